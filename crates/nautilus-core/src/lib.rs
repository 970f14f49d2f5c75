#![forbid(unsafe_code)]

//! Geometry primitives and shared types for the nautilus radial layout
//! engine.
//!
//! Design goals:
//! - deterministic outputs (no randomness, stable iteration everywhere)
//! - plain value types; the engine crate owns all graph state
//! - angles normalized to `[0, 2*PI)` with "forward" = counter-clockwise

pub mod anchor;
pub mod circle;
pub mod config;
pub mod enclosing;
pub mod error;
pub mod geom;
pub mod primitives;
pub mod radial;

pub use anchor::Anchor;
pub use circle::Circle;
pub use config::LayoutConfig;
pub use error::{Error, Result};
pub use primitives::{Curve, Primitive};
pub use radial::{ArcDirection, RadClamp};
