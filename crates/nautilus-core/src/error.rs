pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Unknown node id: {id}")]
    UnknownNode { id: String },

    #[error("Duplicate node id: {id}")]
    DuplicateNode { id: String },

    #[error("Cluster `{cluster}` references node `{id}` more than once")]
    DuplicateClusterMember { cluster: String, id: String },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Geometric construction failed: {what}")]
    Construction { what: String },
}

impl Error {
    pub fn construction(what: impl Into<String>) -> Self {
        Error::Construction { what: what.into() }
    }
}
