use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("not found")]
    NotFound,

    #[error("forbidden")]
    Forbidden,

    /// Delete-path conflation: the row does not exist OR the acting user is
    /// not a member. Deliberately undifferentiated so deletes do not leak
    /// whether an id exists.
    #[error("not found or not a member")]
    NotFoundOrForbidden,

    #[error("already exists")]
    AlreadyExists,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("upstream error: {0}")]
    Upstream(String),

    #[error("no stored GitHub credential for user")]
    MissingCredential,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("invalid token format")]
    InvalidTokenFormat,

    #[error("bad request: {0}")]
    BadRequest(String),
}

pub type Result<T> = std::result::Result<T, Error>;
