use thiserror::Error;

/// Errors returned by LinkPlay device operations
#[derive(Debug, Error)]
pub enum Error {
    /// The request could not be completed (DNS failure, refused connection,
    /// timeout, interrupted body)
    #[error("{0}")]
    Connection(String),

    /// The device answered, but with an unexpected status code, a body that
    /// could not be decoded, or a value outside a known table
    #[error("{0}")]
    Api(String),

    /// A caller-supplied argument was rejected before anything was sent
    #[error("{0}")]
    Validation(String),

    /// The device command for this operation is not known
    #[error("Command '{0}' is not implemented yet")]
    Unsupported(&'static str),
}

impl Error {
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    pub fn api(msg: impl Into<String>) -> Self {
        Self::Api(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// True for device-side protocol errors, including argument validation
    pub fn is_api(&self) -> bool {
        matches!(self, Self::Api(_) | Self::Validation(_))
    }

    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
