pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    General(String),
    /// Dataset attributes or compression could not be resolved.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// Bytes or wire values did not have the expected layout.
    #[error("format error: {0}")]
    Format(String),
    #[error("unsupported: {0}")]
    Unsupported(String),
    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
    /// The remote answered the call with a failure status.
    #[error("remote call failed: {0}")]
    Rpc(#[from] tonic::Status),
    /// The connection to the remote could not be established or broke down.
    #[error(transparent)]
    Transport(#[from] tonic::transport::Error),
    #[error("reader is closed")]
    Closed,
    #[error(transparent)]
    Wrapped(Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    pub fn general(message: impl Into<String>) -> Self {
        Self::General(message.into())
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn format(message: impl Into<String>) -> Self {
        Self::Format(message.into())
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::Unsupported(message.into())
    }

    pub fn wrap(error: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Wrapped(Box::new(error))
    }
}

impl From<Error> for tonic::Status {
    fn from(value: Error) -> Self {
        let message = value.to_string();
        match value {
            Error::Configuration(_) | Error::Format(_) | Error::SerdeJson(_) => {
                tonic::Status::invalid_argument(message)
            }
            Error::Unsupported(_) => tonic::Status::unimplemented(message),
            Error::Rpc(status) => status,
            _ => tonic::Status::internal(message),
        }
    }
}
