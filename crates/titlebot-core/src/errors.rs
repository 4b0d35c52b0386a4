/// Core error type.
///
/// Adapter crates map their transport errors into this type so startup and
/// session failures are reported the same way regardless of the chat network.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("http client error: {0}")]
    Http(String),

    #[error("tls error: {0}")]
    Tls(String),

    #[error("external error: {0}")]
    External(String),
}

pub type Result<T> = std::result::Result<T, Error>;
