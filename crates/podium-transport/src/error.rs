/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The connection was closed.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// Dialing the remote endpoint failed.
    #[error("connect failed: {0}")]
    ConnectFailed(#[source] std::io::Error),

    /// Sending data failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Receiving data failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// The HTTP request could not be completed (DNS, TLS, timeout, reset).
    ///
    /// A non-2xx status is NOT an error at this layer. The response is
    /// handed back as-is and the API layer decides what it means.
    #[cfg(feature = "http")]
    #[error("http request failed: {0}")]
    Http(#[source] reqwest::Error),
}

impl TransportError {
    /// Shorthand used by transports that have no richer error to wrap.
    pub fn connect_refused(reason: impl Into<String>) -> Self {
        Self::ConnectFailed(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            reason.into(),
        ))
    }
}
