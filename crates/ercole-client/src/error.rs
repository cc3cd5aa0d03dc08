/// Errors raised by the remote service clients.
///
/// The port implementations return `anyhow::Result`; these convert
/// transparently at that boundary.
///
/// # Examples
///
/// ```rust
/// use ercole_client::error::ClientError;
///
/// let err = ClientError::Api {
///     service: "alert-service",
///     status: 503,
///     body: "unavailable".to_string(),
/// };
/// assert!(err.to_string().contains("status=503"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The request could not be sent or the response could not be read.
    #[error("Client: HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The remote service answered with a non-success status.
    #[error("Client: API error from {service}: status={status}, body={body}")]
    Api {
        service: &'static str,
        status: u16,
        body: String,
    },
}

/// Convenience `Result` alias for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
