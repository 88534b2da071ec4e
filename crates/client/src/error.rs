/// Failures surfaced by the session client.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ClientError {
    /// Authentication against the game service failed.
    #[error("login: {0}")]
    Login(String),

    /// The connection dropped or a request never completed.
    #[error("transport: {0}")]
    Transport(String),

    /// The service accepted the request and said no.
    #[error("rejected: {0}")]
    Rejected(String),
}
