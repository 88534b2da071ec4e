/// Closed taxonomy for session-scoped operation failures.
///
/// Action services raise the most specific member possible; the command
/// router is the single place these are rendered into user-facing strings.
/// Pool-level routing failures reuse the capacity members so callers get one
/// vocabulary for "why did this not happen".
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActionError {
    /// The operation requires an active party context that does not exist.
    #[error("not in a party")]
    NoParty,

    /// A named cosmetic, member, friend, or session could not be resolved.
    #[error("{kind} \"{query}\" not found")]
    NotFound { query: String, kind: String },

    /// A supplied value is not one of the recognized enumerants.
    #[error("invalid value \"{value}\"")]
    InvalidArgument { value: String },

    /// The action must not target the acting session itself.
    #[error("cannot {action} self")]
    SelfAction { action: String },

    /// A required argument was omitted.
    #[error("missing parameter \"{name}\" (usage: {usage})")]
    MissingParameter { name: String, usage: String },

    /// The underlying session-client call failed after local validation passed.
    #[error("remote operation failed: {detail}")]
    RemoteOperation { detail: String },

    /// Friend routing found only sessions at or above the capacity ceiling.
    #[error("all sessions are at friend capacity")]
    CapacityExhausted,

    /// Friend routing found zero connected sessions.
    #[error("no connected sessions available")]
    NoSessionsAvailable,
}

impl ActionError {
    pub fn not_found(query: impl Into<String>, kind: impl Into<String>) -> Self {
        Self::NotFound {
            query: query.into(),
            kind: kind.into(),
        }
    }

    pub fn invalid(value: impl Into<String>) -> Self {
        Self::InvalidArgument {
            value: value.into(),
        }
    }

    pub fn missing(name: impl Into<String>, usage: impl Into<String>) -> Self {
        Self::MissingParameter {
            name: name.into(),
            usage: usage.into(),
        }
    }

    pub fn remote(detail: impl std::fmt::Display) -> Self {
        Self::RemoteOperation {
            detail: detail.to_string(),
        }
    }
}
