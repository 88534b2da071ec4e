use crate::session::{Friend, PartyMember};

/// Inbound activity on a live session.
///
/// Delivered on a broadcast channel so the pool can attach its fixed handler
/// set at launch time without the client knowing who listens.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Another account sent this session a friend request.
    FriendRequest {
        account_id: String,
        display_name: String,
    },

    /// Someone joined the session's party (including the session itself).
    PartyMemberJoined { member: PartyMember },

    /// A chat message in the party lobby.
    PartyChat { author: PartyMember, body: String },

    /// A direct message. `message_id` identifies the message on the wire;
    /// some event sources redeliver our own outgoing whispers here.
    Whisper {
        author: Friend,
        body: String,
        message_id: String,
    },

    /// The connection dropped. Terminal for this session.
    Disconnected { reason: String },
}
