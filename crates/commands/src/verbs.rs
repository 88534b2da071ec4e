/// Chat verbs and their aliases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Outfit,
    Backpack,
    Pickaxe,
    Emote,
    StopEmote,
    Level,
    Ready,
    Unready,
    Leave,
    Kick,
    Promote,
    Privacy,
    AddFriend,
    Ban,
    Unban,
    Ping,
    Help,
}

impl Verb {
    /// Resolve a (lowercased) verb token. Unknown tokens are simply not
    /// commands; the router stays silent about them.
    pub fn parse(token: &str) -> Option<Self> {
        Some(match token {
            "skin" | "outfit" => Self::Outfit,
            "backpack" | "bag" => Self::Backpack,
            "pickaxe" => Self::Pickaxe,
            "emote" | "dance" => Self::Emote,
            "stopemote" | "stopdance" | "clearemote" => Self::StopEmote,
            "level" => Self::Level,
            "ready" => Self::Ready,
            "unready" => Self::Unready,
            "leave" | "quit" => Self::Leave,
            "kick" => Self::Kick,
            "promote" => Self::Promote,
            "privacy" => Self::Privacy,
            "add" => Self::AddFriend,
            "ban" => Self::Ban,
            "unban" => Self::Unban,
            "ping" => Self::Ping,
            "help" => Self::Help,
            _ => return None,
        })
    }

    /// Administrative verbs require the author to be on the allow-list.
    pub fn requires_admin(&self) -> bool {
        matches!(
            self,
            Self::Leave
                | Self::Kick
                | Self::Promote
                | Self::Privacy
                | Self::AddFriend
                | Self::Ban
                | Self::Unban
        )
    }
}
