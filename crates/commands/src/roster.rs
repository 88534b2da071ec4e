use std::{path::PathBuf, sync::Mutex};

use {
    serde::{Deserialize, Serialize},
    tracing::warn,
};

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
struct RosterData {
    admins: Vec<String>,
    banned: Vec<String>,
}

/// Admin allow-list and ban-list.
///
/// Admins come from configuration and from the roster file; ban mutations are
/// written back to the file when one is configured, so bans survive restarts.
pub struct AdminRoster {
    data: Mutex<RosterData>,
    path: Option<PathBuf>,
}

impl AdminRoster {
    pub fn new(admins: Vec<String>) -> Self {
        Self {
            data: Mutex::new(RosterData {
                admins,
                banned: Vec::new(),
            }),
            path: None,
        }
    }

    /// Load the roster file (when present) and merge the configured admins in.
    pub fn load(path: PathBuf, admins: Vec<String>) -> Self {
        let mut data = match std::fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!(path = %path.display(), "roster file unreadable, starting fresh: {e}");
                RosterData::default()
            }),
            Err(_) => RosterData::default(),
        };
        for admin in admins {
            if !data.admins.iter().any(|a| a.eq_ignore_ascii_case(&admin)) {
                data.admins.push(admin);
            }
        }
        Self {
            data: Mutex::new(data),
            path: Some(path),
        }
    }

    pub fn is_admin(&self, display_name: &str) -> bool {
        self.data
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .admins
            .iter()
            .any(|a| a.eq_ignore_ascii_case(display_name))
    }

    /// Exact ban or a ban entry contained in the display name.
    pub fn is_banned(&self, display_name: &str) -> bool {
        let lowered = display_name.to_lowercase();
        self.data
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .banned
            .iter()
            .any(|b| lowered.contains(&b.to_lowercase()))
    }

    /// Add to the ban-list; returns false when already present.
    pub fn ban(&self, display_name: &str) -> bool {
        let snapshot = {
            let mut data = self.data.lock().unwrap_or_else(|e| e.into_inner());
            if data
                .banned
                .iter()
                .any(|b| b.eq_ignore_ascii_case(display_name))
            {
                return false;
            }
            data.banned.push(display_name.to_string());
            data.clone()
        };
        self.persist(&snapshot);
        true
    }

    /// Remove from the ban-list; returns false when not present.
    pub fn unban(&self, display_name: &str) -> bool {
        let snapshot = {
            let mut data = self.data.lock().unwrap_or_else(|e| e.into_inner());
            let before = data.banned.len();
            data.banned.retain(|b| !b.eq_ignore_ascii_case(display_name));
            if data.banned.len() == before {
                return false;
            }
            data.clone()
        };
        self.persist(&snapshot);
        true
    }

    pub fn banned(&self) -> Vec<String> {
        self.data
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .banned
            .clone()
    }

    fn persist(&self, data: &RosterData) {
        let Some(path) = &self.path else { return };
        match serde_json::to_string_pretty(data) {
            Ok(raw) => {
                if let Err(e) = std::fs::write(path, raw) {
                    warn!(path = %path.display(), "failed to persist roster: {e}");
                }
            },
            Err(e) => warn!("failed to serialize roster: {e}"),
        }
    }
}
