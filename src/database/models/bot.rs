//! Managed bot record model.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// A managed bot: an external executable whose lifecycle this service
/// tracks, plus the local admins scoped to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotRecord {
    /// Unique bot name.
    pub name: String,

    /// Path to the bot executable.
    pub exe: String,

    /// The bot's own chat-platform username, if known.
    #[serde(default)]
    pub bot_username: Option<String>,

    /// Free-form type tag (relay, bridge, ...).
    #[serde(default)]
    pub kind: String,

    /// Declared state: true while the bot is supposed to be running.
    #[serde(default)]
    pub state: bool,

    /// Usernames holding local-admin rank for this bot.
    #[serde(default)]
    pub ladmins: Vec<String>,

    /// Unix timestamp of registration.
    pub created_at: i64,
}

impl BotRecord {
    pub fn new(
        name: impl Into<String>,
        exe: impl Into<String>,
        bot_username: Option<String>,
        kind: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            exe: exe.into(),
            bot_username,
            kind: kind.into(),
            state: false,
            ladmins: Vec::new(),
            created_at: chrono::Utc::now().timestamp(),
        }
    }

    /// Lowercased basename of the executable, the key used to match this
    /// bot against entries of the OS process table. `None` when no
    /// executable path is registered.
    pub fn exe_basename(&self) -> Option<String> {
        if self.exe.is_empty() {
            return None;
        }
        Path::new(&self.exe)
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exe_basename_lowercases() {
        let bot = BotRecord::new("relay", "/opt/bots/Relay.Exe", None, "relay");
        assert_eq!(bot.exe_basename(), Some("relay.exe".to_string()));
    }

    #[test]
    fn test_exe_basename_empty_path() {
        let bot = BotRecord::new("ghost", "", None, "");
        assert_eq!(bot.exe_basename(), None);
    }
}
