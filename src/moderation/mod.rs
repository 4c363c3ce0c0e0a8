//! Moderation state machine.
//!
//! Per-user states: active, banned permanently, banned temporarily with
//! lazy expiry. Warnings accumulate toward a configured ceiling and the
//! final warning escalates to an automatic ban.

mod bans;
mod engine;

pub use bans::BanLedger;
pub use engine::ModerationEngine;

/// Tuning inputs for the warn/ban machinery.
#[derive(Debug, Clone, Copy)]
pub struct ModerationConfig {
    /// Warning count at which the next warning becomes a ban.
    pub max_warns: u32,

    /// Ban duration used on warn escalation, in hours (0 = permanent).
    pub default_ban_hours: u32,
}

/// Result of a successful warn call. The escalated case must stay
/// distinguishable for the caller relaying it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarnOutcome {
    /// Warning recorded, ceiling not reached.
    Warned { count: u32, max: u32 },

    /// The warning reached the ceiling and the user was banned.
    AutoBanned { count: u32, duration_hours: u32 },
}
