//! Moderation state machine: ban lifecycle and warn accumulation.

use std::sync::Arc;

use tracing::info;

use crate::auth::AuthEngine;
use crate::database::{BanRecord, UserRepo};
use crate::error::{WardenError, WardenResult};

use super::bans::BanLedger;
use super::{ModerationConfig, WarnOutcome};

pub struct ModerationEngine {
    auth: Arc<AuthEngine>,
    ledger: Arc<BanLedger>,
    users: Arc<UserRepo>,
    config: ModerationConfig,
}

impl ModerationEngine {
    pub fn new(
        auth: Arc<AuthEngine>,
        ledger: Arc<BanLedger>,
        users: Arc<UserRepo>,
        config: ModerationConfig,
    ) -> Self {
        Self {
            auth,
            ledger,
            users,
            config,
        }
    }

    /// Ban a user. Duration 0 is permanent; any positive value is hours
    /// until lazy auto-expiry.
    ///
    /// On success the target's rank is forced to `user`, the warn counter
    /// is cleared and every admin membership is removed. The demotion is
    /// permanent: unbanning does not restore the old rank.
    pub async fn ban(
        &self,
        issuer: &str,
        target: &str,
        duration_hours: u32,
        reason: &str,
    ) -> WardenResult<()> {
        self.auth.can_ban(issuer, target).await?;

        let record = BanRecord::new(target, issuer, duration_hours, reason);
        self.ledger.impose(&record).await?;
        self.users.apply_ban_penalty(target).await?;
        self.auth.sweep_memberships(target).await?;

        info!(
            "@{} banned @{} ({}h, reason: {:?})",
            issuer, target, duration_hours, reason
        );
        Ok(())
    }

    /// Lift a ban. Fails with `NotFound` when no active ban exists.
    pub async fn unban(&self, target: &str) -> WardenResult<()> {
        if !self.users.exists(target).await {
            return Err(WardenError::NotFound(format!("user @{target}")));
        }
        if !self.ledger.lift(target).await? {
            return Err(WardenError::NotFound(format!("ban for @{target}")));
        }
        info!("@{} unbanned", target);
        Ok(())
    }

    /// Current ban state. Expired temporary bans are cleared as a side
    /// effect (see [`BanLedger::check`] for the mutation contract).
    pub async fn check_ban(&self, target: &str) -> Option<BanRecord> {
        self.ledger.check(target).await
    }

    /// Issue a warning.
    ///
    /// Fails once the counter has already reached the ceiling; the target
    /// should be banned at that point, not warned again. When this warning
    /// itself reaches the ceiling the ban is applied automatically and the
    /// outcome says so.
    pub async fn warn(&self, issuer: &str, target: &str, reason: &str) -> WardenResult<WarnOutcome> {
        self.auth.can_warn(issuer, target).await?;

        let user = self
            .users
            .get(target)
            .await
            .ok_or_else(|| WardenError::NotFound(format!("user @{target}")))?;

        match warn_step(user.warns, self.config.max_warns) {
            WarnStep::Ceiling => Err(WardenError::InvalidInput(format!(
                "@{target} already has {}/{} warnings; ban instead",
                user.warns, self.config.max_warns
            ))),
            WarnStep::Record(count) => {
                self.users.set_warns(target, count).await?;
                info!(
                    "@{} warned @{} ({}/{}, reason: {:?})",
                    issuer, target, count, self.config.max_warns, reason
                );
                Ok(WarnOutcome::Warned {
                    count,
                    max: self.config.max_warns,
                })
            }
            WarnStep::Escalate(count) => {
                self.users.set_warns(target, count).await?;
                info!(
                    "@{} warned @{} ({}/{}, reason: {:?}); ceiling reached",
                    issuer, target, count, self.config.max_warns, reason
                );
                self.ban(issuer, target, self.config.default_ban_hours, "")
                    .await?;
                Ok(WarnOutcome::AutoBanned {
                    count,
                    duration_hours: self.config.default_ban_hours,
                })
            }
        }
    }

    /// Remove one warning. Fails when the counter is already at zero.
    pub async fn unwarn(&self, target: &str) -> WardenResult<u32> {
        let user = self
            .users
            .get(target)
            .await
            .ok_or_else(|| WardenError::NotFound(format!("user @{target}")))?;

        if user.warns == 0 {
            return Err(WardenError::InvalidInput(format!(
                "@{target} has no warnings"
            )));
        }

        let remaining = user.warns - 1;
        self.users.set_warns(target, remaining).await?;
        info!("warning removed from @{} ({} left)", target, remaining);
        Ok(remaining)
    }
}

/// What a new warning does to a counter already at `current`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WarnStep {
    /// Counter already at the ceiling; the warn is refused.
    Ceiling,
    /// Record the warning at this new count.
    Record(u32),
    /// Record the warning and escalate to an automatic ban.
    Escalate(u32),
}

fn warn_step(current: u32, max: u32) -> WarnStep {
    if current >= max {
        WarnStep::Ceiling
    } else if current + 1 >= max {
        WarnStep::Escalate(current + 1)
    } else {
        WarnStep::Record(current + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warn_step_counts_below_ceiling() {
        assert_eq!(warn_step(0, 3), WarnStep::Record(1));
        assert_eq!(warn_step(1, 3), WarnStep::Record(2));
    }

    #[test]
    fn test_warn_step_escalates_on_final_warning() {
        assert_eq!(warn_step(2, 3), WarnStep::Escalate(3));
        assert_eq!(warn_step(0, 1), WarnStep::Escalate(1));
    }

    #[test]
    fn test_warn_step_refuses_at_ceiling() {
        assert_eq!(warn_step(3, 3), WarnStep::Ceiling);
        assert_eq!(warn_step(5, 3), WarnStep::Ceiling);
    }
}
