//! Command boundary.
//!
//! Every ingress channel funnels into [`ControlService`]. Methods check the
//! issuer's standing, run the engines and convert any error into a
//! caller-facing reply; nothing propagates past this layer uncaught.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::auth::{AuthCodes, AuthEngine};
use crate::config::Config;
use crate::database::{
    AuthCodeRepo, BanRepo, BotRecord, BotRepo, Database, Rank, RankRepo, UserRecord, UserRepo,
};
use crate::error::{WardenError, WardenResult};
use crate::moderation::{BanLedger, ModerationConfig, ModerationEngine, WarnOutcome};
use crate::notify::{self, Notifier};
use crate::supervisor::{BotStatus, Supervisor, SystemTable};
use crate::utils::{extract_username, format_ban_hours};

/// Caller-facing outcome of a single command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandReply {
    pub ok: bool,
    pub message: String,
}

impl From<WardenResult<String>> for CommandReply {
    fn from(result: WardenResult<String>) -> Self {
        match result {
            Ok(message) => Self { ok: true, message },
            Err(e) => Self {
                ok: false,
                message: e.to_string(),
            },
        }
    }
}

pub struct ControlService {
    auth: Arc<AuthEngine>,
    moderation: Arc<ModerationEngine>,
    ledger: Arc<BanLedger>,
    supervisor: Arc<Supervisor>,
    users: Arc<UserRepo>,
    bots: Arc<BotRepo>,
    ranks: Arc<RankRepo>,
    codes: Arc<AuthCodes>,
    bots_dir: PathBuf,
    max_warns: u32,
    broadcast_delay: Duration,
}

impl ControlService {
    /// Wire up repositories and engines over a connected database.
    pub fn build(db: &Database, config: &Config) -> Self {
        let users = Arc::new(UserRepo::new(db));
        let ranks = Arc::new(RankRepo::new(db));
        let bots = Arc::new(BotRepo::new(db));

        let ledger = Arc::new(BanLedger::new(
            Arc::new(BanRepo::new(db)),
            Arc::clone(&users),
        ));

        let auth = Arc::new(AuthEngine::new(
            config.super_operator.clone(),
            Arc::clone(&users),
            Arc::clone(&ranks),
            Arc::clone(&bots),
            Arc::clone(&ledger),
        ));

        let moderation = Arc::new(ModerationEngine::new(
            Arc::clone(&auth),
            Arc::clone(&ledger),
            Arc::clone(&users),
            ModerationConfig {
                max_warns: config.max_warns,
                default_ban_hours: config.default_ban_hours,
            },
        ));

        let supervisor = Arc::new(Supervisor::new(Arc::new(SystemTable::new())));

        let codes = Arc::new(AuthCodes::new(
            Arc::new(AuthCodeRepo::new(db)),
            Arc::clone(&users),
            config.auth_code_ttl_secs,
        ));

        Self {
            auth,
            moderation,
            ledger,
            supervisor,
            users,
            bots,
            ranks,
            codes,
            bots_dir: config.bots_dir.clone(),
            max_warns: config.max_warns,
            broadcast_delay: Duration::from_millis(config.broadcast_delay_ms),
        }
    }

    // --- user tracking ---

    /// Record a user seen on an ingress channel.
    pub async fn register_user(
        &self,
        user_id: i64,
        username: &str,
        first_name: &str,
    ) -> CommandReply {
        let result = async {
            let username = extract_username(username)
                .ok_or_else(|| WardenError::InvalidInput("malformed username".into()))?;

            if self
                .users
                .register(UserRecord::new(&username, user_id, first_name))
                .await?
            {
                Ok(format!("@{username} registered"))
            } else {
                self.users
                    .update_identity(&username, user_id, first_name)
                    .await?;
                Ok(format!("@{username} updated"))
            }
        }
        .await;
        result.into()
    }

    // --- moderation ---

    pub async fn ban(
        &self,
        issuer: &str,
        target: &str,
        duration_hours: u32,
        reason: &str,
    ) -> CommandReply {
        let result = async {
            self.gate(issuer, Rank::GlobalAdmin).await?;
            let target = valid_username(target)?;
            self.moderation
                .ban(issuer, &target, duration_hours, reason)
                .await?;
            Ok(format!(
                "@{target} banned ({})",
                format_ban_hours(duration_hours)
            ))
        }
        .await;
        result.into()
    }

    pub async fn unban(&self, issuer: &str, target: &str) -> CommandReply {
        let result = async {
            self.gate(issuer, Rank::GlobalAdmin).await?;
            let target = valid_username(target)?;
            self.moderation.unban(&target).await?;
            Ok(format!("@{target} unbanned"))
        }
        .await;
        result.into()
    }

    pub async fn warn(&self, issuer: &str, target: &str, reason: &str) -> CommandReply {
        let result = async {
            self.gate(issuer, Rank::GlobalAdmin).await?;
            let target = valid_username(target)?;
            match self.moderation.warn(issuer, &target, reason).await? {
                WarnOutcome::Warned { count, max } => {
                    Ok(format!("@{target} warned ({count}/{max})"))
                }
                WarnOutcome::AutoBanned { count, duration_hours } => Ok(format!(
                    "@{target} warned ({count}/{count}) and automatically banned ({})",
                    format_ban_hours(duration_hours)
                )),
            }
        }
        .await;
        result.into()
    }

    pub async fn unwarn(&self, issuer: &str, target: &str) -> CommandReply {
        let result = async {
            self.gate(issuer, Rank::GlobalAdmin).await?;
            let target = valid_username(target)?;
            let remaining = self.moderation.unwarn(&target).await?;
            Ok(format!(
                "warning removed from @{target} ({remaining}/{})",
                self.max_warns
            ))
        }
        .await;
        result.into()
    }

    // --- rank management ---

    pub async fn promote_operator(&self, issuer: &str, target: &str) -> CommandReply {
        let result = async {
            self.gate(issuer, Rank::Operator).await?;
            let target = valid_username(target)?;
            self.auth.promote_to_operator(&target).await?;
            Ok(format!("@{target} promoted to operator"))
        }
        .await;
        result.into()
    }

    pub async fn demote_operator(&self, issuer: &str, target: &str) -> CommandReply {
        let result = async {
            self.gate(issuer, Rank::Operator).await?;
            let target = valid_username(target)?;
            self.auth.demote_from_operator(&target).await?;
            Ok(format!("@{target} demoted from operator"))
        }
        .await;
        result.into()
    }

    pub async fn promote_global_admin(&self, issuer: &str, target: &str) -> CommandReply {
        let result = async {
            self.gate(issuer, Rank::Operator).await?;
            let target = valid_username(target)?;
            self.auth.promote_to_global_admin(&target).await?;
            Ok(format!("@{target} promoted to global admin"))
        }
        .await;
        result.into()
    }

    pub async fn demote_global_admin(&self, issuer: &str, target: &str) -> CommandReply {
        let result = async {
            self.gate(issuer, Rank::Operator).await?;
            let target = valid_username(target)?;
            self.auth.demote_from_global_admin(&target).await?;
            Ok(format!("@{target} demoted from global admin"))
        }
        .await;
        result.into()
    }

    pub async fn assign_local_admin(
        &self,
        issuer: &str,
        target: &str,
        bot_name: &str,
    ) -> CommandReply {
        let result = async {
            self.gate(issuer, Rank::Operator).await?;
            let target = valid_username(target)?;
            self.auth.assign_local_admin(&target, bot_name).await?;
            Ok(format!("@{target} assigned as local admin of {bot_name}"))
        }
        .await;
        result.into()
    }

    pub async fn revoke_local_admin(
        &self,
        issuer: &str,
        target: &str,
        bot_name: &str,
    ) -> CommandReply {
        let result = async {
            self.gate(issuer, Rank::Operator).await?;
            let target = valid_username(target)?;
            self.auth.revoke_local_admin(&target, bot_name).await?;
            Ok(format!("@{target} revoked as local admin of {bot_name}"))
        }
        .await;
        result.into()
    }

    // --- fleet management ---

    pub async fn add_bot(
        &self,
        issuer: &str,
        name: &str,
        bot_username: Option<String>,
        kind: &str,
    ) -> CommandReply {
        let result = async {
            self.gate(issuer, Rank::Operator).await?;
            let name = valid_bot_name(name)?;

            let exe = self.bots_dir.join(&name);
            if !exe.exists() {
                // Registration still goes through; start will refuse until
                // the executable shows up.
                warn!("executable for bot {} missing at {}", name, exe.display());
            }

            let record = BotRecord::new(&name, exe.to_string_lossy(), bot_username, kind);
            if !self.bots.insert(record).await? {
                return Err(WardenError::AlreadyExists(format!(
                    "bot {name} already exists"
                )));
            }
            Ok(format!("bot {name} added"))
        }
        .await;
        result.into()
    }

    pub async fn remove_bot(&self, issuer: &str, name: &str) -> CommandReply {
        let result = async {
            self.gate(issuer, Rank::Operator).await?;

            let bot = self
                .bots
                .get(name)
                .await
                .ok_or_else(|| WardenError::NotFound(format!("bot {name}")))?;

            if self.supervisor.status(&bot) == BotStatus::Running {
                if let Err(e) = self.supervisor.stop(&bot) {
                    warn!("could not stop bot {} before removal: {}", name, e);
                }
            }

            self.bots.remove(name).await?;
            Ok(format!("bot {name} removed"))
        }
        .await;
        result.into()
    }

    pub async fn start_bot(&self, issuer: &str, name: &str) -> CommandReply {
        let result = async {
            self.gate(issuer, Rank::Operator).await?;

            let bot = self
                .bots
                .get(name)
                .await
                .ok_or_else(|| WardenError::NotFound(format!("bot {name}")))?;

            let pid = self.supervisor.start(&bot).await?;
            self.bots.set_state(name, true).await?;
            Ok(format!("bot {name} started (pid {pid})"))
        }
        .await;
        result.into()
    }

    pub async fn stop_bot(&self, issuer: &str, name: &str) -> CommandReply {
        let result = async {
            self.gate(issuer, Rank::Operator).await?;

            let bot = self
                .bots
                .get(name)
                .await
                .ok_or_else(|| WardenError::NotFound(format!("bot {name}")))?;

            let signaled = self.supervisor.stop(&bot)?;
            self.bots.set_state(name, false).await?;
            Ok(format!("bot {name} stopped ({signaled} process(es) signaled)"))
        }
        .await;
        result.into()
    }

    pub async fn bot_status(&self, issuer: &str, name: &str) -> CommandReply {
        let result = async {
            // Local admins may query their own bot; everything else in
            // fleet management stays operator-only.
            if self.ledger.is_banned(issuer).await {
                return Err(WardenError::PermissionDenied("you are banned".into()));
            }
            if !self.auth.is_local_admin(issuer, Some(name)).await {
                return Err(WardenError::PermissionDenied(format!(
                    "requires local admin rank for bot {name}"
                )));
            }

            let bot = self
                .bots
                .get(name)
                .await
                .ok_or_else(|| WardenError::NotFound(format!("bot {name}")))?;

            Ok(format!("bot {name}: {}", self.supervisor.status(&bot)))
        }
        .await;
        result.into()
    }

    pub async fn list_bots(&self, issuer: &str) -> CommandReply {
        let result = async {
            self.gate(issuer, Rank::Operator).await?;

            let bots = self.bots.all().await;
            if bots.is_empty() {
                return Ok("no bots registered".to_string());
            }

            let mut lines = Vec::with_capacity(bots.len());
            for bot in &bots {
                let username = bot.bot_username.as_deref().unwrap_or("-");
                lines.push(format!(
                    "{} ({}) {}",
                    bot.name,
                    username,
                    self.supervisor.status(bot)
                ));
            }
            Ok(lines.join("\n"))
        }
        .await;
        result.into()
    }

    /// Align declared bot state with the live process table. Run at
    /// startup, after the supervisor lost its PID tracking to a restart.
    pub async fn reconcile_fleet(&self) -> usize {
        let bots = self.bots.all().await;
        let divergences = self.supervisor.reconcile(&bots);
        let count = divergences.len();

        for (name, running) in divergences {
            info!(
                "reconciling bot {}: declared {} but actually {}",
                name,
                if running { "stopped" } else { "running" },
                if running { "running" } else { "stopped" }
            );
            if let Err(e) = self.bots.set_state(&name, running).await {
                warn!("failed to persist reconciled state for {}: {}", name, e);
            }
        }

        count
    }

    // --- queries ---

    pub async fn user_info(&self, issuer: &str, target: &str) -> CommandReply {
        let result = async {
            self.gate(issuer, Rank::GlobalAdmin).await?;
            let target = valid_username(target)?;

            let user = self
                .users
                .get(&target)
                .await
                .ok_or_else(|| WardenError::NotFound(format!("user @{target}")))?;

            let rank = self.auth.effective_rank(&target).await;
            let mut lines = vec![
                format!("username: @{}", user.username),
                format!("rank: {}", rank.title()),
                format!("id: {}", user.user_id),
                format!("name: {}", user.first_name),
            ];

            if rank < Rank::GlobalAdmin {
                let status = match self.moderation.check_ban(&target).await {
                    Some(ban) if ban.is_permanent() => "banned permanently".to_string(),
                    Some(ban) => format!("banned ({})", format_ban_hours(ban.duration_hours)),
                    None => "active".to_string(),
                };
                lines.push(format!("status: {status}"));
                lines.push(format!("warnings: {}/{}", user.warns, self.max_warns));
            }

            Ok(lines.join("\n"))
        }
        .await;
        result.into()
    }

    pub async fn list_members(&self, issuer: &str, kind: &str) -> CommandReply {
        let result = async {
            self.gate(issuer, Rank::GlobalAdmin).await?;

            let members = match kind {
                "operator" => self.ranks.operators().await,
                "gadmin" => self.ranks.global_admins().await,
                "ladmin" => self.bots.all_ladmins().await,
                "ban" => self
                    .ledger
                    .all()
                    .await
                    .into_iter()
                    .map(|ban| ban.username)
                    .collect(),
                _ => {
                    return Err(WardenError::InvalidInput(format!(
                        "unknown list {kind}; available: operator, gadmin, ladmin, ban"
                    )));
                }
            };

            if members.is_empty() {
                return Ok(format!("no {kind} entries"));
            }

            Ok(members
                .iter()
                .enumerate()
                .map(|(i, username)| format!("{}. @{username}", i + 1))
                .collect::<Vec<_>>()
                .join("\n"))
        }
        .await;
        result.into()
    }

    pub async fn stats(&self, issuer: &str) -> CommandReply {
        let result = async {
            self.gate(issuer, Rank::Operator).await?;

            let total_users = self.users.count().await;
            let banned_users = self.users.banned_count().await;

            let bots = self.bots.all().await;
            let running = bots
                .iter()
                .filter(|bot| self.supervisor.status(bot) == BotStatus::Running)
                .count();

            Ok(format!(
                "users: {total_users} ({banned_users} banned)\n\
                 bots: {} ({} running, {} stopped)\n\
                 global admins: {}\n\
                 operators: {}",
                bots.len(),
                running,
                bots.len() - running,
                self.ranks.gadmin_count().await,
                self.ranks.operator_count().await,
            ))
        }
        .await;
        result.into()
    }

    // --- notifications ---

    /// Mass notification to every known, unbanned user.
    pub async fn broadcast<N: Notifier>(
        &self,
        issuer: &str,
        body: &str,
        notifier: &N,
    ) -> CommandReply {
        let result = async {
            self.gate(issuer, Rank::Operator).await?;
            if body.trim().is_empty() {
                return Err(WardenError::InvalidInput("empty message".into()));
            }

            let recipients = self.users.all().await;
            let report = notify::broadcast(notifier, &recipients, body, self.broadcast_delay).await;
            Ok(format!(
                "notifications sent to {}/{} users",
                report.sent,
                report.total()
            ))
        }
        .await;
        result.into()
    }

    // --- auth codes ---

    pub async fn issue_auth_code(&self, issuer: &str, target: &str) -> CommandReply {
        let result = async {
            self.gate(issuer, Rank::Operator).await?;
            let target = valid_username(target)?;
            let code = self.codes.issue(&target).await?;
            Ok(format!("auth code for @{target}: {code}"))
        }
        .await;
        result.into()
    }

    pub async fn redeem_auth_code(&self, code: &str) -> CommandReply {
        let result = async {
            let username = self.codes.redeem(code.trim()).await?;
            Ok(format!("authenticated as @{username}"))
        }
        .await;
        result.into()
    }

    /// Drop used and expired auth codes. Run opportunistically at startup.
    pub async fn purge_auth_codes(&self) -> u64 {
        match self.codes.purge_stale().await {
            Ok(purged) => purged,
            Err(e) => {
                warn!("auth code purge failed: {}", e);
                0
            }
        }
    }

    /// Issuer gate shared by every privileged command: banned callers are
    /// rejected outright, then the rank order decides.
    async fn gate(&self, issuer: &str, required: Rank) -> WardenResult<()> {
        if self.ledger.is_banned(issuer).await {
            return Err(WardenError::PermissionDenied("you are banned".into()));
        }

        let rank = self.auth.effective_rank(issuer).await;
        if rank < required {
            return Err(WardenError::PermissionDenied(format!(
                "requires {} rank",
                required.title()
            )));
        }
        Ok(())
    }
}

fn valid_username(raw: &str) -> WardenResult<String> {
    extract_username(raw).ok_or_else(|| WardenError::InvalidInput("malformed username".into()))
}

fn valid_bot_name(raw: &str) -> WardenResult<String> {
    let name = raw.trim();
    let valid = !name.is_empty()
        && name.len() <= 64
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if !valid {
        return Err(WardenError::InvalidInput(format!("malformed bot name {raw:?}")));
    }
    Ok(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_reply_from_result() {
        let ok = CommandReply::from(WardenResult::Ok("done".to_string()));
        assert!(ok.ok);
        assert_eq!(ok.message, "done");

        let err = CommandReply::from(WardenResult::<String>::Err(WardenError::NotFound(
            "user @ghost".into(),
        )));
        assert!(!err.ok);
        assert_eq!(err.message, "user @ghost not found");
    }

    #[test]
    fn test_valid_bot_name() {
        assert_eq!(valid_bot_name(" relay-2 ").unwrap(), "relay-2");
        assert!(valid_bot_name("").is_err());
        assert!(valid_bot_name("../escape").is_err());
        assert!(valid_bot_name("has space").is_err());
    }
}
