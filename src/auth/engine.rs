//! Authorization engine.
//!
//! Resolves ranks from the membership sets, applies the pure policy rules
//! and performs rank mutations. Every mutation rewrites the cached rank
//! field in the same unit of work, derived from the sets it just changed.

use std::sync::Arc;

use tracing::info;

use crate::database::{BotRepo, Rank, RankRepo, UserRepo};
use crate::error::{WardenError, WardenResult};
use crate::moderation::BanLedger;

use super::policy;

pub struct AuthEngine {
    super_operator: String,
    users: Arc<UserRepo>,
    ranks: Arc<RankRepo>,
    bots: Arc<BotRepo>,
    ledger: Arc<BanLedger>,
}

impl AuthEngine {
    pub fn new(
        super_operator: String,
        users: Arc<UserRepo>,
        ranks: Arc<RankRepo>,
        bots: Arc<BotRepo>,
        ledger: Arc<BanLedger>,
    ) -> Self {
        Self {
            super_operator,
            users,
            ranks,
            bots,
            ledger,
        }
    }

    pub fn is_super_operator(&self, username: &str) -> bool {
        username == self.super_operator
    }

    /// True for the super-operator identity and members of the operator set.
    pub async fn is_operator(&self, username: &str) -> bool {
        self.is_super_operator(username) || self.ranks.is_operator_member(username).await
    }

    /// Operators are global admins by hierarchy.
    pub async fn is_global_admin(&self, username: &str) -> bool {
        self.is_operator(username).await || self.ranks.is_gadmin_member(username).await
    }

    /// Global admins are local admins everywhere; otherwise the username
    /// must be bound to the named bot.
    pub async fn is_local_admin(&self, username: &str, bot_name: Option<&str>) -> bool {
        if self.is_global_admin(username).await {
            return true;
        }
        match bot_name {
            Some(name) => self
                .bots
                .get(name)
                .await
                .map(|bot| bot.ladmins.iter().any(|l| l == username))
                .unwrap_or(false),
            None => false,
        }
    }

    /// Displayed rank, derived from the membership sets.
    pub async fn effective_rank(&self, username: &str) -> Rank {
        let is_operator = self.is_operator(username).await;
        let is_gadmin = self.ranks.is_gadmin_member(username).await;
        let bindings = if is_operator || is_gadmin {
            0
        } else {
            self.bots.ladmin_binding_count(username).await
        };
        Rank::from_memberships(is_operator, is_gadmin, bindings)
    }

    pub async fn promote_to_operator(&self, username: &str) -> WardenResult<()> {
        if self.is_super_operator(username) {
            return Err(WardenError::AlreadyExists(
                "the super-operator rank is fixed".into(),
            ));
        }
        self.require_active(username).await?;

        if !self.ranks.add_operator(username).await? {
            return Err(WardenError::AlreadyExists(format!(
                "@{username} is already an operator"
            )));
        }
        self.refresh_rank(username).await?;
        info!("@{} promoted to operator", username);
        Ok(())
    }

    pub async fn demote_from_operator(&self, username: &str) -> WardenResult<()> {
        if self.is_super_operator(username) {
            return Err(WardenError::PermissionDenied(
                "the super-operator cannot be demoted".into(),
            ));
        }

        if !self.ranks.remove_operator(username).await? {
            return Err(WardenError::NotFound(format!("operator @{username}")));
        }
        self.refresh_rank(username).await?;
        info!("@{} demoted from operator", username);
        Ok(())
    }

    pub async fn promote_to_global_admin(&self, username: &str) -> WardenResult<()> {
        self.require_active(username).await?;

        if !self.ranks.add_global_admin(username).await? {
            return Err(WardenError::AlreadyExists(format!(
                "@{username} is already a global admin"
            )));
        }
        self.refresh_rank(username).await?;
        info!("@{} promoted to global admin", username);
        Ok(())
    }

    pub async fn demote_from_global_admin(&self, username: &str) -> WardenResult<()> {
        if !self.ranks.remove_global_admin(username).await? {
            return Err(WardenError::NotFound(format!("global admin @{username}")));
        }
        self.refresh_rank(username).await?;
        info!("@{} demoted from global admin", username);
        Ok(())
    }

    pub async fn assign_local_admin(&self, username: &str, bot_name: &str) -> WardenResult<()> {
        self.require_active(username).await?;
        if self.bots.get(bot_name).await.is_none() {
            return Err(WardenError::NotFound(format!("bot {bot_name}")));
        }

        if !self.bots.add_ladmin(bot_name, username).await? {
            return Err(WardenError::AlreadyExists(format!(
                "@{username} is already a local admin of {bot_name}"
            )));
        }
        self.refresh_rank(username).await?;
        info!("@{} assigned as local admin of {}", username, bot_name);
        Ok(())
    }

    /// Unbind a local admin. The rank reverts to `user` only when no other
    /// membership remains, which `refresh_rank` checks across the gadmin
    /// set, the operator set and every other bot binding.
    pub async fn revoke_local_admin(&self, username: &str, bot_name: &str) -> WardenResult<()> {
        if self.bots.get(bot_name).await.is_none() {
            return Err(WardenError::NotFound(format!("bot {bot_name}")));
        }

        if !self.bots.remove_ladmin(bot_name, username).await? {
            return Err(WardenError::NotFound(format!(
                "local admin @{username} of {bot_name}"
            )));
        }
        self.refresh_rank(username).await?;
        info!("@{} revoked as local admin of {}", username, bot_name);
        Ok(())
    }

    /// Remove the username from every admin set. Applied at ban time; the
    /// caller is responsible for the rank rewrite that goes with it.
    pub async fn sweep_memberships(&self, username: &str) -> WardenResult<()> {
        self.ranks.remove_global_admin(username).await?;
        self.ranks.remove_operator(username).await?;
        self.bots.remove_ladmin_everywhere(username).await?;
        Ok(())
    }

    /// Check whether `issuer` may ban `target`.
    pub async fn can_ban(&self, issuer: &str, target: &str) -> WardenResult<()> {
        if !self.users.exists(target).await {
            return Err(WardenError::NotFound(format!("user @{target}")));
        }

        let issuer_rank = self.effective_rank(issuer).await;
        let target_rank = self.effective_rank(target).await;

        policy::ban_permitted(issuer_rank, target_rank, self.is_super_operator(target))
            .map_err(|denied| WardenError::PermissionDenied(denied.to_string()))
    }

    /// Check whether `target` may be warned at all.
    pub async fn can_warn(&self, _issuer: &str, target: &str) -> WardenResult<()> {
        if !self.users.exists(target).await {
            return Err(WardenError::NotFound(format!("user @{target}")));
        }

        let target_rank = self.effective_rank(target).await;

        policy::warn_permitted(target_rank, self.is_super_operator(target))
            .map_err(|denied| WardenError::PermissionDenied(denied.to_string()))
    }

    /// Exists and not banned: the gate shared by every promotion path.
    async fn require_active(&self, username: &str) -> WardenResult<()> {
        if !self.users.exists(username).await {
            return Err(WardenError::NotFound(format!("user @{username}")));
        }
        if self.ledger.is_banned(username).await {
            return Err(WardenError::PermissionDenied(format!(
                "@{username} is banned"
            )));
        }
        Ok(())
    }

    /// Rewrite the cached rank field from current memberships.
    async fn refresh_rank(&self, username: &str) -> WardenResult<()> {
        let rank = self.effective_rank(username).await;
        self.users.set_rank(username, rank).await
    }
}
