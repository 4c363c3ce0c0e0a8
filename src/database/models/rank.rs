//! Rank hierarchy.

use serde::{Deserialize, Serialize};

/// User rank. Variants are declared in ascending order of authority, so the
/// derived `Ord` is the one precedence used everywhere:
/// operator > gadmin > ladmin > user.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Rank {
    #[default]
    User,
    #[serde(rename = "ladmin")]
    LocalAdmin,
    #[serde(rename = "gadmin")]
    GlobalAdmin,
    Operator,
}

impl Rank {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::LocalAdmin => "ladmin",
            Self::GlobalAdmin => "gadmin",
            Self::Operator => "operator",
        }
    }

    /// Human-readable rank name for replies.
    pub fn title(&self) -> &'static str {
        match self {
            Self::User => "User",
            Self::LocalAdmin => "Local Admin",
            Self::GlobalAdmin => "Global Admin",
            Self::Operator => "Operator",
        }
    }

    /// Compute the displayed rank from set memberships.
    ///
    /// The membership sets are the source of truth; the cached rank field on
    /// a user record is always derived through this function, in the same
    /// unit of work as the membership change.
    pub fn from_memberships(is_operator: bool, is_gadmin: bool, ladmin_bindings: u64) -> Self {
        if is_operator {
            Self::Operator
        } else if is_gadmin {
            Self::GlobalAdmin
        } else if ladmin_bindings > 0 {
            Self::LocalAdmin
        } else {
            Self::User
        }
    }
}

impl std::fmt::Display for Rank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_precedence_total_order() {
        assert!(Rank::Operator > Rank::GlobalAdmin);
        assert!(Rank::GlobalAdmin > Rank::LocalAdmin);
        assert!(Rank::LocalAdmin > Rank::User);
    }

    #[test]
    fn test_from_memberships_prefers_highest_tier() {
        assert_eq!(Rank::from_memberships(true, true, 5), Rank::Operator);
        assert_eq!(Rank::from_memberships(false, true, 2), Rank::GlobalAdmin);
        assert_eq!(Rank::from_memberships(false, false, 1), Rank::LocalAdmin);
        assert_eq!(Rank::from_memberships(false, false, 0), Rank::User);
    }
}
