//! Pure permission rules over the rank hierarchy.
//!
//! Kept free of I/O so the full decision matrix is unit-testable. The
//! engine resolves ranks from the membership sets and delegates here.

use crate::database::Rank;

/// Why a ban request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BanDenied {
    /// Operators (including the super-operator) cannot be banned by anyone.
    OperatorImmune,
    /// Global admins can only be banned by operators.
    RequiresOperator,
}

impl std::fmt::Display for BanDenied {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OperatorImmune => f.write_str("operators cannot be banned"),
            Self::RequiresOperator => f.write_str("only operators may ban a global admin"),
        }
    }
}

/// Why a warn request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarnDenied {
    /// Operators and global admins are immune to warnings from anyone.
    AdminImmune,
}

impl std::fmt::Display for WarnDenied {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("operators and global admins cannot be warned")
    }
}

/// Decide whether `issuer` may ban `target`.
///
/// Rules, applied in order:
/// - an operator target is immune, no matter who asks;
/// - a global-admin target requires an operator issuer, which also blocks
///   a global admin acting laterally or upward;
/// - every other combination is permitted.
pub fn ban_permitted(issuer: Rank, target: Rank, target_is_super: bool) -> Result<(), BanDenied> {
    if target_is_super || target == Rank::Operator {
        return Err(BanDenied::OperatorImmune);
    }
    if target == Rank::GlobalAdmin && issuer != Rank::Operator {
        return Err(BanDenied::RequiresOperator);
    }
    Ok(())
}

/// Decide whether `target` may be warned. Issuer rank is irrelevant:
/// the immunity of privileged targets holds against anyone.
pub fn warn_permitted(target: Rank, target_is_super: bool) -> Result<(), WarnDenied> {
    if target_is_super || target >= Rank::GlobalAdmin {
        return Err(WarnDenied::AdminImmune);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Rank::*;

    #[test]
    fn test_operator_may_ban_gadmin() {
        assert_eq!(ban_permitted(Operator, GlobalAdmin, false), Ok(()));
    }

    #[test]
    fn test_gadmin_cannot_ban_laterally_or_upward() {
        assert_eq!(
            ban_permitted(GlobalAdmin, GlobalAdmin, false),
            Err(BanDenied::RequiresOperator)
        );
        assert_eq!(
            ban_permitted(GlobalAdmin, Operator, false),
            Err(BanDenied::OperatorImmune)
        );
    }

    #[test]
    fn test_operators_immune_from_everyone() {
        for issuer in [User, LocalAdmin, GlobalAdmin, Operator] {
            assert_eq!(
                ban_permitted(issuer, Operator, false),
                Err(BanDenied::OperatorImmune)
            );
        }
    }

    #[test]
    fn test_super_operator_unbannable_at_any_displayed_rank() {
        // The super-operator flag dominates even if the displayed rank
        // were somehow out of sync with the membership sets.
        for target in [User, LocalAdmin, GlobalAdmin, Operator] {
            assert_eq!(
                ban_permitted(Operator, target, true),
                Err(BanDenied::OperatorImmune)
            );
        }
    }

    #[test]
    fn test_unprivileged_targets_bannable() {
        assert_eq!(ban_permitted(GlobalAdmin, User, false), Ok(()));
        assert_eq!(ban_permitted(GlobalAdmin, LocalAdmin, false), Ok(()));
        assert_eq!(ban_permitted(Operator, LocalAdmin, false), Ok(()));
    }

    #[test]
    fn test_warn_immunity() {
        assert_eq!(warn_permitted(Operator, false), Err(WarnDenied::AdminImmune));
        assert_eq!(
            warn_permitted(GlobalAdmin, false),
            Err(WarnDenied::AdminImmune)
        );
        assert_eq!(warn_permitted(User, true), Err(WarnDenied::AdminImmune));
        assert_eq!(warn_permitted(LocalAdmin, false), Ok(()));
        assert_eq!(warn_permitted(User, false), Ok(()));
    }
}
