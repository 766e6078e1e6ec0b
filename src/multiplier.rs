//! Multiplier eligibility policy.
//!
//! Decides, per attribute definition, whether a multiplicative modifier
//! contributes at all. Filtering happens before any multiplier is applied
//! to a baseline or an additive contribution.

use std::collections::BTreeSet;

/// Policy deciding which multiplier keys may apply to an attribute.
///
/// The ignore set is always consulted first. After that, `ApplyAll` and
/// `IgnoreList` accept every key, while `AllowList` only accepts keys in
/// its allow set. All keys are lower-cased.
///
/// # Examples
///
/// ```rust
/// use attrstat::MultiplierApplicability;
///
/// let policy = MultiplierApplicability::allow_only(["Gear.Sword", "gear.shield"])
///     .with_ignored(["gear.shield"]);
///
/// assert!(policy.can_apply("gear.sword"));
/// assert!(!policy.can_apply("gear.shield")); // ignore list wins
/// assert!(!policy.can_apply("potion.rage"));
///
/// let default = MultiplierApplicability::default();
/// assert!(default.can_apply("anything.at_all"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MultiplierApplicability {
    /// Every multiplier applies except the ignored ones.
    ApplyAll { ignored: BTreeSet<String> },
    /// Only allowed multipliers apply, minus the ignored ones.
    AllowList {
        allowed: BTreeSet<String>,
        ignored: BTreeSet<String>,
    },
    /// Every multiplier applies except those on the ignore list.
    IgnoreList { ignored: BTreeSet<String> },
}

fn normalize<I, S>(keys: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    keys.into_iter()
        .map(|k| k.as_ref().trim().to_lowercase())
        .collect()
}

impl MultiplierApplicability {
    pub fn apply_all() -> Self {
        Self::ApplyAll {
            ignored: BTreeSet::new(),
        }
    }

    pub fn allow_only<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::AllowList {
            allowed: normalize(keys),
            ignored: BTreeSet::new(),
        }
    }

    pub fn ignore<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::IgnoreList {
            ignored: normalize(keys),
        }
    }

    /// Extend the ignore set of any mode.
    pub fn with_ignored<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let extra = normalize(keys);
        match &mut self {
            Self::ApplyAll { ignored }
            | Self::AllowList { ignored, .. }
            | Self::IgnoreList { ignored } => ignored.extend(extra),
        }
        self
    }

    /// Whether a multiplier with this key may contribute.
    pub fn can_apply(&self, multiplier_key: &str) -> bool {
        let key = multiplier_key.to_lowercase();
        match self {
            Self::ApplyAll { ignored } | Self::IgnoreList { ignored } => !ignored.contains(&key),
            Self::AllowList { allowed, ignored } => {
                !ignored.contains(&key) && allowed.contains(&key)
            }
        }
    }
}

impl Default for MultiplierApplicability {
    fn default() -> Self {
        Self::apply_all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_all_accepts_everything() {
        let policy = MultiplierApplicability::apply_all();
        assert!(policy.can_apply("a.b"));
        assert!(policy.can_apply("Z.Y"));
    }

    #[test]
    fn test_apply_all_with_ignored() {
        let policy = MultiplierApplicability::apply_all().with_ignored(["Debuff.Slow"]);
        assert!(!policy.can_apply("debuff.slow"));
        assert!(policy.can_apply("buff.haste"));
    }

    #[test]
    fn test_ignore_list() {
        let policy = MultiplierApplicability::ignore(["gear.cursed"]);
        assert!(!policy.can_apply("GEAR.CURSED"));
        assert!(policy.can_apply("gear.blessed"));
    }

    #[test]
    fn test_allow_list_rejects_unknown() {
        let policy = MultiplierApplicability::allow_only(["class.warrior"]);
        assert!(policy.can_apply("Class.Warrior"));
        assert!(!policy.can_apply("class.mage"));
    }

    #[test]
    fn test_empty_allow_list_rejects_all() {
        let policy = MultiplierApplicability::allow_only(Vec::<String>::new());
        assert!(!policy.can_apply("a.b"));
    }
}
