use nutype::nutype;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Name of the sentinel tier that addresses the original asset.
pub const FULL_TIER: &str = "full";

/// Name of a configured thumbnail tier, e.g. `small`.
///
/// Tier names double as storage path components, so only ASCII alphanumerics, `-` and
/// `_` are accepted, and `full` is reserved.
#[nutype(
    sanitize(trim, lowercase),
    validate(
        not_empty,
        len_char_max = 32,
        predicate = |name| name != FULL_TIER
            && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    ),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        AsRef,
        Deref,
        TryFrom,
        Hash,
        Display,
        Serialize,
        Deserialize,
    )
)]
pub struct TierName(String);

/// Requested rendering size: the original, or one thumbnail tier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SizeTier {
    Full,
    Thumbnail(TierName),
}

impl SizeTier {
    pub fn thumbnail(name: &str) -> Result<Self, TierNameError> {
        Ok(SizeTier::Thumbnail(TierName::try_from(name)?))
    }

    pub fn tier_name(&self) -> Option<&TierName> {
        match self {
            SizeTier::Full => None,
            SizeTier::Thumbnail(name) => Some(name),
        }
    }

    pub fn is_full(&self) -> bool {
        matches!(self, SizeTier::Full)
    }
}

impl FromStr for SizeTier {
    type Err = TierNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case(FULL_TIER) {
            return Ok(SizeTier::Full);
        }
        SizeTier::thumbnail(s)
    }
}

impl fmt::Display for SizeTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SizeTier::Full => f.write_str(FULL_TIER),
            SizeTier::Thumbnail(name) => write!(f, "{name}"),
        }
    }
}

impl Serialize for SizeTier {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SizeTier {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
