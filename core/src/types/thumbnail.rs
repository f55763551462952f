use crate::types::{FileId, TierName};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Generation status of one thumbnail tier of one file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ThumbnailStatus {
    #[default]
    Pending,
    InProgress,
    Done,
    Failed,
}

impl fmt::Display for ThumbnailStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThumbnailStatus::Pending => write!(f, "pending"),
            ThumbnailStatus::InProgress => write!(f, "in-progress"),
            ThumbnailStatus::Done => write!(f, "done"),
            ThumbnailStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Local-only document of thumbnail statuses, per file and tier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThumbnailState {
    pub files: BTreeMap<FileId, BTreeMap<TierName, ThumbnailStatus>>,
}

impl ThumbnailState {
    /// Status of a tier, `Pending` when nothing is recorded yet.
    pub fn status(&self, id: &FileId, tier: &TierName) -> ThumbnailStatus {
        self.get(id, tier).unwrap_or_default()
    }

    pub fn get(&self, id: &FileId, tier: &TierName) -> Option<ThumbnailStatus> {
        self.files.get(id).and_then(|sizes| sizes.get(tier)).copied()
    }

    pub fn set(&mut self, id: FileId, tier: TierName, status: ThumbnailStatus) {
        self.files.entry(id).or_default().insert(tier, status);
    }

    pub fn remove_file(&mut self, id: &FileId) {
        self.files.remove(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> FileId {
        FileId::try_from(s).unwrap()
    }

    fn tier(s: &str) -> TierName {
        TierName::try_from(s).unwrap()
    }

    #[test]
    fn test_missing_status_defaults_to_pending() {
        let state = ThumbnailState::default();
        assert_eq!(state.status(&id("f1"), &tier("small")), ThumbnailStatus::Pending);
        assert_eq!(state.get(&id("f1"), &tier("small")), None);
    }

    #[test]
    fn test_tiers_are_independent() {
        let mut state = ThumbnailState::default();
        state.set(id("f1"), tier("small"), ThumbnailStatus::Done);

        assert_eq!(state.status(&id("f1"), &tier("small")), ThumbnailStatus::Done);
        assert_eq!(state.status(&id("f1"), &tier("large")), ThumbnailStatus::Pending);
    }

    #[test]
    fn test_remove_file_drops_all_tiers() {
        let mut state = ThumbnailState::default();
        state.set(id("f1"), tier("small"), ThumbnailStatus::Done);
        state.set(id("f1"), tier("large"), ThumbnailStatus::Failed);

        state.remove_file(&id("f1"));
        assert!(state.files.is_empty());
    }
}
