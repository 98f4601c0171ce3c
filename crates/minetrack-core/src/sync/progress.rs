use serde::{Deserialize, Serialize};

use crate::models::{Category, PerCategory};

/// Progress snapshot passed to the caller's callback. Every value is 0-100.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncProgress {
    pub national: u8,
    pub local: u8,
    pub hotspots: u8,
    /// Mean of the three categories
    pub overall: u8,
}

impl SyncProgress {
    pub const fn complete() -> Self {
        Self {
            national: 100,
            local: 100,
            hotspots: 100,
            overall: 100,
        }
    }
}

/// Download details for one category within a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryDownload {
    /// Pages fetched
    pub pages: usize,
    /// Records received from the source
    pub received: usize,
    /// Records written to the local replica
    pub saved: usize,
    /// Records dropped as malformed or unwritable
    pub skipped: usize,
    /// Fatal error that aborted this category
    pub error: Option<String>,
}

/// Aggregate result of a sync run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRunReport {
    /// True only if every category completed without a fatal error
    pub success: bool,
    pub download_details: PerCategory<CategoryDownload>,
    pub duplicate_details: PerCategory<usize>,
    /// Rows actually stored after the run
    pub stats: PerCategory<usize>,
    pub first_error: Option<String>,
}

impl SyncRunReport {
    pub fn saved_total(&self) -> usize {
        Category::ALL
            .into_iter()
            .map(|category| self.download_details.get(category).saved)
            .sum()
    }

    pub fn received_total(&self) -> usize {
        Category::ALL
            .into_iter()
            .map(|category| self.download_details.get(category).received)
            .sum()
    }

    /// "N of M records saved"
    pub fn summary(&self) -> String {
        format!(
            "{} of {} records saved",
            self.saved_total(),
            self.received_total()
        )
    }
}

/// Keeps each category's percentage from moving backwards.
#[derive(Debug, Default)]
pub(super) struct ProgressTracker {
    percents: PerCategory<u8>,
}

impl ProgressTracker {
    pub(super) fn update(&mut self, category: Category, percent: u8) -> SyncProgress {
        let slot = self.percents.get_mut(category);
        *slot = (*slot).max(percent.min(100));

        let PerCategory {
            national,
            local,
            hotspots,
        } = self.percents;
        let mean = (u16::from(national) + u16::from(local) + u16::from(hotspots)) / 3;
        SyncProgress {
            national,
            local,
            hotspots,
            overall: u8::try_from(mean).unwrap_or(100),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn tracker_never_moves_backwards() {
        let mut tracker = ProgressTracker::default();

        tracker.update(Category::National, 60);
        let snapshot = tracker.update(Category::National, 40);

        assert_eq!(snapshot.national, 60);
        assert_eq!(snapshot.overall, 20);
    }

    #[test]
    fn tracker_reaches_complete() {
        let mut tracker = ProgressTracker::default();
        let mut last = SyncProgress::default();
        for category in Category::ALL {
            last = tracker.update(category, 100);
        }
        assert_eq!(last, SyncProgress::complete());
    }

    #[test]
    fn summary_counts_saved_of_received() {
        let mut report = SyncRunReport {
            success: true,
            download_details: PerCategory::default(),
            duplicate_details: PerCategory::default(),
            stats: PerCategory::default(),
            first_error: None,
        };
        report.download_details.national.received = 100;
        report.download_details.national.saved = 99;
        report.download_details.hotspots.received = 5;
        report.download_details.hotspots.saved = 5;

        assert_eq!(report.summary(), "104 of 105 records saved");
    }
}
