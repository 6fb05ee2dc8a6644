use std::fmt;

// ---------------------------------------------------------------------------
// Run report – per-item outcomes collected at the batch-loop boundary
// ---------------------------------------------------------------------------

/// One failed or skipped unit of work and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemNote {
    pub item: String,
    pub reason: String,
}

/// Outcome tally for one pipeline run, independent of how it is printed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Items that completed.
    pub succeeded: usize,

    /// Items that were attempted and failed.
    pub failed: Vec<ItemNote>,

    /// Items that were not attempted (bad input layout, filtered out, ...).
    pub skipped: Vec<ItemNote>,

    /// Candidates that appeared more than once in the input list.
    pub duplicates: usize,

    /// Labelled slices written (slice pipeline only).
    pub slices_written: usize,

    /// Slices dropped because their segmentation plane was empty.
    pub slices_discarded: usize,
}

impl RunReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&mut self) {
        self.succeeded += 1;
    }

    pub fn record_failure(&mut self, item: impl Into<String>, reason: impl fmt::Display) {
        let note = ItemNote {
            item: item.into(),
            reason: reason.to_string(),
        };
        log::error!("{}: {}", note.item, note.reason);
        self.failed.push(note);
    }

    pub fn record_skip(&mut self, item: impl Into<String>, reason: impl fmt::Display) {
        let note = ItemNote {
            item: item.into(),
            reason: reason.to_string(),
        };
        log::warn!("Skipping {}: {}", note.item, note.reason);
        self.skipped.push(note);
    }

    /// Number of items accounted for.
    pub fn total(&self) -> usize {
        self.succeeded + self.failed.len() + self.skipped.len()
    }

    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }

    /// Fold another report (e.g. one project's) into this one.
    pub fn merge(&mut self, other: RunReport) {
        self.succeeded += other.succeeded;
        self.failed.extend(other.failed);
        self.skipped.extend(other.skipped);
        self.duplicates += other.duplicates;
        self.slices_written += other.slices_written;
        self.slices_discarded += other.slices_discarded;
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Succeeded: {}  Failed: {}  Skipped: {}",
            self.succeeded,
            self.failed.len(),
            self.skipped.len()
        )?;
        if self.duplicates > 0 {
            writeln!(f, "Duplicate candidates: {}", self.duplicates)?;
        }
        if self.slices_written > 0 || self.slices_discarded > 0 {
            writeln!(
                f,
                "Slices written: {}  Slices without labels: {}",
                self.slices_written, self.slices_discarded
            )?;
        }
        for note in &self.failed {
            writeln!(f, "  FAILED  {}: {}", note.item, note.reason)?;
        }
        for note in &self.skipped {
            writeln!(f, "  SKIPPED {}: {}", note.item, note.reason)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn totals_cover_every_outcome() {
        let mut report = RunReport::new();
        report.record_success();
        report.record_failure("a", "boom");
        report.record_skip("b", "bad layout");
        assert_eq!(report.total(), 3);
        assert!(report.has_failures());
    }

    #[test]
    fn merge_adds_counters_and_notes() {
        let mut a = RunReport::new();
        a.record_success();
        a.duplicates = 1;
        let mut b = RunReport::new();
        b.record_failure("x", "nope");
        b.slices_written = 4;
        a.merge(b);
        assert_eq!(a.succeeded, 1);
        assert_eq!(a.failed.len(), 1);
        assert_eq!(a.duplicates, 1);
        assert_eq!(a.slices_written, 4);
    }

    #[test]
    fn summary_lists_failures() {
        let mut report = RunReport::new();
        report.record_failure("proj-x-s1-x-e1-x-FS", "not found");
        let text = report.to_string();
        assert!(text.contains("Failed: 1"));
        assert!(text.contains("proj-x-s1-x-e1-x-FS"));
    }
}
