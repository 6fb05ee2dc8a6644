/// Assessor cleanup against the imaging archive.
///
/// ```text
///  projects ──▶ client.list_project_assessors ──┬─▶ for_subject (subject mode)
///                                               └─▶ find_orphans (orphan mode)
///                                                         │
///                                                         ▼
///                                      BatchDeleter (retry on timeout) ──▶ RunReport
/// ```

pub mod client;
pub mod deleter;
#[cfg(test)]
pub(crate) mod memory;
pub mod model;
pub mod orphan;

use client::ArchiveClient;
use deleter::{with_retry, BatchDeleter};
use model::Assessor;

use crate::config::{CleanupConfig, CleanupMode};
use crate::error::ArchiveError;
use crate::state::RunReport;

/// Select assessors per `config.mode` in every project and delete them.
/// A project whose listing fails becomes one failed entry.
pub fn run_cleanup<C: ArchiveClient + ?Sized>(client: &C, config: &CleanupConfig) -> RunReport {
    let mut report = RunReport::new();
    let deleter = BatchDeleter::new(client, config.retry.clone());

    for project in &config.projects {
        log::info!("Listing assessors of project {project}");
        let listing = with_retry(&config.retry, project, || {
            client.list_project_assessors(project)
        });
        let assessors = match listing {
            Ok(list) => list,
            Err(e) => {
                report.record_failure(project.clone(), e);
                continue;
            }
        };

        let targets = select_targets(&assessors, config, &mut report);
        if config.dry_run {
            for a in &targets {
                println!("{a}");
            }
            log::info!("{project}: {} assessors would be deleted", targets.len());
            continue;
        }
        report.merge(deleter.delete_all(&targets));
    }
    report
}

fn select_targets(
    assessors: &[Assessor],
    config: &CleanupConfig,
    report: &mut RunReport,
) -> Vec<Assessor> {
    match &config.mode {
        CleanupMode::Subjects(subjects) => subjects
            .iter()
            .flat_map(|s| orphan::for_subject(assessors, s))
            .cloned()
            .collect(),
        CleanupMode::Orphans => {
            let found = orphan::find_orphans(assessors);
            for a in &found.malformed {
                report.record_skip(a.label.clone(), ArchiveError::MalformedLabel(a.label.clone()));
            }
            let duplicates = found.duplicate_count();
            log::info!(
                "{} subject mismatches, {} session mismatches, {} duplicates",
                found.subject_mismatch.len(),
                found.session_mismatch.len(),
                duplicates
            );
            report.duplicates += duplicates;
            if config.dedupe {
                found.deduplicated()
            } else {
                found.candidates()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::memory::InMemoryArchive;
    use super::*;
    use crate::config::RetryPolicy;

    fn config(mode: CleanupMode) -> CleanupConfig {
        CleanupConfig {
            projects: vec!["P".into()],
            mode,
            retry: RetryPolicy::immediate(2),
            ..CleanupConfig::default()
        }
    }

    fn archive() -> InMemoryArchive {
        InMemoryArchive::new(vec![
            Assessor::new("P", "S1", "E1", "P-x-S1-x-E1-x-FS"),
            Assessor::new("P", "S9", "E9", "P-x-S1-x-E1-x-T1"),
            Assessor::new("P", "S2", "E2", "P-x-S2-x-E2-x-FS"),
            Assessor::new("Q", "S2", "E2", "Q-x-S2-x-E2-x-FS"),
        ])
    }

    #[test]
    fn subject_mode_deletes_only_that_subject_in_listed_projects() {
        let archive = archive();
        let report = run_cleanup(&archive, &config(CleanupMode::Subjects(vec!["S2".into()])));
        assert_eq!(report.succeeded, 1);
        assert_eq!(archive.remaining().len(), 3);
        assert!(archive.remaining().iter().any(|a| a.project_id == "Q"));
    }

    #[test]
    fn orphan_mode_keeps_literal_concatenation() {
        let archive = archive();
        let report = run_cleanup(&archive, &config(CleanupMode::Orphans));
        // The double mismatch is attempted twice; the second is not found.
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.duplicates, 1);
        assert_eq!(archive.remaining().len(), 3);
    }

    #[test]
    fn dedupe_attempts_each_orphan_once() {
        let archive = archive();
        let mut cfg = config(CleanupMode::Orphans);
        cfg.dedupe = true;
        let report = run_cleanup(&archive, &cfg);
        assert_eq!(report.succeeded, 1);
        assert!(report.failed.is_empty());
        assert_eq!(archive.delete_calls.get(), 1);
    }

    #[test]
    fn dry_run_deletes_nothing() {
        let archive = archive();
        let mut cfg = config(CleanupMode::Orphans);
        cfg.dry_run = true;
        let report = run_cleanup(&archive, &cfg);
        assert_eq!(report.total(), 0);
        assert_eq!(archive.delete_calls.get(), 0);
        assert_eq!(archive.remaining().len(), 4);
    }

    #[test]
    fn malformed_labels_are_skipped_not_deleted() {
        let archive = InMemoryArchive::new(vec![Assessor::new("P", "S1", "E1", "broken")]);
        let report = run_cleanup(&archive, &config(CleanupMode::Orphans));
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(archive.delete_calls.get(), 0);
    }
}
