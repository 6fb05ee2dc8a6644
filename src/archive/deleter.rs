use std::thread;

use super::client::ArchiveClient;
use super::model::Assessor;
use crate::config::RetryPolicy;
use crate::error::ArchiveError;
use crate::state::RunReport;

/// Run `op`, retrying transient failures per `policy`.
pub fn with_retry<T>(
    policy: &RetryPolicy,
    what: &str,
    mut op: impl FnMut() -> Result<T, ArchiveError>,
) -> Result<T, ArchiveError> {
    let mut attempt = 1;
    loop {
        match op() {
            Err(e) if e.is_transient() => {
                if attempt >= policy.max_attempts {
                    return Err(ArchiveError::RetriesExhausted {
                        label: what.to_string(),
                        attempts: attempt,
                    });
                }
                let delay = policy.backoff(attempt);
                log::warn!("{e} ({what}). Retrying in {delay:?} (attempt {attempt})");
                thread::sleep(delay);
                attempt += 1;
            }
            other => return other,
        }
    }
}

// ---------------------------------------------------------------------------
// BatchDeleter
// ---------------------------------------------------------------------------

pub struct BatchDeleter<'a, C: ArchiveClient + ?Sized> {
    client: &'a C,
    retry: RetryPolicy,
}

impl<'a, C: ArchiveClient + ?Sized> BatchDeleter<'a, C> {
    pub fn new(client: &'a C, retry: RetryPolicy) -> Self {
        Self { client, retry }
    }

    /// Delete one assessor. `Ok(false)` when it does not exist.
    pub fn delete_assessor(&self, assessor: &Assessor) -> Result<bool, ArchiveError> {
        with_retry(&self.retry, &assessor.label, || {
            if !self.client.assessor_exists(assessor)? {
                return Ok(false);
            }
            self.client.delete_assessor(assessor)?;
            Ok(true)
        })
    }

    /// Delete every assessor in order; one outcome per item, never aborts.
    pub fn delete_all(&self, assessors: &[Assessor]) -> RunReport {
        let mut report = RunReport::new();
        let total = assessors.len();
        if total == 0 {
            log::info!("No assessors to delete.");
            return report;
        }

        for (i, assessor) in assessors.iter().enumerate() {
            let count = i + 1;
            log::info!("Working on #{count}. {} remaining.", total - count);
            match self.delete_assessor(assessor) {
                Ok(true) => {
                    log::info!("Deleted {}", assessor.label);
                    report.record_success();
                }
                Ok(false) => report.record_failure(
                    assessor.label.clone(),
                    ArchiveError::NotFound(assessor.label.clone()),
                ),
                Err(e) => report.record_failure(assessor.label.clone(), e),
            }
        }
        report
    }
}
