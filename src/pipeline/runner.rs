use std::path::Path;

use super::extract::SliceExtractor;
use super::reorient::{reorient_all, Reorient};
use crate::data::loader::load_volume;
use crate::data::model::ScanPair;
use crate::data::walker::ScanDirectoryWalker;
use crate::error::PipelineResult;
use crate::state::RunReport;

// ---------------------------------------------------------------------------
// Tree-level drivers. Per-item errors become report entries; only an
// unreadable root escapes.
// ---------------------------------------------------------------------------

/// Reorient every volume of every session under `root`.
pub fn reorient_tree(
    root: &Path,
    walker: &ScanDirectoryWalker,
    reorienter: &dyn Reorient,
) -> PipelineResult<RunReport> {
    let mut files = Vec::new();
    for session in walker.session_dirs(root)? {
        files.extend(walker.find_volumes(&session)?);
    }
    Ok(reorient_all(reorienter, &files))
}

/// Slice every scan of every session under `root`.
pub fn extract_tree(
    root: &Path,
    walker: &ScanDirectoryWalker,
    extractor: &SliceExtractor<'_>,
) -> PipelineResult<RunReport> {
    let sessions = walker.session_dirs(root)?;
    let mut report = RunReport::new();

    for (i, session) in sessions.iter().enumerate() {
        log::info!(
            "Processing {}... Remaining: {}",
            session.display(),
            sessions.len() - i
        );
        let scan_ids = match walker.scan_ids(session) {
            Ok(ids) => ids,
            Err(e) => {
                report.record_skip(session.display().to_string(), e);
                continue;
            }
        };

        for scan in scan_ids {
            let ids = walker.scan_ids_for(session, &scan);
            log::info!(
                "Subject ID: {}, Session ID: {}, Scan ID: {}",
                ids.subject,
                ids.session,
                ids.scan
            );
            let label = ids.to_string();
            let pair = match walker
                .matching_volumes(session, &scan)
                .and_then(|files| walker.pair(ids, files))
            {
                Ok(pair) => pair,
                Err(e) => {
                    report.record_skip(label, e);
                    continue;
                }
            };
            match extract_pair(&pair, extractor, &mut report) {
                Ok(()) => report.record_success(),
                Err(e) => report.record_failure(label, e),
            }
        }
    }
    Ok(report)
}

fn extract_pair(
    pair: &ScanPair,
    extractor: &SliceExtractor<'_>,
    report: &mut RunReport,
) -> PipelineResult<()> {
    let mri = load_volume(&pair.mri)?;
    let segmentation = load_volume(&pair.segmentation)?;
    extractor.extract(&mri, &segmentation, &pair.ids, report)
}
