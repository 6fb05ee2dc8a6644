use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

use super::model::{ScanIds, ScanPair};
use crate::error::{PipelineError, PipelineResult};

/// Directory holding the converted volumes of one scan.
pub const NIFTI_DIR: &str = "NIFTI";

// ---------------------------------------------------------------------------
// ScanDirectoryWalker
// ---------------------------------------------------------------------------

/// Discovers `<root>/<subject>/<session>/<scan>-…/NIFTI/*` trees.
#[derive(Debug, Clone)]
pub struct ScanDirectoryWalker {
    volume_extension: String,
    segmentation_marker: String,
}

impl ScanDirectoryWalker {
    pub fn new(volume_extension: impl Into<String>, segmentation_marker: impl Into<String>) -> Self {
        Self {
            volume_extension: volume_extension.into(),
            segmentation_marker: segmentation_marker.into(),
        }
    }

    /// Every `<root>/<subject>/<session>` directory, sorted.
    pub fn session_dirs(&self, root: &Path) -> PipelineResult<Vec<PathBuf>> {
        let sessions = walk(WalkDir::new(root).min_depth(2).max_depth(2), root)?
            .into_iter()
            .filter(|e| e.file_type().is_dir())
            .map(DirEntry::into_path)
            .collect();
        Ok(sessions)
    }

    /// Scan ids of a session: the numeric prefix (before the first `-`) of
    /// each entry starting with a digit, first occurrence kept.
    pub fn scan_ids(&self, session: &Path) -> PipelineResult<Vec<String>> {
        let mut ids: Vec<String> = Vec::new();
        for entry in walk(WalkDir::new(session).min_depth(1).max_depth(1), session)? {
            let name = entry.file_name().to_string_lossy();
            if !name.starts_with(|c: char| c.is_ascii_digit()) {
                continue;
            }
            let id = name.split('-').next().unwrap_or(&name).to_string();
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        Ok(ids)
    }

    /// Volume files under `<session>/*<scan>*/NIFTI/`, sorted.
    pub fn matching_volumes(&self, session: &Path, scan: &str) -> PipelineResult<Vec<PathBuf>> {
        let matches = walk(WalkDir::new(session).min_depth(3).max_depth(3), session)?
            .into_iter()
            .filter(|e| self.is_volume_entry(e))
            .filter(|e| {
                e.path()
                    .parent()
                    .and_then(Path::parent)
                    .and_then(Path::file_name)
                    .is_some_and(|n| n.to_string_lossy().contains(scan))
            })
            .map(DirEntry::into_path)
            .collect();
        Ok(matches)
    }

    /// Resolve one scan to its MRI / segmentation pair.
    ///
    /// Anything other than one MRI plus one segmentation volume is a
    /// `MalformedInput`; the caller skips the scan.
    pub fn pair(&self, ids: ScanIds, files: Vec<PathBuf>) -> PipelineResult<ScanPair> {
        if files.is_empty() || files.len() > 2 {
            return Err(PipelineError::MalformedInput(format!(
                "{ids}: {} matching files found",
                files.len()
            )));
        }

        let mut mri = None;
        let mut segmentation = None;
        for file in files {
            let slot = if self.is_segmentation(&file) {
                &mut segmentation
            } else {
                &mut mri
            };
            if let Some(previous) = slot.replace(file) {
                return Err(PipelineError::MalformedInput(format!(
                    "{ids}: two volumes of the same kind ({})",
                    previous.display()
                )));
            }
        }

        match (mri, segmentation) {
            (Some(mri), Some(segmentation)) => Ok(ScanPair {
                ids,
                mri,
                segmentation,
            }),
            (Some(_), None) => Err(PipelineError::MalformedInput(format!(
                "{ids}: no segmentation volume"
            ))),
            _ => Err(PipelineError::MalformedInput(format!("{ids}: no MRI volume"))),
        }
    }

    /// Identifiers for a scan of `session` (subject is the parent directory).
    pub fn scan_ids_for(&self, session: &Path, scan: &str) -> ScanIds {
        ScanIds {
            subject: dir_name(session.parent()),
            session: dir_name(Some(session)),
            scan: scan.to_string(),
        }
    }

    /// Every volume directly inside a `NIFTI` directory anywhere under
    /// `root`, sorted.
    pub fn find_volumes(&self, root: &Path) -> PipelineResult<Vec<PathBuf>> {
        let found = walk(WalkDir::new(root), root)?
            .into_iter()
            .filter(|e| self.is_volume_entry(e))
            .map(DirEntry::into_path)
            .collect();
        Ok(found)
    }

    pub fn is_segmentation(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.contains(&self.segmentation_marker))
    }

    /// A regular file ending in the volume extension whose parent is `NIFTI`.
    fn is_volume_entry(&self, entry: &DirEntry) -> bool {
        entry.file_type().is_file()
            && entry
                .file_name()
                .to_str()
                .is_some_and(|n| n.ends_with(&self.volume_extension))
            && entry
                .path()
                .parent()
                .and_then(Path::file_name)
                .is_some_and(|n| n == NIFTI_DIR)
    }
}

/// Collect a walk in file-name order; the first error aborts it.
fn walk(walker: WalkDir, root: &Path) -> PipelineResult<Vec<DirEntry>> {
    walker
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .map(|entry| {
            entry.map_err(|e| {
                let path = e.path().unwrap_or(root).to_path_buf();
                PipelineError::io(path, e.into())
            })
        })
        .collect()
}

fn dir_name(path: Option<&Path>) -> String {
    path.and_then(Path::file_name)
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
