use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::{PipelineError, PipelineResult};
use crate::state::RunReport;

/// In-place orientation normalisation of a volume file.
pub trait Reorient {
    fn reorient(&self, path: &Path) -> PipelineResult<()>;
}

/// Runs an FSL-style tool as `<program> <file> <file>`.
#[derive(Debug, Clone)]
pub struct FslReorient {
    program: PathBuf,
}

impl FslReorient {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for FslReorient {
    fn default() -> Self {
        Self::new("fslreorient2std")
    }
}

impl Reorient for FslReorient {
    fn reorient(&self, path: &Path) -> PipelineResult<()> {
        let output = Command::new(&self.program)
            .arg(path)
            .arg(path)
            .output()
            .map_err(|e| PipelineError::Reorient {
                path: path.to_path_buf(),
                reason: format!("could not run {}: {e}", self.program.display()),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PipelineError::Reorient {
                path: path.to_path_buf(),
                reason: format!("{} ({})", output.status, stderr.trim()),
            });
        }
        Ok(())
    }
}

/// Leaves files untouched. Used when volumes are already standardised.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoReorient;

impl Reorient for NoReorient {
    fn reorient(&self, _path: &Path) -> PipelineResult<()> {
        Ok(())
    }
}

/// Reorient every file, recording one outcome per file.
pub fn reorient_all(reorienter: &dyn Reorient, files: &[PathBuf]) -> RunReport {
    let mut report = RunReport::new();
    let total = files.len();
    for (i, file) in files.iter().enumerate() {
        log::info!("Reorienting {} ({}/{total})", file.display(), i + 1);
        match reorienter.reorient(file) {
            Ok(()) => report.record_success(),
            Err(e) => report.record_failure(file.display().to_string(), e),
        }
    }
    report
}
