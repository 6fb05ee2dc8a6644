use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::data::filter::{filtered_images, ViewFilter};
use crate::data::model::DatasetRecord;
use crate::error::{PipelineError, PipelineResult};
use crate::state::RunReport;

const PROGRESS_EVERY: usize = 1000;

// ---------------------------------------------------------------------------
// DatasetPackager
// ---------------------------------------------------------------------------

/// Pairs slice images with their label sidecars in a JSONL manifest and
/// copies the images next to it.
#[derive(Debug, Clone)]
pub struct DatasetPackager {
    input_dir: PathBuf,
    output_dir: PathBuf,
    view: ViewFilter,
}

impl DatasetPackager {
    pub fn new(input_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>, view: ViewFilter) -> Self {
        Self {
            input_dir: input_dir.into(),
            output_dir: output_dir.into(),
            view,
        }
    }

    /// Slice images of the input directory passing the view filter, sorted.
    pub fn collect_images(&self) -> PipelineResult<Vec<PathBuf>> {
        let entries =
            fs::read_dir(&self.input_dir).map_err(|e| PipelineError::io(&self.input_dir, e))?;
        let mut paths = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| PipelineError::io(&self.input_dir, e))?.path();
            if path.is_file() {
                paths.push(path);
            }
        }
        Ok(filtered_images(paths, self.view))
    }

    /// Write `<output_dir>/<manifest_name>`. Images without a sidecar are
    /// reported as failed and left out of both the manifest and the copy.
    pub fn package(&self, manifest_name: &str) -> PipelineResult<RunReport> {
        let images = self.collect_images()?;
        fs::create_dir_all(&self.output_dir).map_err(|e| PipelineError::io(&self.output_dir, e))?;

        let manifest_path = self.output_dir.join(manifest_name);
        let file = File::create(&manifest_path).map_err(|e| PipelineError::io(&manifest_path, e))?;
        let mut out = BufWriter::new(file);
        let mut report = RunReport::new();

        let total = images.len();
        for (i, image) in images.iter().enumerate() {
            if i % PROGRESS_EVERY == 0 {
                log::info!("Files remaining: {}", total - i);
            }
            let record = match self.record_for(image) {
                Ok(record) => record,
                Err(e) => {
                    report.record_failure(image.display().to_string(), e);
                    continue;
                }
            };
            if let Err(e) = self.copy_image(image, &record.file_name) {
                report.record_failure(image.display().to_string(), e);
                continue;
            }
            serde_json::to_writer(&mut out, &record)?;
            out.write_all(b"\n")
                .map_err(|e| PipelineError::io(&manifest_path, e))?;
            report.record_success();
        }
        out.flush().map_err(|e| PipelineError::io(&manifest_path, e))?;

        log::info!(
            "Created {} dataset with {} records in {}",
            self.view.name(),
            report.succeeded,
            manifest_path.display()
        );
        Ok(report)
    }

    fn record_for(&self, image: &Path) -> PipelineResult<DatasetRecord> {
        let file_name = image
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| PipelineError::MalformedInput(format!("{} has no file name", image.display())))?;
        Ok(DatasetRecord {
            file_name,
            text: read_sidecar(image)?,
        })
    }

    fn copy_image(&self, image: &Path, file_name: &str) -> PipelineResult<()> {
        let dest = self.output_dir.join(file_name);
        if same_file(image, &dest) {
            return Ok(());
        }
        fs::copy(image, &dest).map_err(|e| PipelineError::io(&dest, e))?;
        Ok(())
    }
}

/// Labels stored next to `image` as `<stem>.txt`, one per line.
pub fn read_sidecar(image: &Path) -> PipelineResult<Vec<String>> {
    let sidecar = image.with_extension("txt");
    if !sidecar.is_file() {
        return Err(PipelineError::MissingSidecar(sidecar));
    }
    let text = fs::read_to_string(&sidecar).map_err(|e| PipelineError::io(&sidecar, e))?;
    Ok(text.lines().map(|l| l.trim().to_string()).collect())
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn slice(dir: &Path, stem: &str, labels: Option<&str>) {
        fs::write(dir.join(format!("{stem}.png")), b"png").unwrap();
        fs::write(dir.join(format!("{stem}_SEGMENT.png")), b"seg").unwrap();
        if let Some(labels) = labels {
            fs::write(dir.join(format!("{stem}.txt")), labels).unwrap();
        }
    }

    fn manifest(path: &Path) -> Vec<DatasetRecord> {
        fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn manifest_matches_sidecars_and_copies() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path();
        slice(input, "cb2_s_1_axial_001", Some("Left-Hippocampus\nBrainstem\n"));
        slice(input, "cb2_s_1_coronal_004", Some("Brainstem\n"));
        let out = input.join("hf");

        let report = DatasetPackager::new(input, &out, ViewFilter::All)
            .package("all.jsonl")
            .unwrap();
        assert_eq!(report.succeeded, 2);

        let records = manifest(&out.join("all.jsonl"));
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].file_name, "cb2_s_1_axial_001.png");
        assert_eq!(records[0].text, vec!["Left-Hippocampus", "Brainstem"]);
        for rec in &records {
            assert!(out.join(&rec.file_name).is_file());
        }
        assert!(!out.join("cb2_s_1_axial_001_SEGMENT.png").exists());
    }

    #[test]
    fn view_filter_limits_records() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path();
        slice(input, "cb2_s_1_axial_001", Some("A\n"));
        slice(input, "cb2_s_1_sagittal_002", Some("B\n"));
        let out = input.join("axial");

        DatasetPackager::new(input, &out, ViewFilter::Axial)
            .package("axial.jsonl")
            .unwrap();
        let records = manifest(&out.join("axial.jsonl"));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].file_name, "cb2_s_1_axial_001.png");
    }

    #[test]
    fn missing_sidecar_is_reported_not_skipped_silently() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path();
        slice(input, "cb2_s_1_axial_001", None);
        slice(input, "cb2_s_1_axial_002", Some("A\n"));
        let out = input.join("hf");

        let report = DatasetPackager::new(input, &out, ViewFilter::All)
            .package("all.jsonl")
            .unwrap();
        assert_eq!(report.failed.len(), 1);
        assert!(report.failed[0].reason.contains("cb2_s_1_axial_001.txt"));
        assert_eq!(manifest(&out.join("all.jsonl")).len(), 1);
        assert!(!out.join("cb2_s_1_axial_001.png").exists());
    }

    #[test]
    fn packaging_in_place_keeps_images_intact() {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path();
        slice(input, "cb2_s_1_axial_001", Some("A\n"));

        DatasetPackager::new(input, input, ViewFilter::Axial)
            .package("axial.jsonl")
            .unwrap();
        assert_eq!(fs::read(input.join("cb2_s_1_axial_001.png")).unwrap(), b"png");
    }
}
