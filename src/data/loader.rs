use std::path::Path;

use ndarray::{Array3, ArrayD, Axis, Ix3};
use nifti::volume::ndarray::IntoNdArray;
use nifti::writer::WriterOptions;
use nifti::{NiftiObject, ReaderOptions};

use super::catalog::LabelCatalog;
use crate::error::{PipelineError, PipelineResult};

// ---------------------------------------------------------------------------
// Label reference table
// ---------------------------------------------------------------------------

/// Parse the label reference table.
///
/// Layout: one header row, then `name<delim>index` rows. Extra columns are
/// ignored; the index column is trimmed before parsing.
///
/// ```text
/// Label,Index
/// Left-Hippocampus,17
/// Right-Hippocampus,53
/// ```
pub fn load_catalog(path: &Path, delimiter: char) -> PipelineResult<LabelCatalog> {
    let delimiter = u8::try_from(delimiter).map_err(|_| PipelineError::MalformedCatalog {
        path: path.to_path_buf(),
        row: 0,
        reason: format!("delimiter '{delimiter}' is not a single byte"),
    })?;
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(|e| csv_open_error(path, e))?;

    let malformed = |row: usize, reason: String| PipelineError::MalformedCatalog {
        path: path.to_path_buf(),
        row,
        reason,
    };

    let mut entries = Vec::new();
    for result in reader.records() {
        let record = result?;
        let row = record.position().map_or(0, |p| p.line() as usize);

        let name = record
            .get(0)
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| malformed(row, "missing label name".to_string()))?;
        let raw_index = record
            .get(1)
            .ok_or_else(|| malformed(row, "missing index column".to_string()))?
            .trim();
        let index = raw_index
            .parse::<i64>()
            .map_err(|_| malformed(row, format!("'{raw_index}' is not an integer index")))?;

        entries.push((row, index, name.to_string()));
    }

    let rows: Vec<usize> = entries.iter().map(|(row, _, _)| *row).collect();
    LabelCatalog::from_entries(entries.into_iter().map(|(_, index, name)| (index, name)))
        .map_err(|(pos, reason)| malformed(rows[pos - 1], reason))
}

fn csv_open_error(path: &Path, err: csv::Error) -> PipelineError {
    match err.into_kind() {
        csv::ErrorKind::Io(source) => PipelineError::io(path, source),
        kind => PipelineError::MalformedCatalog {
            path: path.to_path_buf(),
            row: 0,
            reason: format!("{kind:?}"),
        },
    }
}

// ---------------------------------------------------------------------------
// NIfTI volumes
// ---------------------------------------------------------------------------

/// Load a `.nii` / `.nii.gz` volume as scaled `f32` voxels indexed `[i, j, k]`.
///
/// Trailing singleton dimensions (a 4D file with one frame) are dropped.
pub fn load_volume(path: &Path) -> PipelineResult<Array3<f32>> {
    if !path.is_file() {
        return Err(PipelineError::io(
            path,
            std::io::Error::new(std::io::ErrorKind::NotFound, "volume file not found"),
        ));
    }
    let object = ReaderOptions::new().read_file(path)?;
    let data: ArrayD<f32> = object.into_volume().into_ndarray::<f32>()?;
    into_3d(data).map_err(|reason| {
        PipelineError::MalformedInput(format!("{}: {reason}", path.display()))
    })
}

fn into_3d(mut data: ArrayD<f32>) -> Result<Array3<f32>, String> {
    let shape = data.shape().to_vec();
    if shape.len() < 3 {
        return Err(format!("expected a 3D volume, got shape {shape:?}"));
    }
    if shape[3..].iter().any(|&d| d != 1) {
        return Err(format!("expected a single frame, got shape {shape:?}"));
    }
    while data.ndim() > 3 {
        let last = Axis(data.ndim() - 1);
        data = data.index_axis_move(last, 0);
    }
    data.into_dimensionality::<Ix3>().map_err(|e| e.to_string())
}

/// Write a volume; a `.gz` suffix selects gzip compression.
pub fn save_volume(path: &Path, data: &Array3<f32>) -> PipelineResult<()> {
    WriterOptions::new(path).write_nifti(data)?;
    Ok(())
}
