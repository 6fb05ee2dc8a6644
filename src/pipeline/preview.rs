use std::fs;
use std::path::{Path, PathBuf};

use image::DynamicImage;
use ndarray::Array3;

use crate::config::{PlaneTransform, RenderConfig};
use crate::data::loader::load_volume;
use crate::data::model::Plane;
use crate::data::walker::ScanDirectoryWalker;
use crate::error::{PipelineError, PipelineResult};
use crate::render::encode::encode_png;
use crate::render::raster::{hconcat, letterbox, orient, to_gray};
use crate::state::RunReport;

/// Render the three mid-planes of `volume` side by side, each transposed
/// and drawn with its origin at the bottom.
pub fn mid_slice_panel(volume: &Array3<f32>, render: &RenderConfig) -> DynamicImage {
    let panels: Vec<DynamicImage> = Plane::ALL
        .iter()
        .map(|&plane| {
            let axis = plane.axis();
            let mid = volume.len_of(axis) / 2;
            let transposed = volume.index_axis(axis, mid).reversed_axes();
            let oriented = orient(transposed, PlaneTransform::new(0, true));
            letterbox(
                &DynamicImage::ImageLuma8(to_gray(&oriented)),
                render.width,
                render.height,
            )
        })
        .collect();
    hconcat(&panels)
}

/// `<root>/<subject>/<session>/<scan>/NIFTI/<file>` → `<subject>_<session>_<scan>_mid.png`
fn preview_name(volume: &Path) -> String {
    let mut parts: Vec<String> = volume
        .ancestors()
        .skip(2)
        .take(3)
        .filter_map(|p| p.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .collect();
    parts.reverse();
    format!("{}_mid.png", parts.join("_"))
}

/// Keep the volumes to preview. Segmentations and file names containing any
/// `exclude` entry are dropped unless `include_seg` is set.
pub fn preview_candidates(
    volumes: Vec<PathBuf>,
    walker: &ScanDirectoryWalker,
    exclude: &[String],
    include_seg: bool,
) -> Vec<PathBuf> {
    if include_seg {
        return volumes;
    }
    volumes
        .into_iter()
        .filter(|v| !walker.is_segmentation(v))
        .filter(|v| {
            let name = v.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
            !exclude.iter().any(|x| name.contains(x.as_str()))
        })
        .collect()
}

/// Write one preview per volume into `output_dir`.
pub fn write_previews(
    volumes: &[PathBuf],
    output_dir: &Path,
    render: &RenderConfig,
) -> PipelineResult<RunReport> {
    fs::create_dir_all(output_dir).map_err(|e| PipelineError::io(output_dir, e))?;
    let mut report = RunReport::new();
    for volume in volumes {
        let result = load_volume(volume).and_then(|data| {
            let png = encode_png(&mid_slice_panel(&data, render), render.dpi)?;
            let dest = output_dir.join(preview_name(volume));
            fs::write(&dest, png).map_err(|e| PipelineError::io(&dest, e))
        });
        match result {
            Ok(()) => report.record_success(),
            Err(e) => report.record_failure(volume.display().to_string(), e),
        }
    }
    Ok(report)
}
