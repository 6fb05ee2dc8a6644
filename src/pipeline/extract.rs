use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use image::DynamicImage;
use ndarray::{Array3, ArrayView2};

use crate::color::LabelColors;
use crate::config::{OrientationConfig, RenderConfig, SegmentationStyle, SliceConfig};
use crate::data::catalog::LabelCatalog;
use crate::data::model::{Layer, Plane, ScanIds, Slice, SEGMENT_SUFFIX};
use crate::error::{PipelineError, PipelineResult};
use crate::render::encode::encode_png;
use crate::render::raster::{letterbox, orient, to_gray, to_label_colors};
use crate::state::RunReport;

// ---------------------------------------------------------------------------
// SliceExtractor
// ---------------------------------------------------------------------------

/// Cuts co-registered MRI / segmentation volumes into labelled PNG slices.
pub struct SliceExtractor<'a> {
    catalog: &'a LabelCatalog,
    output_dir: PathBuf,
    prefix: String,
    write_sidecars: bool,
    render: RenderConfig,
    orientation: OrientationConfig,
    label_colors: Option<LabelColors>,
}

impl<'a> SliceExtractor<'a> {
    pub fn new(catalog: &'a LabelCatalog, output_dir: impl Into<PathBuf>, config: &SliceConfig) -> Self {
        let label_colors = match config.render.segmentation_style {
            SegmentationStyle::Palette => Some(LabelColors::new(catalog)),
            SegmentationStyle::Grayscale => None,
        };
        Self {
            catalog,
            output_dir: output_dir.into(),
            prefix: config.file_prefix.clone(),
            write_sidecars: config.write_sidecars,
            render: config.render.clone(),
            orientation: config.orientation,
            label_colors,
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Slice every plane of one scan. Per-slice failures go to `report`;
    /// only a shape mismatch or an unwritable output directory fails the scan.
    pub fn extract(
        &self,
        mri: &Array3<f32>,
        segmentation: &Array3<f32>,
        ids: &ScanIds,
        report: &mut RunReport,
    ) -> PipelineResult<()> {
        if mri.shape() != segmentation.shape() {
            return Err(PipelineError::MalformedInput(format!(
                "{ids}: MRI shape {:?} differs from segmentation shape {:?}",
                mri.shape(),
                segmentation.shape()
            )));
        }
        fs::create_dir_all(&self.output_dir).map_err(|e| PipelineError::io(&self.output_dir, e))?;

        for plane in Plane::ALL {
            let count = mri.len_of(plane.axis());
            log::debug!("{ids}: {count} {plane} slices");
            for index in 0..count {
                let mri_plane = mri.index_axis(plane.axis(), index);
                let seg_plane = segmentation.index_axis(plane.axis(), index);
                match self.extract_slice(plane, index, mri_plane, seg_plane, ids) {
                    Ok(Some(_)) => report.slices_written += 1,
                    Ok(None) => report.slices_discarded += 1,
                    Err(e) => report.record_failure(format!("{ids} {plane} {index:03}"), e),
                }
            }
        }
        Ok(())
    }

    /// Write one slice if its segmentation plane holds any label.
    ///
    /// Returns `None` for an unlabelled plane. Labels are resolved before
    /// anything touches the disk, and the MRI image, segmentation image and
    /// sidecar are committed together.
    pub fn extract_slice(
        &self,
        plane: Plane,
        index: usize,
        mri: ArrayView2<'_, f32>,
        segmentation: ArrayView2<'_, f32>,
        ids: &ScanIds,
    ) -> PipelineResult<Option<Slice>> {
        let slice = Slice {
            plane,
            index,
            present_labels: present_labels(segmentation),
        };
        if slice.is_empty() {
            return Ok(None);
        }
        let names = self.catalog.resolve_all(&slice.present_labels)?;

        let mri_img = self.render_layer(mri, plane, Layer::Mri);
        let seg_img = self.render_layer(segmentation, plane, Layer::Segmentation);

        let stem = slice.file_stem(&self.prefix, ids);
        let mut files = vec![
            (
                self.output_dir.join(format!("{stem}.png")),
                encode_png(&mri_img, self.render.dpi)?,
            ),
            (
                self.output_dir.join(format!("{stem}{SEGMENT_SUFFIX}.png")),
                encode_png(&seg_img, self.render.dpi)?,
            ),
        ];
        if self.write_sidecars {
            files.push((self.output_dir.join(format!("{stem}.txt")), sidecar_text(&names)));
        }
        commit_together(&files)?;
        Ok(Some(slice))
    }

    fn render_layer(&self, plane_data: ArrayView2<'_, f32>, plane: Plane, layer: Layer) -> DynamicImage {
        let oriented = orient(plane_data, self.orientation.transform(plane, layer));
        let img = match (layer, &self.label_colors) {
            (Layer::Segmentation, Some(colors)) => {
                DynamicImage::ImageRgb8(to_label_colors(&oriented, colors))
            }
            _ => DynamicImage::ImageLuma8(to_gray(&oriented)),
        };
        letterbox(&img, self.render.width, self.render.height)
    }
}

/// Distinct positive label values of a segmentation plane, ascending.
/// Voxels are truncated to integers first.
pub fn present_labels(plane: ArrayView2<'_, f32>) -> BTreeSet<i64> {
    plane
        .iter()
        .filter(|v| v.is_finite())
        .map(|&v| v as i64)
        .filter(|&label| label > 0)
        .collect()
}

fn sidecar_text(names: &[String]) -> Vec<u8> {
    let mut text = String::new();
    for name in names {
        text.push_str(name);
        text.push('\n');
    }
    text.into_bytes()
}

// ---------------------------------------------------------------------------
// All-or-nothing file group commit
// ---------------------------------------------------------------------------

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".partial");
    path.with_file_name(name)
}

/// Stage every file as `*.partial`, then rename into place. On any error
/// nothing from this group is left behind.
fn commit_together(files: &[(PathBuf, Vec<u8>)]) -> PipelineResult<()> {
    let mut staged: Vec<(PathBuf, &Path)> = Vec::with_capacity(files.len());
    for (path, bytes) in files {
        let partial = partial_path(path);
        if let Err(e) = fs::write(&partial, bytes) {
            let _ = fs::remove_file(&partial);
            for (p, _) in &staged {
                let _ = fs::remove_file(p);
            }
            return Err(PipelineError::io(partial, e));
        }
        staged.push((partial, path.as_path()));
    }

    for (i, (partial, path)) in staged.iter().enumerate() {
        if let Err(e) = fs::rename(partial, path) {
            for (_, done) in &staged[..i] {
                let _ = fs::remove_file(done);
            }
            for (pending, _) in &staged[i..] {
                let _ = fs::remove_file(pending);
            }
            return Err(PipelineError::io(*path, e));
        }
    }
    Ok(())
}
