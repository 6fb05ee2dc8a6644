use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::filter::ViewFilter;
use crate::data::model::{Layer, Plane};

// ---------------------------------------------------------------------------
// Slice pipeline configuration
// ---------------------------------------------------------------------------

pub const DEFAULT_CATALOG_FILE: &str = "T1_label_volumes.txt";
pub const DEFAULT_OUTPUT_SUBDIR: &str = "slice_data";
pub const DEFAULT_DATASET_SUBDIR: &str = "hf";
pub const DEFAULT_MANIFEST_NAME: &str = "slices_all.jsonl";

/// Every tunable of the slice pipeline. Loaded from JSON (all fields
/// optional) and then overridden by command-line flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SliceConfig {
    /// Suffix a file must end with to count as a volume.
    pub volume_extension: String,
    /// Substring that marks a volume as the segmentation.
    pub segmentation_marker: String,
    /// First token of every emitted file name.
    pub file_prefix: String,
    /// Write the `.txt` label list next to every MRI slice.
    pub write_sidecars: bool,
    pub reorient: bool,
    pub reorient_program: String,
    pub catalog_file: String,
    pub catalog_delimiter: char,
    pub output_subdir: String,
    pub dataset_subdir: String,
    pub manifest_name: String,
    /// File-name substrings left out of previews unless segmentations are
    /// requested.
    pub preview_exclude: Vec<String>,
    pub view: ViewFilter,
    pub render: RenderConfig,
    pub orientation: OrientationConfig,
}

impl Default for SliceConfig {
    fn default() -> Self {
        Self {
            volume_extension: ".nii.gz".to_string(),
            segmentation_marker: "seg".to_string(),
            file_prefix: "cb2".to_string(),
            write_sidecars: true,
            reorient: true,
            reorient_program: "fslreorient2std".to_string(),
            catalog_file: DEFAULT_CATALOG_FILE.to_string(),
            catalog_delimiter: ',',
            output_subdir: DEFAULT_OUTPUT_SUBDIR.to_string(),
            dataset_subdir: DEFAULT_DATASET_SUBDIR.to_string(),
            manifest_name: DEFAULT_MANIFEST_NAME.to_string(),
            preview_exclude: vec!["slant".to_string()],
            view: ViewFilter::All,
            render: RenderConfig::default(),
            orientation: OrientationConfig::default(),
        }
    }
}

impl SliceConfig {
    /// Read a JSON config file. Missing keys fall back to defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn catalog_path(&self, root: &Path) -> PathBuf {
        root.join(&self.catalog_file)
    }

    pub fn output_dir(&self, root: &Path) -> PathBuf {
        root.join(&self.output_subdir)
    }

    pub fn dataset_dir(&self, output_dir: &Path) -> PathBuf {
        output_dir.join(&self.dataset_subdir)
    }
}

/// How the segmentation layer is coloured.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentationStyle {
    /// Label values scaled to gray, like the MRI layer.
    #[default]
    Grayscale,
    /// One distinct colour per catalog label.
    Palette,
}

/// Output raster geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub width: u32,
    pub height: u32,
    /// Written to the PNG `pHYs` chunk; pixel size is `width × height`.
    pub dpi: u32,
    pub segmentation_style: SegmentationStyle,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 256,
            height: 256,
            dpi: 96,
            segmentation_style: SegmentationStyle::Grayscale,
        }
    }
}

// ---------------------------------------------------------------------------
// Orientation: per-plane, per-layer display transform
// ---------------------------------------------------------------------------

/// Counter-clockwise quarter turns, then an optional vertical flip so that
/// row 0 of the rotated plane ends up at the bottom of the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaneTransform {
    pub quarter_turns: u8,
    pub origin_lower: bool,
}

impl PlaneTransform {
    pub const fn new(quarter_turns: u8, origin_lower: bool) -> Self {
        Self {
            quarter_turns,
            origin_lower,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerTransforms {
    pub mri: PlaneTransform,
    pub segmentation: PlaneTransform,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrientationConfig {
    pub sagittal: LayerTransforms,
    pub coronal: LayerTransforms,
    pub axial: LayerTransforms,
}

impl Default for OrientationConfig {
    /// The historical convention. The axial MRI layer keeps its origin at the
    /// top while its segmentation is drawn origin-lower.
    fn default() -> Self {
        let both = |t| LayerTransforms {
            mri: t,
            segmentation: t,
        };
        Self {
            sagittal: both(PlaneTransform::new(3, true)),
            coronal: both(PlaneTransform::new(1, true)),
            axial: LayerTransforms {
                mri: PlaneTransform::new(1, false),
                segmentation: PlaneTransform::new(1, true),
            },
        }
    }
}

impl OrientationConfig {
    /// Same as the default except the axial MRI layer matches its
    /// segmentation.
    pub fn consistent() -> Self {
        let mut cfg = Self::default();
        cfg.axial.mri = cfg.axial.segmentation;
        cfg
    }

    pub fn transform(&self, plane: Plane, layer: Layer) -> PlaneTransform {
        let layers = match plane {
            Plane::Sagittal => &self.sagittal,
            Plane::Coronal => &self.coronal,
            Plane::Axial => &self.axial,
        };
        match layer {
            Layer::Mri => layers.mri,
            Layer::Segmentation => layers.segmentation,
        }
    }
}

// ---------------------------------------------------------------------------
// Assessor cleanup configuration
// ---------------------------------------------------------------------------

pub const DEFAULT_PROJECTS: [&str; 2] = ["CIBS_COPE", "CIBS_BRAIN2"];

/// Bounded retry with exponential backoff for transient archive timeouts.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub multiplier: u32,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: Duration::from_secs(1),
            multiplier: 2,
            max_backoff: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// A policy that retries without sleeping.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_backoff: Duration::ZERO,
            multiplier: 1,
            max_backoff: Duration::ZERO,
        }
    }

    /// Delay before retry number `attempt` (1-based count of failures so far).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = self
            .multiplier
            .saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

/// What to delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanupMode {
    /// Every assessor whose subject label is in the list.
    Subjects(Vec<String>),
    /// Assessors whose labels disagree with their own identifier.
    Orphans,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CleanupConfig {
    pub projects: Vec<String>,
    pub mode: CleanupMode,
    /// Drop repeated orphan candidates before deleting.
    pub dedupe: bool,
    /// List candidates without deleting anything.
    pub dry_run: bool,
    pub retry: RetryPolicy,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            projects: DEFAULT_PROJECTS.iter().map(|p| p.to_string()).collect(),
            mode: CleanupMode::Orphans,
            dedupe: false,
            dry_run: false,
            retry: RetryPolicy::default(),
        }
    }
}

/// Connection settings for the archive session.
#[derive(Debug, Clone)]
pub struct ArchiveConfig {
    pub host: String,
    pub user: String,
    pub password: String,
    pub timeout: Duration,
}
