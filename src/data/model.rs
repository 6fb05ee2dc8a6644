use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

use ndarray::Axis;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Plane – anatomical cutting direction
// ---------------------------------------------------------------------------

/// One of the three anatomical planes, bound to a volume axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plane {
    Sagittal,
    Coronal,
    Axial,
}

impl Plane {
    /// Extraction order.
    pub const ALL: [Plane; 3] = [Plane::Sagittal, Plane::Coronal, Plane::Axial];

    pub fn axis(self) -> Axis {
        match self {
            Plane::Sagittal => Axis(0),
            Plane::Coronal => Axis(1),
            Plane::Axial => Axis(2),
        }
    }

    /// Lowercase name used in emitted file names.
    pub fn name(self) -> &'static str {
        match self {
            Plane::Sagittal => "sagittal",
            Plane::Coronal => "coronal",
            Plane::Axial => "axial",
        }
    }
}

impl fmt::Display for Plane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which of the two co-registered volumes a plane came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    Mri,
    Segmentation,
}

// ---------------------------------------------------------------------------
// Scan identity and the MRI / segmentation pair
// ---------------------------------------------------------------------------

/// Identifiers parsed from `<root>/<subject>/<session>/<scan>-…/NIFTI/*`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanIds {
    pub subject: String,
    pub session: String,
    pub scan: String,
}

impl fmt::Display for ScanIds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.subject, self.session, self.scan)
    }
}

/// An MRI volume and its segmentation, ready for slicing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanPair {
    pub ids: ScanIds,
    pub mri: PathBuf,
    pub segmentation: PathBuf,
}

// ---------------------------------------------------------------------------
// Slice – one labelled plane
// ---------------------------------------------------------------------------

/// A plane position plus the label values found in its segmentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slice {
    pub plane: Plane,
    pub index: usize,
    /// Distinct positive segmentation values, ascending.
    pub present_labels: BTreeSet<i64>,
}

impl Slice {
    /// Slices without any labelled voxel are never written.
    pub fn is_empty(&self) -> bool {
        self.present_labels.is_empty()
    }

    /// `<prefix>_<subject>_<scan>_<plane>_<index:03>`
    pub fn file_stem(&self, prefix: &str, ids: &ScanIds) -> String {
        format!(
            "{prefix}_{}_{}_{}_{:03}",
            ids.subject, ids.scan, self.plane, self.index
        )
    }
}

// ---------------------------------------------------------------------------
// DatasetRecord – one manifest line
// ---------------------------------------------------------------------------

/// Marker carried by segmentation image names.
pub const SEGMENT_SUFFIX: &str = "_SEGMENT";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetRecord {
    pub file_name: String,
    pub text: Vec<String>,
}
