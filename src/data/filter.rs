use std::path::{Path, PathBuf};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use super::model::{Plane, SEGMENT_SUFFIX};

// ---------------------------------------------------------------------------
// View filter: which planes go into a dataset manifest
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ViewFilter {
    /// No filtering.
    #[default]
    All,
    Sagittal,
    Coronal,
    Axial,
}

impl ViewFilter {
    pub fn plane(self) -> Option<Plane> {
        match self {
            ViewFilter::All => None,
            ViewFilter::Sagittal => Some(Plane::Sagittal),
            ViewFilter::Coronal => Some(Plane::Coronal),
            ViewFilter::Axial => Some(Plane::Axial),
        }
    }

    pub fn name(self) -> &'static str {
        self.plane().map_or("all", Plane::name)
    }

    /// A file passes when its name contains the plane name.
    pub fn matches(self, file_name: &str) -> bool {
        match self.plane() {
            None => true,
            Some(plane) => file_name.contains(plane.name()),
        }
    }
}

/// PNG files that are MRI slices (not segmentation renders).
pub fn is_slice_image(file_name: &str) -> bool {
    file_name.ends_with(".png") && !file_name.contains(SEGMENT_SUFFIX.trim_start_matches('_'))
}

/// Return the slice images among `paths` that pass `view`, sorted.
pub fn filtered_images(paths: impl IntoIterator<Item = PathBuf>, view: ViewFilter) -> Vec<PathBuf> {
    let mut images: Vec<PathBuf> = paths
        .into_iter()
        .filter(|p| {
            let Some(name) = file_name(p) else {
                return false;
            };
            is_slice_image(name) && view.matches(name)
        })
        .collect();
    images.sort();
    images
}

fn file_name(path: &Path) -> Option<&str> {
    path.file_name().and_then(|n| n.to_str())
}
