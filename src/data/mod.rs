/// Data layer: core types, discovery, loading, and filtering.
///
/// Architecture:
/// ```text
///  <root>/<subject>/<session>/<scan>-…/NIFTI/*.nii.gz     T1_label_volumes.txt
///        │                                                   │
///        ▼                                                   ▼
///   ┌──────────┐                                       ┌──────────┐
///   │  walker   │  sessions → scan ids → ScanPair       │  loader   │  csv → LabelCatalog
///   └──────────┘                                       └──────────┘
///        │                                                   │
///        ▼                                                   ▼
///   ┌──────────┐                                       ┌──────────┐
///   │  loader   │  NIfTI → Array3<f32>                  │ catalog   │  index → name
///   └──────────┘                                       └──────────┘
///
///   ┌──────────┐
///   │  filter   │  emitted PNGs → dataset images for a view
///   └──────────┘
/// ```

pub mod catalog;
pub mod filter;
pub mod loader;
pub mod model;
pub mod walker;
