/// Slice pipeline stages.
///
/// ```text
///  root ──▶ reorient (in place) ──▶ runner: walker + extract ──▶ slice_data/*.png|txt
///                                                                   │
///                                                                   ▼
///                                                         package ──▶ hf/*.jsonl + copies
///  root ──▶ preview ──▶ <subject>_<session>_<scan>_mid.png
/// ```

pub mod extract;
pub mod package;
pub mod preview;
pub mod reorient;
pub mod runner;
