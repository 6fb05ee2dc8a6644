use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::str::contains;
use tempfile::TempDir;

fn slicer() -> Command {
    Command::cargo_bin("mri-slicer").unwrap()
}

fn sample_tree() -> TempDir {
    let dir = TempDir::new().unwrap();
    Command::cargo_bin("generate_sample")
        .unwrap()
        .arg(dir.path())
        .assert()
        .success()
        .stdout(contains("Sample tree ready"));
    dir
}

fn count_files(dir: &Path, pred: impl Fn(&str) -> bool) -> usize {
    fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| pred(&e.file_name().to_string_lossy()))
        .count()
}

#[test]
fn run_extracts_and_packages_sample_tree() {
    let root = sample_tree();
    slicer()
        .args(["run", "--skip-reorient", "--root"])
        .arg(root.path())
        .assert()
        .success()
        .stdout(contains("== Extract =="))
        .stdout(contains("Succeeded: 1"))
        .stdout(contains("Slices written: 28"));

    let slices = root.path().join("slice_data");
    assert_eq!(count_files(&slices, |n| n.ends_with("_SEGMENT.png")), 28);
    assert_eq!(count_files(&slices, |n| n.ends_with(".txt")), 28);
    assert_eq!(count_files(&slices, |n| n.ends_with(".partial")), 0);

    let manifest = fs::read_to_string(slices.join("hf").join("slices_all.jsonl")).unwrap();
    assert_eq!(manifest.lines().count(), 28);
    let first: serde_json::Value = serde_json::from_str(manifest.lines().next().unwrap()).unwrap();
    assert!(first["file_name"].as_str().unwrap().starts_with("cb2_sub-01_301_"));
    assert!(manifest.contains("Left-Hippocampus"));
    assert!(!manifest.contains("SEGMENT"));
}

#[test]
fn package_with_view_filter_keeps_one_plane() {
    let root = sample_tree();
    slicer()
        .args(["extract", "--root"])
        .arg(root.path())
        .assert()
        .success();

    let slices = root.path().join("slice_data");
    let out = root.path().join("axial_only");
    slicer()
        .args(["package", "--view", "axial", "--name", "axial.jsonl", "--input"])
        .arg(&slices)
        .arg("--out")
        .arg(&out)
        .assert()
        .success()
        .stdout(contains("Succeeded: 6"));

    let manifest = fs::read_to_string(out.join("axial.jsonl")).unwrap();
    assert_eq!(manifest.lines().count(), 6);
    assert!(manifest.lines().all(|l| l.contains("_axial_")));
    assert_eq!(count_files(&out, |n| n.ends_with(".png")), 6);
}

#[test]
fn preview_writes_one_image_per_mri_volume() {
    let root = sample_tree();
    let session = root.path().join("sub-01").join("ses-01");
    let slant = session.join("302-SLANT").join("NIFTI");
    fs::create_dir_all(&slant).unwrap();
    fs::copy(
        session.join("301-T1w/NIFTI/t1.nii.gz"),
        slant.join("t1_slant.nii.gz"),
    )
    .unwrap();

    let out = root.path().join("previews");
    slicer()
        .args(["preview", "--root"])
        .arg(root.path())
        .arg("--out")
        .arg(&out)
        .assert()
        .success();
    assert!(out.join("sub-01_ses-01_301-T1w_mid.png").is_file());
    assert!(!out.join("sub-01_ses-01_302-SLANT_mid.png").exists());
    assert_eq!(count_files(&out, |n| n.ends_with("_mid.png")), 2);

    let all = root.path().join("previews_all");
    slicer()
        .args(["preview", "--include-seg", "--root"])
        .arg(root.path())
        .arg("--out")
        .arg(&all)
        .assert()
        .success();
    assert!(all.join("sub-01_ses-01_302-SLANT_mid.png").is_file());
    assert!(all.join("sub-01_ses-01_301-SLANT_mid.png").is_file());
    assert_eq!(count_files(&all, |n| n.ends_with("_mid.png")), 4);
}

#[test]
fn package_missing_input_fails() {
    let dir = TempDir::new().unwrap();
    slicer()
        .args(["package", "--input"])
        .arg(dir.path().join("nope"))
        .assert()
        .failure()
        .code(1);
}

#[test]
fn missing_catalog_is_fatal() {
    let dir = TempDir::new().unwrap();
    slicer()
        .args(["extract", "--root"])
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(contains("loading label table"));
}

#[test]
fn unknown_subcommand_is_a_usage_error() {
    slicer().arg("slice-everything").assert().failure().code(2);
}

#[test]
fn delete_assessors_reports_version() {
    Command::cargo_bin("delete_assessors")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(contains("delete_assessors"));
}
