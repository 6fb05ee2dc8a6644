use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use ndarray::Array3;

use mri_slicer::config::DEFAULT_CATALOG_FILE;
use mri_slicer::data::loader::save_volume;

/// Write a small synthetic scan tree and label table.
///
/// ```text
/// <out>/T1_label_volumes.txt
/// <out>/sub-01/ses-01/301-T1w/NIFTI/t1.nii.gz
/// <out>/sub-01/ses-01/301-SLANT/NIFTI/t1_seg.nii.gz
/// <out>/sub-02/ses-01/401-T1w/NIFTI/t1.nii.gz      (no segmentation)
/// ```
#[derive(Parser, Debug)]
#[command(name = "generate_sample", version, about)]
struct Cli {
    /// Output root.
    out: PathBuf,
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

const SHAPE: (usize, usize, usize) = (20, 24, 16);

/// (name, index, box lower corner, box upper corner)
const REGIONS: [(&str, i64, [usize; 3], [usize; 3]); 3] = [
    ("Left-Lateral-Ventricle", 4, [8, 14, 6], [12, 18, 10]),
    ("Left-Hippocampus", 17, [4, 6, 4], [8, 12, 10]),
    ("Right-Hippocampus", 53, [12, 6, 4], [16, 12, 10]),
];

fn gaussian(x: f64, mu: f64, sigma: f64) -> f64 {
    (-(x - mu).powi(2) / (2.0 * sigma.powi(2))).exp()
}

/// Bright ellipsoid head with noise.
fn generate_mri(mut rng: NoiseRng) -> Array3<f32> {
    let (nx, ny, nz) = SHAPE;
    Array3::from_shape_fn(SHAPE, |(i, j, k)| {
        let signal = gaussian(i as f64, nx as f64 / 2.0, nx as f64 / 3.0)
            * gaussian(j as f64, ny as f64 / 2.0, ny as f64 / 3.0)
            * gaussian(k as f64, nz as f64 / 2.0, nz as f64 / 3.0);
        (1000.0 * signal + rng.gauss(0.0, 20.0)).max(0.0) as f32
    })
}

fn generate_segmentation() -> Array3<f32> {
    Array3::from_shape_fn(SHAPE, |(i, j, k)| {
        let voxel = [i, j, k];
        REGIONS
            .iter()
            .find(|(_, _, lo, hi)| (0..3).all(|d| lo[d] <= voxel[d] && voxel[d] < hi[d]))
            .map_or(0.0, |(_, index, _, _)| *index as f32)
    })
}

fn write_volume(dir: &Path, name: &str, data: &Array3<f32>) -> Result<()> {
    let nifti_dir = dir.join("NIFTI");
    fs::create_dir_all(&nifti_dir).with_context(|| format!("creating {}", nifti_dir.display()))?;
    let path = nifti_dir.join(name);
    save_volume(&path, data).with_context(|| format!("writing {}", path.display()))?;
    println!("Wrote {}", path.display());
    Ok(())
}

fn write_catalog(out: &Path) -> Result<()> {
    let path = out.join(DEFAULT_CATALOG_FILE);
    let mut writer =
        csv::Writer::from_path(&path).with_context(|| format!("creating {}", path.display()))?;
    writer.write_record(["Label", "Index"])?;
    for (name, index, _, _) in REGIONS {
        writer.write_record([name.to_string(), index.to_string()])?;
    }
    writer.flush()?;
    println!("Wrote {}", path.display());
    Ok(())
}

/// SplitMix64 noise source, one independent stream per volume.
struct NoiseRng(u64);

impl NoiseRng {
    fn for_volume(seed: u64, volume: &str) -> Self {
        // FNV-1a of the volume name
        let salt = volume
            .bytes()
            .fold(0xcbf2_9ce4_8422_2325u64, |h, b| {
                (h ^ u64::from(b)).wrapping_mul(0x0100_0000_01b3)
            });
        NoiseRng(seed ^ salt)
    }

    fn next_u64(&mut self) -> u64 {
        self.0 = self.0.wrapping_add(0x9e37_79b9_7f4a_7c15);
        let mut z = self.0;
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
        z ^ (z >> 31)
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        mean + std_dev * (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    fs::create_dir_all(&cli.out).with_context(|| format!("creating {}", cli.out.display()))?;
    write_catalog(&cli.out)?;

    let session = cli.out.join("sub-01").join("ses-01");
    write_volume(
        &session.join("301-T1w"),
        "t1.nii.gz",
        &generate_mri(NoiseRng::for_volume(cli.seed, "sub-01/301-T1w")),
    )?;
    write_volume(&session.join("301-SLANT"), "t1_seg.nii.gz", &generate_segmentation())?;

    // A scan without segmentation, skipped by the slice pipeline.
    let lonely = cli.out.join("sub-02").join("ses-01");
    write_volume(
        &lonely.join("401-T1w"),
        "t1.nii.gz",
        &generate_mri(NoiseRng::for_volume(cli.seed, "sub-02/401-T1w")),
    )?;

    println!("Sample tree ready at {}", cli.out.display());
    Ok(())
}
