use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use env_logger::Env;

use mri_slicer::config::{OrientationConfig, SegmentationStyle, SliceConfig};
use mri_slicer::data::filter::ViewFilter;
use mri_slicer::data::loader::load_catalog;
use mri_slicer::data::walker::ScanDirectoryWalker;
use mri_slicer::pipeline::extract::SliceExtractor;
use mri_slicer::pipeline::package::DatasetPackager;
use mri_slicer::pipeline::preview::{preview_candidates, write_previews};
use mri_slicer::pipeline::reorient::{FslReorient, NoReorient, Reorient};
use mri_slicer::pipeline::runner::{extract_tree, reorient_tree};
use mri_slicer::state::RunReport;

#[derive(Parser, Debug)]
#[command(name = "mri-slicer", version, about = "Cut MRI scans into labelled 2D slices")]
struct Cli {
    #[arg(long, global = true, help = "JSON settings file; flags override its values")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Reorient, extract and package in one go.
    Run {
        #[command(flatten)]
        tree: TreeArgs,
        #[command(flatten)]
        render: RenderArgs,
        #[arg(long, help = "Leave volumes as they are")]
        skip_reorient: bool,
        #[arg(long, value_enum)]
        view: Option<ViewFilter>,
        #[arg(long, help = "Manifest file name")]
        name: Option<String>,
    },
    /// Reorient every volume in place.
    Reorient {
        #[arg(long)]
        root: PathBuf,
        #[arg(long, help = "Reorientation program")]
        program: Option<String>,
    },
    /// Write labelled slices for every scan.
    Extract {
        #[command(flatten)]
        tree: TreeArgs,
        #[command(flatten)]
        render: RenderArgs,
    },
    /// Build the dataset manifest from extracted slices.
    Package {
        #[arg(long, help = "Directory holding extracted slices")]
        input: PathBuf,
        #[arg(long, help = "Dataset directory [default: <input>/hf]")]
        out: Option<PathBuf>,
        #[arg(long, value_enum)]
        view: Option<ViewFilter>,
        #[arg(long)]
        name: Option<String>,
    },
    /// Save a three-plane mid-slice image per volume.
    Preview {
        #[arg(long)]
        root: PathBuf,
        #[arg(long)]
        out: PathBuf,
        #[arg(long, help = "Also preview segmentation volumes")]
        include_seg: bool,
        #[command(flatten)]
        render: RenderArgs,
    },
}

#[derive(Args, Debug)]
struct TreeArgs {
    #[arg(long, help = "Root of the subject/session/scan tree")]
    root: PathBuf,
    #[arg(long, help = "Label table [default: <root>/T1_label_volumes.txt]")]
    catalog: Option<PathBuf>,
    #[arg(long, help = "Slice output directory [default: <root>/slice_data]")]
    out: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct RenderArgs {
    #[arg(long, value_enum)]
    orientation: Option<OrientationPreset>,
    #[arg(long, help = "Colour segmentation labels from a palette")]
    palette: bool,
    #[arg(long)]
    width: Option<u32>,
    #[arg(long)]
    height: Option<u32>,
    #[arg(long)]
    dpi: Option<u32>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OrientationPreset {
    /// Axial MRI drawn origin-upper, as historically emitted.
    Reference,
    /// Every layer of a plane drawn the same way.
    Consistent,
}

impl RenderArgs {
    fn apply(&self, config: &mut SliceConfig) {
        match self.orientation {
            Some(OrientationPreset::Reference) => config.orientation = OrientationConfig::default(),
            Some(OrientationPreset::Consistent) => {
                config.orientation = OrientationConfig::consistent()
            }
            None => {}
        }
        if self.palette {
            config.render.segmentation_style = SegmentationStyle::Palette;
        }
        if let Some(w) = self.width {
            config.render.width = w;
        }
        if let Some(h) = self.height {
            config.render.height = h;
        }
        if let Some(dpi) = self.dpi {
            config.render.dpi = dpi;
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => SliceConfig::from_json_file(path)?,
        None => SliceConfig::default(),
    };

    match cli.command {
        Commands::Run {
            tree,
            render,
            skip_reorient,
            view,
            name,
        } => {
            render.apply(&mut config);
            if skip_reorient {
                config.reorient = false;
            }
            if let Some(view) = view {
                config.view = view;
            }
            if let Some(name) = name {
                config.manifest_name = name;
            }
            let walker = scan_walker(&config);

            let reorienter = reorienter(&config);
            print_report("Reorient", &reorient_tree(&tree.root, &walker, &*reorienter)?);

            let output_dir = extract(&tree, &walker, &config)?;

            let packager = DatasetPackager::new(
                &output_dir,
                config.dataset_dir(&output_dir),
                config.view,
            );
            let report = packager
                .package(&config.manifest_name)
                .context("packaging dataset")?;
            print_report("Package", &report);
        }
        Commands::Reorient { root, program } => {
            if let Some(program) = program {
                config.reorient_program = program;
            }
            let reorienter = FslReorient::new(config.reorient_program.clone());
            print_report("Reorient", &reorient_tree(&root, &scan_walker(&config), &reorienter)?);
        }
        Commands::Extract { tree, render } => {
            render.apply(&mut config);
            extract(&tree, &scan_walker(&config), &config)?;
        }
        Commands::Package {
            input,
            out,
            view,
            name,
        } => {
            let out = out.unwrap_or_else(|| config.dataset_dir(&input));
            let packager = DatasetPackager::new(&input, out, view.unwrap_or(config.view));
            let name = name.unwrap_or_else(|| config.manifest_name.clone());
            let report = packager
                .package(&name)
                .with_context(|| format!("packaging {}", input.display()))?;
            print_report("Package", &report);
        }
        Commands::Preview {
            root,
            out,
            include_seg,
            render,
        } => {
            render.apply(&mut config);
            let walker = scan_walker(&config);
            let mut volumes = Vec::new();
            for session in walker.session_dirs(&root)? {
                volumes.extend(walker.find_volumes(&session)?);
            }
            let volumes =
                preview_candidates(volumes, &walker, &config.preview_exclude, include_seg);
            let report = write_previews(&volumes, &out, &config.render)?;
            print_report("Preview", &report);
        }
    }
    Ok(())
}

fn scan_walker(config: &SliceConfig) -> ScanDirectoryWalker {
    ScanDirectoryWalker::new(
        config.volume_extension.clone(),
        config.segmentation_marker.clone(),
    )
}

fn reorienter(config: &SliceConfig) -> Box<dyn Reorient> {
    if config.reorient {
        Box::new(FslReorient::new(config.reorient_program.clone()))
    } else {
        Box::new(NoReorient)
    }
}

/// Load the catalog and slice the tree. Returns the slice output directory.
fn extract(tree: &TreeArgs, walker: &ScanDirectoryWalker, config: &SliceConfig) -> Result<PathBuf> {
    let catalog_path = tree
        .catalog
        .clone()
        .unwrap_or_else(|| config.catalog_path(&tree.root));
    let catalog = load_catalog(&catalog_path, config.catalog_delimiter)
        .with_context(|| format!("loading label table {}", catalog_path.display()))?;
    log::info!("{} labels in {}", catalog.len(), catalog_path.display());

    let output_dir = tree
        .out
        .clone()
        .unwrap_or_else(|| config.output_dir(&tree.root));
    let extractor = SliceExtractor::new(&catalog, &output_dir, config);
    let report = extract_tree(&tree.root, walker, &extractor)
        .with_context(|| format!("walking {}", tree.root.display()))?;
    print_report("Extract", &report);
    Ok(output_dir)
}

fn print_report(stage: &str, report: &RunReport) {
    println!("== {stage} ==");
    print!("{report}");
}
