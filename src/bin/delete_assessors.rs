use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;

use mri_slicer::archive::client::XnatSession;
use mri_slicer::archive::run_cleanup;
use mri_slicer::config::{ArchiveConfig, CleanupConfig, CleanupMode, RetryPolicy, DEFAULT_PROJECTS};

/// Delete assessors for the given subjects, or every orphaned assessor when
/// no subjects are given.
#[derive(Parser, Debug)]
#[command(name = "delete_assessors", version, about)]
struct Cli {
    #[arg(short, long, num_args = 1.., default_values_t = DEFAULT_PROJECTS.map(String::from))]
    projects: Vec<String>,
    #[arg(short, long, num_args = 1..)]
    subjects: Vec<String>,
    #[arg(long, env = "XNAT_HOST")]
    host: String,
    #[arg(long, env = "XNAT_USER")]
    user: String,
    #[arg(long, env = "XNAT_PASS", hide_env_values = true)]
    password: String,
    #[arg(long, help = "Attempt each orphan once even if it fails both checks")]
    dedupe: bool,
    #[arg(long, help = "List candidates without deleting")]
    dry_run: bool,
    #[arg(long, default_value_t = RetryPolicy::default().max_attempts)]
    max_attempts: u32,
    #[arg(long, default_value_t = 60)]
    timeout_secs: u64,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let mode = if cli.subjects.is_empty() {
        CleanupMode::Orphans
    } else {
        CleanupMode::Subjects(cli.subjects)
    };
    let cleanup = CleanupConfig {
        projects: cli.projects,
        mode,
        dedupe: cli.dedupe,
        dry_run: cli.dry_run,
        retry: RetryPolicy {
            max_attempts: cli.max_attempts.max(1),
            ..RetryPolicy::default()
        },
    };
    let archive = ArchiveConfig {
        host: cli.host,
        user: cli.user,
        password: cli.password,
        timeout: Duration::from_secs(cli.timeout_secs),
    };

    let report = {
        let session = XnatSession::connect(&archive)
            .with_context(|| format!("connecting to {}", archive.host))?;
        run_cleanup(&session, &cleanup)
    };
    print!("{report}");
    if report.has_failures() {
        log::warn!("{} assessors could not be deleted", report.failed.len());
    }
    Ok(())
}
