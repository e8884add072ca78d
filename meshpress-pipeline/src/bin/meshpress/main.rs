//! meshpress CLI - decimate a mesh and compress its texture.
//!
//! Usage: meshpress <INPUT> [TEXTURE] [OUTPUT] [COMPRESSED_TEXTURE] [OPTIONS]
//!
//! Run `meshpress --help` for available options.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use meshpress_pipeline::{Error, Job, JobReport, Pipeline, PipelineConfig};

#[derive(Parser)]
#[command(name = "meshpress")]
#[command(author, version, about = "Decimate a mesh and compress its texture", long_about = None)]
struct Cli {
    /// Input mesh file (OBJ)
    input: PathBuf,

    /// Texture image belonging to the mesh
    texture: Option<PathBuf>,

    /// Output mesh file; nothing is written without it
    output: Option<PathBuf>,

    /// Output texture file, format chosen by extension
    compressed_texture: Option<PathBuf>,

    /// Fraction of triangles to keep (0.0 to 1.0]
    #[arg(short, long)]
    decimation: Option<f64>,

    /// Texture quality (1 to 100)
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(1..=100))]
    quality: Option<u8>,

    /// Maximum texture width in pixels
    #[arg(long)]
    max_width: Option<u32>,

    /// Maximum texture height in pixels
    #[arg(long)]
    max_height: Option<u32>,

    /// TOML file with pipeline settings; flags override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the job report (or the error) as JSON on stdout
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct ErrorReport {
    kind: String,
    message: String,
}

fn init_logging() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to set subscriber")
}

fn load_config(cli: &Cli) -> Result<PipelineConfig> {
    let mut config = match &cli.config {
        Some(path) => PipelineConfig::from_toml_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => PipelineConfig::default(),
    };

    if let Some(factor) = cli.decimation {
        config.decimation_factor = factor;
    }
    if let Some(quality) = cli.quality {
        config.texture.quality = quality;
    }
    if let Some(width) = cli.max_width {
        config.texture.max_size.0 = width;
    }
    if let Some(height) = cli.max_height {
        config.texture.max_size.1 = height;
    }
    Ok(config)
}

fn build_job(cli: &Cli) -> Job {
    Job {
        mesh_input: cli.input.clone(),
        mesh_output: cli.output.clone(),
        texture_input: cli.texture.clone(),
        texture_output: cli.compressed_texture.clone(),
    }
}

fn run(cli: &Cli) -> Result<JobReport> {
    let config = load_config(cli)?;
    let job = build_job(cli);

    if job.texture_input.is_some() != job.texture_output.is_some() {
        warn!("texture compression needs both TEXTURE and COMPRESSED_TEXTURE; skipping it");
    }

    info!(
        input = %job.mesh_input.display(),
        decimation = config.decimation_factor,
        "Processing mesh"
    );

    let pipeline = Pipeline::new(config);
    let report = pipeline.run_with(&job, |stage| info!(?stage, "Stage complete"))?;

    info!(
        input_triangles = report.input_triangles,
        target = report.target_triangles,
        output_triangles = report.output_triangles,
        output_vertices = report.output_vertices,
        "Mesh simplified"
    );
    if report.output_triangles > report.target_triangles {
        warn!(
            "No valid collapse left; stopped at {} triangles",
            report.output_triangles
        );
    }
    if report.had_uvs {
        warn!("Texture coordinates are not carried into the simplified mesh");
    }
    if job.mesh_output.is_none() {
        info!("No output path given; simplified mesh was not written");
    }
    if let Some(texture) = &report.texture {
        info!(
            width = texture.output.0,
            height = texture.output.1,
            bytes = texture.bytes_written,
            "Texture compressed"
        );
    }

    Ok(report)
}

fn error_report(err: &anyhow::Error) -> ErrorReport {
    let kind = match err.downcast_ref::<Error>() {
        Some(e) => e.kind().as_str().to_string(),
        None => "Error".to_string(),
    };
    ErrorReport {
        kind,
        message: format!("{err:#}"),
    }
}

/// Print `value` as pretty JSON on stdout; logs and returns false if it cannot be serialized
fn print_json<T: Serialize>(value: &T, what: &str) -> bool {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            println!("{json}");
            true
        }
        Err(e) => {
            error!("Failed to serialize {what}: {e}");
            false
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(err) = init_logging() {
        eprintln!("{err:#}");
    }

    match run(&cli) {
        Ok(report) => {
            if cli.json && !print_json(&report, "report") {
                return ExitCode::FAILURE;
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("{err:#}");
            if cli.json {
                print_json(&error_report(&err), "error report");
            }
            ExitCode::FAILURE
        }
    }
}
