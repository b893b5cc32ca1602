use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rayon::prelude::*;
use sample_analyzer::config::DEFAULT_SAMPLE_RATE;
use sample_analyzer::error::EngineError;
use sample_analyzer::{waveplot, AnalysisPipeline, EngineConfig};
use serde::Serialize;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Parser, Debug)]
#[command(name = "sample-analyzer")]
#[command(about = "Decode audio samples and extract musical features", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Verbose logging
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    /// Sample rate every file is decoded to
    #[arg(long, global = true, default_value_t = DEFAULT_SAMPLE_RATE)]
    sample_rate: u32,

    /// Minimum BPM for tempo detection
    #[arg(long, global = true, default_value = "30")]
    min_bpm: f64,

    /// Maximum BPM for tempo detection
    #[arg(long, global = true, default_value = "320")]
    max_bpm: f64,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Container properties without a full decode
    Info {
        /// Audio files or directories
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Check that files can be decoded
    Validate {
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Full feature extraction and classification
    Analyze {
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Streaming-service style mix features
    Mix {
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Duration, tempo, loudness and key only
    Summary {
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Render an amplitude envelope PNG
    Waveplot {
        /// Audio file
        input: String,

        /// PNG to write
        #[arg(short = 'o', long)]
        output: PathBuf,

        #[arg(long, default_value = "800")]
        width: u32,

        #[arg(long, default_value = "200")]
        height: u32,
    },
}

#[derive(Serialize)]
struct FileResult<T> {
    file: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let config = EngineConfig::new()
        .with_target_sample_rate(args.sample_rate)
        .with_tempo_range(args.min_bpm, args.max_bpm);
    let pipeline = AnalysisPipeline::new(config);

    match args.command {
        Command::Info { paths } => {
            let files = collect_files(&paths, pipeline.config())?;
            run_batch(&files, |path| pipeline.get_info(path))
        }
        Command::Validate { paths } => {
            let files = collect_files(&paths, pipeline.config())?;
            run_batch(&files, |path| Ok(pipeline.validate(path)))
        }
        Command::Analyze { paths } => {
            let files = collect_files(&paths, pipeline.config())?;
            run_batch(&files, |path| pipeline.analyze(path))
        }
        Command::Mix { paths } => {
            let files = collect_files(&paths, pipeline.config())?;
            run_batch(&files, |path| pipeline.analyze_mix(path))
        }
        Command::Summary { paths } => {
            let files = collect_files(&paths, pipeline.config())?;
            run_batch(&files, |path| pipeline.summarize(path))
        }
        Command::Waveplot {
            input,
            output,
            width,
            height,
        } => {
            let input = PathBuf::from(shellexpand::tilde(&input).as_ref());
            let waveform = pipeline
                .decoder()
                .load(&input)
                .with_context(|| format!("Failed to load {:?}", input))?;

            let png = waveplot::render_png(&waveform, width, height)?;
            std::fs::write(&output, png)
                .with_context(|| format!("Failed to write waveplot to {:?}", output))?;

            log::info!("Waveplot written to {:?}", output);
            Ok(())
        }
    }
}

/// Expand `~`, walk directories for supported files, keep explicit files as given
fn collect_files(paths: &[String], config: &EngineConfig) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for raw in paths {
        let path = PathBuf::from(shellexpand::tilde(raw).as_ref());
        if !path.is_dir() {
            files.push(path);
            continue;
        }

        let before = files.len();
        for entry in WalkDir::new(&path).follow_links(true) {
            let entry = entry.with_context(|| format!("Failed to walk {:?}", path))?;
            let supported = entry
                .path()
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| config.is_supported(e));
            if entry.file_type().is_file() && supported {
                files.push(entry.into_path());
            }
        }
        log::info!("Found {} audio files in {:?}", files.len() - before, path);
    }

    files.sort();
    Ok(files)
}

/// Run `op` over every file in parallel and print the results as JSON
///
/// Fails after printing if any file failed.
fn run_batch<T, F>(files: &[PathBuf], op: F) -> Result<()>
where
    T: Serialize + Send,
    F: Fn(&Path) -> Result<T, EngineError> + Sync,
{
    let results: Vec<FileResult<T>> = files
        .par_iter()
        .map(|path| match op(path) {
            Ok(result) => FileResult {
                file: path.clone(),
                result: Some(result),
                error: None,
            },
            Err(e) => {
                if e.is_pre_decode() {
                    log::warn!("Skipping {:?}: {}", path, e);
                } else {
                    log::error!("{}", e);
                }
                FileResult {
                    file: path.clone(),
                    result: None,
                    error: Some(e.to_string()),
                }
            }
        })
        .collect();

    let failed = results.iter().filter(|r| r.error.is_some()).count();
    let json = serde_json::to_string_pretty(&results).context("Failed to serialize results")?;
    println!("{}", json);

    if failed > 0 {
        anyhow::bail!("{} of {} files failed", failed, results.len());
    }
    log::info!("Processed {} files", results.len());
    Ok(())
}
