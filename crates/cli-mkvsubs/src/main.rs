use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info, LevelFilter};
use mkvsubs::{BatchOptions, BatchRunner, FailurePolicy, PipelineConfig, ProcessRunner};
use std::path::PathBuf;

/// Keep only the Japanese audio, convert the English subtitles to ASS and
/// make both the defaults, for every MKV in a folder.
///
/// Requires mkvmerge, mkvextract, SubtitleEdit and (with --reencode) ffmpeg.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The path to the videos
    #[arg(value_parser = existing_directory)]
    dir: PathBuf,

    /// Stop after the first file
    #[arg(short, long)]
    debug: bool,

    /// Redo every step even if its output already exists
    #[arg(short, long)]
    force: bool,

    /// Re-encode the remuxed files with ffmpeg
    #[arg(short, long)]
    reencode: bool,

    /// Keep processing the remaining files when one fails
    #[arg(short, long)]
    keep_going: bool,

    /// Path to configuration file (JSON or TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn existing_directory(path: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(path);
    if !path.is_dir() {
        return Err(format!("'{}' is not a valid directory.", path.display()));
    }
    Ok(path)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    // RUST_LOG wins; otherwise info, or debug with --verbose
    let default_level = if args.verbose { LevelFilter::Debug } else { LevelFilter::Info };
    env_logger::Builder::new()
        .filter_level(default_level)
        .parse_default_env()
        .format_timestamp_secs()
        .init();

    let cfg = PipelineConfig::load_config(args.config.as_deref())
        .context("Failed to load configuration")?;

    let on_failure = if args.keep_going { FailurePolicy::Continue } else { cfg.on_failure };
    let opts = BatchOptions {
        reencode: args.reencode,
        debug: args.debug,
        force: args.force,
        on_failure,
    };

    info!("Processing {}", args.dir.display());
    info!("  Options: reencode={} debug={} force={} on_failure={:?}", opts.reencode, opts.debug, opts.force, opts.on_failure);

    let runner = BatchRunner::new(&cfg, ProcessRunner);
    let report = runner
        .run(&args.dir, &opts)
        .await
        .with_context(|| format!("Failed to process {}", args.dir.display()))?;

    if !report.is_success() {
        for (path, e) in &report.failed {
            error!("{}: {}", path.display(), e);
        }
        anyhow::bail!("{} of {} file(s) failed", report.failed.len(), report.discovered);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_parse() {
        let tmp = std::env::temp_dir();
        let args = Args::try_parse_from([
            "mkvsubs",
            tmp.to_str().unwrap(),
            "-d",
            "--force",
            "-r",
            "-k",
        ])
        .unwrap();
        assert!(args.debug && args.force && args.reencode && args.keep_going);
        assert!(!args.verbose);
        assert!(args.config.is_none());
    }

    #[test]
    fn test_rejects_missing_directory() {
        let err = Args::try_parse_from(["mkvsubs", "/nonexistent/videos"]).unwrap_err();
        assert!(err.to_string().contains("is not a valid directory"));
    }

    #[test]
    fn test_directory_is_required() {
        assert!(Args::try_parse_from(["mkvsubs"]).is_err());
    }
}
