use std::path::{Path, PathBuf};
use chrono::{DateTime, Utc};
use log::{info, warn};

use crate::config::{FailurePolicy, PipelineConfig};
use crate::error::{PipelineError, Result};
use crate::layout::WorkDirs;
use crate::mkvinfo::probe_file;
use crate::runner::ToolRunner;
use crate::scan::scan_directory;
use crate::selector::{TrackSelection, TrackSelector};
use crate::stages::Stages;

/// Per-run switches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchOptions {
    /// Run the ffmpeg re-encode after remuxing
    pub reencode: bool,
    /// Stop after the first file
    pub debug: bool,
    /// Redo every stage even when its output exists
    pub force: bool,
    pub on_failure: FailurePolicy,
}

/// What came out of one source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReport {
    pub source: PathBuf,
    pub selection: TrackSelection,
    /// The last file the pipeline wrote (remuxed, or re-encoded with `reencode`)
    pub output: PathBuf,
    /// Stages that were skipped because their output already existed
    pub skipped_stages: usize,
}

/// Outcome of a whole batch
#[derive(Debug)]
pub struct BatchReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Number of container files found in the directory
    pub discovered: usize,
    pub completed: Vec<FileReport>,
    /// Only populated under `FailurePolicy::Continue`
    pub failed: Vec<(PathBuf, PipelineError)>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Drives the per-file pipeline over a directory
pub struct BatchRunner<'a, R> {
    cfg: &'a PipelineConfig,
    runner: R,
    selector: TrackSelector,
}

impl<'a, R: ToolRunner> BatchRunner<'a, R> {
    pub fn new(cfg: &'a PipelineConfig, runner: R) -> Self {
        Self {
            cfg,
            runner,
            selector: TrackSelector::new(cfg.keywords.clone()),
        }
    }

    /// Process every container file directly inside `dir`
    ///
    /// Under `FailurePolicy::Abort` the first failing file ends the run with
    /// its error; under `Continue` failures are collected in the report.
    pub async fn run(&self, dir: &Path, opts: &BatchOptions) -> Result<BatchReport> {
        let started_at = Utc::now();

        let dirs = WorkDirs::new(dir, self.cfg);
        dirs.create_all()?;

        let files = scan_directory(dir, self.cfg)?;
        let total = files.len();
        let mut completed = Vec::new();
        let mut failed = Vec::new();

        for (i, file) in files.into_iter().enumerate() {
            let name = file
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            info!("+ {}/{} {}", i + 1, total, name);

            let file_started = Utc::now();
            match self.process_file(&dirs, &file, opts).await {
                Ok(report) => {
                    info!(
                        "Finished {} in {} ({} stage(s) already done)",
                        name,
                        format_duration(Utc::now() - file_started),
                        report.skipped_stages
                    );
                    completed.push(report);
                }
                Err(e) => match opts.on_failure {
                    FailurePolicy::Abort => return Err(e),
                    FailurePolicy::Continue => {
                        warn!("❌ {}: {}", name, e);
                        failed.push((file, e));
                    }
                },
            }

            if opts.debug {
                info!("[debug] exit early");
                break;
            }
        }

        let finished_at = Utc::now();
        info!(
            "Batch complete in {}: {} done, {} failed, {} found",
            format_duration(finished_at - started_at),
            completed.len(),
            failed.len(),
            total
        );

        Ok(BatchReport {
            started_at,
            finished_at,
            discovered: total,
            completed,
            failed,
        })
    }

    /// Probe, select, then run the stages in order for one file
    pub async fn process_file(&self, dirs: &WorkDirs, source: &Path, opts: &BatchOptions) -> Result<FileReport> {
        let info = probe_file(&self.runner, self.cfg, source).await?;
        let selection = self
            .selector
            .select(&info)
            .map_err(|e| PipelineError::Selection {
                path: source.to_path_buf(),
                cause: e,
            })?;

        let stages = Stages::new(&self.runner, self.cfg, dirs);
        let mut skipped_stages = 0;

        let sup = stages.extract_subtitles(source, selection.subtitle_id, opts.force).await?;
        skipped_stages += usize::from(sup.was_skipped());

        let ass = stages.convert_subtitles(sup.path(), opts.force).await?;
        skipped_stages += usize::from(ass.was_skipped());

        let mut output = stages.remux(source, ass.path(), &selection, opts.force).await?;
        skipped_stages += usize::from(output.was_skipped());

        if opts.reencode {
            output = stages.reencode(output.path(), opts.force).await?;
            skipped_stages += usize::from(output.was_skipped());
        }

        Ok(FileReport {
            source: source.to_path_buf(),
            selection,
            output: output.into_path(),
            skipped_stages,
        })
    }
}

/// Helper function to format duration for logging
fn format_duration(d: chrono::Duration) -> String {
    let hours = d.num_hours();
    let minutes = d.num_minutes() % 60;
    let seconds = d.num_seconds() % 60;
    format!("{}h {}m {}s", hours, minutes, seconds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SelectionError;
    use crate::mkvinfo::TrackType;
    use crate::runner::fake::{manifest, FakeToolchain};
    use std::fs;

    fn reference_manifest() -> String {
        manifest(&[
            ("video", Some("und"), None, Some(3000)),
            ("audio", Some("eng"), Some("English"), None),
            ("audio", Some("jpn"), Some("Japanese"), None),
            ("subtitles", Some("eng"), None, Some(500)),
            ("subtitles", Some("jpn"), None, Some(520)),
        ])
    }

    fn write_sources(dir: &Path, names: &[&str]) {
        for name in names {
            fs::write(dir.join(name), b"matroska").unwrap();
        }
    }

    #[tokio::test]
    async fn test_reference_scenario_end_to_end() {
        let tmp = tempfile::tempdir().unwrap();
        write_sources(tmp.path(), &["Show 01.mkv"]);
        let cfg = PipelineConfig::default();
        let fake = FakeToolchain::new().with_probe("Show 01.mkv", reference_manifest());

        let report = BatchRunner::new(&cfg, &fake)
            .run(tmp.path(), &BatchOptions::default())
            .await
            .unwrap();

        assert!(report.is_success());
        assert_eq!(report.completed.len(), 1);
        let file = &report.completed[0];
        assert_eq!(file.selection, TrackSelection { video_id: 0, audio_id: 2, subtitle_id: 3 });
        assert_eq!(file.output, tmp.path().join("2_filtered_video/Show 01.mkv"));

        assert!(tmp.path().join("1_converted_subs/Show 01.sup").is_file());
        assert!(tmp.path().join("1_converted_subs/Show 01.ass").is_file());
        assert!(tmp.path().join("2_filtered_video/Show 01.mkv").is_file());
        // working dirs exist even when re-encoding is off
        assert!(tmp.path().join("3_converted_video").is_dir());

        assert_eq!(fake.programs(), vec!["mkvmerge", "mkvextract", "SubtitleEdit", "mkvmerge"]);
        let extract = &fake.calls()[1];
        assert!(extract.args.last().unwrap().to_string_lossy().starts_with("3:"));
        let remux = &fake.calls()[3];
        assert!(remux.args.windows(2).any(|w| w == ["--audio-tracks", "2"]));
    }

    #[tokio::test]
    async fn test_reencode_runs_last() {
        let tmp = tempfile::tempdir().unwrap();
        write_sources(tmp.path(), &["ep.mkv"]);
        let cfg = PipelineConfig::default();
        let fake = FakeToolchain::new().with_probe("ep.mkv", reference_manifest());
        let opts = BatchOptions { reencode: true, ..Default::default() };

        let report = BatchRunner::new(&cfg, &fake).run(tmp.path(), &opts).await.unwrap();

        assert_eq!(report.completed[0].output, tmp.path().join("3_converted_video/ep.mkv"));
        assert_eq!(fake.programs().last().map(String::as_str), Some("ffmpeg"));
        assert_eq!(
            fake.calls().last().unwrap().args[2],
            tmp.path().join("2_filtered_video/ep.mkv").into_os_string()
        );
    }

    #[tokio::test]
    async fn test_no_video_fails_before_any_tool_runs() {
        let tmp = tempfile::tempdir().unwrap();
        write_sources(tmp.path(), &["audio_only.mkv"]);
        let cfg = PipelineConfig::default();
        let fake = FakeToolchain::new().with_probe(
            "audio_only.mkv",
            manifest(&[("audio", None, None, None), ("subtitles", Some("eng"), None, None)]),
        );

        let err = BatchRunner::new(&cfg, &fake)
            .run(tmp.path(), &BatchOptions::default())
            .await
            .unwrap_err();

        match err {
            PipelineError::Selection { cause, .. } => {
                assert_eq!(cause, SelectionError::NoTrack(TrackType::Video));
            }
            other => panic!("expected selection error, got {:?}", other),
        }
        assert_eq!(fake.programs(), vec!["mkvmerge"]);
        assert!(fs::read_dir(tmp.path().join("1_converted_subs")).unwrap().next().is_none());
    }

    #[tokio::test]
    async fn test_debug_stops_after_first_file() {
        let tmp = tempfile::tempdir().unwrap();
        write_sources(tmp.path(), &["a.mkv", "b.mkv", "c.mkv"]);
        let cfg = PipelineConfig::default();
        let fake = FakeToolchain::new()
            .with_probe("a.mkv", reference_manifest())
            .with_probe("b.mkv", reference_manifest())
            .with_probe("c.mkv", reference_manifest());
        let opts = BatchOptions { debug: true, ..Default::default() };

        let report = BatchRunner::new(&cfg, &fake).run(tmp.path(), &opts).await.unwrap();

        assert_eq!(report.discovered, 3);
        assert_eq!(report.completed.len(), 1);
        assert_eq!(report.completed[0].source, tmp.path().join("a.mkv"));
        assert!(tmp.path().join("2_filtered_video/a.mkv").exists());
        for name in ["b", "c"] {
            assert!(!tmp.path().join(format!("1_converted_subs/{}.sup", name)).exists());
            assert!(!tmp.path().join(format!("2_filtered_video/{}.mkv", name)).exists());
        }
    }

    #[tokio::test]
    async fn test_abort_policy_stops_at_first_failure() {
        let tmp = tempfile::tempdir().unwrap();
        write_sources(tmp.path(), &["a.mkv", "b.mkv"]);
        let cfg = PipelineConfig::default();
        // a.mkv has no probe answer, so mkvmerge -J fails for it
        let fake = FakeToolchain::new().with_probe("b.mkv", reference_manifest());

        let err = BatchRunner::new(&cfg, &fake)
            .run(tmp.path(), &BatchOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Probe { .. }));
        assert_eq!(fake.calls().len(), 1);
        assert!(!tmp.path().join("2_filtered_video/b.mkv").exists());
    }

    #[tokio::test]
    async fn test_continue_policy_isolates_failures() {
        let tmp = tempfile::tempdir().unwrap();
        write_sources(tmp.path(), &["a.mkv", "b.mkv"]);
        let cfg = PipelineConfig::default();
        let fake = FakeToolchain::new().with_probe("b.mkv", reference_manifest());
        let opts = BatchOptions { on_failure: FailurePolicy::Continue, ..Default::default() };

        let report = BatchRunner::new(&cfg, &fake).run(tmp.path(), &opts).await.unwrap();

        assert!(!report.is_success());
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, tmp.path().join("a.mkv"));
        assert_eq!(report.completed.len(), 1);
        assert!(tmp.path().join("2_filtered_video/b.mkv").exists());
    }

    #[tokio::test]
    async fn test_rerun_skips_finished_stages() {
        let tmp = tempfile::tempdir().unwrap();
        write_sources(tmp.path(), &["ep.mkv"]);
        let cfg = PipelineConfig::default();
        let fake = FakeToolchain::new().with_probe("ep.mkv", reference_manifest());
        let runner = BatchRunner::new(&cfg, &fake);

        runner.run(tmp.path(), &BatchOptions::default()).await.unwrap();
        let report = runner.run(tmp.path(), &BatchOptions::default()).await.unwrap();

        // only the probe runs the second time
        assert_eq!(fake.programs().len(), 5);
        assert_eq!(report.completed[0].skipped_stages, 3);

        let forced = BatchOptions { force: true, ..Default::default() };
        let report = runner.run(tmp.path(), &forced).await.unwrap();
        assert_eq!(report.completed[0].skipped_stages, 0);
        assert_eq!(fake.programs().len(), 9);
    }

    #[tokio::test]
    async fn test_empty_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = PipelineConfig::default();
        let fake = FakeToolchain::new();

        let report = BatchRunner::new(&cfg, &fake)
            .run(tmp.path(), &BatchOptions::default())
            .await
            .unwrap();
        assert_eq!(report.discovered, 0);
        assert!(report.is_success());
        assert!(fake.calls().is_empty());
    }
}
