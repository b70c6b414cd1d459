use std::fmt;
use std::path::{Path, PathBuf};
use humansize::{format_size, DECIMAL};
use log::info;

use crate::commands::CommandBuilder;
use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result, ToolError};
use crate::layout::WorkDirs;
use crate::runner::{Invocation, ToolRunner};
use crate::selector::TrackSelection;

/// The four per-file steps, in the order they run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ExtractSubtitles,
    ConvertSubtitles,
    Remux,
    Reencode,
}

impl Stage {
    /// Wrap a tool failure into the error kind belonging to this stage
    fn error(self, input: &Path, cause: ToolError) -> PipelineError {
        let path = input.to_path_buf();
        match self {
            Stage::ExtractSubtitles => PipelineError::Extraction { path, cause },
            Stage::ConvertSubtitles => PipelineError::Conversion { path, cause },
            Stage::Remux => PipelineError::Remux { path, cause },
            Stage::Reencode => PipelineError::Reencode { path, cause },
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::ExtractSubtitles => "extract subtitles",
            Stage::ConvertSubtitles => "convert subtitles",
            Stage::Remux => "remux",
            Stage::Reencode => "re-encode",
        };
        f.write_str(name)
    }
}

/// Result of a stage: the output file, which exists either way
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    /// The tool ran and wrote the file
    Produced(PathBuf),
    /// The file was already there and nothing ran
    AlreadyDone(PathBuf),
}

impl StageOutcome {
    pub fn path(&self) -> &Path {
        match self {
            StageOutcome::Produced(p) | StageOutcome::AlreadyDone(p) => p,
        }
    }

    pub fn into_path(self) -> PathBuf {
        match self {
            StageOutcome::Produced(p) | StageOutcome::AlreadyDone(p) => p,
        }
    }

    pub fn was_skipped(&self) -> bool {
        matches!(self, StageOutcome::AlreadyDone(_))
    }
}

/// Runs individual stages against one set of working directories
pub struct Stages<'a, R> {
    runner: &'a R,
    commands: CommandBuilder<'a>,
    dirs: &'a WorkDirs,
}

impl<'a, R: ToolRunner> Stages<'a, R> {
    pub fn new(runner: &'a R, cfg: &'a PipelineConfig, dirs: &'a WorkDirs) -> Self {
        Self {
            runner,
            commands: CommandBuilder::new(cfg),
            dirs,
        }
    }

    /// Pull the selected subtitle track out of the source as `<subs>/<stem>.sup`
    pub async fn extract_subtitles(&self, source: &Path, track_id: u64, force: bool) -> Result<StageOutcome> {
        let output = self.dirs.extracted_subtitle_path(source);
        let invocation = self.commands.extract_subtitles(source, track_id, &output);
        self.run(Stage::ExtractSubtitles, source, output, force, invocation).await
    }

    /// Turn the extracted image subtitles into text subtitles next to them
    pub async fn convert_subtitles(&self, extracted: &Path, force: bool) -> Result<StageOutcome> {
        let output = self.dirs.converted_subtitle_path(extracted);
        let invocation = self.commands.convert_subtitles(extracted, force);
        self.run(Stage::ConvertSubtitles, extracted, output, force, invocation).await
    }

    /// Write `<filtered>/<name>` with the selected tracks and the converted subtitles
    pub async fn remux(
        &self,
        source: &Path,
        subtitle: &Path,
        selection: &TrackSelection,
        force: bool,
    ) -> Result<StageOutcome> {
        let output = self.dirs.remuxed_path(source);
        let invocation = self.commands.remux(
            source,
            subtitle,
            selection.video_id,
            selection.audio_id,
            &output,
        );
        self.run(Stage::Remux, source, output, force, invocation).await
    }

    /// Re-encode a remuxed file into `<reencoded>/<name>`
    pub async fn reencode(&self, remuxed: &Path, force: bool) -> Result<StageOutcome> {
        let output = self.dirs.reencoded_path(remuxed);
        let invocation = self.commands.reencode(remuxed, &output);
        self.run(Stage::Reencode, remuxed, output, force, invocation).await
    }

    /// Skip when the output exists (unless forced), otherwise run the tool and
    /// insist that the output shows up.
    async fn run(
        &self,
        stage: Stage,
        input: &Path,
        output: PathBuf,
        force: bool,
        invocation: Invocation,
    ) -> Result<StageOutcome> {
        if output.exists() && !force {
            info!("  {}: already done ({})", stage, output.display());
            return Ok(StageOutcome::AlreadyDone(output));
        }

        self.runner
            .run(&invocation)
            .await
            .map_err(|e| stage.error(input, e))?;

        if !output.exists() {
            return Err(stage.error(
                input,
                ToolError::MissingOutput {
                    program: invocation.program_name(),
                    output,
                },
            ));
        }

        let size = std::fs::metadata(&output).map(|m| m.len()).unwrap_or(0);
        info!("  {}: ✅ {} ({})", stage, output.display(), format_size(size, DECIMAL));
        Ok(StageOutcome::Produced(output))
    }
}
