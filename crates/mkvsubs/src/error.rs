use std::path::PathBuf;
use thiserror::Error;

use crate::mkvinfo::TrackType;

/// Failure of a single external tool invocation
#[derive(Debug, Error)]
pub enum ToolError {
    /// The process could not be started at all
    #[error("failed to spawn {program}: {cause}")]
    Spawn {
        program: String,
        cause: std::io::Error,
    },
    /// The process ran and exited unsuccessfully
    #[error("{program} exited with code {exit_code}\nSTDERR:\n{stderr}")]
    Failed {
        program: String,
        exit_code: i32,
        stderr: String,
    },
    /// The process exited cleanly but the expected file is not there
    #[error("{program} reported success but did not produce {}", .output.display())]
    MissingOutput { program: String, output: PathBuf },
}

/// `mkvmerge -J` output that cannot be turned into a track list
#[derive(Debug, Error)]
pub enum IdentifyError {
    #[error("unexpected mkvmerge JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("container format not recognized")]
    UnrecognizedContainer,
}

/// Track selection could not settle on a single track
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectionError {
    #[error("no {0} track found")]
    NoTrack(TrackType),
    #[error("{count} {kind} tracks remain after filtering, expected exactly one")]
    AmbiguousTrack { kind: TrackType, count: usize },
}

/// Everything that can abort processing of a file
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("probe failed for {}: {reason}", .path.display())]
    Probe { path: PathBuf, reason: String },

    #[error("track selection failed for {}: {cause}", .path.display())]
    Selection {
        path: PathBuf,
        cause: SelectionError,
    },

    #[error("subtitle extraction failed for {}: {cause}", .path.display())]
    Extraction {
        path: PathBuf,
        cause: ToolError,
    },

    #[error("subtitle conversion failed for {}: {cause}", .path.display())]
    Conversion {
        path: PathBuf,
        cause: ToolError,
    },

    #[error("remux failed for {}: {cause}", .path.display())]
    Remux {
        path: PathBuf,
        cause: ToolError,
    },

    #[error("re-encode failed for {}: {cause}", .path.display())]
    Reencode {
        path: PathBuf,
        cause: ToolError,
    },

    #[error("i/o error on {}: {cause}", .path.display())]
    Io {
        path: PathBuf,
        cause: std::io::Error,
    },
}

impl PipelineError {
    pub(crate) fn io(path: impl Into<PathBuf>, cause: std::io::Error) -> Self {
        PipelineError::Io { path: path.into(), cause }
    }
}

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;
