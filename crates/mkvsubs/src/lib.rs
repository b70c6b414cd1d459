pub mod batch;
pub mod commands;
pub mod config;
pub mod error;
pub mod layout;
pub mod mkvinfo;
pub mod runner;
pub mod scan;
pub mod selector;
pub mod stages;

pub use batch::{BatchOptions, BatchReport, BatchRunner, FileReport};
pub use config::{FailurePolicy, PipelineConfig};
pub use error::{IdentifyError, PipelineError, SelectionError, ToolError};
pub use mkvinfo::{MediaInfo, TrackInfo, TrackType};
pub use runner::{Invocation, ProcessRunner, ToolRunner};
pub use selector::{select_tracks, TrackSelection, TrackSelector};
pub use stages::{Stage, StageOutcome};
