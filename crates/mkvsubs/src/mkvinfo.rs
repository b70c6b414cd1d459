use std::fmt;
use std::path::Path;
use log::debug;
use serde::Deserialize;

use crate::config::PipelineConfig;
use crate::error::{IdentifyError, PipelineError, Result};
use crate::runner::{Invocation, ToolRunner};

/// Kind of a track as reported by `mkvmerge -J`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackType {
    Video,
    Audio,
    Subtitles,
    /// Anything else mkvmerge knows about (e.g. DVD buttons); never selected
    #[serde(other)]
    Other,
}

impl fmt::Display for TrackType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TrackType::Video => "video",
            TrackType::Audio => "audio",
            TrackType::Subtitles => "subtitle",
            TrackType::Other => "other",
        };
        f.write_str(name)
    }
}

/// A single track of a container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackInfo {
    pub id: u64,
    pub kind: TrackType,
    pub language: Option<String>,
    pub track_name: Option<String>,
    pub index_entry_count: u64,
}

/// All tracks of one file, in the order mkvmerge lists them
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaInfo {
    pub tracks: Vec<TrackInfo>,
}

impl MediaInfo {
    /// Tracks of one kind, keeping input order
    pub fn tracks_of(&self, kind: TrackType) -> impl Iterator<Item = &TrackInfo> {
        self.tracks.iter().filter(move |t| t.kind == kind)
    }

    /// Parse `mkvmerge -J` output
    pub fn from_identification(json: &str) -> Result<Self, IdentifyError> {
        let ident: Identification = serde_json::from_str(json)?;

        if let Some(container) = &ident.container {
            if !container.recognized {
                return Err(IdentifyError::UnrecognizedContainer);
            }
        }

        let tracks = ident
            .tracks
            .into_iter()
            .map(|t| TrackInfo {
                id: t.id,
                kind: t.kind,
                language: t.properties.language,
                track_name: t.properties.track_name,
                index_entry_count: t.properties.num_index_entries.unwrap_or(0),
            })
            .collect();

        Ok(MediaInfo { tracks })
    }
}

#[derive(Debug, Deserialize)]
struct Identification {
    container: Option<ContainerInfo>,
    tracks: Vec<RawTrack>,
}

#[derive(Debug, Deserialize)]
struct ContainerInfo {
    recognized: bool,
}

#[derive(Debug, Deserialize)]
struct RawTrack {
    id: u64,
    #[serde(rename = "type")]
    kind: TrackType,
    #[serde(default)]
    properties: RawProperties,
}

#[derive(Debug, Default, Deserialize)]
struct RawProperties {
    language: Option<String>,
    track_name: Option<String>,
    num_index_entries: Option<u64>,
}

/// Run `mkvmerge -J` on a file and parse the track listing
pub async fn probe_file<R: ToolRunner>(
    runner: &R,
    cfg: &PipelineConfig,
    file_path: &Path,
) -> Result<MediaInfo> {
    let probe_error = |reason: String| PipelineError::Probe {
        path: file_path.to_path_buf(),
        reason,
    };

    if !file_path.exists() {
        return Err(probe_error("file does not exist".to_string()));
    }

    let invocation = Invocation::new(&cfg.mkvmerge_bin)
        .arg("-J")
        .path_arg(file_path)
        .quiet();
    let output = runner
        .run(&invocation)
        .await
        .map_err(|e| probe_error(e.to_string()))?;

    let info = MediaInfo::from_identification(&output.stdout).map_err(|e| probe_error(e.to_string()))?;
    debug!("Probed {}: {} track(s)", file_path.display(), info.tracks.len());
    Ok(info)
}
