use std::path::{Path, PathBuf};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// What the batch runner does when a file fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Stop the whole run at the first failing file
    #[default]
    Abort,
    /// Record the failure and move on to the next file
    Continue,
}

/// Keywords driving track selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionKeywords {
    /// Substring an audio track name must contain when several audio tracks exist
    pub audio_name: String,
    /// Substring of the subtitle language tag that marks an English track
    pub subtitle_language: String,
    /// Substring of the subtitle track name that marks an English track
    pub subtitle_name: String,
}

impl Default for SelectionKeywords {
    fn default() -> Self {
        Self {
            audio_name: "japanese".to_string(),
            subtitle_language: "eng".to_string(),
            subtitle_name: "english".to_string(),
        }
    }
}

/// Parameters for the optional ffmpeg re-encode
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodeSettings {
    pub video_codec: String,
    pub pixel_format: String,
    pub preset: String,
    pub crf: u8,
    pub audio_codec: String,
    pub audio_bitrate: String,
}

impl Default for EncodeSettings {
    fn default() -> Self {
        Self {
            video_codec: "hevc_nvenc".to_string(),
            pixel_format: "yuv420p".to_string(),
            preset: "slow".to_string(),
            crf: 23,
            audio_codec: "ac3".to_string(),
            audio_bitrate: "192k".to_string(),
        }
    }
}

/// Configuration for the subtitle/remux pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Path to mkvmerge (used for probing and remuxing)
    pub mkvmerge_bin: PathBuf,
    /// Path to mkvextract
    pub mkvextract_bin: PathBuf,
    /// Path to the SubtitleEdit command line
    pub subtitle_edit_bin: PathBuf,
    /// Path to ffmpeg
    pub ffmpeg_bin: PathBuf,
    /// Directory (under the input dir) for extracted and converted subtitles
    pub subs_dir_name: String,
    /// Directory (under the input dir) for remuxed containers
    pub filtered_dir_name: String,
    /// Directory (under the input dir) for re-encoded containers
    pub reencoded_dir_name: String,
    /// Container extensions picked up by the directory scan
    pub container_extensions: Vec<String>,
    /// Extension given to the raw extracted subtitle stream
    pub extracted_subtitle_extension: String,
    /// Extension the converter writes
    pub converted_subtitle_extension: String,
    /// SubtitleEdit target format name
    pub subtitle_format: String,
    pub keywords: SelectionKeywords,
    pub encode: EncodeSettings,
    pub on_failure: FailurePolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::default_config()
    }
}

impl PipelineConfig {
    /// Create a default configuration matching the usual toolchain layout
    pub fn default_config() -> Self {
        Self {
            mkvmerge_bin: PathBuf::from("mkvmerge"),
            mkvextract_bin: PathBuf::from("mkvextract"),
            subtitle_edit_bin: PathBuf::from("SubtitleEdit"),
            ffmpeg_bin: PathBuf::from("ffmpeg"),
            subs_dir_name: "1_converted_subs".to_string(),
            filtered_dir_name: "2_filtered_video".to_string(),
            reencoded_dir_name: "3_converted_video".to_string(),
            container_extensions: vec!["mkv".to_string()],
            extracted_subtitle_extension: "sup".to_string(),
            converted_subtitle_extension: "ass".to_string(),
            subtitle_format: "AdvancedSubStationAlpha".to_string(),
            keywords: SelectionKeywords::default(),
            encode: EncodeSettings::default(),
            on_failure: FailurePolicy::Abort,
        }
    }

    /// Load configuration from a file, or return defaults if path is None or file doesn't exist
    pub fn load_config(path: Option<&Path>) -> Result<Self> {
        let mut config = Self::default_config();

        if let Some(config_path) = path {
            if config_path.exists() {
                let content = std::fs::read_to_string(config_path)
                    .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

                // TOML by extension, JSON otherwise
                if config_path.extension().and_then(|s| s.to_str()) == Some("toml") {
                    config = toml::from_str(&content)
                        .with_context(|| format!("Failed to parse TOML config: {}", config_path.display()))?;
                } else {
                    config = serde_json::from_str(&content)
                        .with_context(|| format!("Failed to parse JSON config: {}", config_path.display()))?;
                }
            }
        }

        Ok(config)
    }
}
