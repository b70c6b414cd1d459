use std::cmp::Reverse;
use log::{debug, info};

use crate::config::SelectionKeywords;
use crate::error::SelectionError;
use crate::mkvinfo::{MediaInfo, TrackInfo, TrackType};

/// The track ids the rest of the pipeline works with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackSelection {
    pub video_id: u64,
    pub audio_id: u64,
    pub subtitle_id: u64,
}

/// Picks one video, one audio and one subtitle track out of a listing
///
/// Works purely on the metadata mkvmerge reports: names and language tags
/// are matched case-insensitively against the configured keywords, subtitle
/// content is never looked at.
#[derive(Debug, Clone, Default)]
pub struct TrackSelector {
    keywords: SelectionKeywords,
}

impl TrackSelector {
    pub fn new(keywords: SelectionKeywords) -> Self {
        Self {
            keywords: SelectionKeywords {
                audio_name: keywords.audio_name.to_lowercase(),
                subtitle_language: keywords.subtitle_language.to_lowercase(),
                subtitle_name: keywords.subtitle_name.to_lowercase(),
            },
        }
    }

    pub fn select(&self, info: &MediaInfo) -> Result<TrackSelection, SelectionError> {
        let video = self.select_video(info)?;
        let audio = self.select_audio(info)?;
        let subtitle = self.select_subtitle(info)?;

        let selection = TrackSelection {
            video_id: video.id,
            audio_id: audio.id,
            subtitle_id: subtitle.id,
        };
        info!(
            "Selected tracks: video={}, audio={} ({}), subtitles={} ({})",
            selection.video_id,
            selection.audio_id,
            describe(audio),
            selection.subtitle_id,
            describe(subtitle)
        );
        Ok(selection)
    }

    /// Exactly one video track, no disambiguation
    fn select_video<'a>(&self, info: &'a MediaInfo) -> Result<&'a TrackInfo, SelectionError> {
        let candidates: Vec<&TrackInfo> = info.tracks_of(TrackType::Video).collect();
        exactly_one(TrackType::Video, candidates)
    }

    fn select_audio<'a>(&self, info: &'a MediaInfo) -> Result<&'a TrackInfo, SelectionError> {
        let mut candidates: Vec<&TrackInfo> = info.tracks_of(TrackType::Audio).collect();
        if candidates.len() > 1 {
            candidates.retain(|t| contains_ci(t.track_name.as_deref(), &self.keywords.audio_name));
            debug!("{} audio track(s) named like '{}'", candidates.len(), self.keywords.audio_name);
        }
        exactly_one(TrackType::Audio, candidates)
    }

    fn select_subtitle<'a>(&self, info: &'a MediaInfo) -> Result<&'a TrackInfo, SelectionError> {
        let mut candidates: Vec<&TrackInfo> = info.tracks_of(TrackType::Subtitles).collect();
        if candidates.len() > 1 {
            candidates.retain(|t| {
                contains_ci(t.language.as_deref(), &self.keywords.subtitle_language)
                    || contains_ci(t.track_name.as_deref(), &self.keywords.subtitle_name)
            });
            debug!("{} subtitle track(s) look English", candidates.len());
        }
        if candidates.len() > 1 {
            // min_by_key keeps the first of equal keys, so ties go to input order
            candidates = candidates
                .into_iter()
                .min_by_key(|t| Reverse(t.index_entry_count))
                .into_iter()
                .collect();
        }
        exactly_one(TrackType::Subtitles, candidates)
    }
}

/// Select tracks with the default keywords
pub fn select_tracks(info: &MediaInfo) -> Result<TrackSelection, SelectionError> {
    TrackSelector::default().select(info)
}

fn exactly_one(kind: TrackType, candidates: Vec<&TrackInfo>) -> Result<&TrackInfo, SelectionError> {
    match candidates.as_slice() {
        [] => Err(SelectionError::NoTrack(kind)),
        [only] => Ok(*only),
        many => Err(SelectionError::AmbiguousTrack {
            kind,
            count: many.len(),
        }),
    }
}

/// `needle` must already be lowercase; absent metadata counts as empty
fn contains_ci(haystack: Option<&str>, needle: &str) -> bool {
    haystack.unwrap_or("").to_lowercase().contains(needle)
}

fn describe(track: &TrackInfo) -> String {
    match (&track.track_name, &track.language) {
        (Some(name), Some(lang)) => format!("{}, {}", name, lang),
        (Some(name), None) => name.clone(),
        (None, Some(lang)) => lang.clone(),
        (None, None) => "unnamed".to_string(),
    }
}
