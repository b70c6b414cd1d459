use std::ffi::OsString;
use std::path::Path;

use crate::config::PipelineConfig;
use crate::runner::Invocation;

/// Builds the command lines for each external tool
pub struct CommandBuilder<'a> {
    cfg: &'a PipelineConfig,
}

impl<'a> CommandBuilder<'a> {
    pub fn new(cfg: &'a PipelineConfig) -> Self {
        Self { cfg }
    }

    /// `mkvextract tracks <source> <track>:<output>`
    pub fn extract_subtitles(&self, source: &Path, track_id: u64, output: &Path) -> Invocation {
        let mut target = OsString::from(format!("{}:", track_id));
        target.push(output);
        Invocation::new(&self.cfg.mkvextract_bin)
            .arg("tracks")
            .path_arg(source)
            .arg(target)
    }

    /// SubtitleEdit converts in place: it is run from the subtitle's directory
    /// and writes `<stem>.<format ext>` next to the input.
    pub fn convert_subtitles(&self, input: &Path, overwrite: bool) -> Invocation {
        let name = input.file_name().unwrap_or(input.as_os_str());

        let mut inv = Invocation::new(&self.cfg.subtitle_edit_bin)
            .arg("/convert")
            .arg(name)
            .arg(&self.cfg.subtitle_format);
        if overwrite {
            inv = inv.arg("/overwrite");
        }
        if let Some(dir) = input.parent() {
            inv = inv.current_dir(dir);
        }
        inv
    }

    /// Keep the selected video and audio, drop all original subtitles, and add
    /// the converted subtitle file as a default + forced track.
    pub fn remux(
        &self,
        source: &Path,
        subtitle: &Path,
        video_id: u64,
        audio_id: u64,
        output: &Path,
    ) -> Invocation {
        Invocation::new(&self.cfg.mkvmerge_bin)
            .arg("-o")
            .path_arg(output)
            .arg("--video-tracks")
            .arg(video_id.to_string())
            .arg("--audio-tracks")
            .arg(audio_id.to_string())
            .arg("--no-subtitles")
            .arg("--default-track")
            .arg(format!("{}:yes", audio_id))
            .path_arg(source)
            // options bind to the next file: these describe track 0 of the subtitle file
            .arg("--default-track")
            .arg("0:yes")
            .arg("--forced-track")
            .arg("0:yes")
            .path_arg(subtitle)
    }

    /// Re-encode video and audio, copy subtitles, drop attachments
    pub fn reencode(&self, input: &Path, output: &Path) -> Invocation {
        let enc = &self.cfg.encode;
        Invocation::new(&self.cfg.ffmpeg_bin)
            .arg("-y")
            .arg("-i")
            .path_arg(input)
            // first video stream, every audio and subtitle stream, no attachments
            .arg("-map")
            .arg("0:v:0")
            .arg("-map")
            .arg("0:a")
            .arg("-map")
            .arg("0:s")
            .arg("-map")
            .arg("-0:t")
            .arg("-c:v")
            .arg(enc.video_codec.clone())
            .arg("-pix_fmt")
            .arg(enc.pixel_format.clone())
            .arg("-preset")
            .arg(enc.preset.clone())
            .arg("-crf")
            .arg(enc.crf.to_string())
            .arg("-c:a")
            .arg(enc.audio_codec.clone())
            .arg("-b:a")
            .arg(enc.audio_bitrate.clone())
            .arg("-c:s")
            .arg("copy")
            .path_arg(output)
    }
}
