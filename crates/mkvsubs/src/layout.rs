use std::fs;
use std::path::{Path, PathBuf};

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};

/// Working directories of a batch run, all siblings under the input directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkDirs {
    /// Extracted `.sup` and converted `.ass` subtitles
    pub subs: PathBuf,
    /// Remuxed containers
    pub filtered: PathBuf,
    /// Re-encoded containers
    pub reencoded: PathBuf,
    extracted_ext: String,
    converted_ext: String,
}

impl WorkDirs {
    pub fn new(input_dir: &Path, cfg: &PipelineConfig) -> Self {
        Self {
            subs: input_dir.join(&cfg.subs_dir_name),
            filtered: input_dir.join(&cfg.filtered_dir_name),
            reencoded: input_dir.join(&cfg.reencoded_dir_name),
            extracted_ext: cfg.extracted_subtitle_extension.clone(),
            converted_ext: cfg.converted_subtitle_extension.clone(),
        }
    }

    /// Create all three directories; existing ones are left alone
    pub fn create_all(&self) -> Result<()> {
        for dir in [&self.subs, &self.filtered, &self.reencoded] {
            fs::create_dir_all(dir).map_err(|e| PipelineError::io(dir, e))?;
        }
        Ok(())
    }

    /// `<subs>/<stem>.sup` for a source container
    pub fn extracted_subtitle_path(&self, source: &Path) -> PathBuf {
        self.subs.join(file_name(source)).with_extension(&self.extracted_ext)
    }

    /// The converted file sits next to the extracted one
    pub fn converted_subtitle_path(&self, extracted: &Path) -> PathBuf {
        extracted.with_extension(&self.converted_ext)
    }

    /// `<filtered>/<name>` for a source container
    pub fn remuxed_path(&self, source: &Path) -> PathBuf {
        self.filtered.join(file_name(source))
    }

    /// `<reencoded>/<name>` for a remuxed container
    pub fn reencoded_path(&self, remuxed: &Path) -> PathBuf {
        self.reencoded.join(file_name(remuxed))
    }
}

fn file_name(path: &Path) -> &std::ffi::OsStr {
    path.file_name().unwrap_or(path.as_os_str())
}
