use std::path::{Path, PathBuf};
use log::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};

/// List the container files directly inside `dir`, sorted by file name
///
/// Subdirectories (including the pipeline's own working directories) are
/// never descended into.
pub fn scan_directory(dir: &Path, cfg: &PipelineConfig) -> Result<Vec<PathBuf>> {
    let extensions: Vec<String> = cfg
        .container_extensions
        .iter()
        .map(|e| e.trim_start_matches('.').to_lowercase())
        .collect();

    info!("Scanning directory: {}", dir.display());

    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name();

    let mut files = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                // the directory itself being unreadable is fatal, a single entry is not
                if e.depth() == 0 {
                    let source = e
                        .into_io_error()
                        .unwrap_or_else(|| std::io::Error::other("directory walk failed"));
                    return Err(PipelineError::io(dir, source));
                }
                warn!("Error reading directory entry: {}", e);
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_lowercase());

        match ext {
            Some(ext) if extensions.contains(&ext) => {
                debug!("Found container: {}", path.display());
                files.push(path.to_path_buf());
            }
            _ => continue,
        }
    }

    info!("Scan complete: {} container file(s)", files.len());
    Ok(files)
}
