// trkf_sim/src/simulation/config/catalog.rs

//! Discovery of scenario files on disk.

use crate::simulation::error::{SimError, SimResult};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

/// Every `.toml` file under `dir`, sorted by path.
///
/// A missing directory yields an empty list.
pub fn discover_scenarios(dir: &Path) -> SimResult<Vec<PathBuf>> {
    if !dir.exists() {
        warn!("Scenario directory not found at {:?}", dir);
        return Ok(Vec::new());
    }

    let mut found = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|source| SimError::Discovery {
            path: dir.to_path_buf(),
            source,
        })?;
        let is_toml = entry.path().extension().map_or(false, |ext| ext == "toml");
        if entry.file_type().is_file() && is_toml {
            found.push(entry.into_path());
        }
    }

    info!("Found {} scenario(s) under {:?}", found.len(), dir);
    Ok(found)
}
