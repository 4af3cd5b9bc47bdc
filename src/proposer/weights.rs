//! Locating model weights, downloading them when absent.

use crate::config::ProposerSettings;
use crate::error::{DetectError, Result};
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::info;

/// Path to usable weights: the configured file if present, otherwise a
/// fresh download from `model_url`.
pub fn ensure_weights(settings: &ProposerSettings) -> Result<PathBuf> {
    let path = &settings.model_path;
    if path.is_file() {
        return Ok(path.clone());
    }
    let Some(url) = settings.model_url.as_deref() else {
        return Err(DetectError::ModelLoad(format!(
            "weights not found at {} and no model_url configured",
            path.display()
        )));
    };
    download(url, path)?;
    Ok(path.clone())
}

/// Fetch `url` into `dest` via a sibling `.part` file
fn download(url: &str, dest: &Path) -> Result<()> {
    let fail = |what: &str, err: &dyn std::fmt::Display| {
        DetectError::ModelLoad(format!("{what} {}: {err}", dest.display()))
    };

    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| fail("cannot create directory for", &e))?;
    }

    info!("Downloading region model from {url}");
    let response = ureq::get(url)
        .call()
        .map_err(|e| DetectError::ModelLoad(format!("download from {url} failed: {e}")))?;

    let partial = dest.with_extension("part");
    let mut out = File::create(&partial).map_err(|e| fail("cannot create", &e))?;
    if let Err(e) = std::io::copy(&mut response.into_reader(), &mut out) {
        let _ = std::fs::remove_file(&partial);
        return Err(fail("interrupted download of", &e));
    }
    drop(out);
    std::fs::rename(&partial, dest).map_err(|e| fail("cannot move weights into", &e))?;
    info!("Region model saved to {}", dest.display());
    Ok(())
}
