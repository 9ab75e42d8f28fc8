use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use crate::shared::constants::{
    APP_DIR_NAME, EXPRESSION_MANIFEST, EXPRESSION_WEIGHTS, FACE_DETECTOR_MANIFEST,
    FACE_DETECTOR_WEIGHTS, MODEL_BASE_URL,
};

#[derive(Error, Debug)]
pub enum ModelResolveError {
    #[error("failed to create cache directory: {0}")]
    CacheDir(#[source] std::io::Error),
    #[error("download failed for {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to write model to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not determine cache directory")]
    NoCacheDir,
}

/// Progress callback: `(bytes_downloaded, total_bytes)`.
/// `total_bytes` is 0 if the server didn't provide Content-Length.
pub type ProgressFn = Box<dyn Fn(u64, u64) + Send>;

/// Per-file progress callback used when resolving a whole model set:
/// `(file_name, bytes_downloaded, total_bytes)`.
pub type SetProgressFn = Arc<dyn Fn(&str, u64, u64) + Send + Sync>;

/// Local paths of the face detector and expression classifier weights.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExpressionModelPaths {
    pub detector_manifest: PathBuf,
    pub detector_weights: PathBuf,
    pub expression_manifest: PathBuf,
    pub expression_weights: PathBuf,
}

/// Resolve a model file by name, checking cache locations before downloading.
///
/// Resolution order:
/// 1. User cache directory (platform-specific)
/// 2. Bundled path (for development / pre-packaged installs)
/// 3. Download from URL to cache
pub fn resolve(
    name: &str,
    url: &str,
    bundled_dir: Option<&Path>,
    progress: Option<ProgressFn>,
) -> Result<PathBuf, ModelResolveError> {
    resolve_in(&model_cache_dir()?, name, url, bundled_dir, progress)
}

/// [`resolve`] against an explicit cache directory.
pub fn resolve_in(
    cache_dir: &Path,
    name: &str,
    url: &str,
    bundled_dir: Option<&Path>,
    progress: Option<ProgressFn>,
) -> Result<PathBuf, ModelResolveError> {
    let cached_path = cache_dir.join(name);
    if cached_path.exists() {
        return Ok(cached_path);
    }

    if let Some(dir) = bundled_dir {
        let bundled_path = dir.join(name);
        if bundled_path.exists() {
            return Ok(bundled_path);
        }
    }

    fs::create_dir_all(cache_dir).map_err(ModelResolveError::CacheDir)?;
    log::info!("Downloading {name}");
    download(url, &cached_path, progress)?;
    Ok(cached_path)
}

/// Resolves the tiny face detector and the expression network, downloading
/// whatever is not cached yet from the public weights CDN.
pub fn resolve_expression_models(
    bundled_dir: Option<&Path>,
    progress: Option<SetProgressFn>,
) -> Result<ExpressionModelPaths, ModelResolveError> {
    resolve_expression_models_in(&model_cache_dir()?, MODEL_BASE_URL, bundled_dir, progress)
}

fn resolve_expression_models_in(
    cache_dir: &Path,
    base_url: &str,
    bundled_dir: Option<&Path>,
    progress: Option<SetProgressFn>,
) -> Result<ExpressionModelPaths, ModelResolveError> {
    let fetch = |name: &'static str| {
        let file_progress: Option<ProgressFn> = progress.clone().map(|cb| {
            Box::new(move |downloaded: u64, total: u64| cb(name, downloaded, total)) as ProgressFn
        });
        resolve_in(
            cache_dir,
            name,
            &format!("{base_url}{name}"),
            bundled_dir,
            file_progress,
        )
    };

    Ok(ExpressionModelPaths {
        detector_manifest: fetch(FACE_DETECTOR_MANIFEST)?,
        detector_weights: fetch(FACE_DETECTOR_WEIGHTS)?,
        expression_manifest: fetch(EXPRESSION_MANIFEST)?,
        expression_weights: fetch(EXPRESSION_WEIGHTS)?,
    })
}

/// Platform-specific model cache directory.
///
/// - macOS: `~/Library/Application Support/FaceMood/models/`
/// - Linux: `$XDG_CACHE_HOME/FaceMood/models/` or `~/.cache/FaceMood/models/`
/// - Windows: `%LOCALAPPDATA%/FaceMood/models/`
pub fn model_cache_dir() -> Result<PathBuf, ModelResolveError> {
    #[cfg(target_os = "macos")]
    {
        dirs::data_dir()
            .map(|d| d.join(APP_DIR_NAME).join("models"))
            .ok_or(ModelResolveError::NoCacheDir)
    }
    #[cfg(not(target_os = "macos"))]
    {
        dirs::cache_dir()
            .map(|d| d.join(APP_DIR_NAME).join("models"))
            .ok_or(ModelResolveError::NoCacheDir)
    }
}

fn download(url: &str, dest: &Path, progress: Option<ProgressFn>) -> Result<(), ModelResolveError> {
    let temp_path = dest.with_extension("part");

    let result = download_inner(url, dest, &temp_path, progress);

    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }

    result
}

fn download_inner(
    url: &str,
    dest: &Path,
    temp_path: &Path,
    progress: Option<ProgressFn>,
) -> Result<(), ModelResolveError> {
    let write_err = |path: &Path| {
        let path = path.to_path_buf();
        move |e: std::io::Error| ModelResolveError::Write { path, source: e }
    };

    let mut response = reqwest::blocking::get(url)
        .and_then(|r| r.error_for_status())
        .map_err(|e| ModelResolveError::Download {
            url: url.to_string(),
            source: e,
        })?;

    let total = response.content_length().unwrap_or(0);
    let mut downloaded: u64 = 0;

    let mut file = fs::File::create(temp_path).map_err(write_err(temp_path))?;

    let mut buf = vec![0u8; 256 * 1024];
    loop {
        let n = response.read(&mut buf).map_err(write_err(temp_path))?;
        if n == 0 {
            break;
        }
        file.write_all(&buf[..n]).map_err(write_err(temp_path))?;
        downloaded += n as u64;
        if let Some(ref cb) = progress {
            cb(downloaded, total);
        }
    }

    file.flush().map_err(write_err(temp_path))?;
    drop(file);

    fs::rename(temp_path, dest).map_err(write_err(dest))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tempfile::TempDir;

    const UNREACHABLE: &str = "http://invalid.nonexistent.example.com/";

    #[test]
    fn test_resolve_prefers_cached_file() {
        let tmp = TempDir::new().unwrap();
        let cache = tmp.path().join("cache");
        let bundled = tmp.path().join("bundled");
        fs::create_dir_all(&cache).unwrap();
        fs::create_dir_all(&bundled).unwrap();
        fs::write(cache.join("model.json"), b"cached").unwrap();
        fs::write(bundled.join("model.json"), b"bundled").unwrap();

        let path = resolve_in(&cache, "model.json", UNREACHABLE, Some(&bundled), None).unwrap();

        assert_eq!(path, cache.join("model.json"));
    }

    #[test]
    fn test_resolve_falls_back_to_bundled_file() {
        let tmp = TempDir::new().unwrap();
        let cache = tmp.path().join("cache");
        let bundled = tmp.path().join("bundled");
        fs::create_dir_all(&bundled).unwrap();
        fs::write(bundled.join("model.json"), b"bundled").unwrap();

        let path = resolve_in(&cache, "model.json", UNREACHABLE, Some(&bundled), None).unwrap();

        assert_eq!(path, bundled.join("model.json"));
        assert_eq!(fs::read(&path).unwrap(), b"bundled");
    }

    #[test]
    fn test_resolve_set_uses_bundled_files() {
        let tmp = TempDir::new().unwrap();
        let bundled = tmp.path().join("weights");
        fs::create_dir_all(&bundled).unwrap();
        for name in [
            FACE_DETECTOR_MANIFEST,
            FACE_DETECTOR_WEIGHTS,
            EXPRESSION_MANIFEST,
            EXPRESSION_WEIGHTS,
        ] {
            fs::write(bundled.join(name), b"w").unwrap();
        }

        let paths = resolve_expression_models_in(
            &tmp.path().join("cache"),
            UNREACHABLE,
            Some(&bundled),
            None,
        )
        .unwrap();

        assert_eq!(paths.detector_manifest, bundled.join(FACE_DETECTOR_MANIFEST));
        assert_eq!(paths.expression_weights, bundled.join(EXPRESSION_WEIGHTS));
    }

    #[test]
    fn test_resolve_set_fails_when_download_fails() {
        let tmp = TempDir::new().unwrap();
        let called = Arc::new(AtomicBool::new(false));
        let flag = called.clone();
        let progress: SetProgressFn = Arc::new(move |_: &str, _: u64, _: u64| {
            flag.store(true, Ordering::SeqCst)
        });

        let result = resolve_expression_models_in(
            &tmp.path().join("cache"),
            UNREACHABLE,
            None,
            Some(progress),
        );

        assert!(matches!(result, Err(ModelResolveError::Download { .. })));
        assert!(!called.load(Ordering::SeqCst));
    }

    #[test]
    fn test_model_cache_dir_returns_path() {
        let path = model_cache_dir().unwrap();
        assert!(path.to_string_lossy().contains(APP_DIR_NAME));
        assert!(path.to_string_lossy().contains("models"));
    }

    #[test]
    fn test_download_atomic_no_partial_on_failure() {
        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("model.json");
        let result = download("http://invalid.nonexistent.example.com/model", &dest, None);
        assert!(result.is_err());
        assert!(!dest.exists());
        assert!(!dest.with_extension("part").exists());
    }
}
