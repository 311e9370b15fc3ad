//! Resource fetching
//!
//! Delivery of the audio bytes is the host application's business; the engine
//! only needs something that turns a source URL into bytes. `FileFetcher`
//! covers local paths and `file://` URLs, and any `Fn(&str) -> Result<Vec<u8>, _>`
//! closure works as a fetcher too.

use crate::error::AnalysisError;
use std::path::{Path, PathBuf};

/// Turns a source URL into the raw bytes of an encoded audio resource
///
/// Implementations are called from the loader thread, never from the frame loop.
pub trait ResourceFetcher: Send + Sync {
    /// Fetch the complete resource
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::FetchError` if the resource cannot be retrieved.
    fn fetch(&self, url: &str) -> Result<Vec<u8>, AnalysisError>;
}

impl<F> ResourceFetcher for F
where
    F: Fn(&str) -> Result<Vec<u8>, AnalysisError> + Send + Sync,
{
    fn fetch(&self, url: &str) -> Result<Vec<u8>, AnalysisError> {
        self(url)
    }
}

/// Reads resources from the local filesystem
#[derive(Debug, Clone, Default)]
pub struct FileFetcher {
    root: Option<PathBuf>,
}

impl FileFetcher {
    /// Fetcher resolving paths as given
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetcher resolving relative paths against `root`
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    fn resolve(&self, url: &str) -> PathBuf {
        let path = Path::new(url.strip_prefix("file://").unwrap_or(url));
        match &self.root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }
}

impl ResourceFetcher for FileFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, AnalysisError> {
        let path = self.resolve(url);
        log::debug!("Reading audio resource from {}", path.display());
        std::fs::read(&path)
            .map_err(|e| AnalysisError::FetchError(format!("{}: {}", path.display(), e)))
    }
}

/// File extension of a URL, ignoring query string and fragment
///
/// Used as a format hint for the decoder.
pub fn extension_hint(url: &str) -> Option<String> {
    let end = url.find(['?', '#']).unwrap_or(url.len());
    let path = &url[..end];
    let name = path.rsplit('/').next()?;
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_hint() {
        assert_eq!(extension_hint("song.mp3").as_deref(), Some("mp3"));
        assert_eq!(
            extension_hint("https://cdn.example.com/a/b/Track.WAV?sig=1#t=3").as_deref(),
            Some("wav")
        );
        assert_eq!(extension_hint("https://cdn.example.com/stream"), None);
        assert_eq!(extension_hint(".hidden"), None);
    }

    #[test]
    fn test_file_fetcher_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.bin");
        std::fs::write(&path, [1u8, 2, 3]).unwrap();

        let fetcher = FileFetcher::new();
        let url = format!("file://{}", path.display());
        assert_eq!(fetcher.fetch(&url).unwrap(), vec![1, 2, 3]);

        let rooted = FileFetcher::with_root(dir.path());
        assert_eq!(rooted.fetch("clip.bin").unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_file_fetcher_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = FileFetcher::with_root(dir.path());
        let err = fetcher.fetch("nope.wav").unwrap_err();
        assert!(matches!(err, AnalysisError::FetchError(_)));
    }

    #[test]
    fn test_closure_fetcher() {
        let fetcher = |url: &str| -> Result<Vec<u8>, AnalysisError> { Ok(url.as_bytes().to_vec()) };
        assert_eq!(fetcher.fetch("ab").unwrap(), b"ab".to_vec());
    }
}
