//! Delivery of encoded exports.
//!
//! A [`RasterSink`] takes the encoded bytes of an export and puts them
//! somewhere: a file, the clipboard, memory. [`FallbackSink`] chains a
//! primary sink with an optional fallback (clipboard, then download).

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::{RenderError, RenderResult};

/// Destination for encoded export bytes.
#[async_trait]
pub trait RasterSink: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Deliver the bytes. Returns a description of where they went.
    ///
    /// # Errors
    ///
    /// Returns an error if the destination refused or failed the write.
    async fn deliver(&self, bytes: &[u8]) -> RenderResult<String>;
}

/// Writes each delivery to `<dir>/<prefix>-<unix-seconds>.<extension>`.
///
/// Existing files are never overwritten: a second delivery within the same
/// second goes to `<prefix>-<unix-seconds>-1.<extension>`, and so on.
#[derive(Debug, Clone)]
pub struct FileSink {
    dir: PathBuf,
    prefix: String,
    extension: String,
}

impl FileSink {
    /// Sink writing `prostate-report-<secs>.png` files into `dir`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            prefix: "prostate-report".to_string(),
            extension: "png".to_string(),
        }
    }

    /// Use a different file name prefix.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Use a different file extension (without the dot).
    #[must_use]
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    /// Target directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File name for a delivery at `secs` since the Unix epoch.
    #[must_use]
    pub fn file_name(&self, secs: u64) -> String {
        format!("{}-{secs}.{}", self.prefix, self.extension)
    }

    /// File name for the `attempt`-th delivery within the same second;
    /// attempt 0 is [`file_name`](Self::file_name).
    #[must_use]
    pub fn numbered_file_name(&self, secs: u64, attempt: u32) -> String {
        if attempt == 0 {
            self.file_name(secs)
        } else {
            format!("{}-{secs}-{attempt}.{}", self.prefix, self.extension)
        }
    }

    /// Create a file that does not exist yet, numbering the name past any
    /// existing ones.
    async fn create_unique(&self, secs: u64) -> RenderResult<(PathBuf, tokio::fs::File)> {
        for attempt in 0..MAX_NAME_ATTEMPTS {
            let path = self.dir.join(self.numbered_file_name(secs, attempt));
            match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => return Ok((path, file)),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    tracing::trace!("{} exists, trying the next name", path.display());
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(RenderError::Sink(format!(
            "no free file name for {} after {MAX_NAME_ATTEMPTS} attempts",
            self.file_name(secs)
        )))
    }
}

/// Numbered names tried per second before a file delivery gives up.
const MAX_NAME_ATTEMPTS: u32 = 1000;

#[async_trait]
impl RasterSink for FileSink {
    fn name(&self) -> &str {
        "file"
    }

    async fn deliver(&self, bytes: &[u8]) -> RenderResult<String> {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| RenderError::Sink(format!("system clock before Unix epoch: {e}")))?
            .as_secs();
        tokio::fs::create_dir_all(&self.dir).await?;
        let (path, mut file) = self.create_unique(secs).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        tracing::info!("Wrote {} bytes to {}", bytes.len(), path.display());
        Ok(path.display().to_string())
    }
}

/// Keeps the last delivery in memory, like a clipboard.
///
/// Can be created "unsupported" to stand in for a platform without
/// clipboard access.
#[derive(Debug, Default)]
pub struct MemorySink {
    contents: Mutex<Option<Vec<u8>>>,
    unsupported: bool,
}

impl MemorySink {
    /// A working in-memory sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink that rejects every delivery.
    #[must_use]
    pub fn unsupported() -> Self {
        Self {
            contents: Mutex::new(None),
            unsupported: true,
        }
    }

    /// Bytes of the last successful delivery.
    pub async fn contents(&self) -> Option<Vec<u8>> {
        self.contents.lock().await.clone()
    }
}

#[async_trait]
impl RasterSink for MemorySink {
    fn name(&self) -> &str {
        "memory"
    }

    async fn deliver(&self, bytes: &[u8]) -> RenderResult<String> {
        if self.unsupported {
            return Err(RenderError::Sink(
                "clipboard not supported on this platform".to_string(),
            ));
        }
        *self.contents.lock().await = Some(bytes.to_vec());
        tracing::info!("Copied {} bytes to memory", bytes.len());
        Ok("memory".to_string())
    }
}

/// Which sink of a [`FallbackSink`] took the delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// The primary sink succeeded; carries its description.
    Primary(String),
    /// The primary failed and the fallback succeeded; carries its description.
    Fallback(String),
}

/// Tries a primary sink, then an optional fallback. No retries.
pub struct FallbackSink {
    primary: Box<dyn RasterSink>,
    fallback: Option<Box<dyn RasterSink>>,
}

impl FallbackSink {
    /// Chain `primary` with an optional `fallback`.
    #[must_use]
    pub fn new(primary: Box<dyn RasterSink>, fallback: Option<Box<dyn RasterSink>>) -> Self {
        Self { primary, fallback }
    }

    /// Deliver to the primary sink, falling back once on failure.
    ///
    /// # Errors
    ///
    /// Returns the primary's error if there is no fallback, or the
    /// fallback's error if both fail.
    pub async fn deliver(&self, bytes: &[u8]) -> RenderResult<Delivery> {
        match self.primary.deliver(bytes).await {
            Ok(description) => Ok(Delivery::Primary(description)),
            Err(primary_err) => {
                let Some(fallback) = &self.fallback else {
                    return Err(primary_err);
                };
                tracing::warn!(
                    "{} sink failed ({primary_err}); falling back to {}",
                    self.primary.name(),
                    fallback.name()
                );
                fallback.deliver(bytes).await.map(Delivery::Fallback)
            }
        }
    }
}

impl std::fmt::Debug for FallbackSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackSink")
            .field("primary", &self.primary.name())
            .field("fallback", &self.fallback.as_ref().map(|s| s.name()))
            .finish()
    }
}
