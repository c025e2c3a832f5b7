use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::Context as _;
use async_trait::async_trait;
use chrono::Utc;
use regex::Regex;
use serde::Serialize;
use tokio::fs;

use crate::formats::SlideOutline;

static UNSAFE_FILE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9가-힣]").expect("file name regex is valid"));

/// Turns a parsed outline into a file on local disk.
#[async_trait]
pub trait ArtifactBuilder: Send + Sync {
    /// Writes the artifact and returns its temporary path.
    async fn build(&self, slides: &[SlideOutline], topic: &str) -> anyhow::Result<PathBuf>;
}

/// Moves a built artifact to its final location.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn persist(&self, temp_path: &Path, generation_id: &str) -> anyhow::Result<PathBuf>;
}

#[derive(Debug, Serialize)]
struct OutlineDocument<'a> {
    topic: &'a str,
    generated_at: chrono::DateTime<Utc>,
    slide_count: usize,
    slides: &'a [SlideOutline],
}

/// Writes the outline as pretty JSON into a temp directory.
#[derive(Debug, Clone)]
pub struct JsonOutlineBuilder {
    temp_dir: PathBuf,
}

impl JsonOutlineBuilder {
    pub fn new(temp_dir: impl Into<PathBuf>) -> Self {
        Self {
            temp_dir: temp_dir.into(),
        }
    }
}

impl Default for JsonOutlineBuilder {
    fn default() -> Self {
        Self::new(std::env::temp_dir().join("slidecraft"))
    }
}

/// `<topic>_<millis>` with anything outside ASCII alphanumerics and Hangul
/// replaced by `_`.
pub fn artifact_stem(topic: &str) -> String {
    let safe = UNSAFE_FILE_CHARS.replace_all(topic.trim(), "_");
    format!("{safe}_{}", Utc::now().timestamp_millis())
}

#[async_trait]
impl ArtifactBuilder for JsonOutlineBuilder {
    async fn build(&self, slides: &[SlideOutline], topic: &str) -> anyhow::Result<PathBuf> {
        fs::create_dir_all(&self.temp_dir)
            .await
            .with_context(|| format!("create temp dir: {}", self.temp_dir.display()))?;

        let document = OutlineDocument {
            topic,
            generated_at: Utc::now(),
            slide_count: slides.len(),
            slides,
        };
        let data = serde_json::to_vec_pretty(&document).context("serialize outline json")?;

        let temp_dir = self.temp_dir.clone();
        let stem = artifact_stem(topic);
        let path = tokio::task::spawn_blocking(move || -> anyhow::Result<PathBuf> {
            let file = tempfile::Builder::new()
                .prefix(&format!("{stem}."))
                .suffix(".json")
                .tempfile_in(&temp_dir)
                .with_context(|| format!("create temp file in {}", temp_dir.display()))?;
            std::fs::write(file.path(), &data)
                .with_context(|| format!("write outline: {}", file.path().display()))?;
            let (_, path) = file.keep().context("keep outline temp file")?;
            Ok(path)
        })
        .await
        .context("join outline writer task")??;

        tracing::debug!(path = %path.display(), slides = slides.len(), "built outline artifact");
        Ok(path)
    }
}

/// Stores artifacts under `<base_dir>/presentations/<id>_<timestamp>.<ext>`.
#[derive(Debug, Clone)]
pub struct LocalFsArtifactStore {
    base_dir: PathBuf,
}

impl LocalFsArtifactStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn presentations_dir(&self) -> PathBuf {
        self.base_dir.join("presentations")
    }
}

#[async_trait]
impl ArtifactStore for LocalFsArtifactStore {
    async fn persist(&self, temp_path: &Path, generation_id: &str) -> anyhow::Result<PathBuf> {
        let dir = self.presentations_dir();
        fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("create presentations dir: {}", dir.display()))?;

        let extension = temp_path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("bin");
        let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
        let target = dir.join(format!("{generation_id}_{timestamp}.{extension}"));

        fs::copy(temp_path, &target).await.with_context(|| {
            format!(
                "copy artifact {} -> {}",
                temp_path.display(),
                target.display()
            )
        })?;
        if let Err(err) = fs::remove_file(temp_path).await {
            tracing::warn!(path = %temp_path.display(), error = %err, "failed to remove temp artifact");
        }

        Ok(target)
    }
}
