//! Chunked persistence of documents.
//!
//! A document is saved as several named JSON artifacts:
//!
//! | Artifact | Contents | Required on load |
//! |----------|----------|------------------|
//! | `<id>.meta` | everything except the objects, plus the object count | yes |
//! | `<id>.objects` | every top-level record | yes |
//! | `<id>.text`, `.image`, `.shape`, `.line` | top-level records of one family | no |
//!
//! Per-kind artifacts only speed up selective reads through
//! [`ChunkedStorage::load_kind`].

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};

use crate::diagnostics::Diagnostics;
use crate::document::{parse_records, CanvasSize, Document, Metadata};
use crate::error::{CoreError, CoreResult};
use crate::record::{DrawableRecord, KindFamily};

/// Narrow interface to the external persistence service.
#[async_trait]
pub trait Persistence: Send + Sync {
    /// Store `json` under `name`, replacing any previous value.
    async fn save(&self, name: &str, json: &str) -> CoreResult<()>;

    /// Fetch the value stored under `name`, or `None` if there is none.
    async fn load(&self, name: &str) -> CoreResult<Option<String>>;

    /// Delete `name`. Returns whether it existed.
    async fn remove(&self, name: &str) -> CoreResult<bool>;
}

/// In-process persistence backed by a shared map.
#[derive(Debug, Clone, Default)]
pub struct MemoryPersistence {
    artifacts: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryPersistence {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of every stored artifact, sorted.
    #[must_use]
    pub fn artifact_names(&self) -> Vec<String> {
        let artifacts = self
            .artifacts
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = artifacts.keys().cloned().collect();
        names.sort();
        names
    }
}

#[async_trait]
impl Persistence for MemoryPersistence {
    async fn save(&self, name: &str, json: &str) -> CoreResult<()> {
        let mut artifacts = self
            .artifacts
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        artifacts.insert(name.to_string(), json.to_string());
        Ok(())
    }

    async fn load(&self, name: &str) -> CoreResult<Option<String>> {
        let artifacts = self
            .artifacts
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(artifacts.get(name).cloned())
    }

    async fn remove(&self, name: &str) -> CoreResult<bool> {
        let mut artifacts = self
            .artifacts
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(artifacts.remove(name).is_some())
    }
}

/// Filesystem persistence: one `<name>.json` file per artifact.
#[derive(Debug, Clone)]
pub struct DirectoryPersistence {
    root: PathBuf,
}

impl DirectoryPersistence {
    /// Use `root` as the artifact directory. It is created on first save.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The artifact directory.
    #[must_use]
    pub fn root(&self) -> &std::path::Path {
        &self.root
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.root.join(format!("{}.json", encode_artifact_name(name)))
    }
}

#[async_trait]
impl Persistence for DirectoryPersistence {
    async fn save(&self, name: &str, json: &str) -> CoreResult<()> {
        tokio::fs::create_dir_all(&self.root).await?;
        let path = self.path_for(name);
        tokio::fs::write(&path, json).await?;
        tracing::debug!(artifact = name, path = %path.display(), "wrote artifact");
        Ok(())
    }

    async fn load(&self, name: &str) -> CoreResult<Option<String>> {
        match tokio::fs::read_to_string(self.path_for(name)).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn remove(&self, name: &str) -> CoreResult<bool> {
        match tokio::fs::remove_file(self.path_for(name)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

/// Parse a records artifact. Malformed records are defaulted and logged.
fn parse_artifact_records(json: &str) -> CoreResult<Vec<DrawableRecord>> {
    let values: Vec<serde_json::Value> = serde_json::from_str(json)?;
    Ok(parse_records(&values, &mut Diagnostics::new()))
}

/// Bytes kept verbatim in artifact filenames. Everything else, `%` included,
/// is percent-encoded, so distinct names never share a file.
const FILENAME_SAFE: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.');

/// Encode an artifact name as a single path component.
fn encode_artifact_name(name: &str) -> String {
    utf8_percent_encode(name, FILENAME_SAFE).to_string()
}

/// Record families that get their own optional artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KindFilter {
    /// Text records.
    Text,
    /// Image records.
    Image,
    /// Rectangles, circles, ellipses, triangles, polygons and paths.
    Shape,
    /// Lines.
    Line,
}

impl KindFilter {
    /// Every filter, in artifact write order.
    pub const ALL: [Self; 4] = [Self::Text, Self::Image, Self::Shape, Self::Line];

    /// Artifact name suffix.
    #[must_use]
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::Shape => "shape",
            Self::Line => "line",
        }
    }

    /// Whether `record` belongs to this filter.
    #[must_use]
    pub fn matches(self, record: &DrawableRecord) -> bool {
        matches!(
            (self, record.family()),
            (Self::Text, KindFamily::Text)
                | (Self::Image, KindFamily::Image)
                | (Self::Shape, KindFamily::Shape)
                | (Self::Line, KindFamily::Line)
        )
    }
}

/// Metadata artifact: the document envelope without its objects.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MetaArtifact {
    id: String,
    editor_kind: String,
    canvas_size: CanvasSize,
    background_color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    background_image_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    template_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    metadata: Option<Metadata>,
    object_count: usize,
}

/// What a save wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveReport {
    /// Document id.
    pub document_id: String,
    /// Artifact names written, in write order.
    pub artifacts: Vec<String>,
    /// Total bytes written across all artifacts.
    pub bytes_written: usize,
}

/// Splits documents into artifacts on save and reassembles them on load.
#[derive(Debug, Clone)]
pub struct ChunkedStorage<P> {
    persistence: P,
}

impl<P: Persistence> ChunkedStorage<P> {
    /// Wrap a persistence service.
    #[must_use]
    pub fn new(persistence: P) -> Self {
        Self { persistence }
    }

    /// The wrapped persistence service.
    #[must_use]
    pub fn persistence(&self) -> &P {
        &self.persistence
    }

    /// Name of an artifact for a document.
    #[must_use]
    pub fn artifact_name(document_id: &str, suffix: &str) -> String {
        format!("{document_id}.{suffix}")
    }

    /// Persist every artifact of `document`.
    ///
    /// The metadata artifact is written last. Per-kind artifacts for families
    /// with no records are removed so they never go stale.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the persistence service fails.
    pub async fn save(&self, document: &Document) -> CoreResult<SaveReport> {
        let mut report = SaveReport {
            document_id: document.id.clone(),
            artifacts: Vec::new(),
            bytes_written: 0,
        };

        for filter in KindFilter::ALL {
            let name = Self::artifact_name(&document.id, filter.suffix());
            let records: Vec<&DrawableRecord> = document
                .objects
                .iter()
                .filter(|r| filter.matches(r))
                .collect();
            if records.is_empty() {
                if self.persistence.remove(&name).await? {
                    tracing::debug!(artifact = %name, "removed stale artifact");
                }
                continue;
            }
            self.write(&name, &serde_json::to_string(&records)?, &mut report)
                .await?;
        }

        let objects = serde_json::to_string(&document.objects)?;
        self.write(
            &Self::artifact_name(&document.id, "objects"),
            &objects,
            &mut report,
        )
        .await?;

        let meta = MetaArtifact {
            id: document.id.clone(),
            editor_kind: document.editor_kind.clone(),
            canvas_size: document.canvas_size,
            background_color: document.background_color.clone(),
            background_image_uri: document.background_image_uri.clone(),
            template_key: document.template_key.clone(),
            metadata: document.metadata.clone(),
            object_count: document.object_count(),
        };
        self.write(
            &Self::artifact_name(&document.id, "meta"),
            &serde_json::to_string(&meta)?,
            &mut report,
        )
        .await?;

        tracing::info!(
            document_id = %document.id,
            artifacts = report.artifacts.len(),
            bytes = report.bytes_written,
            "saved document"
        );
        Ok(report)
    }

    async fn write(&self, name: &str, json: &str, report: &mut SaveReport) -> CoreResult<()> {
        self.persistence.save(name, json).await?;
        report.artifacts.push(name.to_string());
        report.bytes_written += json.len();
        Ok(())
    }

    async fn load_records(
        &self,
        document_id: &str,
        suffix: &str,
    ) -> CoreResult<Vec<DrawableRecord>> {
        parse_artifact_records(&self.require(Self::artifact_name(document_id, suffix)).await?)
    }

    async fn require(&self, name: String) -> CoreResult<String> {
        match self.persistence.load(&name).await? {
            Some(json) => Ok(json),
            None => {
                tracing::warn!(artifact = %name, "required artifact missing");
                Err(CoreError::StorageMissing { artifact: name })
            }
        }
    }

    /// Reassemble a document from its metadata and objects artifacts.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::StorageMissing`] naming the first absent required
    /// artifact, [`CoreError::InvalidDocument`] if the metadata belongs to
    /// another document or the artifacts disagree on the object count, or a
    /// serialization error.
    pub async fn load(&self, document_id: &str) -> CoreResult<Document> {
        let meta: MetaArtifact = serde_json::from_str(
            &self
                .require(Self::artifact_name(document_id, "meta"))
                .await?,
        )?;
        let objects = self.load_records(document_id, "objects").await?;
        if meta.id != document_id {
            return Err(CoreError::InvalidDocument(format!(
                "artifact {document_id}.meta holds document {}",
                meta.id
            )));
        }
        if objects.len() != meta.object_count {
            return Err(CoreError::InvalidDocument(format!(
                "metadata declares {} objects but {} were stored",
                meta.object_count,
                objects.len()
            )));
        }

        tracing::debug!(document_id, objects = objects.len(), "loaded document");
        Ok(Document {
            id: meta.id,
            editor_kind: meta.editor_kind,
            canvas_size: meta.canvas_size,
            background_color: meta.background_color,
            background_image_uri: meta.background_image_uri,
            template_key: meta.template_key,
            objects,
            metadata: meta.metadata,
        })
    }

    /// Load the top-level records of one family.
    ///
    /// Reads the per-kind artifact when present and falls back to filtering
    /// the objects artifact.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::StorageMissing`] if neither artifact exists.
    pub async fn load_kind(
        &self,
        document_id: &str,
        filter: KindFilter,
    ) -> CoreResult<Vec<DrawableRecord>> {
        let name = Self::artifact_name(document_id, filter.suffix());
        if let Some(json) = self.persistence.load(&name).await? {
            return parse_artifact_records(&json);
        }
        let objects = self.load_records(document_id, "objects").await?;
        Ok(objects.into_iter().filter(|r| filter.matches(r)).collect())
    }

    /// Remove every artifact of a document. Returns how many existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the persistence service fails.
    pub async fn delete(&self, document_id: &str) -> CoreResult<usize> {
        let mut removed = 0;
        let suffixes = ["meta", "objects"]
            .into_iter()
            .chain(KindFilter::ALL.into_iter().map(KindFilter::suffix));
        for suffix in suffixes {
            if self
                .persistence
                .remove(&Self::artifact_name(document_id, suffix))
                .await?
            {
                removed += 1;
            }
        }
        Ok(removed)
    }
}
