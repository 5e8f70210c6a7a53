//! Annotation persistence
//!
//! The ledger is saved and loaded as a list of [`StoredAnnotation`] under a
//! [`ScanSignature`]. Storage technology is up to the implementor; two are
//! provided:
//! - [`InMemoryAnnotationStore`] backed by `DashMap`
//! - [`JsonFileStore`] writing one JSON document per signature

use crate::error::StoreError;
use crate::identity::MatchId;
use crate::ledger::{AnnotationLedger, StoredAnnotation};
use async_trait::async_trait;
use cfgdrift_resolve::ScanQuery;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const SIGNATURE_TAG: &str = "cfgdrift/scan-signature/v1";

/// Key of a persisted annotation set
///
/// Derived from pattern, case sensitivity, scope and the sorted namespace
/// list, so the same query over the same namespaces finds its annotations
/// again regardless of namespace order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScanSignature(String);

impl ScanSignature {
    /// Signature of a query
    #[must_use]
    pub fn from_query(query: &ScanQuery) -> Self {
        let mut namespaces: Vec<&str> = query.namespaces.iter().map(String::as_str).collect();
        namespaces.sort_unstable();
        namespaces.dedup();

        let case = if query.case_insensitive { "i" } else { "s" };
        let mut fields = vec![query.pattern.as_str(), case, query.scope.as_str()];
        fields.extend(namespaces);
        Self(MatchId::digest(SIGNATURE_TAG, &fields).to_string())
    }

    /// Hex form
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScanSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Save/load contract for annotations
#[async_trait]
pub trait AnnotationStore: Send + Sync {
    /// Replace the annotations stored under a signature
    async fn save(
        &self,
        signature: &ScanSignature,
        annotations: &[StoredAnnotation],
    ) -> Result<(), StoreError>;

    /// Annotations stored under a signature; empty when none were saved
    async fn load(&self, signature: &ScanSignature) -> Result<Vec<StoredAnnotation>, StoreError>;
}

/// Save a ledger snapshot under a signature
///
/// # Errors
/// Propagates the store's error.
pub async fn save_ledger(
    store: &dyn AnnotationStore,
    signature: &ScanSignature,
    ledger: &AnnotationLedger,
) -> Result<(), StoreError> {
    let snapshot = ledger.snapshot();
    store.save(signature, &snapshot).await?;
    tracing::debug!(%signature, entries = snapshot.len(), "saved annotations");
    Ok(())
}

/// Merge stored annotations into a ledger
///
/// # Errors
/// Propagates the store's error.
pub async fn load_into(
    store: &dyn AnnotationStore,
    signature: &ScanSignature,
    ledger: &mut AnnotationLedger,
) -> Result<usize, StoreError> {
    let stored = store.load(signature).await?;
    let count = stored.len();
    ledger.restore(stored);
    tracing::debug!(%signature, entries = count, "loaded annotations");
    Ok(count)
}

/// Process-local store
#[derive(Debug, Clone, Default)]
pub struct InMemoryAnnotationStore {
    inner: Arc<DashMap<ScanSignature, Vec<StoredAnnotation>>>,
}

impl InMemoryAnnotationStore {
    /// Empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of signatures stored
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether nothing is stored
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[async_trait]
impl AnnotationStore for InMemoryAnnotationStore {
    async fn save(
        &self,
        signature: &ScanSignature,
        annotations: &[StoredAnnotation],
    ) -> Result<(), StoreError> {
        self.inner.insert(signature.clone(), annotations.to_vec());
        Ok(())
    }

    async fn load(&self, signature: &ScanSignature) -> Result<Vec<StoredAnnotation>, StoreError> {
        Ok(self
            .inner
            .get(signature)
            .map(|entry| entry.value().clone())
            .unwrap_or_default())
    }
}

/// One `{signature}.json` file per annotation set in a directory
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Store rooted at a directory (created on first save)
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Root directory
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, signature: &ScanSignature) -> PathBuf {
        self.dir.join(format!("{signature}.json"))
    }
}

#[async_trait]
impl AnnotationStore for JsonFileStore {
    async fn save(
        &self,
        signature: &ScanSignature,
        annotations: &[StoredAnnotation],
    ) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.path_for(signature);
        let tmp = path.with_extension("json.tmp");
        let body = serde_json::to_vec_pretty(annotations)?;
        tokio::fs::write(&tmp, body).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn load(&self, signature: &ScanSignature) -> Result<Vec<StoredAnnotation>, StoreError> {
        match tokio::fs::read(self.path_for(signature)).await {
            Ok(body) => Ok(serde_json::from_slice(&body)?),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(err) => Err(err.into()),
        }
    }
}
