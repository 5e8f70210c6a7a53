//! Annotation ledger
//!
//! Operator review state keyed by match identity. Records are created lazily
//! on first access. A volatile id seen for the first time is seeded from the
//! last record written under its stable id, so a justification survives the
//! matched value changing between scans. Unknown ids are never an error.

use crate::identity::{MatchId, MatchIdentity};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Ledger shared between threads
pub type SharedLedger = Arc<Mutex<AnnotationLedger>>;

/// Review state of one match
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnnotationRecord {
    /// Operator accepted the value
    pub justified: bool,
    /// Value has to be migrated
    pub migration_required: bool,
    /// Free-form note
    pub comment: String,
}

impl AnnotationRecord {
    /// Whether nothing was ever set
    #[must_use]
    pub fn is_blank(&self) -> bool {
        !self.justified && !self.migration_required && self.comment.is_empty()
    }

    /// Set a flag; raising one flag lowers the other
    pub fn set_flag(&mut self, field: AnnotationField, value: bool) {
        match field {
            AnnotationField::Justified => {
                self.justified = value;
                if value {
                    self.migration_required = false;
                }
            }
            AnnotationField::MigrationRequired => {
                self.migration_required = value;
                if value {
                    self.justified = false;
                }
            }
        }
    }

    /// Apply one update
    pub fn apply(&mut self, update: &AnnotationUpdate) {
        match update {
            AnnotationUpdate::Justified(value) => self.set_flag(AnnotationField::Justified, *value),
            AnnotationUpdate::MigrationRequired(value) => {
                self.set_flag(AnnotationField::MigrationRequired, *value);
            }
            AnnotationUpdate::Comment(comment) => self.comment.clone_from(comment),
        }
    }
}

/// Mutually exclusive review flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AnnotationField {
    /// `justified`
    Justified,
    /// `migrationRequired`
    MigrationRequired,
}

/// One operator edit, applicable to many matches at once
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AnnotationUpdate {
    /// Set or clear `justified`
    Justified(bool),
    /// Set or clear `migrationRequired`
    MigrationRequired(bool),
    /// Replace the comment
    Comment(String),
}

/// Which map a stored record belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdKind {
    /// Keyed by volatile id
    Volatile,
    /// Seed keyed by stable id
    Stable,
}

/// Persisted form of one ledger entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredAnnotation {
    /// Record id
    pub id: MatchId,
    /// Volatile record or stable seed
    pub kind: IdKind,
    /// The record
    #[serde(flatten)]
    pub record: AnnotationRecord,
}

/// Process-wide review state, injected wherever annotations are read or written
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnotationLedger {
    records: HashMap<MatchId, AnnotationRecord>,
    seeds: HashMap<MatchId, AnnotationRecord>,
}

impl AnnotationLedger {
    /// Empty ledger
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap for use across threads
    #[must_use]
    pub fn shared(self) -> SharedLedger {
        Arc::new(Mutex::new(self))
    }

    /// Record for a match, created on first access
    ///
    /// A missing volatile record is seeded from the stable id's last record.
    /// Edits made through the returned reference do not refresh that seed;
    /// the `set_*` / `apply*` operations do.
    pub fn get(&mut self, identity: &MatchIdentity) -> &mut AnnotationRecord {
        let seeds = &self.seeds;
        self.records
            .entry(identity.volatile)
            .or_insert_with(|| seeds.get(&identity.stable).cloned().unwrap_or_default())
    }

    /// Read a record without creating it
    #[must_use]
    pub fn lookup(&self, identity: &MatchIdentity) -> AnnotationRecord {
        self.records
            .get(&identity.volatile)
            .or_else(|| self.seeds.get(&identity.stable))
            .cloned()
            .unwrap_or_default()
    }

    /// Set one flag on a match
    pub fn set_flag(&mut self, identity: &MatchIdentity, field: AnnotationField, value: bool) {
        self.write(identity, |record| record.set_flag(field, value));
    }

    /// Replace the comment on a match
    pub fn set_comment(&mut self, identity: &MatchIdentity, comment: impl Into<String>) {
        let comment = comment.into();
        self.write(identity, |record| record.comment = comment);
    }

    /// Apply one update to a match
    pub fn apply(&mut self, identity: &MatchIdentity, update: &AnnotationUpdate) {
        self.write(identity, |record| record.apply(update));
    }

    /// Apply one update to every selected match
    pub fn apply_bulk(&mut self, identities: &[MatchIdentity], update: &AnnotationUpdate) {
        for identity in identities {
            self.apply(identity, update);
        }
        tracing::debug!(count = identities.len(), ?update, "applied bulk annotation update");
    }

    /// Overwrite the record of a match
    pub fn put(&mut self, identity: &MatchIdentity, record: AnnotationRecord) {
        self.write(identity, |current| *current = record);
    }

    /// Number of volatile records
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no record exists
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty() && self.seeds.is_empty()
    }

    /// Every record and seed, ordered by kind then id
    #[must_use]
    pub fn snapshot(&self) -> Vec<StoredAnnotation> {
        let mut stored: Vec<StoredAnnotation> = self
            .records
            .iter()
            .map(|(id, record)| (IdKind::Volatile, id, record))
            .chain(self.seeds.iter().map(|(id, record)| (IdKind::Stable, id, record)))
            .map(|(kind, id, record)| StoredAnnotation {
                id: *id,
                kind,
                record: record.clone(),
            })
            .collect();
        stored.sort_by(|a, b| {
            (a.kind == IdKind::Stable, a.id).cmp(&(b.kind == IdKind::Stable, b.id))
        });
        stored
    }

    /// Merge stored entries, replacing records with the same id
    pub fn restore(&mut self, stored: impl IntoIterator<Item = StoredAnnotation>) {
        for entry in stored {
            let map = match entry.kind {
                IdKind::Volatile => &mut self.records,
                IdKind::Stable => &mut self.seeds,
            };
            map.insert(entry.id, entry.record);
        }
    }

    /// Build a ledger from stored entries
    #[must_use]
    pub fn from_snapshot(stored: impl IntoIterator<Item = StoredAnnotation>) -> Self {
        let mut ledger = Self::new();
        ledger.restore(stored);
        ledger
    }

    fn write(&mut self, identity: &MatchIdentity, edit: impl FnOnce(&mut AnnotationRecord)) {
        let record = self.get(identity);
        edit(record);
        let seed = record.clone();
        self.seeds.insert(identity.stable, seed);
    }
}
