//! Storage abstraction consumed by the import pipeline.
//!
//! The [`Store`] trait names every persistence operation the pipeline uses,
//! enabling pluggable backends. The pipeline itself is single-threaded and
//! sequential; operations are async so a real backend can be wired in without
//! touching the importer.
//!
//! # Operations
//!
//! | Group | Purpose |
//! |-------|---------|
//! | collections / languages | create + bulk delete of base reference entities |
//! | document types | get-or-create by label |
//! | fragments | lookup by shelfmark, create, bulk delete |
//! | documents | create with externally supplied id, language sets, bulk delete |
//! | text blocks | document-fragment linkage with placement metadata |
//! | users / creators | identity lookups for edit history and citations |
//! | sources / footnotes | citation records, candidate search for dedup |
//! | log entries | append-only activity log with timestamp override |
//! | id sequence | resync after bulk creation with explicit ids |

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StoreResult;
use crate::models::{
    Collection, Creator, DocRelationSet, Document, DocumentType, EventKind, Footnote, Fragment,
    Id, LanguageScript, LogEntry, ObjectKind, Side, Source, SourceType, TextBlock, User,
};

/// Fields for a new collection record.
#[derive(Debug, Clone, Default)]
pub struct NewCollection {
    pub library: String,
    pub lib_abbrev: String,
    pub abbrev: String,
    pub location: String,
    pub name: String,
}

/// Fields for a new fragment record.
#[derive(Debug, Clone, Default)]
pub struct NewFragment {
    pub shelfmark: String,
    pub collection_id: Option<Id>,
    pub old_shelfmarks: String,
    pub is_multifragment: bool,
    pub url: String,
    pub iiif_url: String,
}

/// Fields for a new source record.
#[derive(Debug, Clone, Default)]
pub struct NewSource {
    pub source_type: Option<SourceType>,
    pub title: String,
    pub year: Option<String>,
    pub volume: String,
    pub url: String,
    pub notes: String,
    pub languages: Vec<String>,
}

/// Fields for a new footnote record.
#[derive(Debug, Clone)]
pub struct NewFootnote {
    pub source_id: Id,
    pub document_id: Id,
    pub doc_relation: DocRelationSet,
    pub location: String,
    pub notes: String,
}

/// Pure candidate criteria for source deduplication.
///
/// A source matches when title, volume, and type are equal, it has exactly
/// `author_count` authors, every last name in `author_last_names` appears
/// among them, and — when `year` is set — the years are equal.
#[derive(Debug, Clone, Default)]
pub struct SourceCriteria {
    pub title: String,
    pub volume: String,
    pub source_type: Option<SourceType>,
    pub author_last_names: Vec<String>,
    pub author_count: usize,
    /// Only set when the citation has no title.
    pub year: Option<String>,
}

/// Abstract persistence backend for the import pipeline.
#[async_trait]
pub trait Store: Send + Sync {
    // -- collections ---------------------------------------------------------

    async fn create_collection(&self, data: NewCollection) -> StoreResult<Collection>;
    async fn delete_all_collections(&self) -> StoreResult<()>;

    // -- language scripts ----------------------------------------------------

    async fn create_language_script(
        &self,
        language: &str,
        script: &str,
        display_name: Option<&str>,
    ) -> StoreResult<LanguageScript>;
    async fn delete_all_language_scripts(&self) -> StoreResult<()>;

    // -- document types ------------------------------------------------------

    async fn get_or_create_doctype(&self, name: &str) -> StoreResult<DocumentType>;

    // -- fragments -----------------------------------------------------------

    async fn find_fragment_by_shelfmark(&self, shelfmark: &str) -> StoreResult<Option<Fragment>>;
    async fn create_fragment(&self, data: NewFragment) -> StoreResult<Fragment>;
    async fn delete_all_fragments(&self) -> StoreResult<()>;

    // -- documents -----------------------------------------------------------

    /// Create a document with an externally supplied id.
    async fn create_document(
        &self,
        id: Id,
        doctype_id: Option<Id>,
        description: &str,
        tags: Vec<String>,
    ) -> StoreResult<Document>;
    async fn delete_all_documents(&self) -> StoreResult<()>;

    /// Replace a document's language sets and language note.
    async fn set_document_languages(
        &self,
        document_id: Id,
        language_ids: Vec<Id>,
        probable_language_ids: Vec<Id>,
        language_note: &str,
    ) -> StoreResult<()>;

    // -- text blocks ---------------------------------------------------------

    async fn create_text_block(
        &self,
        document_id: Id,
        fragment_id: Id,
        side: Option<Side>,
        extent_label: &str,
        multifragment: &str,
    ) -> StoreResult<TextBlock>;

    // -- users ---------------------------------------------------------------

    async fn create_user(
        &self,
        username: &str,
        first_name: &str,
        last_name: &str,
        is_active: bool,
    ) -> StoreResult<User>;

    /// Get-must-exist lookup by username.
    async fn get_user_by_username(&self, username: &str) -> StoreResult<User>;

    /// Case-insensitive exact match on first and last name.
    async fn find_user_by_name(&self, first_name: &str, last_name: &str)
        -> StoreResult<Option<User>>;

    /// Case-insensitive prefix match of first/last initials.
    async fn find_user_by_initials(&self, first_initial: char, last_initial: char)
        -> StoreResult<Option<User>>;

    // -- creators ------------------------------------------------------------

    async fn create_creator(&self, first_name: &str, last_name: &str) -> StoreResult<Creator>;
    async fn list_creators(&self) -> StoreResult<Vec<Creator>>;
    async fn delete_all_creators(&self) -> StoreResult<()>;

    // -- sources & footnotes -------------------------------------------------

    /// Pure candidate lookup for deduplication; tie-breaks are the caller's.
    async fn find_sources(&self, criteria: &SourceCriteria) -> StoreResult<Vec<Source>>;
    async fn create_source(&self, data: NewSource) -> StoreResult<Source>;
    /// Persist year/notes changes made after a dedup match.
    async fn update_source(&self, source: &Source) -> StoreResult<()>;
    /// Attach authors in citation order (1-based sort order).
    async fn set_source_authors(&self, source_id: Id, author_ids: &[Id]) -> StoreResult<()>;
    /// Cascades to footnotes.
    async fn delete_all_sources(&self) -> StoreResult<()>;

    async fn create_footnote(&self, data: NewFootnote) -> StoreResult<Footnote>;

    // -- activity log --------------------------------------------------------

    #[allow(clippy::too_many_arguments)]
    async fn create_log_entry(
        &self,
        user_id: Id,
        object_kind: ObjectKind,
        object_id: Id,
        object_repr: &str,
        change_message: &str,
        action: EventKind,
        action_time: DateTime<Utc>,
    ) -> StoreResult<LogEntry>;

    async fn delete_log_entries(&self, object_kind: ObjectKind) -> StoreResult<()>;

    // -- id sequence ---------------------------------------------------------

    /// Advance the document id generator past the maximum imported id,
    /// so future auto-assigned inserts cannot collide. Returns the new floor.
    async fn sync_document_id_sequence(&self) -> StoreResult<Id>;
}
