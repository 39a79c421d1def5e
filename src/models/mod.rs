//! Domain models for the Manuload import pipeline.
//!
//! This module contains the core data structures used throughout the pipeline:
//!
//! - [`Collection`] - A holding institution or sub-collection
//! - [`LanguageScript`] - A (language, script) pair with optional display name
//! - [`DocumentType`] - A free-text document type label
//! - [`Fragment`] - A physical artifact identified by shelfmark
//! - [`Document`] - The catalogable unit, linked to fragments via [`TextBlock`]
//! - [`User`] / [`Creator`] - Contributor accounts and citation authors
//! - [`Source`] / [`Footnote`] - Bibliographic citations and their links
//! - [`LogEntry`] - Timestamped activity records forming the edit history

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Record identifier used by every persisted entity.
pub type Id = i64;

// =============================================================================
// Reference entities
// =============================================================================

/// A holding institution or sub-collection.
///
/// Immutable after creation in this pipeline; looked up by a composite code
/// (institution code, or institution + collection abbreviation when one
/// institution has multiple sub-collections sharing a code).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Collection {
    pub id: Id,
    /// Institution name, e.g. "Cambridge University Library".
    pub library: String,
    /// Institution abbreviation, e.g. "CUL".
    pub lib_abbrev: String,
    /// Sub-collection abbreviation, e.g. "T-S".
    pub abbrev: String,
    /// Current location of the collection.
    pub location: String,
    /// Sub-collection display name, when different from the library.
    pub name: String,
}

/// A (language, script) pair with an optional display-name override.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LanguageScript {
    pub id: Id,
    pub language: String,
    pub script: String,
    pub display_name: Option<String>,
}

/// A free-text document type label ("Letter", "Legal document", ...).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentType {
    pub id: Id,
    pub name: String,
}

// =============================================================================
// Fragments & documents
// =============================================================================

/// A physical artifact identified by its current shelfmark.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fragment {
    pub id: Id,
    pub shelfmark: String,
    pub collection_id: Option<Id>,
    /// Historical shelfmarks, as recorded in the spreadsheet.
    pub old_shelfmarks: String,
    pub is_multifragment: bool,
    /// External image link from the spreadsheet.
    pub url: String,
    /// Derived image-manifest (IIIF) link, empty when none can be derived.
    pub iiif_url: String,
}

/// The catalogable unit.
///
/// Definite and probable language sets are mutually exclusive; the importer
/// rejects a label asserted in both.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: Id,
    pub doctype_id: Option<Id>,
    pub description: String,
    pub tags: Vec<String>,
    pub language_ids: Vec<Id>,
    pub probable_language_ids: Vec<Id>,
    pub language_note: String,
}

/// Recto/verso placement of a text block on a fragment.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Side {
    Recto,
    Verso,
    RectoVerso,
}

impl Side {
    /// Parse the spreadsheet label into a side code.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "recto" => Some(Self::Recto),
            "verso" => Some(Self::Verso),
            "recto and verso" => Some(Self::RectoVerso),
            _ => None,
        }
    }

    /// Short code used by the store.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Recto => "r",
            Self::Verso => "v",
            Self::RectoVerso => "rv",
        }
    }
}

/// Join-table record linking a document to a fragment with placement metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextBlock {
    pub id: Id,
    pub document_id: Id,
    pub fragment_id: Id,
    pub side: Option<Side>,
    /// Extent label, e.g. "b" or "1 recto".
    pub extent_label: String,
    /// Multifragment indicator text from the spreadsheet.
    pub multifragment: String,
    /// Whether the association is certain; the spreadsheet carries no
    /// uncertainty marker, so imported blocks are always certain.
    pub certainty: bool,
}

// =============================================================================
// Contributors
// =============================================================================

/// A contributor account referenced by the spreadsheet's edit history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: Id,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_active: bool,
}

impl User {
    /// Display form used in log messages.
    pub fn display_name(&self) -> String {
        if self.first_name.is_empty() && self.last_name.is_empty() {
            self.username.clone()
        } else {
            format!("{} {}", self.first_name, self.last_name).trim().to_string()
        }
    }
}

/// An author of a bibliographic source, keyed by unique last name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Creator {
    pub id: Id,
    pub first_name: String,
    pub last_name: String,
}

// =============================================================================
// Sources & footnotes
// =============================================================================

/// Bibliographic source type, classified from the citation text.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SourceType {
    Book,
    Article,
    Dissertation,
    Unpublished,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Book => "Book",
            Self::Article => "Article",
            Self::Dissertation => "Dissertation",
            Self::Unpublished => "Unpublished",
        }
    }
}

/// A bibliographic citation resolved from free text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    pub id: Id,
    pub source_type: SourceType,
    pub title: String,
    pub year: Option<String>,
    pub volume: String,
    pub journal: String,
    pub url: String,
    pub notes: String,
    /// Author ids in citation order (1-based order preserved by the store).
    pub author_ids: Vec<Id>,
    /// Language names attached to the source ("Hebrew", "German").
    pub languages: Vec<String>,
}

/// How a footnote's source relates to the document.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum DocRelation {
    Edition,
    Translation,
    Discussion,
}

/// Set of relation flags carried by a footnote.
pub type DocRelationSet = BTreeSet<DocRelation>;

/// Links a document to a source with location and notes.
///
/// Footnotes are created fresh for every parsed citation fragment; they are
/// not deduplicated, so several may point at the same source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Footnote {
    pub id: Id,
    pub source_id: Id,
    pub document_id: Id,
    pub doc_relation: DocRelationSet,
    pub location: String,
    pub notes: String,
}

// =============================================================================
// Activity log
// =============================================================================

/// Kind of change recorded by a log entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum EventKind {
    Addition,
    Change,
}

/// Entity kind an activity record refers to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Collection,
    LanguageScript,
    Fragment,
    Document,
}

/// Append-only activity record.
///
/// The pipeline persists these with explicit timestamps to materialize the
/// reconstructed edit history, then a final import marker stamped now.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: Id,
    pub user_id: Id,
    pub object_kind: ObjectKind,
    pub object_id: Id,
    pub object_repr: String,
    pub change_message: String,
    pub action: EventKind,
    pub action_time: DateTime<Utc>,
}

/// One reconstructed edit-history event, before persistence.
#[derive(Debug, Clone, PartialEq)]
pub struct EditEvent {
    pub kind: EventKind,
    pub user_id: Id,
    pub date: NaiveDate,
    /// Original unparsed date text, kept for auditability.
    pub orig_date: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_from_label() {
        assert_eq!(Side::from_label("Recto"), Some(Side::Recto));
        assert_eq!(Side::from_label("verso "), Some(Side::Verso));
        assert_eq!(Side::from_label("Recto and verso"), Some(Side::RectoVerso));
        assert_eq!(Side::from_label("margin"), None);
    }

    #[test]
    fn test_side_codes() {
        assert_eq!(Side::Recto.code(), "r");
        assert_eq!(Side::Verso.code(), "v");
        assert_eq!(Side::RectoVerso.code(), "rv");
    }

    #[test]
    fn test_user_display_name() {
        let user = User {
            id: 1,
            username: "gkhan".into(),
            first_name: "Geoffrey".into(),
            last_name: "Khan".into(),
            is_active: false,
        };
        assert_eq!(user.display_name(), "Geoffrey Khan");

        let bot = User {
            id: 2,
            username: "script".into(),
            first_name: String::new(),
            last_name: String::new(),
            is_active: true,
        };
        assert_eq!(bot.display_name(), "script");
    }

    #[test]
    fn test_doc_relation_set_ordering() {
        let mut rel = DocRelationSet::new();
        rel.insert(DocRelation::Translation);
        rel.insert(DocRelation::Edition);
        // BTreeSet keeps a stable order for serialization
        let flags: Vec<_> = rel.iter().copied().collect();
        assert_eq!(flags, vec![DocRelation::Edition, DocRelation::Translation]);
    }

    #[test]
    fn test_source_serialization() {
        let source = Source {
            id: 1,
            source_type: SourceType::Book,
            title: "Mediterranean Society".into(),
            year: Some("1971".into()),
            volume: "2".into(),
            journal: String::new(),
            url: String::new(),
            notes: String::new(),
            author_ids: vec![7],
            languages: vec![],
        };
        let json = serde_json::to_string(&source).unwrap();
        assert!(json.contains("Mediterranean Society"));
        assert!(json.contains("1971"));
    }
}
