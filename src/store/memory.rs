//! In-memory [`Store`] implementation for tests and offline runs.
//!
//! Uses maps behind a single `std::sync::RwLock`; all futures are
//! immediately ready. Id assignment is a per-run monotonic counter, except
//! for documents, whose ids are supplied by the spreadsheet.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::{StoreError, StoreResult};
use crate::models::{
    Collection, Creator, Document, DocumentType, EventKind, Footnote, Fragment, Id,
    LanguageScript, LogEntry, ObjectKind, Side, Source, TextBlock, User,
};

use super::{NewCollection, NewFootnote, NewFragment, NewSource, SourceCriteria, Store};

#[derive(Default)]
struct Inner {
    next_id: Id,
    document_seq: Id,
    collections: HashMap<Id, Collection>,
    language_scripts: HashMap<Id, LanguageScript>,
    doctypes: HashMap<Id, DocumentType>,
    fragments: HashMap<Id, Fragment>,
    documents: HashMap<Id, Document>,
    text_blocks: Vec<TextBlock>,
    users: HashMap<Id, User>,
    creators: HashMap<Id, Creator>,
    sources: HashMap<Id, Source>,
    footnotes: Vec<Footnote>,
    log_entries: Vec<LogEntry>,
}

impl Inner {
    fn next(&mut self) -> Id {
        self.next_id += 1;
        self.next_id
    }
}

/// In-memory store backing tests and dry runs.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // -- inspection helpers used by tests ------------------------------------

    pub fn document(&self, id: Id) -> Option<Document> {
        self.inner.read().unwrap().documents.get(&id).cloned()
    }

    pub fn fragment_count(&self) -> usize {
        self.inner.read().unwrap().fragments.len()
    }

    pub fn source_count(&self) -> usize {
        self.inner.read().unwrap().sources.len()
    }

    pub fn footnotes(&self) -> Vec<Footnote> {
        self.inner.read().unwrap().footnotes.clone()
    }

    pub fn sources(&self) -> Vec<Source> {
        self.inner.read().unwrap().sources.values().cloned().collect()
    }

    pub fn text_blocks_for(&self, document_id: Id) -> Vec<TextBlock> {
        self.inner
            .read()
            .unwrap()
            .text_blocks
            .iter()
            .filter(|tb| tb.document_id == document_id)
            .cloned()
            .collect()
    }

    pub fn log_entries_for(&self, object_kind: ObjectKind, object_id: Id) -> Vec<LogEntry> {
        self.inner
            .read()
            .unwrap()
            .log_entries
            .iter()
            .filter(|e| e.object_kind == object_kind && e.object_id == object_id)
            .cloned()
            .collect()
    }

    pub fn document_seq(&self) -> Id {
        self.inner.read().unwrap().document_seq
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_collection(&self, data: NewCollection) -> StoreResult<Collection> {
        let mut inner = self.inner.write().unwrap();
        let id = inner.next();
        let collection = Collection {
            id,
            library: data.library,
            lib_abbrev: data.lib_abbrev,
            abbrev: data.abbrev,
            location: data.location,
            name: data.name,
        };
        inner.collections.insert(id, collection.clone());
        Ok(collection)
    }

    async fn delete_all_collections(&self) -> StoreResult<()> {
        self.inner.write().unwrap().collections.clear();
        Ok(())
    }

    async fn create_language_script(
        &self,
        language: &str,
        script: &str,
        display_name: Option<&str>,
    ) -> StoreResult<LanguageScript> {
        let mut inner = self.inner.write().unwrap();
        let id = inner.next();
        let lang = LanguageScript {
            id,
            language: language.to_string(),
            script: script.to_string(),
            display_name: display_name.map(str::to_string),
        };
        inner.language_scripts.insert(id, lang.clone());
        Ok(lang)
    }

    async fn delete_all_language_scripts(&self) -> StoreResult<()> {
        self.inner.write().unwrap().language_scripts.clear();
        Ok(())
    }

    async fn get_or_create_doctype(&self, name: &str) -> StoreResult<DocumentType> {
        let mut inner = self.inner.write().unwrap();
        if let Some(existing) = inner.doctypes.values().find(|d| d.name == name) {
            return Ok(existing.clone());
        }
        let id = inner.next();
        let doctype = DocumentType {
            id,
            name: name.to_string(),
        };
        inner.doctypes.insert(id, doctype.clone());
        Ok(doctype)
    }

    async fn find_fragment_by_shelfmark(&self, shelfmark: &str) -> StoreResult<Option<Fragment>> {
        Ok(self
            .inner
            .read()
            .unwrap()
            .fragments
            .values()
            .find(|f| f.shelfmark == shelfmark)
            .cloned())
    }

    async fn create_fragment(&self, data: NewFragment) -> StoreResult<Fragment> {
        let mut inner = self.inner.write().unwrap();
        let id = inner.next();
        let fragment = Fragment {
            id,
            shelfmark: data.shelfmark,
            collection_id: data.collection_id,
            old_shelfmarks: data.old_shelfmarks,
            is_multifragment: data.is_multifragment,
            url: data.url,
            iiif_url: data.iiif_url,
        };
        inner.fragments.insert(id, fragment.clone());
        Ok(fragment)
    }

    async fn delete_all_fragments(&self) -> StoreResult<()> {
        let mut inner = self.inner.write().unwrap();
        inner.fragments.clear();
        inner.text_blocks.clear();
        Ok(())
    }

    async fn create_document(
        &self,
        id: Id,
        doctype_id: Option<Id>,
        description: &str,
        tags: Vec<String>,
    ) -> StoreResult<Document> {
        let mut inner = self.inner.write().unwrap();
        let document = Document {
            id,
            doctype_id,
            description: description.to_string(),
            tags,
            language_ids: Vec::new(),
            probable_language_ids: Vec::new(),
            language_note: String::new(),
        };
        inner.documents.insert(id, document.clone());
        Ok(document)
    }

    async fn delete_all_documents(&self) -> StoreResult<()> {
        let mut inner = self.inner.write().unwrap();
        inner.documents.clear();
        inner.text_blocks.clear();
        Ok(())
    }

    async fn set_document_languages(
        &self,
        document_id: Id,
        language_ids: Vec<Id>,
        probable_language_ids: Vec<Id>,
        language_note: &str,
    ) -> StoreResult<()> {
        let mut inner = self.inner.write().unwrap();
        let doc = inner
            .documents
            .get_mut(&document_id)
            .ok_or_else(|| StoreError::Backend(format!("no document {document_id}")))?;
        doc.language_ids = language_ids;
        doc.probable_language_ids = probable_language_ids;
        doc.language_note = language_note.to_string();
        Ok(())
    }

    async fn create_text_block(
        &self,
        document_id: Id,
        fragment_id: Id,
        side: Option<Side>,
        extent_label: &str,
        multifragment: &str,
    ) -> StoreResult<TextBlock> {
        let mut inner = self.inner.write().unwrap();
        let id = inner.next();
        let block = TextBlock {
            id,
            document_id,
            fragment_id,
            side,
            extent_label: extent_label.to_string(),
            multifragment: multifragment.to_string(),
            certainty: true,
        };
        inner.text_blocks.push(block.clone());
        Ok(block)
    }

    async fn create_user(
        &self,
        username: &str,
        first_name: &str,
        last_name: &str,
        is_active: bool,
    ) -> StoreResult<User> {
        let mut inner = self.inner.write().unwrap();
        let id = inner.next();
        let user = User {
            id,
            username: username.to_string(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            is_active,
        };
        inner.users.insert(id, user.clone());
        Ok(user)
    }

    async fn get_user_by_username(&self, username: &str) -> StoreResult<User> {
        self.inner
            .read()
            .unwrap()
            .users
            .values()
            .find(|u| u.username == username)
            .cloned()
            .ok_or_else(|| StoreError::UserNotFound(username.to_string()))
    }

    async fn find_user_by_name(
        &self,
        first_name: &str,
        last_name: &str,
    ) -> StoreResult<Option<User>> {
        Ok(self
            .inner
            .read()
            .unwrap()
            .users
            .values()
            .find(|u| {
                u.first_name.eq_ignore_ascii_case(first_name)
                    && u.last_name.eq_ignore_ascii_case(last_name)
            })
            .cloned())
    }

    async fn find_user_by_initials(
        &self,
        first_initial: char,
        last_initial: char,
    ) -> StoreResult<Option<User>> {
        let fi = first_initial.to_lowercase().to_string();
        let li = last_initial.to_lowercase().to_string();
        Ok(self
            .inner
            .read()
            .unwrap()
            .users
            .values()
            .find(|u| {
                u.first_name.to_lowercase().starts_with(&fi)
                    && u.last_name.to_lowercase().starts_with(&li)
            })
            .cloned())
    }

    async fn create_creator(&self, first_name: &str, last_name: &str) -> StoreResult<Creator> {
        let mut inner = self.inner.write().unwrap();
        let id = inner.next();
        let creator = Creator {
            id,
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
        };
        inner.creators.insert(id, creator.clone());
        Ok(creator)
    }

    async fn list_creators(&self) -> StoreResult<Vec<Creator>> {
        Ok(self.inner.read().unwrap().creators.values().cloned().collect())
    }

    async fn delete_all_creators(&self) -> StoreResult<()> {
        self.inner.write().unwrap().creators.clear();
        Ok(())
    }

    async fn find_sources(&self, criteria: &SourceCriteria) -> StoreResult<Vec<Source>> {
        let inner = self.inner.read().unwrap();
        let mut matches: Vec<Source> = inner
            .sources
            .values()
            .filter(|s| {
                if s.title != criteria.title
                    || s.volume != criteria.volume
                    || Some(s.source_type) != criteria.source_type
                    || s.author_ids.len() != criteria.author_count
                {
                    return false;
                }
                if let Some(ref year) = criteria.year {
                    if s.year.as_deref() != Some(year.as_str()) {
                        return false;
                    }
                }
                // every requested last name must appear among the authors
                criteria.author_last_names.iter().all(|last| {
                    s.author_ids.iter().any(|aid| {
                        inner
                            .creators
                            .get(aid)
                            .is_some_and(|c| &c.last_name == last)
                    })
                })
            })
            .cloned()
            .collect();
        matches.sort_by_key(|s| s.id);
        Ok(matches)
    }

    async fn create_source(&self, data: NewSource) -> StoreResult<Source> {
        let source_type = data
            .source_type
            .ok_or_else(|| StoreError::Backend("source type is required".into()))?;
        let mut inner = self.inner.write().unwrap();
        let id = inner.next();
        let source = Source {
            id,
            source_type,
            title: data.title,
            year: data.year,
            volume: data.volume,
            journal: String::new(),
            url: data.url,
            notes: data.notes,
            author_ids: Vec::new(),
            languages: data.languages,
        };
        inner.sources.insert(id, source.clone());
        Ok(source)
    }

    async fn update_source(&self, source: &Source) -> StoreResult<()> {
        let mut inner = self.inner.write().unwrap();
        match inner.sources.get_mut(&source.id) {
            Some(existing) => {
                *existing = source.clone();
                Ok(())
            }
            None => Err(StoreError::Backend(format!("no source {}", source.id))),
        }
    }

    async fn set_source_authors(&self, source_id: Id, author_ids: &[Id]) -> StoreResult<()> {
        let mut inner = self.inner.write().unwrap();
        let source = inner
            .sources
            .get_mut(&source_id)
            .ok_or_else(|| StoreError::Backend(format!("no source {source_id}")))?;
        source.author_ids = author_ids.to_vec();
        Ok(())
    }

    async fn delete_all_sources(&self) -> StoreResult<()> {
        let mut inner = self.inner.write().unwrap();
        inner.sources.clear();
        // cascade to footnotes
        inner.footnotes.clear();
        Ok(())
    }

    async fn create_footnote(&self, data: NewFootnote) -> StoreResult<Footnote> {
        let mut inner = self.inner.write().unwrap();
        let id = inner.next();
        let footnote = Footnote {
            id,
            source_id: data.source_id,
            document_id: data.document_id,
            doc_relation: data.doc_relation,
            location: data.location,
            notes: data.notes,
        };
        inner.footnotes.push(footnote.clone());
        Ok(footnote)
    }

    async fn create_log_entry(
        &self,
        user_id: Id,
        object_kind: ObjectKind,
        object_id: Id,
        object_repr: &str,
        change_message: &str,
        action: EventKind,
        action_time: DateTime<Utc>,
    ) -> StoreResult<LogEntry> {
        let mut inner = self.inner.write().unwrap();
        let id = inner.next();
        let entry = LogEntry {
            id,
            user_id,
            object_kind,
            object_id,
            object_repr: object_repr.chars().take(200).collect(),
            change_message: change_message.to_string(),
            action,
            action_time,
        };
        inner.log_entries.push(entry.clone());
        Ok(entry)
    }

    async fn delete_log_entries(&self, object_kind: ObjectKind) -> StoreResult<()> {
        self.inner
            .write()
            .unwrap()
            .log_entries
            .retain(|e| e.object_kind != object_kind);
        Ok(())
    }

    async fn sync_document_id_sequence(&self) -> StoreResult<Id> {
        let mut inner = self.inner.write().unwrap();
        let max = inner.documents.keys().max().copied().unwrap_or(0);
        inner.document_seq = max;
        Ok(max)
    }
}
