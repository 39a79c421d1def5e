//! Pipeline orchestration: spreadsheet rows into normalized catalog records.
//!
//! Control flow: the collection and language importers run first and
//! populate the leaf caches, then the document importer consumes the
//! metadata sheet row by row, invoking the edit-history reconstructor and
//! citation parser per row. Join relationships are deferred to a second
//! pass once every document exists, and the id-sequence finalizer runs
//! last.
//!
//! Errors local to one row or one citation never abort the batch; only
//! store, connectivity, and configuration errors do.

pub mod citation;
pub mod history;
pub mod source;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{error, info, warn};

use crate::config::ImportConfig;
use crate::error::{ImportResult, StoreError, StoreResult};
use crate::fixtures;
use crate::models::{EventKind, Fragment, Id, ObjectKind, Side, User};
use crate::reader::{self, Row, Table};
use crate::resolve::{CollectionCache, CreatorCache, DoctypeCache, LanguageCache, UserCache};
use crate::store::{NewCollection, NewFragment, Store};

/// Institution whose library code is shared by several sub-collections;
/// differentiated by shelfmark prefix.
const AMBIGUOUS_LIB_CODE: &str = "CUL";
const AMBIGUOUS_LIB_PREFIXES: &[&str] = &["T-S", "CUL Or.", "CUL Add."];

/// Parenthesized text that is not a question mark: a language note.
static RE_LANG_NOTE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\([^?]+\)").unwrap());
/// Any parenthetical, removed before the language lookup.
static RE_PARENTHETICAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\(.+\)").unwrap());
/// Trailing page indicator on an image view link.
static RE_VIEW_PAGE: Lazy<Regex> = Lazy::new(|| Regex::new(r"/\d$").unwrap());

/// Counters reported after a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportStats {
    pub collections: usize,
    pub languages: usize,
    pub documents: usize,
    pub joins: usize,
    pub skipped: usize,
}

/// The import pipeline.
///
/// Owns the per-run entity resolution caches; construct one per run and
/// discard it afterwards.
pub struct Importer<'a, S: Store + ?Sized> {
    store: &'a S,
    config: ImportConfig,
    client: reqwest::Client,
    max_documents: Option<usize>,
    collections: CollectionCache,
    languages: LanguageCache,
    doctypes: DoctypeCache,
    users: UserCache,
    creators: CreatorCache,
    script_user: Option<User>,
    team_user: Option<User>,
}

impl<'a, S: Store + ?Sized> Importer<'a, S> {
    pub fn new(store: &'a S, config: ImportConfig) -> Self {
        Self {
            store,
            config,
            client: reqwest::Client::new(),
            max_documents: None,
            collections: CollectionCache::default(),
            languages: LanguageCache::default(),
            doctypes: DoctypeCache::default(),
            users: UserCache::default(),
            creators: CreatorCache::default(),
            script_user: None,
            team_user: None,
        }
    }

    /// Apply a row-count ceiling to the metadata table, for fast partial runs.
    pub fn with_max_documents(mut self, max: Option<usize>) -> Self {
        self.max_documents = max;
        self
    }

    /// Load fixture identities and resolve the system users.
    ///
    /// The automation and team identities must already exist; a missing one
    /// is a fatal bootstrap error.
    pub async fn setup(&mut self) -> ImportResult<()> {
        fixtures::load_historic_users(self.store).await?;

        self.script_user = Some(
            self.store
                .get_user_by_username(&self.config.script_username)
                .await?,
        );
        self.team_user = Some(
            self.store
                .get_user_by_username(&self.config.team_username)
                .await?,
        );

        // known exception: this name carries an accent in the account record
        // and would not resolve through name lookup
        let naim = self.store.get_user_by_username("nvanthieghem").await?;
        self.users.insert("Naim Vanthieghem", naim);

        // citation creators are rebuilt each run, then cached by last name
        fixtures::load_source_creators(self.store).await?;
        self.creators.load(self.store).await?;
        Ok(())
    }

    /// Run the whole pipeline against the configured row sources.
    pub async fn run(&mut self) -> ImportResult<ImportStats> {
        self.setup().await?;

        let libraries =
            reader::fetch_table(&self.client, &self.config, "libraries", None).await?;
        let collections = self.import_collections_from(&libraries).await?;

        let languages =
            reader::fetch_table(&self.client, &self.config, "languages", None).await?;
        let language_count = self.import_languages_from(&languages).await?;

        let metadata =
            reader::fetch_table(&self.client, &self.config, "metadata", self.max_documents)
                .await?;
        let doc_stats = self.import_documents_from(&metadata).await?;

        Ok(ImportStats {
            collections,
            languages: language_count,
            ..doc_stats
        })
    }

    fn script_user(&self) -> StoreResult<&User> {
        self.script_user
            .as_ref()
            .ok_or_else(|| StoreError::UserNotFound(self.config.script_username.clone()))
    }

    fn team_user(&self) -> StoreResult<User> {
        self.team_user
            .clone()
            .ok_or_else(|| StoreError::UserNotFound(self.config.team_username.clone()))
    }

    /// Record the creation of an imported object by the script identity.
    async fn log_creation(
        &self,
        kind: ObjectKind,
        object_id: Id,
        object_repr: &str,
    ) -> StoreResult<()> {
        self.store
            .create_log_entry(
                self.script_user()?.id,
                kind,
                object_id,
                object_repr,
                history::IMPORT_MSG,
                EventKind::Addition,
                chrono::Utc::now(),
            )
            .await?;
        Ok(())
    }

    // -- collections ---------------------------------------------------------

    /// Import the libraries sheet: one collection per row that names a
    /// library or collection, keyed for lookup by its composite code.
    pub async fn import_collections_from(&mut self, table: &Table) -> ImportResult<usize> {
        self.store.delete_all_collections().await?;

        let mut count = 0;
        for row in &table.rows {
            // must have at least a library or a collection name
            if row.get("library").is_empty() && row.get("collection").is_empty() {
                continue;
            }
            let collection = self
                .store
                .create_collection(NewCollection {
                    library: row.get("library").to_string(),
                    lib_abbrev: row.get("lib_abbrev").to_string(),
                    abbrev: row.get("abbrev").to_string(),
                    location: row.get("location").to_string(),
                    name: row.get("collection").to_string(),
                })
                .await?;

            // one institution reuses a single library code for several
            // sub-collections; key those by code + collection abbreviation
            let mut lookup_code = row.get("current").to_string();
            if lookup_code == AMBIGUOUS_LIB_CODE {
                lookup_code = format!("{}_{}", AMBIGUOUS_LIB_CODE, row.get("abbrev"));
            }

            let repr = if collection.name.is_empty() {
                collection.library.clone()
            } else {
                collection.name.clone()
            };
            self.log_creation(ObjectKind::Collection, collection.id, &repr)
                .await?;
            self.collections.insert(lookup_code, collection);
            count += 1;
        }

        info!("Imported {} collections", count);
        Ok(count)
    }

    // -- languages -----------------------------------------------------------

    /// Import the languages sheet and populate the label lookup.
    pub async fn import_languages_from(&mut self, table: &Table) -> ImportResult<usize> {
        self.store.delete_all_language_scripts().await?;

        let mut count = 0;
        for row in &table.rows {
            if row.get("language").is_empty() && row.get("script").is_empty() {
                continue;
            }
            let display_name = row.get("display_name");
            let language = self
                .store
                .create_language_script(
                    row.get("language"),
                    row.get("script"),
                    (!display_name.is_empty()).then_some(display_name),
                )
                .await?;

            // lookup key is the spreadsheet alias when set, or display name
            let key = if !row.get("spreadsheet_name").is_empty() {
                row.get("spreadsheet_name")
            } else {
                display_name
            };
            let repr = format!("{} ({})", language.language, language.script);
            self.log_creation(ObjectKind::LanguageScript, language.id, &repr)
                .await?;
            if !key.is_empty() {
                self.languages.insert(key, language);
            }
            count += 1;
        }

        info!("Imported {} languages", count);
        Ok(count)
    }

    // -- documents -----------------------------------------------------------

    /// Import the metadata sheet: the main per-row pass, then the deferred
    /// join pass, then the id-sequence finalizer.
    pub async fn import_documents_from(&mut self, table: &Table) -> ImportResult<ImportStats> {
        self.store.delete_all_documents().await?;
        self.store.delete_all_fragments().await?;
        self.store.delete_log_entries(ObjectKind::Document).await?;

        let team_user = self.team_user()?;
        let mut stats = ImportStats::default();
        let mut joins: Vec<(Id, String, String)> = Vec::new();

        for row in &table.rows {
            // a type with a delimiter marks an unresolved multi-document row
            if row.get("type").contains(';') {
                warn!(pgpid = row.get("pgpid"), "skipping row (demerge)");
                stats.skipped += 1;
                continue;
            }
            let pgpid: Id = match row.get("pgpid").parse() {
                Ok(id) => id,
                Err(_) => {
                    error!(pgpid = row.get("pgpid"), "skipping row (bad id)");
                    stats.skipped += 1;
                    continue;
                }
            };

            let doctype = self.doctypes.get_or_create(self.store, row.get("type")).await?;
            let fragment = self.get_fragment(row).await?;

            let tags: Vec<String> = row
                .get("tags")
                .split('#')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect();
            let document = self
                .store
                .create_document(pgpid, doctype.map(|d| d.id), row.get("description"), tags)
                .await?;

            // associate the fragment via a text block with placement metadata
            self.store
                .create_text_block(
                    document.id,
                    fragment.id,
                    Side::from_label(row.get("recto_verso")),
                    row.get("text_block"),
                    row.get("multifragment"),
                )
                .await?;

            self.add_document_language(document.id, row.get("language")).await?;

            let repr = format!("{} (PGPID {})", row.get("shelfmark"), pgpid);
            let events = history::reconstruct_edit_history(
                self.store,
                &mut self.users,
                &team_user,
                row.get("input_by"),
                row.get("date_entered"),
                pgpid,
            )
            .await?;
            history::persist_edit_history(
                self.store,
                self.script_user()?,
                document.id,
                &repr,
                &events,
            )
            .await?;

            // parse editor & translator text into sources and footnotes;
            // the translator column additionally carries the translation flag
            let editor = row.get("editor").trim_matches('.');
            if !editor.is_empty() {
                citation::parse_editor(self.store, &self.creators, document.id, editor, false)
                    .await?;
            }
            let translator = row.get("translator");
            if !translator.is_empty() {
                citation::parse_editor(self.store, &self.creators, document.id, translator, true)
                    .await?;
            }

            // joins are handled on a second pass, once every document exists
            let join = row.get("joins").trim();
            if !join.is_empty() {
                joins.push((document.id, row.get("shelfmark").to_string(), join.to_string()));
            }
            stats.documents += 1;
        }

        // second pass: attach the remaining fragments of each join
        for (document_id, initial_shelfmark, join) in &joins {
            for shelfmark in join.split(" + ") {
                // the first listed shelfmark is already associated
                if shelfmark == initial_shelfmark {
                    continue;
                }
                let fragment = self.get_or_create_stub_fragment(shelfmark).await?;
                self.store
                    .create_text_block(*document_id, fragment.id, None, "", "")
                    .await?;
            }
        }
        stats.joins = joins.len();

        // rows supply explicit ids; resync the generator so future inserts
        // cannot collide
        let floor = self.store.sync_document_id_sequence().await?;
        info!(
            "Imported {} documents, {} with joins; skipped {} (id sequence at {})",
            stats.documents, stats.joins, stats.skipped, floor
        );
        Ok(stats)
    }

    /// Resolve or create the fragment for a metadata row.
    async fn get_fragment(&self, row: &Row) -> ImportResult<Fragment> {
        let shelfmark = row.get("shelfmark");
        if let Some(fragment) = self.store.find_fragment_by_shelfmark(shelfmark).await? {
            return Ok(fragment);
        }

        let fragment = self
            .store
            .create_fragment(NewFragment {
                shelfmark: shelfmark.to_string(),
                collection_id: self.get_collection(row),
                old_shelfmarks: row.get("shelfmark_historic").to_string(),
                is_multifragment: !row.get("multifragment").is_empty(),
                url: row.get("image_link").to_string(),
                iiif_url: derive_iiif_url(row.get("image_link")),
            })
            .await?;
        self.log_creation(ObjectKind::Fragment, fragment.id, &fragment.shelfmark)
            .await?;
        Ok(fragment)
    }

    /// Find the collection for a row, differentiating the shared library
    /// code by shelfmark prefix.
    fn get_collection(&self, row: &Row) -> Option<Id> {
        let mut lib_code = row.get("library").trim().to_string();
        if lib_code == AMBIGUOUS_LIB_CODE {
            for prefix in AMBIGUOUS_LIB_PREFIXES {
                if row.get("shelfmark").starts_with(prefix) {
                    lib_code = format!(
                        "{}_{}",
                        AMBIGUOUS_LIB_CODE,
                        prefix.replace("CUL ", "")
                    );
                    break;
                }
            }
            if lib_code == AMBIGUOUS_LIB_CODE {
                warn!(
                    shelfmark = row.get("shelfmark"),
                    "collection not determined for shared library code"
                );
            }
        }
        self.collections.get(&lib_code).map(|c| c.id)
    }

    /// Resolve a join shelfmark, creating a stub fragment when absent.
    async fn get_or_create_stub_fragment(&self, shelfmark: &str) -> ImportResult<Fragment> {
        if let Some(fragment) = self.store.find_fragment_by_shelfmark(shelfmark).await? {
            return Ok(fragment);
        }
        let fragment = self
            .store
            .create_fragment(NewFragment {
                shelfmark: shelfmark.to_string(),
                ..Default::default()
            })
            .await?;
        self.log_creation(ObjectKind::Fragment, fragment.id, shelfmark)
            .await?;
        Ok(fragment)
    }

    /// Parse the language field into definite/probable sets and a note.
    ///
    /// A trailing "?" marks a language as probable; parenthesized non-"?"
    /// text is preserved as a note. A label asserted both ways is an error
    /// and is rejected from both sets.
    async fn add_document_language(&self, document_id: Id, field: &str) -> ImportResult<()> {
        if field.is_empty() {
            return Ok(());
        }

        let mut notes: Vec<String> = Vec::new();
        let mut definite: Vec<Id> = Vec::new();
        let mut probable: Vec<Id> = Vec::new();

        for raw in field.split(';').map(str::trim) {
            if raw.is_empty() {
                continue;
            }
            // keep the full entry as a note when it carries a parenthetical
            if RE_LANG_NOTE.is_match(raw) {
                notes.push(raw.to_string());
            }
            let is_probable = raw.contains('?');
            let cleaned = RE_PARENTHETICAL.replace_all(raw, "").replace("some", "");
            let label = cleaned.trim_matches(['?', ' ']);

            match self.languages.get(label) {
                None => error!(document_id, language = label, "language not found"),
                Some(language) => {
                    let set = if is_probable { &mut probable } else { &mut definite };
                    if !set.contains(&language.id) {
                        set.push(language.id);
                    }
                }
            }
        }

        // surfaced to the operator rather than silently fixed
        let conflicted: Vec<Id> = definite
            .iter()
            .copied()
            .filter(|id| probable.contains(id))
            .collect();
        for language_id in &conflicted {
            error!(
                document_id,
                language_id,
                "language asserted as both definite and probable; rejected"
            );
        }
        definite.retain(|id| !conflicted.contains(id));
        probable.retain(|id| !conflicted.contains(id));

        if !definite.is_empty() || !probable.is_empty() || !notes.is_empty() {
            self.store
                .set_document_languages(document_id, definite, probable, &notes.join("\n"))
                .await?;
        }
        Ok(())
    }
}

/// Derive an image-manifest link from an external image link when possible.
///
/// Cambridge digital library view links use the same id as their manifest
/// links; the trailing page indicator is dropped. Anything else derives an
/// empty string.
pub fn derive_iiif_url(image_link: &str) -> String {
    if image_link.contains("cudl.lib.cam.ac.uk/view/") {
        let iiif = image_link.replace("/view/", "/iiif/");
        return RE_VIEW_PAGE.replace(&iiif, "").into_owned();
    }
    String::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use crate::models::DocRelation;
    use crate::reader::parse_table;
    use crate::store::memory::MemoryStore;

    const LIBRARIES_CSV: &str = "\
Library,Current List of Libraries,Library abbreviation,Collection abbreviation,Location (current),Collection (if different from library)
Cambridge University Library,CUL,CUL,T-S,\"Cambridge, UK\",Taylor-Schechter
Cambridge University Library,CUL,CUL,Or.,\"Cambridge, UK\",Oriental Manuscripts
Bodleian Library,BODL,Bodl,MS,Oxford,
,,,,,
";

    const LANGUAGES_CSV: &str = "\
Language,Script,Display name,Spreadsheet name
Judaeo-Arabic,Hebrew,Judaeo-Arabic,
Hebrew,Hebrew,Hebrew,
Arabic,Arabic,Arabic,
Aramaic,Hebrew,Aramaic,aramaic
";

    async fn importer(store: &MemoryStore) -> Importer<'_, MemoryStore> {
        fixtures::ensure_system_users(store, "script", "team")
            .await
            .unwrap();
        let mut importer = Importer::new(store, ImportConfig::new(HashMap::new()));
        importer.setup().await.unwrap();
        importer
    }

    async fn load_reference_tables(importer: &mut Importer<'_, MemoryStore>) {
        let libraries = parse_table("libraries", LIBRARIES_CSV.as_bytes(), None).unwrap();
        importer.import_collections_from(&libraries).await.unwrap();
        let languages = parse_table("languages", LANGUAGES_CSV.as_bytes(), None).unwrap();
        importer.import_languages_from(&languages).await.unwrap();
    }

    fn metadata_row(pairs: &[(&str, &str)]) -> Row {
        Row::from_pairs(pairs.iter().map(|(k, v)| (*k, *v)))
    }

    fn metadata_table(rows: Vec<Row>) -> Table {
        Table {
            name: "metadata".to_string(),
            fields: Vec::new(),
            rows,
        }
    }

    #[tokio::test]
    async fn test_collection_import_keys_shared_code_by_abbreviation() {
        let store = MemoryStore::new();
        let mut importer = importer(&store).await;
        let libraries = parse_table("libraries", LIBRARIES_CSV.as_bytes(), None).unwrap();

        let count = importer.import_collections_from(&libraries).await.unwrap();
        assert_eq!(count, 3);
        assert!(importer.collections.get("CUL_T-S").is_some());
        assert!(importer.collections.get("CUL_Or.").is_some());
        assert!(importer.collections.get("BODL").is_some());
        assert!(importer.collections.get("CUL").is_none());
    }

    #[tokio::test]
    async fn test_language_import_prefers_spreadsheet_alias() {
        let store = MemoryStore::new();
        let mut importer = importer(&store).await;
        let languages = parse_table("languages", LANGUAGES_CSV.as_bytes(), None).unwrap();

        let count = importer.import_languages_from(&languages).await.unwrap();
        assert_eq!(count, 4);
        assert!(importer.languages.get("judaeo-arabic").is_some());
        assert!(importer.languages.get("aramaic").is_some());
    }

    #[tokio::test]
    async fn test_same_shelfmark_yields_one_fragment() {
        let store = MemoryStore::new();
        let mut importer = importer(&store).await;
        load_reference_tables(&mut importer).await;

        let table = metadata_table(vec![
            metadata_row(&[
                ("pgpid", "1"),
                ("shelfmark", "T-S 8J22.21"),
                ("library", "CUL"),
                ("type", "Letter"),
                ("description", "A letter"),
            ]),
            metadata_row(&[
                ("pgpid", "2"),
                ("shelfmark", "T-S 8J22.21"),
                ("library", "CUL"),
                ("type", "Legal document"),
                ("description", "Verso reuse"),
            ]),
        ]);
        importer.import_documents_from(&table).await.unwrap();

        assert_eq!(store.fragment_count(), 1);
        assert_eq!(store.text_blocks_for(1).len(), 1);
        assert_eq!(store.text_blocks_for(2).len(), 1);
    }

    #[tokio::test]
    async fn test_demerge_rows_are_counted_and_skipped() {
        let store = MemoryStore::new();
        let mut importer = importer(&store).await;
        load_reference_tables(&mut importer).await;

        let table = metadata_table(vec![
            metadata_row(&[
                ("pgpid", "1"),
                ("shelfmark", "T-S 8J22.21"),
                ("library", "CUL"),
                ("type", "Letter; Legal document"),
            ]),
            metadata_row(&[
                ("pgpid", "2"),
                ("shelfmark", "T-S NS J193"),
                ("library", "CUL"),
                ("type", "Letter"),
            ]),
        ]);
        let stats = importer.import_documents_from(&table).await.unwrap();

        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.documents, 1);
        assert!(store.document(1).is_none());
        assert!(store.document(2).is_some());
    }

    #[tokio::test]
    async fn test_join_attaches_only_missing_fragments() {
        let store = MemoryStore::new();
        let mut importer = importer(&store).await;
        load_reference_tables(&mut importer).await;

        let table = metadata_table(vec![metadata_row(&[
            ("pgpid", "1"),
            ("shelfmark", "T-S 8J22.21"),
            ("library", "CUL"),
            ("type", "Letter"),
            ("joins", "T-S 8J22.21 + T-S NS J193"),
        ])]);
        let stats = importer.import_documents_from(&table).await.unwrap();

        assert_eq!(stats.joins, 1);
        // the first listed shelfmark is not re-resolved or duplicated
        assert_eq!(store.fragment_count(), 2);
        assert_eq!(store.text_blocks_for(1).len(), 2);
    }

    #[tokio::test]
    async fn test_cul_collection_inferred_from_shelfmark_prefix() {
        let store = MemoryStore::new();
        let mut importer = importer(&store).await;
        load_reference_tables(&mut importer).await;

        let table = metadata_table(vec![metadata_row(&[
            ("pgpid", "1"),
            ("shelfmark", "T-S 12.34"),
            ("library", "CUL"),
            ("type", "Letter"),
        ])]);
        importer.import_documents_from(&table).await.unwrap();

        let fragment = store
            .find_fragment_by_shelfmark("T-S 12.34")
            .await
            .unwrap()
            .unwrap();
        let expected = importer.collections.get("CUL_T-S").unwrap().id;
        assert_eq!(fragment.collection_id, Some(expected));
    }

    #[tokio::test]
    async fn test_language_parsing_definite_probable_and_note() {
        let store = MemoryStore::new();
        let mut importer = importer(&store).await;
        load_reference_tables(&mut importer).await;

        let table = metadata_table(vec![metadata_row(&[
            ("pgpid", "1"),
            ("shelfmark", "T-S 12.34"),
            ("library", "CUL"),
            ("type", "Letter"),
            ("language", "Judaeo-Arabic; Hebrew?; some Arabic (address)"),
        ])]);
        importer.import_documents_from(&table).await.unwrap();

        let doc = store.document(1).unwrap();
        assert_eq!(doc.language_ids.len(), 2); // Judaeo-Arabic + Arabic
        assert_eq!(doc.probable_language_ids.len(), 1); // Hebrew?
        assert!(doc.language_note.contains("(address)"));
    }

    #[tokio::test]
    async fn test_language_in_both_sets_is_rejected() {
        let store = MemoryStore::new();
        let mut importer = importer(&store).await;
        load_reference_tables(&mut importer).await;

        let table = metadata_table(vec![metadata_row(&[
            ("pgpid", "1"),
            ("shelfmark", "T-S 12.34"),
            ("library", "CUL"),
            ("type", "Letter"),
            ("language", "Hebrew; Hebrew?"),
        ])]);
        importer.import_documents_from(&table).await.unwrap();

        let doc = store.document(1).unwrap();
        assert!(doc.language_ids.is_empty());
        assert!(doc.probable_language_ids.is_empty());
    }

    #[tokio::test]
    async fn test_ignored_editor_text_creates_no_source() {
        let store = MemoryStore::new();
        let mut importer = importer(&store).await;
        load_reference_tables(&mut importer).await;

        let table = metadata_table(vec![metadata_row(&[
            ("pgpid", "1"),
            ("shelfmark", "T-S 12.34"),
            ("library", "CUL"),
            ("type", "Letter"),
            ("editor", "Awaiting transcription."),
        ])]);
        importer.import_documents_from(&table).await.unwrap();

        assert_eq!(store.source_count(), 0);
        assert!(store.footnotes().is_empty());
    }

    #[tokio::test]
    async fn test_editor_citation_creates_source_and_footnote() {
        let store = MemoryStore::new();
        let mut importer = importer(&store).await;
        load_reference_tables(&mut importer).await;

        let table = metadata_table(vec![metadata_row(&[
            ("pgpid", "1"),
            ("shelfmark", "T-S 12.34"),
            ("library", "CUL"),
            ("type", "Letter"),
            ("editor", "Ed. Goitein, Mediterranean Society, vol. 2, pp. 45-50 (1971)"),
        ])]);
        importer.import_documents_from(&table).await.unwrap();

        assert_eq!(store.source_count(), 1);
        let footnotes = store.footnotes();
        assert_eq!(footnotes.len(), 1);
        assert!(footnotes[0].location.contains("pp. 45-50"));
        assert!(footnotes[0].doc_relation.contains(&DocRelation::Edition));

        let sources = store.sources();
        assert_eq!(sources[0].title, "Mediterranean Society");
        assert_eq!(sources[0].volume, "2");
        assert_eq!(sources[0].year.as_deref(), Some("1971"));
    }

    #[tokio::test]
    async fn test_translator_column_sets_translation_flag() {
        let store = MemoryStore::new();
        let mut importer = importer(&store).await;
        load_reference_tables(&mut importer).await;

        let table = metadata_table(vec![metadata_row(&[
            ("pgpid", "1"),
            ("shelfmark", "T-S 12.34"),
            ("library", "CUL"),
            ("type", "Letter"),
            ("translator", "Ed. Goitein, Mediterranean Society, vol. 2"),
        ])]);
        importer.import_documents_from(&table).await.unwrap();

        let footnotes = store.footnotes();
        assert_eq!(footnotes.len(), 1);
        assert!(footnotes[0].doc_relation.contains(&DocRelation::Translation));
        assert!(footnotes[0].doc_relation.contains(&DocRelation::Edition));
    }

    #[tokio::test]
    async fn test_unknown_citation_author_skips_reference_not_row() {
        let store = MemoryStore::new();
        let mut importer = importer(&store).await;
        load_reference_tables(&mut importer).await;

        let table = metadata_table(vec![
            metadata_row(&[
                ("pgpid", "1"),
                ("shelfmark", "T-S 12.34"),
                ("library", "CUL"),
                ("type", "Letter"),
                ("editor", "Ed. Nobody, Lost Book"),
            ]),
            metadata_row(&[
                ("pgpid", "2"),
                ("shelfmark", "T-S 12.35"),
                ("library", "CUL"),
                ("type", "Letter"),
            ]),
        ]);
        let stats = importer.import_documents_from(&table).await.unwrap();

        // the citation failed but both rows imported
        assert_eq!(stats.documents, 2);
        assert_eq!(store.source_count(), 0);
    }

    #[tokio::test]
    async fn test_edit_history_persisted_with_import_marker() {
        let store = MemoryStore::new();
        let mut importer = importer(&store).await;
        load_reference_tables(&mut importer).await;

        let table = metadata_table(vec![metadata_row(&[
            ("pgpid", "7"),
            ("shelfmark", "T-S 12.34"),
            ("library", "CUL"),
            ("type", "Letter"),
            ("input_by", "Geoffrey Khan; Oded Zinger"),
            ("date_entered", "3/5/1990; 6/2/2010"),
        ])]);
        importer.import_documents_from(&table).await.unwrap();

        let entries = store.log_entries_for(ObjectKind::Document, 7);
        assert_eq!(entries.len(), 3);
        assert!(entries[0].change_message.contains("Initial data entry"));
        assert!(entries[1].change_message.contains("Major revision"));
        assert_eq!(entries[2].change_message, history::IMPORT_MSG);
    }

    #[tokio::test]
    async fn test_id_sequence_synced_to_max_imported_id() {
        let store = MemoryStore::new();
        let mut importer = importer(&store).await;
        load_reference_tables(&mut importer).await;

        let table = metadata_table(vec![
            metadata_row(&[
                ("pgpid", "4521"),
                ("shelfmark", "T-S 12.34"),
                ("library", "CUL"),
                ("type", "Letter"),
            ]),
            metadata_row(&[
                ("pgpid", "12"),
                ("shelfmark", "T-S 12.35"),
                ("library", "CUL"),
                ("type", "Letter"),
            ]),
        ]);
        importer.import_documents_from(&table).await.unwrap();

        assert_eq!(store.document_seq(), 4521);
    }

    #[tokio::test]
    async fn test_tags_split_on_hash() {
        let store = MemoryStore::new();
        let mut importer = importer(&store).await;
        load_reference_tables(&mut importer).await;

        let table = metadata_table(vec![metadata_row(&[
            ("pgpid", "1"),
            ("shelfmark", "T-S 12.34"),
            ("library", "CUL"),
            ("type", "Letter"),
            ("tags", "trade # india # spices"),
        ])]);
        importer.import_documents_from(&table).await.unwrap();

        let doc = store.document(1).unwrap();
        assert_eq!(doc.tags, vec!["trade", "india", "spices"]);
    }

    #[tokio::test]
    async fn test_recto_verso_mapped_through_label_table() {
        let store = MemoryStore::new();
        let mut importer = importer(&store).await;
        load_reference_tables(&mut importer).await;

        let table = metadata_table(vec![metadata_row(&[
            ("pgpid", "1"),
            ("shelfmark", "T-S 12.34"),
            ("library", "CUL"),
            ("type", "Letter"),
            ("recto_verso", "recto"),
            ("text_block", "b"),
        ])]);
        importer.import_documents_from(&table).await.unwrap();

        let blocks = store.text_blocks_for(1);
        assert_eq!(blocks[0].side, Some(Side::Recto));
        assert_eq!(blocks[0].extent_label, "b");
    }

    #[test]
    fn test_derive_iiif_url() {
        assert_eq!(
            derive_iiif_url("https://cudl.lib.cam.ac.uk/view/MS-TS-00012-00034/1"),
            "https://cudl.lib.cam.ac.uk/iiif/MS-TS-00012-00034"
        );
        assert_eq!(derive_iiif_url("https://example.org/image.jpg"), "");
        assert_eq!(derive_iiif_url(""), "");
    }
}
