//! Entity resolution caches.
//!
//! In-memory mappings that make repeated lookups idempotent within one
//! import run. Each cache is an explicit object constructed at pipeline
//! start and passed into the importer stages; none of them is invalidated
//! mid-run, and all are discarded with the run.
//!
//! Caches backed by get-or-create ([`DoctypeCache`]) may create entities;
//! caches over fixture data ([`CreatorCache`], the user lookups behind
//! [`UserCache`]) fail loudly instead, since those records are expected to
//! exist from the bootstrap step.

use std::collections::HashMap;

use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::models::{Collection, Creator, DocumentType, Id, LanguageScript, User};
use crate::store::Store;

// =============================================================================
// Collection cache
// =============================================================================

/// Composite collection code -> collection, populated by the collection
/// importer and read during fragment creation.
#[derive(Debug, Default)]
pub struct CollectionCache {
    by_code: HashMap<String, Collection>,
}

impl CollectionCache {
    pub fn insert(&mut self, code: impl Into<String>, collection: Collection) {
        self.by_code.insert(code.into(), collection);
    }

    pub fn get(&self, code: &str) -> Option<&Collection> {
        self.by_code.get(code)
    }

    pub fn len(&self) -> usize {
        self.by_code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_code.is_empty()
    }
}

// =============================================================================
// Language cache
// =============================================================================

/// Case-insensitive label -> language entity.
///
/// Keys are the lower-cased spreadsheet alias when one exists, otherwise the
/// lower-cased display name.
#[derive(Debug, Default)]
pub struct LanguageCache {
    by_label: HashMap<String, LanguageScript>,
}

impl LanguageCache {
    pub fn insert(&mut self, label: &str, language: LanguageScript) {
        self.by_label.insert(label.to_lowercase(), language);
    }

    pub fn get(&self, label: &str) -> Option<&LanguageScript> {
        self.by_label.get(&label.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.by_label.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_label.is_empty()
    }
}

// =============================================================================
// Document type cache
// =============================================================================

/// Type label -> document type, get-or-create against the store.
#[derive(Debug, Default)]
pub struct DoctypeCache {
    by_name: HashMap<String, DocumentType>,
}

impl DoctypeCache {
    /// Resolve a type label, creating the entity on first occurrence.
    /// Empty labels resolve to `None`.
    pub async fn get_or_create<S: Store + ?Sized>(
        &mut self,
        store: &S,
        label: &str,
    ) -> StoreResult<Option<DocumentType>> {
        let label = label.trim();
        if label.is_empty() {
            return Ok(None);
        }
        if let Some(doctype) = self.by_name.get(label) {
            return Ok(Some(doctype.clone()));
        }
        let doctype = store.get_or_create_doctype(label).await?;
        self.by_name.insert(label.to_string(), doctype.clone());
        Ok(Some(doctype))
    }
}

// =============================================================================
// User cache
// =============================================================================

/// Outcome of resolving an "input by" name against user accounts.
///
/// The fallback to the shared team identity is deliberately NOT applied
/// here; the caller owns that policy, so resolution failures stay visible.
#[derive(Debug, Clone, PartialEq)]
pub enum NameResolution {
    Matched(User),
    Unmatched,
}

/// Raw "input by" name -> resolved user account.
#[derive(Debug, Default)]
pub struct UserCache {
    by_name: HashMap<String, User>,
}

fn strip_punctuation(value: &str) -> &str {
    value.trim_matches(|c: char| c.is_ascii_punctuation() || c.is_whitespace())
}

impl UserCache {
    /// Pre-seed a mapping, used for the documented accented-name exception.
    pub fn insert(&mut self, name: impl Into<String>, user: User) {
        self.by_name.insert(name.into(), user);
    }

    /// Resolve a name to a user account.
    ///
    /// Policy: cache hit; exact case-insensitive "first last" match;
    /// initials-based match (first/last character against name prefixes);
    /// otherwise [`NameResolution::Unmatched`]. Successful lookups are
    /// cached under the requested name.
    pub async fn resolve<S: Store + ?Sized>(
        &mut self,
        store: &S,
        name: &str,
        document_id: Option<Id>,
    ) -> StoreResult<NameResolution> {
        if let Some(user) = self.by_name.get(name) {
            debug!(name, document_id, user = %user.display_name(), "using cached user");
            return Ok(NameResolution::Matched(user.clone()));
        }

        let user = if name.contains(' ') {
            // person with given name(s) and last name
            let (given, last) = match name.rsplit_once(' ') {
                Some((g, l)) => (strip_punctuation(g), strip_punctuation(l)),
                None => (name, name),
            };
            store.find_user_by_name(given, last).await?
        } else {
            let cleaned = strip_punctuation(name);
            let mut chars = cleaned.chars();
            match (chars.next(), cleaned.chars().last()) {
                (Some(first), Some(last)) => store.find_user_by_initials(first, last).await?,
                _ => None,
            }
        };

        match user {
            Some(user) => {
                debug!(name, document_id, user = %user.display_name(), "found user");
                self.by_name.insert(name.to_string(), user.clone());
                Ok(NameResolution::Matched(user))
            }
            None => Ok(NameResolution::Unmatched),
        }
    }
}

// =============================================================================
// Creator cache
// =============================================================================

/// Citation last name -> creator, loaded wholesale from fixture data.
#[derive(Debug, Default)]
pub struct CreatorCache {
    by_last_name: HashMap<String, Creator>,
}

impl CreatorCache {
    /// Load all creators from the store; last names are unique.
    pub async fn load<S: Store + ?Sized>(&mut self, store: &S) -> StoreResult<()> {
        self.by_last_name.clear();
        for creator in store.list_creators().await? {
            self.by_last_name.insert(creator.last_name.clone(), creator);
        }
        Ok(())
    }

    /// Get-must-exist lookup by the last word of a cited name.
    pub fn get(&self, name: &str) -> StoreResult<Creator> {
        let last_name = name.rsplit(' ').next().unwrap_or(name);
        self.by_last_name
            .get(last_name)
            .cloned()
            .ok_or_else(|| StoreError::CreatorNotFound(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.by_last_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_last_name.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;

    #[tokio::test]
    async fn test_doctype_cache_creates_once() {
        let store = MemoryStore::new();
        let mut cache = DoctypeCache::default();

        let a = cache.get_or_create(&store, "Letter").await.unwrap().unwrap();
        let b = cache.get_or_create(&store, "Letter").await.unwrap().unwrap();
        assert_eq!(a.id, b.id);

        assert!(cache.get_or_create(&store, "  ").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_user_resolution_full_name() {
        let store = MemoryStore::new();
        store
            .create_user("mrustow", "Marina", "Rustow", true)
            .await
            .unwrap();
        let mut cache = UserCache::default();

        let resolved = cache.resolve(&store, "marina rustow", None).await.unwrap();
        match resolved {
            NameResolution::Matched(user) => assert_eq!(user.username, "mrustow"),
            NameResolution::Unmatched => panic!("expected match"),
        }
    }

    #[tokio::test]
    async fn test_user_resolution_initials() {
        let store = MemoryStore::new();
        store
            .create_user("ozinger", "Oded", "Zinger", false)
            .await
            .unwrap();
        let mut cache = UserCache::default();

        let resolved = cache.resolve(&store, "OZ", Some(42)).await.unwrap();
        assert!(matches!(resolved, NameResolution::Matched(ref u) if u.username == "ozinger"));
    }

    #[tokio::test]
    async fn test_user_resolution_unmatched_is_visible() {
        let store = MemoryStore::new();
        let mut cache = UserCache::default();

        let resolved = cache.resolve(&store, "Nobody Here", None).await.unwrap();
        assert_eq!(resolved, NameResolution::Unmatched);
    }

    #[tokio::test]
    async fn test_user_cache_preseed_wins() {
        let store = MemoryStore::new();
        let naim = store
            .create_user("nvanthieghem", "Naim", "Vanthieghem", true)
            .await
            .unwrap();
        let mut cache = UserCache::default();
        cache.insert("Naïm Vanthieghem", naim);

        let resolved = cache
            .resolve(&store, "Naïm Vanthieghem", None)
            .await
            .unwrap();
        assert!(matches!(resolved, NameResolution::Matched(ref u) if u.username == "nvanthieghem"));
    }

    #[tokio::test]
    async fn test_creator_cache_by_last_word() {
        let store = MemoryStore::new();
        store.create_creator("Tamer", "el-Leithy").await.unwrap();
        let mut cache = CreatorCache::default();
        cache.load(&store).await.unwrap();

        let creator = cache.get("Tamer el-Leithy").unwrap();
        assert_eq!(creator.last_name, "el-Leithy");

        let err = cache.get("Unknown Person").unwrap_err();
        assert!(matches!(err, StoreError::CreatorNotFound(_)));
    }

    #[tokio::test]
    async fn test_language_cache_case_insensitive() {
        let store = MemoryStore::new();
        let lang = store
            .create_language_script("Judaeo-Arabic", "Hebrew", None)
            .await
            .unwrap();
        let mut cache = LanguageCache::default();
        cache.insert("Judaeo-Arabic", lang);

        assert!(cache.get("judaeo-arabic").is_some());
        assert!(cache.get("JUDAEO-ARABIC").is_some());
        assert!(cache.get("Coptic").is_none());
    }
}
