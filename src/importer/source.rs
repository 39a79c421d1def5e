//! Source resolution: residual citation text into deduplicated sources.
//!
//! The residual text (after the extraction cascade) is split into ordered
//! parts: authors first, then title, then content-sniffed volume / location /
//! language / notes. The resulting identity tuple is matched against
//! previously created sources; a match is merged into, a miss creates a new
//! source with a provenance note and ordered authorship.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

use crate::error::StoreResult;
use crate::models::{Id, Source, SourceType};
use crate::resolve::CreatorCache;
use crate::store::{NewSource, SourceCriteria, Store};

static RE_URL: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?P<url>https://[^ ]+)").unwrap());

/// 4-digit year, tolerant of a date-range ("1971–1972") or month-prefixed
/// ("05/1971") variant; a non-exact match is recorded as a note.
static RE_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?P<full>(\d{4}[-–]|\d{2}/)?(?P<year>\d{4}))\b").unwrap());

/// Chunk boundary: commas, parentheses, brackets, semicolons.
static RE_PART_SPLIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[,()\[\];]").unwrap());

/// Author-name boundary within the leading part.
static RE_AUTHOR_SPLIT: Lazy<Regex> = Lazy::new(|| Regex::new(r", | and ").unwrap());

/// Known multi-author citations that a naive comma split would mis-segment.
const SPECIAL_CASE_AUTHORS: &[&str] = &[
    "Lorenzo Bondioli, Tamer el-Leithy, Joshua Picard, Marina Rustow and Zain Shirazi",
    "Khan, el-Leithy, Rustow and Vanthieghem",
    "Oded Zinger, Naim Vanthieghem and Marina Rustow",
];

/// Phrases indicating an unpublished source.
const UNPUBLISHED_TERMS: &[&str] = &["typed texts", "unpublished", "handwritten texts"];

/// Languages recognized in citation parts.
const SOURCE_LANGUAGES: &[&str] = &["Hebrew", "German"];

/// A resolved (found or created) source plus location parts sniffed from the
/// citation, which belong on the footnote.
#[derive(Debug, Clone)]
pub struct ResolvedSource {
    pub source: Source,
    pub locations: Vec<String>,
}

/// Classify the source type from the working text and the raw title.
fn classify_source_type(text: &str, raw_title: &str) -> SourceType {
    if text.contains("diss") {
        SourceType::Dissertation
    } else if raw_title.is_empty() {
        // no title indicates an in-house edition
        SourceType::Unpublished
    } else if UNPUBLISHED_TERMS.iter().any(|term| text.contains(term)) {
        SourceType::Unpublished
    } else if raw_title.starts_with('\'') || raw_title.starts_with('"') {
        SourceType::Article
    } else {
        SourceType::Book
    }
}

/// Resolve the source for one citation, deduplicating against previously
/// created sources.
///
/// Returns [`StoreError::CreatorNotFound`](crate::error::StoreError) when an
/// author cannot be resolved by last name; the caller treats that as a
/// per-reference failure.
pub async fn resolve_source<S: Store + ?Sized>(
    store: &S,
    creators: &CreatorCache,
    document_id: Id,
    citation: &str,
) -> StoreResult<ResolvedSource> {
    let mut note_lines: Vec<String> = Vec::new();
    let mut text = citation.to_string();

    // pull out an embedded url to simplify the part split
    let mut url = String::new();
    if let Some(m) = RE_URL.find(&text) {
        url = m.as_str().to_string();
        text = text.replace(&url, "").trim().to_string();
    }

    // pull out a 4-digit year; a range or month prefix goes to the notes
    let mut year: Option<String> = None;
    if let Some(caps) = RE_YEAR.captures(&text) {
        let full = caps["full"].to_string();
        let y = caps["year"].to_string();
        if full != y {
            note_lines.push(full.clone());
            text = text.replace(&full, "").trim_matches([' ', '.', ',']).to_string();
        }
        year = Some(y);
    }

    // split into ordered parts; three known author lists would be
    // mis-segmented by the generic split
    let mut parts: Vec<String> = Vec::new();
    for special_case in SPECIAL_CASE_AUTHORS {
        if text.starts_with(special_case) {
            parts.push(special_case.to_string());
            let remainder = text[special_case.len()..].trim_start_matches([' ', ',', ';', '.']);
            parts.extend(RE_PART_SPLIT.split(remainder).map(|p| p.trim().to_string()));
            break;
        }
    }
    if parts.is_empty() {
        parts = RE_PART_SPLIT
            .split(&text)
            .map(|p| p.trim().to_string())
            .collect();
    }

    // authors always listed first
    let mut parts = parts.into_iter();
    let author_part = parts.next().unwrap_or_default();
    let mut authors = Vec::new();
    for name in RE_AUTHOR_SPLIT.split(&author_part) {
        authors.push(creators.get(name)?);
    }

    // if there are more parts, the second is the title
    let raw_title = parts.next().unwrap_or_default();
    let source_type = classify_source_type(&text, &raw_title);
    let title = raw_title.trim_matches(['"', '\'']).trim().to_string();

    // sniff the remaining parts
    let mut volume = String::new();
    let mut language = String::new();
    let mut locations: Vec<String> = Vec::new();
    for part in parts {
        if part.is_empty() {
            continue;
        }
        if part.contains("vol.") {
            volume = part.replace("vol.", "").trim().to_string();
        } else if ["Doc", "pp.", "#", " at "].iter().any(|v| part.contains(v)) {
            locations.push(part);
        } else if SOURCE_LANGUAGES.contains(&part.as_str()) {
            language = part;
        } else {
            note_lines.push(part);
        }
    }

    // dedup identity: title, volume, type, author last names + count,
    // and year only when there is no title
    let criteria = SourceCriteria {
        title: title.clone(),
        volume: volume.clone(),
        source_type: Some(source_type),
        author_last_names: authors.iter().map(|a| a.last_name.clone()).collect(),
        author_count: authors.len(),
        year: if title.is_empty() { year.clone() } else { None },
    };
    let candidates = store.find_sources(&criteria).await?;
    if candidates.len() > 1 {
        // no documented tie-break rule exists for this data; first match wins
        warn!(
            authors = %criteria.author_last_names.join("; "),
            title = %title,
            source_type = source_type.as_str(),
            "found multiple sources"
        );
    }

    if let Some(mut source) = candidates.into_iter().next() {
        let mut updated = false;
        // set year if available and not already known
        if !title.is_empty() && source.year.is_none() && year.is_some() {
            source.year = year;
            updated = true;
        }
        // append any new note information to existing notes
        if !note_lines.is_empty() {
            if !source.notes.is_empty() {
                note_lines.insert(0, source.notes.clone());
            }
            source.notes = note_lines.join("\n");
            updated = true;
        }
        if updated {
            store.update_source(&source).await?;
        }
        return Ok(ResolvedSource { source, locations });
    }

    // existing source not found; create a new one
    let mut notes = vec![format!("Created from PGPID {document_id}")];
    notes.extend(note_lines);
    let mut source = store
        .create_source(NewSource {
            source_type: Some(source_type),
            title,
            year,
            volume,
            url,
            notes: notes.join("\n"),
            languages: if language.is_empty() {
                Vec::new()
            } else {
                vec![language]
            },
        })
        .await?;

    // attach authors, preserving listed order
    let author_ids: Vec<Id> = authors.iter().map(|a| a.id).collect();
    store.set_source_authors(source.id, &author_ids).await?;
    source.author_ids = author_ids;

    Ok(ResolvedSource { source, locations })
}
