//! Citation parsing: editor/translator free text into footnotes.
//!
//! An editor field may carry several edition references ("; also ed. ...").
//! Each reference is checked against a placeholder ignore list, stripped of
//! its relation marker, run through an ordered extraction cascade that pulls
//! notes and locators out of the text, and handed to source resolution. A
//! footnote links the document to the resolved source; an author lookup
//! failure aborts only that reference.
//!
//! The extraction cascade is order-dependent (each stage substitutes on the
//! residual text of the previous one), so the order lives in a first-class
//! constant list.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::error;

use crate::error::{StoreError, StoreResult};
use crate::models::{DocRelation, DocRelationSet, Id};
use crate::resolve::CreatorCache;
use crate::store::{NewFootnote, Store};

use super::source::resolve_source;

/// Non-bibliographic placeholder values in the editor field; no source or
/// footnote is created for these.
pub const EDITOR_IGNORE: &[&str] = &[
    "awaiting transcription",
    "transcription listed on fgp",
    "transcription listed on fgp, awaiting digitization on pgp",
    "transcription listed in fgp, awaiting digitization on pgp",
    "source of transcription not noted in original pgp database",
    "yes",
    "partial transcription listed in fgp, awaiting digitization on pgp.",
    "partial transcription listed in fgp, awaiting digitization on pgp",
    "transcription (recto only) listed in fgp, awaiting digitization on pgp",
];

/// Boundary between edition references; the keyword is not consumed.
static RE_EDITION_BOUNDARY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)[;.] (?:also ed\.|ed\.|also)").unwrap());

/// Leading relation marker; "and trans" inside it adds the translation flag.
static RE_DOC_RELATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(. Also )?Ed\. (and transl?\.)? ?").unwrap());

/// Where an extraction stage accumulates its match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageTarget {
    Notes,
    Location,
}

/// One stage of the extraction cascade: a pattern, the named capture to
/// keep, and where it accumulates.
pub struct ExtractionStage {
    pub name: &'static str,
    pub target: StageTarget,
    pub group: &'static str,
    pub pattern: Lazy<Regex>,
}

/// The extraction cascade, in application order: explanatory notes, then
/// document locator, then page locator, then the Hebrew-numeral section
/// marker. Each stage removes what it matched before the next one runs.
pub static EXTRACTION_STAGES: [ExtractionStage; 4] = [
    ExtractionStage {
        name: "edition_notes",
        target: StageTarget::Notes,
        group: "note",
        pattern: Lazy::new(|| {
            Regex::new(
                r"(?i)[.;] (?P<note>((full )?transcription (listed|awaiting).*$|(with )?minor|with corrections).*$|awaiting digitization.*$|; edited (here )?in comparison with.*$|\. see .*$|(\(\w+ [\w ]+\) ?$))",
            )
            .unwrap()
        }),
    },
    ExtractionStage {
        name: "document_location",
        target: StageTarget::Location,
        group: "doc",
        pattern: Lazy::new(|| {
            Regex::new(r"(?i)(, )?\(?(?P<doc>(Doc\. #?|#)([A-Z]-)?\d+)\)?\.?").unwrap()
        }),
    },
    ExtractionStage {
        name: "page_location",
        target: StageTarget::Location,
        group: "pages",
        pattern: Lazy::new(|| {
            Regex::new(r"(?i)[,.] (?P<pages>((pp?|pgs)\. ?\d+([-–]\d+)?)|(\d+[-–]\d+))\.?")
                .unwrap()
        }),
    },
    ExtractionStage {
        name: "section_marker",
        target: StageTarget::Location,
        // \u{0590}-\u{05fe} is the Hebrew character range
        group: "p",
        pattern: Lazy::new(|| {
            Regex::new(
                r" (?P<p>(\d+?[\u{0590}-\u{05fe}]|[\u{0590}-\u{05fe}]\d+)[\u{0590}-\u{05fe}]?)",
            )
            .unwrap()
        }),
    },
];

/// Split an editor value into independent edition references.
///
/// Boundaries are "; "/". " followed by "also ed." / "ed." / "also"; the
/// keyword stays with the following reference.
pub fn split_editions(editor: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    for m in RE_EDITION_BOUNDARY.find_iter(editor) {
        if m.start() < start {
            continue;
        }
        parts.push(&editor[start..m.start()]);
        // skip the two-character "; " delimiter, keep the keyword
        start = m.start() + 2;
    }
    parts.push(&editor[start..]);
    parts
}

/// Check a reference against the placeholder ignore list, trailing
/// spaces/periods and case insensitively.
pub fn is_ignored(reference: &str) -> bool {
    let cleaned = reference
        .trim_end_matches([' ', '.'])
        .to_lowercase();
    EDITOR_IGNORE.contains(&cleaned.as_str())
}

/// Result of running one reference through the extraction cascade.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedReference {
    /// Residual citation text, ready for source resolution.
    pub citation: String,
    pub relation: DocRelationSet,
    pub notes: Vec<String>,
    pub location: Vec<String>,
}

/// Parse one edition reference: relation marker, then the cascade.
pub fn parse_reference(reference: &str, translation: bool) -> ParsedReference {
    // footnotes for these records are always editions
    let mut relation = DocRelationSet::new();
    relation.insert(DocRelation::Edition);
    if translation {
        relation.insert(DocRelation::Translation);
    }

    let mut text = reference.to_string();
    if let Some(marker) = RE_DOC_RELATION.find(&text) {
        if marker.as_str().to_lowercase().contains("and trans") {
            relation.insert(DocRelation::Translation);
        }
        text = RE_DOC_RELATION.replace_all(&text, "").into_owned();
    }

    let mut notes = Vec::new();
    let mut location = Vec::new();
    for stage in EXTRACTION_STAGES.iter() {
        let captured = stage
            .pattern
            .captures(&text)
            .and_then(|caps| caps.name(stage.group).map(|m| m.as_str().to_string()));
        if let Some(value) = captured {
            match stage.target {
                StageTarget::Notes => notes.push(value),
                StageTarget::Location => location.push(value),
            }
            text = stage.pattern.replace_all(&text, "").into_owned();
        }
    }

    ParsedReference {
        citation: text.trim_matches([' ', '.', ',', ';']).to_string(),
        relation,
        notes,
        location,
    }
}

/// Parse an editor (or translator) field for a document.
///
/// Creates one footnote per non-ignored edition reference; a creator lookup
/// failure aborts only that reference, logged with the document id and raw
/// text. Other store errors abort the run.
pub async fn parse_editor<S: Store + ?Sized>(
    store: &S,
    creators: &CreatorCache,
    document_id: Id,
    editor: &str,
    translation: bool,
) -> StoreResult<()> {
    for reference in split_editions(editor) {
        if is_ignored(reference) {
            continue;
        }

        let parsed = parse_reference(reference, translation);
        match resolve_source(store, creators, document_id, &parsed.citation).await {
            Ok(resolved) => {
                let mut location = parsed.location.clone();
                location.extend(resolved.locations);
                store
                    .create_footnote(NewFootnote {
                        source_id: resolved.source.id,
                        document_id,
                        doc_relation: parsed.relation.clone(),
                        location: location.join(", "),
                        notes: parsed.notes.join("\n"),
                    })
                    .await?;
            }
            Err(StoreError::CreatorNotFound(name)) => {
                error!(
                    document_id,
                    reference,
                    creator = %name,
                    "error parsing editor reference"
                );
            }
            Err(other) => return Err(other),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_editions_on_also_ed() {
        let parts = split_editions("Ed. Goitein, Tarbiz 20; also ed. Gil, Palestine, Doc. #100");
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0], "Ed. Goitein, Tarbiz 20");
        assert!(parts[1].starts_with("also ed. Gil"));
    }

    #[test]
    fn test_split_editions_single_reference() {
        let parts = split_editions("Ed. Goitein, Mediterranean Society");
        assert_eq!(parts, vec!["Ed. Goitein, Mediterranean Society"]);
    }

    #[test]
    fn test_ignore_list_is_case_and_period_insensitive() {
        assert!(is_ignored("Awaiting transcription"));
        assert!(is_ignored("awaiting transcription."));
        assert!(is_ignored("YES"));
        assert!(!is_ignored("Ed. Goitein"));
    }

    #[test]
    fn test_relation_marker_stripped() {
        let parsed = parse_reference("Ed. Goitein, Tarbiz 20", false);
        assert!(parsed.citation.starts_with("Goitein"));
        assert!(parsed.relation.contains(&DocRelation::Edition));
        assert!(!parsed.relation.contains(&DocRelation::Translation));
    }

    #[test]
    fn test_relation_marker_with_translation() {
        let parsed = parse_reference("Ed. and transl. Goitein, Tarbiz 20", false);
        assert!(parsed.relation.contains(&DocRelation::Translation));
        assert!(parsed.citation.starts_with("Goitein"));
    }

    #[test]
    fn test_translator_column_sets_translation() {
        let parsed = parse_reference("Ed. Goitein, Tarbiz 20", true);
        assert!(parsed.relation.contains(&DocRelation::Edition));
        assert!(parsed.relation.contains(&DocRelation::Translation));
    }

    #[test]
    fn test_page_location_extracted() {
        let parsed = parse_reference("Ed. Goitein, Mediterranean Society, vol. 2, pp. 45-50", false);
        assert_eq!(parsed.location, vec!["pp. 45-50"]);
        assert!(!parsed.citation.contains("pp."));
        // volume stays for source resolution
        assert!(parsed.citation.contains("vol. 2"));
    }

    #[test]
    fn test_doc_location_extracted_before_pages() {
        let parsed = parse_reference("Ed. Gil, Palestine, Doc. #123, pp. 20-22", false);
        assert_eq!(parsed.location, vec!["Doc. #123", "pp. 20-22"]);
    }

    #[test]
    fn test_edition_notes_extracted() {
        let parsed = parse_reference(
            "Ed. Goitein, Tarbiz 20; full transcription listed in FGP",
            false,
        );
        assert_eq!(parsed.notes.len(), 1);
        assert!(parsed.notes[0].to_lowercase().contains("transcription listed"));
        assert!(!parsed.citation.to_lowercase().contains("transcription"));
    }

    #[test]
    fn test_hebrew_section_marker_extracted() {
        let parsed = parse_reference("Ed. Goitein, Tarbiz 20 12א", false);
        assert_eq!(parsed.location, vec!["12א"]);
    }

    #[test]
    fn test_stage_order_is_fixed() {
        let names: Vec<&str> = EXTRACTION_STAGES.iter().map(|s| s.name).collect();
        assert_eq!(
            names,
            vec![
                "edition_notes",
                "document_location",
                "page_location",
                "section_marker"
            ]
        );
    }
}
