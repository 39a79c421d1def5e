//! Tabular row reader: remote CSV exports to field-named records.
//!
//! Each logical table (libraries, languages, metadata) is backed by a CSV
//! export URL from [`ImportConfig`](crate::config::ImportConfig). Headers are
//! mapped to stable field names through a per-table alias table; unmapped
//! headers fall back to a slugified snake_case of the header text. The legacy
//! export is not reliably UTF-8, so raw bytes go through encoding detection
//! before parsing.

use std::collections::HashMap;

use crate::config::ImportConfig;
use crate::error::{CsvError, CsvResult, ImportError, ImportResult};

/// Header aliases for a table; headers not listed are slugified.
fn field_aliases(table: &str) -> &'static [(&'static str, &'static str)] {
    match table {
        "libraries" => &[
            ("Current List of Libraries", "current"),
            ("Library abbreviation", "lib_abbrev"),
            ("Collection abbreviation", "abbrev"),
            ("Location (current)", "location"),
            ("Collection (if different from library)", "collection"),
        ],
        "metadata" => &[
            ("Shelfmark - Current", "shelfmark"),
            ("Input by (optional)", "input_by"),
            ("Date entered (optional)", "date_entered"),
            ("Recto or verso (optional)", "recto_verso"),
            ("Language (optional)", "language"),
            ("Text-block (optional)", "text_block"),
            ("Shelfmark - Historical (optional)", "shelfmark_historic"),
            ("Multifragment (optional)", "multifragment"),
            ("Link to image", "image_link"),
            ("Editor(s)", "editor"),
            ("Translator (optional)", "translator"),
        ],
        // lower-cased slugs are fine for the languages sheet
        _ => &[],
    }
}

/// Slugify a header into a snake_case field name.
///
/// Lower-cases, collapses runs of non-alphanumeric characters to a single
/// underscore, and trims leading/trailing underscores. Returns an empty
/// string for an all-punctuation or blank header.
pub fn slugify(header: &str) -> String {
    let mut slug = String::with_capacity(header.len());
    let mut last_sep = true;
    for c in header.trim().chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
            last_sep = false;
        } else if !last_sep {
            slug.push('_');
            last_sep = true;
        }
    }
    while slug.ends_with('_') {
        slug.pop();
    }
    slug
}

/// Map raw CSV headers to field names.
///
/// At most one header may be blank (mapped to a synthetic `empty` field);
/// a second blank header is a fatal configuration error.
pub fn map_headers(table: &str, headers: &[String]) -> CsvResult<Vec<String>> {
    let aliases = field_aliases(table);
    let mut fields = Vec::with_capacity(headers.len());
    let mut blanks = 0;

    for header in headers {
        let alias = aliases
            .iter()
            .find(|(raw, _)| *raw == header.as_str())
            .map(|(_, field)| field.to_string());
        let field = match alias {
            Some(f) => f,
            None => {
                let slug = slugify(header);
                if slug.is_empty() {
                    blanks += 1;
                    if blanks > 1 {
                        return Err(CsvError::DuplicateBlankHeader {
                            table: table.to_string(),
                        });
                    }
                    "empty".to_string()
                } else {
                    slug
                }
            }
        };
        fields.push(field);
    }
    Ok(fields)
}

/// A single field-named record.
#[derive(Debug, Clone, Default)]
pub struct Row {
    fields: HashMap<String, String>,
}

impl Row {
    /// Get a field value; missing fields read as empty.
    pub fn get(&self, field: &str) -> &str {
        self.fields.get(field).map(String::as_str).unwrap_or("")
    }

    /// Build a row from field/value pairs (used by tests).
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            fields: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// A parsed table with its resolved field names.
#[derive(Debug, Clone)]
pub struct Table {
    pub name: String,
    pub fields: Vec<String>,
    pub rows: Vec<Row>,
}

/// Detect the encoding of raw bytes using chardet.
fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    // Normalize charset names
    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes to a string using the detected encoding.
fn decode_content(bytes: &[u8]) -> String {
    match detect_encoding(bytes).as_str() {
        "iso-8859-1" => encoding_rs::ISO_8859_15.decode(bytes).0.to_string(),
        "windows-1252" => encoding_rs::WINDOWS_1252.decode(bytes).0.to_string(),
        _ => String::from_utf8_lossy(bytes).to_string(),
    }
}

/// Parse CSV bytes into a [`Table`] for the given logical table name.
pub fn parse_table(table: &str, bytes: &[u8], max_rows: Option<usize>) -> CsvResult<Table> {
    let content = decode_content(bytes);

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| CsvError::ParseError {
            table: table.to_string(),
            message: e.to_string(),
        })?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
        return Err(CsvError::NoHeaders {
            table: table.to_string(),
        });
    }

    let fields = map_headers(table, &headers)?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| CsvError::ParseError {
            table: table.to_string(),
            message: e.to_string(),
        })?;
        if record.iter().all(|v| v.trim().is_empty()) {
            continue;
        }
        let mut values = HashMap::with_capacity(fields.len());
        for (i, field) in fields.iter().enumerate() {
            let value = record.get(i).map(str::trim).unwrap_or("");
            values.insert(field.clone(), value.to_string());
        }
        rows.push(Row { fields: values });
        if let Some(max) = max_rows {
            if rows.len() >= max {
                break;
            }
        }
    }

    Ok(Table {
        name: table.to_string(),
        fields,
        rows,
    })
}

/// Fetch and parse a configured table.
///
/// Fails fast when the URL is unconfigured or the fetch does not succeed.
/// `max_rows` applies a row-count ceiling, used for fast partial runs of the
/// metadata table only.
pub async fn fetch_table(
    client: &reqwest::Client,
    config: &ImportConfig,
    table: &str,
    max_rows: Option<usize>,
) -> ImportResult<Table> {
    let url = config.url_for(table)?;

    let response = client.get(url).send().await.map_err(|e| CsvError::FetchFailed {
        table: table.to_string(),
        message: e.to_string(),
    })?;
    if !response.status().is_success() {
        return Err(ImportError::Csv(CsvError::BadStatus {
            table: table.to_string(),
            status: response.status().as_u16(),
        }));
    }

    let bytes = response.bytes().await.map_err(|e| CsvError::FetchFailed {
        table: table.to_string(),
        message: e.to_string(),
    })?;

    let ceiling = if table == "metadata" { max_rows } else { None };
    Ok(parse_table(table, &bytes, ceiling)?)
}
