//! Edit-history reconstruction from "input by" / "date entered" columns.
//!
//! The spreadsheet records decades of contributor history as two loosely
//! parallel semicolon-delimited text columns. This module rebuilds a
//! chronologically ordered sequence of attributable events from them and
//! materializes the result as timestamped activity records.
//!
//! Alignment policy: when there are more dates than name segments, the name
//! list is left-padded so alignment anchors from the most recent entry
//! backwards — recent entries are more likely to carry attribution — and
//! leading unattributed dates fall back to the shared team identity.

use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use crate::error::StoreResult;
use crate::models::{EditEvent, EventKind, Id, ObjectKind, User};
use crate::resolve::{NameResolution, UserCache};
use crate::store::Store;

/// Events with missing or malformed date components fall back to this date.
pub const DEFAULT_EVENT_YEAR: i32 = 2020;
pub const DEFAULT_EVENT_MONTH: u32 = 1;
pub const DEFAULT_EVENT_DAY: u32 = 1;

/// Message for the chronologically earliest reconstructed event.
pub const SHEET_ADD_MSG: &str = "Initial data entry (spreadsheet)";
/// Message for every later reconstructed event.
pub const SHEET_CHG_MSG: &str = "Major revision (spreadsheet)";
/// Message for the synthetic import marker.
pub const IMPORT_MSG: &str = "Imported via script";

static RE_NUMERIC_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})/(\d{1,2})/(\d{2,4})$").unwrap());
static RE_MONTH_YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{1,2})/(\d{4})$").unwrap());
static RE_ISO_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})-(\d{1,2})-(\d{1,2})$").unwrap());
static RE_YEAR_ONLY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{4})$").unwrap());
static RE_TEXT_MONTH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z]+)\.?(?: (\d{1,2}))?,? ?(\d{4})$").unwrap());

const MONTH_NAMES: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

fn month_from_name(name: &str) -> Option<u32> {
    let lower = name.to_lowercase();
    if lower.len() < 3 {
        return None;
    }
    MONTH_NAMES
        .iter()
        .position(|m| m.starts_with(&lower))
        .map(|i| i as u32 + 1)
}

fn expand_year(year: i32) -> i32 {
    // two-digit years in the export are all post-2000
    if year < 100 {
        2000 + year
    } else {
        year
    }
}

/// Leniently parse a free-text date, substituting default components for
/// whatever is missing. Returns `None` for unparseable text.
///
/// Accepted forms: `m/d/yyyy`, `m/d/yy`, `m/yyyy`, `yyyy-m-d`, `yyyy`,
/// `Month yyyy`, `Month d, yyyy` (full or abbreviated month names).
pub fn parse_lenient_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();

    if let Some(caps) = RE_NUMERIC_DATE.captures(value) {
        let month: u32 = caps[1].parse().ok()?;
        let day: u32 = caps[2].parse().ok()?;
        let year: i32 = caps[3].parse().ok()?;
        return NaiveDate::from_ymd_opt(expand_year(year), month, day);
    }
    if let Some(caps) = RE_MONTH_YEAR.captures(value) {
        let month: u32 = caps[1].parse().ok()?;
        let year: i32 = caps[2].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, DEFAULT_EVENT_DAY);
    }
    if let Some(caps) = RE_ISO_DATE.captures(value) {
        let year: i32 = caps[1].parse().ok()?;
        let month: u32 = caps[2].parse().ok()?;
        let day: u32 = caps[3].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }
    if let Some(caps) = RE_YEAR_ONLY.captures(value) {
        let year: i32 = caps[1].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, DEFAULT_EVENT_MONTH, DEFAULT_EVENT_DAY);
    }
    if let Some(caps) = RE_TEXT_MONTH.captures(value) {
        let month = month_from_name(&caps[1])?;
        let day: u32 = caps
            .get(2)
            .map(|d| d.as_str().parse().ok())
            .unwrap_or(Some(DEFAULT_EVENT_DAY))?;
        let year: i32 = caps[3].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }
    None
}

/// Reconstruct the edit history of a single document.
///
/// Returns events sorted ascending by effective date; the first event is the
/// one creation event, all others are revisions (including same-day
/// duplicates and coauthored earliest entries).
pub async fn reconstruct_edit_history<S: Store + ?Sized>(
    store: &S,
    user_cache: &mut UserCache,
    team_user: &User,
    input_by: &str,
    date_entered: &str,
    document_id: Id,
) -> StoreResult<Vec<EditEvent>> {
    // map every "input by" segment to one or more user accounts; coauthored
    // segments ("A and B") resolve to a multi-user group
    let mut groups: Vec<Option<Vec<User>>> = Vec::new();
    for segment in input_by.split(';').map(str::trim) {
        if segment.is_empty() {
            continue;
        }
        let mut group = Vec::new();
        for name in segment.split(" and ").map(str::trim) {
            match user_cache.resolve(store, name, Some(document_id)).await? {
                NameResolution::Matched(user) => group.push(user),
                NameResolution::Unmatched => {
                    warn!(
                        name,
                        document_id,
                        fallback = %team_user.display_name(),
                        "couldn't find user; using team account"
                    );
                    group.push(team_user.clone());
                }
            }
        }
        groups.push(Some(group));
    }

    // parse every "date entered" segment, keeping the original text paired
    // with the parsed date for the audit trail
    let mut dates: Vec<(NaiveDate, String)> = Vec::new();
    for raw in date_entered.split(';').map(str::trim) {
        if raw.is_empty() {
            continue;
        }
        match parse_lenient_date(raw) {
            Some(date) => dates.push((date, raw.to_string())),
            None => warn!(date = raw, document_id, "failed to parse date"),
        }
    }

    // left-pad the name groups so the two lists align by position from the
    // most recent entry backwards
    while groups.len() < dates.len() {
        groups.insert(0, None);
    }

    // moving backwards in time, pair dates with user groups; a date without
    // attribution belongs to the whole team
    let mut events = Vec::new();
    let groups_rev: Vec<&Option<Vec<User>>> = groups.iter().rev().collect();
    for (i, (date, orig_date)) in dates.iter().rev().enumerate() {
        let team_group = vec![team_user.clone()];
        let group = groups_rev
            .get(i)
            .and_then(|g| (*g).as_ref())
            .unwrap_or(&team_group);
        for user in group {
            events.push(EditEvent {
                kind: EventKind::Change,
                user_id: user.id,
                date: *date,
                orig_date: orig_date.clone(),
            });
        }
        if group.len() > 1 {
            debug!(document_id, date = %date, coauthors = group.len(), "found coauthored event");
        }
    }

    // sort chronologically; the earliest event is the one creation event
    events.sort_by_key(|e| e.date);
    if let Some(first) = events.first_mut() {
        first.kind = EventKind::Addition;
    }
    Ok(events)
}

/// Persist a reconstructed edit history as activity records.
///
/// One record per event with an explicit timestamp (midnight UTC of the
/// effective date), annotated with the original date text, followed by
/// exactly one import marker by the script identity stamped now.
pub async fn persist_edit_history<S: Store + ?Sized>(
    store: &S,
    script_user: &User,
    document_id: Id,
    document_repr: &str,
    events: &[EditEvent],
) -> StoreResult<()> {
    for event in events {
        let msg = match event.kind {
            EventKind::Addition => SHEET_ADD_MSG,
            EventKind::Change => SHEET_CHG_MSG,
        };
        let action_time = Utc.from_utc_datetime(&event.date.and_time(NaiveTime::MIN));
        store
            .create_log_entry(
                event.user_id,
                ObjectKind::Document,
                document_id,
                document_repr,
                &format!("{}, dated {}", msg, event.orig_date),
                event.kind,
                action_time,
            )
            .await?;
    }

    // the import itself is an addition: it marks the point at which the
    // record entered this database
    store
        .create_log_entry(
            script_user.id,
            ObjectKind::Document,
            document_id,
            document_repr,
            IMPORT_MSG,
            EventKind::Addition,
            Utc::now(),
        )
        .await?;
    Ok(())
}
