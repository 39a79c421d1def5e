//! Seed data for identities referenced by the spreadsheet.
//!
//! The production deployment loads these from fixture files before the
//! import runs; they are embedded here so runs and tests are self-contained.
//! Historic editor accounts are inactive; the automation and shared-team
//! identities are active system accounts.

use tracing::info;

use crate::error::StoreResult;
use crate::store::Store;

/// Historic editor accounts: (username, first name, last name).
const HISTORIC_USERS: &[(&str, &str, &str)] = &[
    ("gkhan", "Geoffrey", "Khan"),
    ("mcohen", "Mark", "Cohen"),
    ("ozinger", "Oded", "Zinger"),
    ("nvanthieghem", "Naim", "Vanthieghem"),
    ("telleithy", "Tamer", "el-Leithy"),
    ("lbondioli", "Lorenzo", "Bondioli"),
    ("jpicard", "Joshua", "Picard"),
    ("zshirazi", "Zain", "Shirazi"),
    ("ekrakowski", "Eve", "Krakowski"),
    ("jgoldberg", "Jessica", "Goldberg"),
    ("afranklin", "Arnold", "Franklin"),
    ("mfrenkel", "Miriam", "Frenkel"),
    ("cperry", "Craig", "Perry"),
    ("aashur", "Amir", "Ashur"),
    ("rrichman", "Rachel", "Richman"),
    ("mrustow", "Marina", "Rustow"),
];

/// Citation authors referenced in the editor/translator columns:
/// (first name, last name). Last names are unique.
const SOURCE_CREATORS: &[(&str, &str)] = &[
    ("S. D.", "Goitein"),
    ("Moshe", "Gil"),
    ("Geoffrey", "Khan"),
    ("Tamer", "el-Leithy"),
    ("Marina", "Rustow"),
    ("Naim", "Vanthieghem"),
    ("Oded", "Zinger"),
    ("Lorenzo", "Bondioli"),
    ("Joshua", "Picard"),
    ("Zain", "Shirazi"),
    ("Mordechai Akiva", "Friedman"),
    ("Eliyahu", "Ashtor"),
    ("Nehemia", "Allony"),
    ("Menahem", "Ben-Sasson"),
    ("Mark", "Cohen"),
    ("Miriam", "Frenkel"),
    ("Jessica", "Goldberg"),
    ("Eve", "Krakowski"),
    ("Amir", "Ashur"),
    ("Craig", "Perry"),
    ("Avraham", "David"),
    ("Gershon", "Weiss"),
    ("Aharon", "Motzkin"),
    ("Norman", "Stillman"),
];

/// Create the automation and shared-team identities if missing.
pub async fn ensure_system_users<S: Store + ?Sized>(
    store: &S,
    script_username: &str,
    team_username: &str,
) -> StoreResult<()> {
    for username in [script_username, team_username] {
        if store.get_user_by_username(username).await.is_err() {
            store.create_user(username, "", "", true).await?;
        }
    }
    Ok(())
}

/// Seed the known historic editor accounts (idempotent).
pub async fn load_historic_users<S: Store + ?Sized>(store: &S) -> StoreResult<()> {
    let mut loaded = 0;
    for (username, first, last) in HISTORIC_USERS {
        if store.get_user_by_username(username).await.is_err() {
            store.create_user(username, first, last, false).await?;
            loaded += 1;
        }
    }
    info!("loaded {} historic users", loaded);
    Ok(())
}

/// Clear and reseed the citation creators referenced by the spreadsheet.
///
/// Creators (and the sources that point at them) are fully rebuilt on every
/// run, so any records from a previous run are deleted first.
pub async fn load_source_creators<S: Store + ?Sized>(store: &S) -> StoreResult<()> {
    store.delete_all_creators().await?;
    store.delete_all_sources().await?;
    for (first, last) in SOURCE_CREATORS {
        store.create_creator(first, last).await?;
    }
    info!("loaded {} source creators", SOURCE_CREATORS.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;

    #[tokio::test]
    async fn test_fixture_load_is_idempotent() {
        let store = MemoryStore::new();
        load_historic_users(&store).await.unwrap();
        load_historic_users(&store).await.unwrap();

        let user = store.get_user_by_username("gkhan").await.unwrap();
        assert_eq!(user.last_name, "Khan");
        assert!(!user.is_active);
    }

    #[tokio::test]
    async fn test_creator_last_names_are_unique() {
        let mut names: Vec<&str> = SOURCE_CREATORS.iter().map(|(_, last)| *last).collect();
        names.sort_unstable();
        let before = names.len();
        names.dedup();
        assert_eq!(before, names.len());
    }

    #[tokio::test]
    async fn test_system_users_created_once() {
        let store = MemoryStore::new();
        ensure_system_users(&store, "script", "team").await.unwrap();
        ensure_system_users(&store, "script", "team").await.unwrap();

        let script = store.get_user_by_username("script").await.unwrap();
        assert!(script.is_active);
    }
}
