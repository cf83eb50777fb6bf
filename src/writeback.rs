//! Write-back path: change a species' status or diet locally, then mirror
//! the reference table to the remote repository.
//!
//! Local files are written before the remote push and are left as written
//! if the push fails. Cached reads are dropped only after every requested
//! step has succeeded.

use crate::cache::TtlCache;
use crate::clients::{ContentClient, runtime};
use crate::config::{HttpConfig, RemoteConfig};
use crate::constants::{diet, status};
use crate::data::{DataStore, ReferenceTable, UpsertAction, load_diet_map, set_diet};
use crate::error::{Error, Result};
use crate::output::progress::{create_spinner, finish_progress};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Reject statuses outside the assignable vocabulary.
pub fn validate_status(value: &str) -> Result<()> {
    if status::ASSIGNABLE.contains(&value) {
        Ok(())
    } else {
        Err(Error::UnknownStatus {
            value: value.to_string(),
        })
    }
}

/// Reject diets outside the category vocabulary.
pub fn validate_diet(value: &str) -> Result<()> {
    if diet::CATEGORIES.contains(&value) {
        Ok(())
    } else {
        Err(Error::UnknownDiet {
            value: value.to_string(),
        })
    }
}

/// Commit message for a status change.
pub fn commit_message(action: UpsertAction, scientific_name: &str, status: &str) -> String {
    format!("{action} species status: {scientific_name} -> {status}")
}

/// Content client for the configured remote, if a credential is available.
pub fn content_client(
    http: &HttpConfig,
    remote: &RemoteConfig,
    token: Option<&str>,
) -> Result<ContentClient> {
    let token = token
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(Error::MissingCredential)?;
    ContentClient::new(http, remote, token)
}

/// A requested status (and optional diet) change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    /// Scientific name (row key).
    pub scientific_name: String,
    /// Display name written to the row.
    pub common_name: String,
    /// New status.
    pub status: String,
    /// New diet, if it should change too.
    pub diet: Option<String>,
}

/// What a status update did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateReport {
    /// Scientific name.
    pub scientific_name: String,
    /// Whether the reference row was updated or appended.
    pub action: UpsertAction,
    /// New status.
    pub status: String,
    /// New diet, when it changed.
    pub diet: Option<String>,
    /// Commit message used (or that would have been used).
    pub message: String,
    /// Whether the table was pushed to the remote.
    pub pushed: bool,
}

/// Local data files plus the caches to drop after a change.
pub struct WriteBack<'a> {
    store: &'a DataStore,
    cache: &'a TtlCache,
    progress: bool,
}

impl<'a> WriteBack<'a> {
    /// Write-back over the files of `store`.
    pub fn new(store: &'a DataStore, cache: &'a TtlCache, progress: bool) -> Self {
        Self {
            store,
            cache,
            progress,
        }
    }

    fn invalidate(&self) {
        self.store.invalidate();
        self.cache.clear();
        info!("Cached reads invalidated");
    }

    /// Assign a diet category in the side file.
    pub fn classify_diet(&self, scientific_name: &str, value: &str) -> Result<()> {
        validate_diet(value)?;
        set_diet(&self.store.config().diet, scientific_name, value)?;
        info!("Set diet of {scientific_name} to {value}");
        self.invalidate();
        Ok(())
    }

    /// Apply `update` locally and, with a client, push the reference table.
    pub fn update_status(
        &self,
        update: &StatusUpdate,
        remote: Option<&ContentClient>,
    ) -> Result<UpdateReport> {
        validate_status(&update.status)?;
        if let Some(value) = &update.diet {
            validate_diet(value)?;
        }
        let data = self.store.config();

        let diet_changed = match &update.diet {
            Some(value) => {
                let current = load_diet_map(&data.diet)?;
                let changed = current.get(&update.scientific_name) != Some(value);
                if changed {
                    set_diet(&data.diet, &update.scientific_name, value)?;
                    info!("Set diet of {} to {value}", update.scientific_name);
                }
                changed
            }
            None => false,
        };

        let mut table = ReferenceTable::load(&data.reference)?;
        let action = table.upsert(&update.scientific_name, &update.common_name, &update.status);
        table.save(&data.reference)?;
        info!(
            "{action} {} -> {} in {}",
            update.scientific_name,
            update.status,
            data.reference.display()
        );

        let message = commit_message(action, &update.scientific_name, &update.status);
        let pushed = match remote {
            Some(client) => {
                let content = table.to_csv_bytes().map_err(|e| Error::ReferenceWrite {
                    path: data.reference.clone(),
                    source: e,
                })?;
                self.push(client, &content, &message)?;
                true
            }
            None => false,
        };

        self.invalidate();
        Ok(UpdateReport {
            scientific_name: update.scientific_name.clone(),
            action,
            status: update.status.clone(),
            diet: diet_changed.then(|| update.diet.clone()).flatten(),
            message,
            pushed,
        })
    }

    fn push(&self, client: &ContentClient, content: &[u8], message: &str) -> Result<()> {
        let rt = runtime()?;
        let spinner = create_spinner(&format!("Pushing to {}", client.url()), self.progress);
        let result = rt.block_on(async {
            let sha = client.get_revision().await?;
            client.put_file(content, message, sha.as_deref()).await
        });
        match &result {
            Ok(()) => finish_progress(spinner, "Pushed"),
            Err(e) => {
                finish_progress(spinner, "Push failed");
                warn!("Local files were updated but the remote push failed: {e}");
            }
        }
        result
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::clients::test_server::TestServer;
    use crate::config::DataConfig;
    use crate::data::{ReferenceRow, load_diet_map};
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use rusqlite::Connection;
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> DataStore {
        let reference = dir.path().join("reference.csv");
        ReferenceTable::from_rows(vec![ReferenceRow {
            common_name: "Robin".to_string(),
            latin_name: "Erithacus rubecula".to_string(),
            status: "Resident".to_string(),
        }])
        .save(&reference)
        .unwrap();
        DataStore::new(DataConfig {
            database: dir.path().join("birds.db"),
            table: "detections".to_string(),
            reference,
            diet: dir.path().join("diet.json"),
        })
    }

    fn update(status: &str) -> StatusUpdate {
        StatusUpdate {
            scientific_name: "Erithacus rubecula".to_string(),
            common_name: "European Robin".to_string(),
            status: status.to_string(),
            diet: Some("Insectivore".to_string()),
        }
    }

    #[test]
    fn test_vocabularies() {
        assert!(validate_status("Resident").is_ok());
        assert!(validate_status("False Positive").is_ok());
        assert!(matches!(
            validate_status("Review Recording"),
            Err(Error::UnknownStatus { .. })
        ));
        assert!(validate_diet("Granivore").is_ok());
        assert!(matches!(validate_diet("Unclassified"), Err(Error::UnknownDiet { .. })));
    }

    #[test]
    fn test_commit_message() {
        assert_eq!(
            commit_message(UpsertAction::Add, "Pica pica", "Resident"),
            "Add species status: Pica pica -> Resident"
        );
    }

    #[test]
    fn test_missing_token_is_rejected() {
        let remote = RemoteConfig {
            repository: Some("someone/bird-dashboard".to_string()),
            ..RemoteConfig::default()
        };
        assert!(matches!(
            content_client(&HttpConfig::default(), &remote, None),
            Err(Error::MissingCredential)
        ));
        assert!(matches!(
            content_client(&HttpConfig::default(), &remote, Some("  ")),
            Err(Error::MissingCredential)
        ));
        assert!(matches!(
            content_client(&HttpConfig::default(), &RemoteConfig::default(), Some("t")),
            Err(Error::RemoteNotConfigured)
        ));
    }

    #[test]
    fn test_local_update_without_push() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let cache = TtlCache::in_memory();
        cache.insert("species_summary", "Robin", &"cached");

        let report = WriteBack::new(&store, &cache, false)
            .update_status(&update("Winter visitor"), None)
            .unwrap();

        assert_eq!(report.action, UpsertAction::Update);
        assert_eq!(report.message, "Update species status: Erithacus rubecula -> Winter visitor");
        assert_eq!(report.diet.as_deref(), Some("Insectivore"));
        assert!(!report.pushed);
        assert!(cache.is_empty());

        let table = ReferenceTable::load(&store.config().reference).unwrap();
        assert_eq!(table.rows()[0].status, "Winter visitor");
        assert_eq!(table.rows()[0].common_name, "European Robin");
        let diets = load_diet_map(&store.config().diet).unwrap();
        assert_eq!(diets["Erithacus rubecula"], "Insectivore");
    }

    #[test]
    fn test_unchanged_diet_is_not_reported() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let cache = TtlCache::in_memory();
        let writeback = WriteBack::new(&store, &cache, false);
        writeback.update_status(&update("Resident"), None).unwrap();
        let report = writeback.update_status(&update("Resident"), None).unwrap();
        assert!(report.diet.is_none());
    }

    #[test]
    fn test_failed_push_keeps_local_change() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let cache = TtlCache::in_memory();
        cache.insert("species_summary", "Robin", &"cached");
        let http = HttpConfig {
            content_read_timeout_secs: 2,
            content_write_timeout_secs: 2,
            ..HttpConfig::default()
        };
        let remote = RemoteConfig {
            api_url: "http://127.0.0.1:9".to_string(),
            repository: Some("someone/bird-dashboard".to_string()),
            ..RemoteConfig::default()
        };
        let client = content_client(&http, &remote, Some("token")).unwrap();

        let mut new_species = update("Rare vagrant");
        new_species.scientific_name = "Upupa epops".to_string();
        new_species.common_name = "Hoopoe".to_string();
        let result = WriteBack::new(&store, &cache, false).update_status(&new_species, Some(&client));

        assert!(matches!(result, Err(Error::RemoteRequest { .. })));
        let table = ReferenceTable::load(&store.config().reference).unwrap();
        assert_eq!(table.rows().len(), 2);
        assert_eq!(table.rows()[1].latin_name, "Upupa epops");
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_classify_diet() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let cache = TtlCache::in_memory();
        let writeback = WriteBack::new(&store, &cache, false);
        writeback.classify_diet("Pica pica", "Omnivore").unwrap();
        assert!(writeback.classify_diet("Pica pica", "Rocks").is_err());
        let diets = load_diet_map(&store.config().diet).unwrap();
        assert_eq!(diets["Pica pica"], "Omnivore");
    }

    /// Store with an empty detections table, already loaded.
    fn loaded_store(dir: &TempDir) -> DataStore {
        let store = store(dir);
        Connection::open(&store.config().database)
            .unwrap()
            .execute_batch(
                "CREATE TABLE detections (
                    Date TEXT, Time TEXT, Sci_Name TEXT, Com_Name TEXT,
                    Confidence REAL, Lat REAL, Lon REAL
                 );",
            )
            .unwrap();
        store.get().unwrap();
        assert!(store.is_loaded());
        store
    }

    fn local_client(server: &TestServer) -> ContentClient {
        let remote = RemoteConfig {
            api_url: server.url.clone(),
            repository: Some("someone/bird-dashboard".to_string()),
            ..RemoteConfig::default()
        };
        content_client(&HttpConfig::default(), &remote, Some("token")).unwrap()
    }

    #[test]
    fn test_push_sends_current_revision_then_invalidates() {
        let dir = TempDir::new().unwrap();
        let store = loaded_store(&dir);
        let cache = TtlCache::in_memory();
        cache.insert("species_summary", "Robin", &"cached");
        let server = TestServer::start(vec![(200, r#"{"sha":"abc"}"#), (200, "{}")]);

        let report = WriteBack::new(&store, &cache, false)
            .update_status(&update("Winter visitor"), Some(&local_client(&server)))
            .unwrap();

        assert!(report.pushed);
        assert!(cache.is_empty());
        assert!(!store.is_loaded());

        let requests = server.requests();
        assert_eq!(requests.len(), 2);
        assert!(requests[0].request_line.starts_with("GET "));
        assert!(requests[1].request_line.starts_with("PUT "));
        let body: serde_json::Value = serde_json::from_str(&requests[1].body).unwrap();
        assert_eq!(body["sha"], "abc");
        assert_eq!(
            body["message"],
            "Update species status: Erithacus rubecula -> Winter visitor"
        );
        let pushed = STANDARD.decode(body["content"].as_str().unwrap()).unwrap();
        assert_eq!(pushed, std::fs::read(&store.config().reference).unwrap());
    }

    #[test]
    fn test_conflicting_push_keeps_caches() {
        let dir = TempDir::new().unwrap();
        let store = loaded_store(&dir);
        let cache = TtlCache::in_memory();
        cache.insert("species_summary", "Robin", &"cached");
        let server = TestServer::start(vec![
            (200, r#"{"sha":"abc"}"#),
            (409, r#"{"message":"sha does not match"}"#),
        ]);

        let result = WriteBack::new(&store, &cache, false)
            .update_status(&update("Winter visitor"), Some(&local_client(&server)));

        assert!(matches!(result, Err(Error::RevisionConflict { status: 409, .. })));
        assert_eq!(cache.len(), 1);
        assert!(store.is_loaded());
        let table = ReferenceTable::load(&store.config().reference).unwrap();
        assert_eq!(table.rows()[0].status, "Winter visitor");
    }
}
