// JSON document store
// One file per collection under the data directory, kept in memory and
// rewritten on every change

use std::collections::{BTreeMap, HashMap};
use std::io::ErrorKind;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use poise::serenity_prelude as serenity;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tracing::debug;

use crate::features::minigame::{PersistedScheduleStore, RewardInventory};
use crate::models::card::Card;
use crate::models::schedule::CommunityScheduleState;

/// Collection holding per-guild schedule state
pub const SCHEDULES: &str = "minigame";
/// Collection holding per-guild, per-user data
pub const USERS: &str = "users";

type Collection = BTreeMap<String, Value>;

pub struct JsonStore {
    dir: Option<PathBuf>,
    collections: Mutex<HashMap<String, Collection>>,
}

impl JsonStore {
    /// Store persisted under `dir`; collections are loaded on first access
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
            collections: Mutex::new(HashMap::new()),
        }
    }

    /// Store that never touches the disk
    pub fn in_memory() -> Self {
        Self {
            dir: None,
            collections: Mutex::new(HashMap::new()),
        }
    }

    /// Get a document
    pub async fn get_document(&self, collection: &str, doc_id: &str) -> Result<Option<Value>> {
        let mut collections = self.collections.lock().await;
        let docs = self.loaded(&mut collections, collection).await?;
        Ok(docs.get(doc_id).cloned())
    }

    /// Set a document, replacing any previous value
    pub async fn set_document(&self, collection: &str, doc_id: &str, data: &Value) -> Result<()> {
        self.update_document(collection, doc_id, |doc| *doc = data.clone())
            .await
    }

    /// Atomic read-modify-write of one document. A missing document starts
    /// out as `null`. The change only becomes visible once it is on disk.
    pub async fn update_document<F>(&self, collection: &str, doc_id: &str, update: F) -> Result<()>
    where
        F: FnOnce(&mut Value),
    {
        let mut collections = self.collections.lock().await;
        let docs = self.loaded(&mut collections, collection).await?;

        let mut doc = docs.get(doc_id).cloned().unwrap_or(Value::Null);
        update(&mut doc);

        let previous = docs.insert(doc_id.to_string(), doc);
        let snapshot = serde_json::to_string_pretty(docs);
        let result = match snapshot {
            Ok(snapshot) => self.flush(collection, snapshot).await,
            Err(e) => Err(e.into()),
        };

        if result.is_err() {
            match previous {
                Some(previous) => docs.insert(doc_id.to_string(), previous),
                None => docs.remove(doc_id),
            };
        }
        result
    }

    /// Ids of every document in a collection
    pub async fn list_documents(&self, collection: &str) -> Result<Vec<String>> {
        let mut collections = self.collections.lock().await;
        let docs = self.loaded(&mut collections, collection).await?;
        Ok(docs.keys().cloned().collect())
    }

    async fn loaded<'a>(
        &self,
        collections: &'a mut HashMap<String, Collection>,
        collection: &str,
    ) -> Result<&'a mut Collection> {
        if !collections.contains_key(collection) {
            let docs = self.read_collection(collection).await?;
            collections.insert(collection.to_string(), docs);
        }
        collections
            .get_mut(collection)
            .ok_or_else(|| anyhow!("collection {} vanished while loading", collection))
    }

    async fn read_collection(&self, collection: &str) -> Result<Collection> {
        let Some(path) = self.path_of(collection) else {
            return Ok(Collection::new());
        };

        match tokio::fs::read_to_string(&path).await {
            Ok(content) => {
                let docs = serde_json::from_str(&content)
                    .with_context(|| format!("corrupt collection file {}", path.display()))?;
                debug!("Loaded collection {} from {}", collection, path.display());
                Ok(docs)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Collection::new()),
            Err(e) => Err(e).with_context(|| format!("failed to read {}", path.display())),
        }
    }

    async fn flush(&self, collection: &str, snapshot: String) -> Result<()> {
        let (Some(dir), Some(path)) = (&self.dir, self.path_of(collection)) else {
            return Ok(());
        };

        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("failed to create {}", dir.display()))?;

        // Write-then-rename so a crash never leaves a half-written file
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, snapshot)
            .await
            .with_context(|| format!("failed to write {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .with_context(|| format!("failed to replace {}", path.display()))?;
        Ok(())
    }

    fn path_of(&self, collection: &str) -> Option<PathBuf> {
        self.dir
            .as_ref()
            .map(|dir| dir.join(format!("{collection}.json")))
    }
}

fn user_key(community: serenity::GuildId, participant: serenity::UserId) -> String {
    format!("{}:{}", community, participant)
}

#[async_trait]
impl PersistedScheduleStore for JsonStore {
    async fn get(
        &self,
        community: serenity::GuildId,
    ) -> Result<Option<CommunityScheduleState>> {
        self.get_document(SCHEDULES, &community.to_string())
            .await?
            .map(serde_json::from_value::<CommunityScheduleState>)
            .transpose()
            .with_context(|| format!("invalid schedule state for guild {}", community))
    }

    async fn set(
        &self,
        community: serenity::GuildId,
        state: &CommunityScheduleState,
    ) -> Result<()> {
        let value = serde_json::to_value(state)?;
        self.set_document(SCHEDULES, &community.to_string(), &value)
            .await
    }

    async fn communities(&self) -> Result<Vec<serenity::GuildId>> {
        Ok(self
            .list_documents(SCHEDULES)
            .await?
            .iter()
            .filter_map(|id| id.parse::<u64>().ok())
            .filter(|id| *id != 0)
            .map(serenity::GuildId::new)
            .collect())
    }
}

#[async_trait]
impl RewardInventory for JsonStore {
    async fn grant(
        &self,
        community: serenity::GuildId,
        participant: serenity::UserId,
        item: &Card,
    ) -> Result<()> {
        let card = serde_json::to_value(item)?;
        self.update_document(USERS, &user_key(community, participant), |doc| {
            if !doc.is_object() {
                *doc = json!({ "coins": 0, "collection": [] });
            }
            match doc.get_mut("collection").and_then(Value::as_array_mut) {
                Some(collection) => collection.push(card),
                None => doc["collection"] = json!([card]),
            }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn temp_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("fuyard-store-{}-{}", name, std::process::id()))
    }

    fn card(id: &str) -> Card {
        Card {
            id: id.to_string(),
            name: id.to_string(),
            rarity: "Elite".to_string(),
            kind: None,
            position: None,
            stats: BTreeMap::new(),
            image: None,
        }
    }

    #[tokio::test]
    async fn test_read_after_write() {
        let store = JsonStore::in_memory();
        assert_eq!(store.get_document("things", "a").await.unwrap(), None);

        store
            .set_document("things", "a", &json!({ "n": 1 }))
            .await
            .unwrap();
        assert_eq!(
            store.get_document("things", "a").await.unwrap(),
            Some(json!({ "n": 1 }))
        );
        assert_eq!(store.list_documents("things").await.unwrap(), vec!["a"]);
    }

    #[tokio::test]
    async fn test_schedule_state_roundtrip_and_listing() {
        let store = JsonStore::in_memory();
        let guild = serenity::GuildId::new(55);
        let mut state = CommunityScheduleState::new(guild);
        state.next_spawn_at = Some(Utc::now());
        state.target_channel = Some(serenity::ChannelId::new(9));

        store.set(guild, &state).await.unwrap();
        store
            .set_document(SCHEDULES, "not-a-guild", &json!({}))
            .await
            .unwrap();

        assert_eq!(store.get(guild).await.unwrap(), Some(state));
        assert_eq!(store.communities().await.unwrap(), vec![guild]);
    }

    #[tokio::test]
    async fn test_grant_appends_to_collection() {
        let store = JsonStore::in_memory();
        let guild = serenity::GuildId::new(1);
        let user = serenity::UserId::new(2);
        store
            .set_document(USERS, "1:2", &json!({ "coins": 40, "collection": [] }))
            .await
            .unwrap();

        store.grant(guild, user, &card("a")).await.unwrap();
        store.grant(guild, user, &card("b")).await.unwrap();

        let doc = store.get_document(USERS, "1:2").await.unwrap().unwrap();
        assert_eq!(doc["coins"], json!(40));
        let ids: Vec<&str> = doc["collection"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|c| c["id"].as_str())
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = temp_dir("reopen");
        let _ = tokio::fs::remove_dir_all(&dir).await;

        let store = JsonStore::open(&dir);
        store
            .grant(serenity::GuildId::new(1), serenity::UserId::new(2), &card("a"))
            .await
            .unwrap();
        drop(store);

        let reopened = JsonStore::open(&dir);
        let doc = reopened.get_document(USERS, "1:2").await.unwrap().unwrap();
        assert_eq!(doc["collection"][0]["id"], json!("a"));

        let _ = tokio::fs::remove_dir_all(&dir).await;
    }

    #[tokio::test]
    async fn test_failed_flush_leaves_document_untouched() {
        let dir = temp_dir("unwritable");
        let _ = tokio::fs::remove_dir_all(&dir).await;
        let guild = serenity::GuildId::new(1);
        let user = serenity::UserId::new(2);

        let store = JsonStore::open(&dir);
        store.grant(guild, user, &card("a")).await.unwrap();

        // Every later flush fails once the directory is a plain file
        tokio::fs::remove_dir_all(&dir).await.unwrap();
        tokio::fs::write(&dir, "not a directory").await.unwrap();

        assert!(store.grant(guild, user, &card("b")).await.is_err());
        assert!(store.set_document(USERS, "1:3", &json!({})).await.is_err());

        let doc = store.get_document(USERS, "1:2").await.unwrap().unwrap();
        assert_eq!(doc["collection"].as_array().map(Vec::len), Some(1));
        assert_eq!(store.get_document(USERS, "1:3").await.unwrap(), None);

        let _ = tokio::fs::remove_file(&dir).await;
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let dir = temp_dir("corrupt");
        tokio::fs::create_dir_all(&dir).await.unwrap();
        tokio::fs::write(dir.join("users.json"), "{ not json").await.unwrap();

        let store = JsonStore::open(&dir);
        assert!(store.get_document(USERS, "x").await.is_err());

        let _ = tokio::fs::remove_dir_all(&dir).await;
    }
}
