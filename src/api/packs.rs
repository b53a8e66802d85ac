// Card packs stored as JSON arrays under <data dir>/packs

use std::io::ErrorKind;
use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use poise::serenity_prelude as serenity;
use tracing::{debug, warn};

use crate::features::minigame::RewardCatalog;
use crate::models::card::Card;

/// Serves the configured reward pack as every guild's reward pool
pub struct PackCatalog {
    dir: PathBuf,
    pack: String,
}

impl PackCatalog {
    pub fn new(data_dir: impl Into<PathBuf>, pack: impl Into<String>) -> Self {
        Self {
            dir: data_dir.into().join("packs"),
            pack: pack.into(),
        }
    }

    /// Load every card of a pack. A missing pack file is an empty pack.
    pub async fn load_pack(&self, pack: &str) -> Result<Vec<Card>> {
        let path = self.dir.join(format!("{pack}.json"));
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => {
                let cards: Vec<Card> = serde_json::from_str(&content)
                    .with_context(|| format!("invalid pack file {}", path.display()))?;
                debug!("Loaded {} cards from pack {}", cards.len(), pack);
                Ok(cards)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!("Pack file {} not found", path.display());
                Ok(Vec::new())
            }
            Err(e) => Err(e).with_context(|| format!("failed to read {}", path.display())),
        }
    }
}

#[async_trait]
impl RewardCatalog for PackCatalog {
    async fn pool(&self, _community: serenity::GuildId) -> Result<Vec<Card>> {
        self.load_pack(&self.pack).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_loads_pack_file() {
        let data_dir = std::env::temp_dir().join(format!("fuyard-packs-{}", std::process::id()));
        tokio::fs::create_dir_all(data_dir.join("packs")).await.unwrap();
        tokio::fs::write(
            data_dir.join("packs").join("pack_event.json"),
            r#"[
                { "id": "a", "nom": "Card A", "rareté": "Elite" },
                { "id": "b", "nom": "Card B", "rareté": "Legend" }
            ]"#,
        )
        .await
        .unwrap();

        let catalog = PackCatalog::new(&data_dir, "pack_event");
        let pool = catalog.pool(serenity::GuildId::new(1)).await.unwrap();
        assert_eq!(pool.len(), 2);
        assert_eq!(pool[1].rarity, "Legend");

        assert!(catalog.load_pack("missing").await.unwrap().is_empty());

        let _ = tokio::fs::remove_dir_all(&data_dir).await;
    }
}
