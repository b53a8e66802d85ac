// Collectible card data model
// Matches the pack JSON files under data/packs

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::features::minigame::reward::Categorized;

/// One collectible card, as stored in pack files and user collections
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Card {
    pub id: String,
    #[serde(alias = "nom")]
    pub name: String,
    #[serde(alias = "rareté")]
    pub rarity: String,
    /// "joueur" or "collectible"
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub stats: BTreeMap<String, Value>,
    #[serde(default)]
    pub image: Option<String>,
}

impl Card {
    pub fn rarity_emoji(&self) -> &'static str {
        match self.rarity.as_str() {
            "Basic" => "🟢",
            "Advanced" => "🔵",
            "Elite" => "🟣",
            "Legend" => "🟠",
            "Unique" => "⭐",
            _ => "⚫",
        }
    }

    /// Card type with its emoji, e.g. "⚽ Joueur"
    pub fn type_label(&self) -> String {
        let kind = self.kind.as_deref().unwrap_or_default();
        let emoji = match kind {
            "joueur" => "⚽",
            "collectible" => "🎖️",
            _ => "🎴",
        };

        let mut chars = kind.chars();
        let name = match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => "Card".to_string(),
        };
        format!("{emoji} {name}")
    }

    /// Image URL if it is usable in an embed
    pub fn image_url(&self) -> Option<&str> {
        self.image
            .as_deref()
            .filter(|url| url.starts_with("http://") || url.starts_with("https://"))
            .filter(|url| url.len() <= 2048)
    }

    /// "Stat: value" pairs on one line, numeric stats only
    pub fn stats_line(&self) -> String {
        let parts: Vec<String> = self
            .stats
            .iter()
            .filter_map(|(name, value)| value.as_i64().map(|v| format!("{name}: {v}")))
            .collect();
        if parts.is_empty() {
            "No stats".to_string()
        } else {
            parts.join(" · ")
        }
    }
}

impl Categorized for Card {
    fn category(&self) -> &str {
        &self.rarity
    }
}
