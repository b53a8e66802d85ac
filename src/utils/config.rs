// Centralized configuration for the Fuyard bot

use std::collections::BTreeMap;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::features::minigame::MinigameError;

/// Default directory for the persistent store and pack files
pub const DEFAULT_DATA_DIR: &str = "data";

/// Discord embed colors
pub mod colors {
    pub const PRIMARY: u32 = 0x001f5b;
    pub const ERROR: u32 = 0xda0037;
    pub const SUCCESS: u32 = 0x00d25b;
    pub const EVENT: u32 = 0xffd700;
}

/// Mini-game timing and reward settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MinigameConfig {
    pub min_interval_days: u32,
    pub max_interval_days: u32,
    /// First hour of the spawn window (inclusive)
    pub start_hour: u32,
    /// Last hour of the spawn window (exclusive, at most 24)
    pub end_hour: u32,
    pub timeout_secs: u64,
    /// Pack file the reward is drawn from
    pub reward_pack: String,
    /// Timezone the hour window is evaluated in
    pub utc_offset_hours: i32,
    pub drop_rates: BTreeMap<String, f64>,
}

impl Default for MinigameConfig {
    fn default() -> Self {
        Self {
            min_interval_days: 4,
            max_interval_days: 7,
            start_hour: 7,
            end_hour: 24,
            timeout_secs: 30,
            reward_pack: "pack_event".to_string(),
            utc_offset_hours: 0,
            drop_rates: BTreeMap::from([
                ("Elite".to_string(), 60.0),
                ("Legend".to_string(), 40.0),
            ]),
        }
    }
}

impl MinigameConfig {
    /// Defaults overridden by `MINIGAME_*` environment variables
    pub fn from_env() -> Result<Self, MinigameError> {
        let mut config = Self::default();

        override_from_env("MINIGAME_MIN_INTERVAL_DAYS", &mut config.min_interval_days)?;
        override_from_env("MINIGAME_MAX_INTERVAL_DAYS", &mut config.max_interval_days)?;
        override_from_env("MINIGAME_START_HOUR", &mut config.start_hour)?;
        override_from_env("MINIGAME_END_HOUR", &mut config.end_hour)?;
        override_from_env("MINIGAME_TIMEOUT_SECS", &mut config.timeout_secs)?;
        override_from_env("MINIGAME_UTC_OFFSET_HOURS", &mut config.utc_offset_hours)?;
        if let Ok(pack) = env::var("MINIGAME_REWARD_PACK") {
            config.reward_pack = pack;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), MinigameError> {
        validate_interval(self.min_interval_days, self.max_interval_days)?;
        if self.end_hour > 24 || self.start_hour >= self.end_hour {
            return Err(MinigameError::InvalidConfig(format!(
                "hour window {}h-{}h is empty or exceeds 24h",
                self.start_hour, self.end_hour
            )));
        }
        if self.timeout_secs == 0 {
            return Err(MinigameError::InvalidConfig(
                "timeout must be at least one second".to_string(),
            ));
        }
        if self.utc_offset_hours.abs() >= 24 {
            return Err(MinigameError::InvalidConfig(format!(
                "utc offset {}h is out of range",
                self.utc_offset_hours
            )));
        }
        Ok(())
    }
}

/// Check a day interval, used for both the global config and per-guild overrides
pub fn validate_interval(min_days: u32, max_days: u32) -> Result<(), MinigameError> {
    if min_days > max_days {
        return Err(MinigameError::InvalidConfig(format!(
            "min interval ({min_days}d) is greater than max interval ({max_days}d)"
        )));
    }
    Ok(())
}

/// Directory holding the JSON store and `packs/`
pub fn data_dir() -> PathBuf {
    env::var("DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_DATA_DIR))
}

fn override_from_env<T: FromStr>(key: &str, slot: &mut T) -> Result<(), MinigameError> {
    if let Ok(raw) = env::var(key) {
        *slot = raw
            .trim()
            .parse()
            .map_err(|_| MinigameError::InvalidConfig(format!("{key} has invalid value {raw:?}")))?;
    }
    Ok(())
}
