//! Harness settings with persistence
//!
//! Settings are saved to `~/.config/vigil/settings.toml`

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use vigil_ai::AiConfig;
use vigil_core::TimeConfig;

/// All harness settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VigilSettings {
    pub simulation: SimulationSettings,
    pub ai: AiConfig,
}

impl VigilSettings {
    /// Get the config directory path
    fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("vigil"))
    }

    /// Get the settings file path
    fn settings_path() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join("settings.toml"))
    }

    /// Load settings from disk, or return defaults if not found
    pub fn load() -> Self {
        let Some(path) = Self::settings_path() else {
            warn!("Could not determine config directory");
            return Self::default();
        };

        if !path.exists() {
            info!("No settings file found, using defaults");
            return Self::default();
        }

        match fs::read_to_string(&path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(settings) => {
                    info!("Loaded settings from {:?}", path);
                    settings
                }
                Err(e) => {
                    warn!("Failed to parse settings: {}, using defaults", e);
                    Self::default()
                }
            },
            Err(e) => {
                warn!("Failed to read settings file: {}, using defaults", e);
                Self::default()
            }
        }
    }

    /// Save settings to disk
    pub fn save(&self) -> anyhow::Result<()> {
        let Some(dir) = Self::config_dir() else {
            anyhow::bail!("Could not determine config directory");
        };

        let path = dir.join("settings.toml");
        if !dir.exists() {
            fs::create_dir_all(&dir)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content)?;
        info!("Saved settings to {:?}", path);
        Ok(())
    }
}

/// Clock and run length
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    /// RNG seed for the arena
    pub seed: u64,
    /// Ticks to run before exiting
    pub ticks: u32,
    /// Length of one tick in seconds
    pub fixed_timestep: f32,
    /// Simulated seconds per real second
    pub time_scale: f32,
    /// Log a status line every this many ticks (0 = never)
    pub report_interval: u32,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            seed: 1,
            ticks: 600,
            fixed_timestep: 0.05,
            time_scale: 1.0,
            report_interval: 40,
        }
    }
}

impl SimulationSettings {
    pub fn time_config(&self) -> TimeConfig {
        TimeConfig {
            time_scale: self.time_scale,
            fixed_timestep: self.fixed_timestep,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let settings: VigilSettings = toml::from_str(
            r#"
            [simulation]
            ticks = 10

            [ai]
            melee_range = 80.0
            "#,
        )
        .unwrap();
        assert_eq!(settings.simulation.ticks, 10);
        assert_eq!(settings.simulation.fixed_timestep, 0.05);
        assert_eq!(settings.ai.melee_range, 80.0);
        assert_eq!(settings.ai.mid_range, AiConfig::default().mid_range);
    }

    #[test]
    fn test_round_trip_toml() {
        let settings = VigilSettings::default();
        let text = toml::to_string_pretty(&settings).unwrap();
        let loaded: VigilSettings = toml::from_str(&text).unwrap();
        assert_eq!(loaded.simulation.seed, settings.simulation.seed);
        assert_eq!(loaded.ai.chase_stuck_ticks, settings.ai.chase_stuck_ticks);
    }
}
