//! Save slots for the arena harness
//!
//! Each slot is one JSON file under `~/.local/share/vigil/saves/` holding a
//! full simulation archive plus some metadata for listing.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use vigil_ai::SimulationArchive;

/// Save format version (for future migration)
const SAVE_VERSION: u32 = 1;

/// Top-level save data structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveData {
    pub version: u32,
    /// When the save was written
    pub timestamp: DateTime<Utc>,
    /// Display name of the slot (empty for quicksave)
    #[serde(default)]
    pub slot_name: String,
    /// Arena the archive belongs to
    pub level: String,
    pub archive: SimulationArchive,
}

impl SaveData {
    pub fn new(slot_name: &str, level: &str, archive: SimulationArchive) -> Self {
        Self {
            version: SAVE_VERSION,
            timestamp: Utc::now(),
            slot_name: slot_name.to_string(),
            level: level.to_string(),
            archive,
        }
    }
}

/// Summary info for a save slot
#[derive(Debug, Clone)]
pub struct SaveSlotInfo {
    /// Filename (without extension)
    pub filename: String,
    pub slot_name: String,
    pub timestamp: DateTime<Utc>,
    pub level: String,
    /// Level time of the archive in seconds
    pub level_time: f32,
    pub actors: usize,
}

/// Get the save directory path, creating it if it doesn't exist
fn save_dir() -> Result<PathBuf> {
    let dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("vigil")
        .join("saves");
    fs::create_dir_all(&dir).context("Failed to create save directory")?;
    Ok(dir)
}

fn slot_path(dir: &Path, filename: &str) -> PathBuf {
    dir.join(format!("{}.json", filename))
}

/// Sanitize a slot name into a valid filename
fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect::<String>()
        .to_lowercase()
}

/// Save to a named slot
pub fn save_to_slot(data: &SaveData) -> Result<PathBuf> {
    let dir = save_dir()?;
    let name = if data.slot_name.is_empty() { "quicksave" } else { &data.slot_name };
    let path = slot_path(&dir, &sanitize_filename(name));
    write_save(&path, data)?;
    Ok(path)
}

/// Load from a named slot (by filename, not display name)
pub fn load_from_slot(filename: &str) -> Result<SaveData> {
    let dir = save_dir()?;
    read_save(&slot_path(&dir, &sanitize_filename(filename)))
}

/// Delete a save slot
pub fn delete_slot(filename: &str) -> Result<()> {
    let path = slot_path(&save_dir()?, &sanitize_filename(filename));
    if path.exists() {
        fs::remove_file(&path).context("Failed to delete save file")?;
    }
    Ok(())
}

/// List all save slots, newest first
pub fn list_save_slots() -> Result<Vec<SaveSlotInfo>> {
    list_slots_in(&save_dir()?)
}

fn list_slots_in(dir: &Path) -> Result<Vec<SaveSlotInfo>> {
    let mut slots = Vec::new();

    for entry in fs::read_dir(dir).context("Failed to read save directory")? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let filename = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_string();

        if let Ok(data) = read_save(&path) {
            slots.push(SaveSlotInfo {
                filename,
                slot_name: data.slot_name,
                timestamp: data.timestamp,
                level: data.level,
                level_time: data.archive.time.level_time,
                actors: data.archive.actors.len(),
            });
        }
    }

    slots.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    Ok(slots)
}

// --- Internal helpers ---

fn write_save(path: &Path, data: &SaveData) -> Result<()> {
    let json = serde_json::to_string_pretty(data).context("Failed to serialize save data")?;
    fs::write(path, json).with_context(|| format!("Failed to write save file {:?}", path))?;
    Ok(())
}

fn read_save(path: &Path) -> Result<SaveData> {
    let json = fs::read_to_string(path).with_context(|| format!("Failed to read save file {:?}", path))?;
    let data: SaveData = serde_json::from_str(&json).context("Failed to deserialize save data")?;
    if data.version != SAVE_VERSION {
        anyhow::bail!("Unsupported save version {} in {:?}", data.version, path);
    }
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena;
    use crate::settings::VigilSettings;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("vigil-save-test-{}-{}", name, std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn sample(slot: &str) -> SaveData {
        let settings = VigilSettings::default();
        let mut arena = arena::Arena::build(&settings).unwrap();
        for _ in 0..10 {
            arena.step();
        }
        SaveData::new(slot, arena::LEVEL_NAME, arena.sim.save().unwrap())
    }

    #[test]
    fn test_write_then_read() {
        let dir = scratch_dir("rw");
        let data = sample("Before Ambush");
        let path = slot_path(&dir, &sanitize_filename(&data.slot_name));
        write_save(&path, &data).unwrap();

        let loaded = read_save(&path).unwrap();
        assert_eq!(loaded.slot_name, "Before Ambush");
        assert_eq!(loaded.level, arena::LEVEL_NAME);
        assert_eq!(loaded.timestamp, data.timestamp);
        assert_eq!(loaded.archive.actors.len(), data.archive.actors.len());
        assert_eq!(loaded.archive.time.tick_count, 10);

        let slots = list_slots_in(&dir).unwrap();
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].filename, "before_ambush");
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("My Save!"), "my_save_");
        assert_eq!(sanitize_filename("save-01_test"), "save-01_test");
    }
}
