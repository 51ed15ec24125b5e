//! # World Content Module
//!
//! Loaders for the two static-ish datasets the bot works from:
//!
//! - the **world map** (read-only input): locations, directions, and squares
//!   with their mob levels, used to build the farming route
//! - the **mob observation database** (merged output): everything the bot
//!   has learned about mobs it encountered, appended as new species appear
//!
//! Server JSON for square levels is loosely shaped (plain integers, numeric
//! strings, or objects pointing at inner locations), so the map types are
//! permissive and classification happens behind [`MobLevel::classify`].

use anyhow::{anyhow, Result};
use fs2::FileExt;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::api::types::MobSpawn;

/// The world map document: `world_map -> location -> direction -> square`.
#[derive(Debug, Clone, Deserialize)]
pub struct WorldMap {
    pub world_map: HashMap<String, Location>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Location {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub directions: HashMap<String, Direction>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Direction {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub squares: HashMap<String, Square>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Square {
    #[serde(default)]
    pub mob_level: Option<MobLevel>,
    #[serde(default)]
    pub has_mobs: bool,
    #[serde(default)]
    pub mob_count: i64,
}

/// A square's mob level as the dataset spells it: a number, a numeric
/// string, or an object that may instead point at an inner location.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MobLevel {
    Number(i64),
    Text(String),
    Detailed {
        #[serde(default, rename = "mobLvl")]
        mob_lvl: Option<Value>,
        #[serde(default, rename = "locoId")]
        loco_id: Option<Value>,
        #[serde(default, rename = "locoName")]
        loco_name: Option<String>,
    },
}

/// What a square's `mob_level` means for route building.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SquareClass {
    /// An ordinary square with mobs of this level.
    Level(i64),
    /// The square exposes an inner location; excluded from the route.
    InnerLocation,
    /// The level could not be parsed.
    Unusable,
}

impl MobLevel {
    pub fn classify(&self) -> SquareClass {
        match self {
            MobLevel::Number(n) => SquareClass::Level(*n),
            MobLevel::Text(s) => match s.trim().parse::<i64>() {
                Ok(n) => SquareClass::Level(n),
                Err(_) => SquareClass::Unusable,
            },
            MobLevel::Detailed {
                mob_lvl,
                loco_id,
                loco_name,
            } => {
                if loco_id.is_some() || loco_name.is_some() {
                    return SquareClass::InnerLocation;
                }
                match mob_lvl.as_ref().and_then(crate::api::types::scalar_or_pair) {
                    Some(n) => SquareClass::Level(n),
                    None => SquareClass::Unusable,
                }
            }
        }
    }
}

impl WorldMap {
    pub async fn load(path: &str) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read world map {}: {}", path, e))?;
        let map: WorldMap = serde_json::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse world map {}: {}", path, e))?;
        info!("World map loaded: {} locations", map.world_map.len());
        Ok(map)
    }
}

/// One drop table entry of an observed mob. `min_level_drop` records the
/// player level at first observation and is never overwritten afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DropRecord {
    pub id: String,
    #[serde(default, rename = "typeElement")]
    pub type_element: String,
    #[serde(default)]
    pub count: i64,
    #[serde(default)]
    pub chance: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_level_drop: Option<u32>,
}

/// An observed mob species.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MobRecord {
    pub id: String,
    pub name: String,
    pub photo: String,
    pub desc: String,
    pub farm_id: String,
    pub location: String,
    pub side_ru: String,
    #[serde(default)]
    pub drop: Vec<DropRecord>,
}

/// The append/merge mob observation database, backed by one JSON array.
#[derive(Debug)]
pub struct MobDatabase {
    records: Vec<MobRecord>,
    path: PathBuf,
    dirty: bool,
}

impl MobDatabase {
    /// Load the database, treating a missing file as empty.
    pub async fn load(path: &str) -> Result<Self> {
        let path_buf = PathBuf::from(path);
        let records = match tokio::fs::read_to_string(&path_buf).await {
            Ok(content) => serde_json::from_str(&content)
                .map_err(|e| anyhow!("Failed to parse mob database {}: {}", path, e))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(anyhow!("Failed to read mob database {}: {}", path, e)),
        };
        Ok(MobDatabase {
            records,
            path: path_buf,
            dirty: false,
        })
    }

    #[cfg(test)]
    pub fn in_memory() -> Self {
        MobDatabase {
            records: Vec::new(),
            path: PathBuf::from("mobs-test.json"),
            dirty: false,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&MobRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    /// Record one spawn. A spawn missing any identifying field is skipped
    /// entirely; a known species only merges new drop entries. Returns
    /// whether anything changed.
    pub fn observe(&mut self, spawn: &MobSpawn, player_level: u32) -> bool {
        let required = [
            spawn.id.as_deref(),
            spawn.name.as_deref(),
            spawn.photo.as_deref(),
            spawn.desc.as_deref(),
            spawn.farm_id.as_deref(),
            spawn.location.as_deref(),
            spawn.side.as_deref(),
        ];
        if required.iter().any(|f| f.is_none_or(str::is_empty)) {
            debug!("skipping mob observation with missing fields");
            return false;
        }
        let id = spawn.id.clone().unwrap_or_default();

        let drops: Vec<DropRecord> = spawn
            .drop
            .iter()
            .filter_map(|d| {
                let drop_id = d.id.clone()?;
                Some(DropRecord {
                    id: drop_id,
                    type_element: d.type_element.clone().unwrap_or_default(),
                    count: d
                        .count
                        .as_ref()
                        .and_then(crate::api::types::scalar_or_pair)
                        .unwrap_or(0),
                    chance: d.chance.as_ref().and_then(Value::as_f64).unwrap_or(0.0),
                    min_level_drop: Some(player_level),
                })
            })
            .collect();

        if let Some(existing) = self.records.iter_mut().find(|r| r.id == id) {
            let mut changed = false;
            for drop in drops {
                match existing.drop.iter_mut().find(|d| d.id == drop.id) {
                    Some(known) => {
                        if known.min_level_drop.is_none() {
                            known.min_level_drop = Some(player_level);
                            changed = true;
                        }
                    }
                    None => {
                        existing.drop.push(drop);
                        changed = true;
                    }
                }
            }
            self.dirty |= changed;
            changed
        } else {
            info!("new mob observed: {}", spawn.name.as_deref().unwrap_or("?"));
            self.records.push(MobRecord {
                id,
                name: spawn.name.clone().unwrap_or_default(),
                photo: spawn.photo.clone().unwrap_or_default(),
                desc: spawn.desc.clone().unwrap_or_default(),
                farm_id: spawn.farm_id.clone().unwrap_or_default(),
                location: spawn.location.clone().unwrap_or_default(),
                side_ru: spawn.side.clone().unwrap_or_default(),
                drop: drops,
            });
            self.dirty = true;
            true
        }
    }

    /// Persist the database when observations changed it.
    pub fn save(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }
        let content = serde_json::to_string_pretty(&self.records)?;
        write_text_atomic(&self.path, &content)
            .map_err(|e| anyhow!("Failed to write mob database: {}", e))?;
        self.dirty = false;
        Ok(())
    }
}

/// Write a file atomically: take an exclusive lock on the destination,
/// write a sibling temp file, fsync, then rename over the target.
pub fn write_text_atomic(path: &Path, content: &str) -> std::io::Result<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    std::fs::create_dir_all(dir)?;

    let lock_file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .read(true)
        .write(true)
        .open(path)?;
    lock_file.lock_exclusive()?;

    let base = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("out.json");
    let tmp_path = dir.join(format!(".{}.tmp-{}", base, std::process::id()));
    {
        let mut tmp = OpenOptions::new()
            .create(true)
            .truncate(true)
            .write(true)
            .open(&tmp_path)?;
        tmp.write_all(content.as_bytes())?;
        tmp.flush()?;
        let _ = tmp.sync_all();
    }
    std::fs::rename(&tmp_path, path)?;
    if let Ok(dirf) = File::open(dir) {
        let _ = dirf.sync_all();
    }
    if let Err(e) = fs2::FileExt::unlock(&lock_file) {
        warn!("failed to release lock on {}: {}", path.display(), e);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn full_spawn() -> MobSpawn {
        serde_json::from_value(json!({
            "id": "mob_3",
            "farmId": "f_1",
            "name": "Кабан",
            "photo": "boar.png",
            "desc": "Дикий кабан",
            "location": "loco_0",
            "sideRu": "восток",
            "lvl": 5,
            "drop": [
                { "id": "res_25", "typeElement": "res", "count": 1, "chance": 0.4 }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn mob_level_classifies_numbers_and_strings() {
        let level: MobLevel = serde_json::from_value(json!(12)).unwrap();
        assert_eq!(level.classify(), SquareClass::Level(12));

        let level: MobLevel = serde_json::from_value(json!("8")).unwrap();
        assert_eq!(level.classify(), SquareClass::Level(8));

        let level: MobLevel = serde_json::from_value(json!("boss?")).unwrap();
        assert_eq!(level.classify(), SquareClass::Unusable);
    }

    #[test]
    fn mob_level_detects_inner_locations() {
        let level: MobLevel =
            serde_json::from_value(json!({ "mobLvl": 4, "locoId": "loco_9" })).unwrap();
        assert_eq!(level.classify(), SquareClass::InnerLocation);

        let level: MobLevel = serde_json::from_value(json!({ "locoName": "Пещера" })).unwrap();
        assert_eq!(level.classify(), SquareClass::InnerLocation);

        let level: MobLevel = serde_json::from_value(json!({ "mobLvl": "6" })).unwrap();
        assert_eq!(level.classify(), SquareClass::Level(6));
    }

    #[test]
    fn observe_records_a_complete_spawn() {
        let mut db = MobDatabase::in_memory();
        assert!(db.observe(&full_spawn(), 7));
        let record = db.get("mob_3").unwrap();
        assert_eq!(record.name, "Кабан");
        assert_eq!(record.drop.len(), 1);
        assert_eq!(record.drop[0].min_level_drop, Some(7));
    }

    #[test]
    fn observe_skips_incomplete_spawns() {
        let mut db = MobDatabase::in_memory();
        let spawn: MobSpawn = serde_json::from_value(json!({
            "id": "mob_4",
            "farmId": "f_2",
            "name": "Безликий"
        }))
        .unwrap();
        assert!(!db.observe(&spawn, 7));
        assert!(db.is_empty());
    }

    #[test]
    fn min_level_drop_is_never_overwritten() {
        let mut db = MobDatabase::in_memory();
        db.observe(&full_spawn(), 7);
        // Re-observing at a different level must not move the stamp.
        assert!(!db.observe(&full_spawn(), 12));
        assert_eq!(db.get("mob_3").unwrap().drop[0].min_level_drop, Some(7));
    }

    #[test]
    fn observe_merges_new_drops_into_known_species() {
        let mut db = MobDatabase::in_memory();
        db.observe(&full_spawn(), 7);
        let richer: MobSpawn = serde_json::from_value(json!({
            "id": "mob_3",
            "farmId": "f_1",
            "name": "Кабан",
            "photo": "boar.png",
            "desc": "Дикий кабан",
            "location": "loco_0",
            "sideRu": "восток",
            "drop": [
                { "id": "res_25", "count": 1 },
                { "id": "res_40", "count": 2, "chance": 0.1 }
            ]
        }))
        .unwrap();
        assert!(db.observe(&richer, 12));
        let record = db.get("mob_3").unwrap();
        assert_eq!(record.drop.len(), 2);
        assert_eq!(record.drop[0].min_level_drop, Some(7));
        assert_eq!(record.drop[1].min_level_drop, Some(12));
    }
}
