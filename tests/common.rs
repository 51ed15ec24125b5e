//! Test utilities & fixtures.
//! Builds small world-map documents in temp dirs so suites stay hermetic.

use std::path::{Path, PathBuf};

/// A compact two-location world map: enough squares to exercise band
/// selection, the below-band fallback, and inner-location exclusion.
pub fn world_map_json() -> serde_json::Value {
    serde_json::json!({
        "world_map": {
            "loco_0": {
                "name": "Равнина",
                "directions": {
                    "E": {
                        "name": "Восток",
                        "squares": {
                            "s_1": { "mob_level": 5, "has_mobs": true, "mob_count": 3 },
                            "s_2": { "mob_level": 9, "has_mobs": true, "mob_count": 2 },
                            "s_3": { "mob_level": "12", "has_mobs": true, "mob_count": 4 }
                        }
                    },
                    "N": {
                        "name": "Север",
                        "squares": {
                            "s_4": { "mob_level": { "mobLvl": 6, "locoId": "loco_9" } },
                            "s_5": { "mob_level": 22 }
                        }
                    }
                }
            },
            "loco_1": {
                "name": "Лес",
                "directions": {
                    "W": {
                        "name": "Запад",
                        "squares": {
                            "s_6": { "mob_level": 2 },
                            "s_7": { "mob_level": 4 }
                        }
                    }
                }
            }
        }
    })
}

/// Write the fixture world map into `dir` and return its path.
#[allow(dead_code)] // Not every suite builds a route.
pub fn write_world_map(dir: &Path) -> PathBuf {
    let path = dir.join("world_map.json");
    std::fs::write(&path, world_map_json().to_string()).unwrap();
    path
}
