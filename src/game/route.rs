//! Farming route construction, traversal, and persistence.
//!
//! One square is chosen per (location, direction) for the player's level:
//! among squares within the level band the *lowest* mob level wins (the
//! safest square), and only when the band is empty does the best
//! below-band square stand in. Squares pointing at inner locations and
//! squares above the hard level cap never enter the route.
//!
//! The route position survives restarts as a single integer in a file,
//! written atomically before every city excursion.

use log::{debug, info, warn};
use std::path::Path;

use crate::config::RouteConfig;
use crate::content::{write_text_atomic, SquareClass, WorldMap};

/// One stop on the farming route.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutePoint {
    pub location_id: String,
    pub location_name: String,
    pub direction_key: String,
    pub direction_name: String,
    pub square_id: String,
    pub mob_level: i64,
}

/// Ordered route plus the traversal cursor and per-square kill counter.
#[derive(Debug)]
pub struct Route {
    points: Vec<RoutePoint>,
    current_index: usize,
    kills_on_current_square: u32,
    kills_per_square: u32,
}

/// Fixed traversal order for direction keys; anything else sorts after.
fn direction_rank(key: &str) -> usize {
    match key {
        "N" => 0,
        "S" => 1,
        "E" => 2,
        "W" => 3,
        _ => 4,
    }
}

impl Route {
    /// Build the route for a player level from the world map.
    pub fn build(level: u32, map: &WorldMap, cfg: &RouteConfig) -> Self {
        let level = i64::from(level);
        let band_floor = (level - i64::from(cfg.level_band)).max(1);

        let mut points = Vec::new();
        let mut locations: Vec<_> = map.world_map.iter().collect();
        locations.sort_by(|a, b| a.0.cmp(b.0));

        for (location_id, location) in locations {
            let mut directions: Vec<_> = location.directions.iter().collect();
            directions.sort_by(|a, b| {
                direction_rank(a.0)
                    .cmp(&direction_rank(b.0))
                    .then(a.0.cmp(b.0))
            });

            for (direction_key, direction) in directions {
                let mut in_band: Option<(&String, i64)> = None;
                let mut below_band: Option<(&String, i64)> = None;

                let mut squares: Vec<_> = direction.squares.iter().collect();
                squares.sort_by(|a, b| a.0.cmp(b.0));

                for (square_id, square) in squares {
                    let class = match &square.mob_level {
                        Some(lvl) => lvl.classify(),
                        None => continue,
                    };
                    let m = match class {
                        SquareClass::Level(m) => m,
                        SquareClass::InnerLocation => {
                            debug!("{} {} {}: inner location, skipped", location_id, direction_key, square_id);
                            continue;
                        }
                        SquareClass::Unusable => continue,
                    };
                    if m > cfg.max_mob_level {
                        continue;
                    }
                    if m >= band_floor && m <= level {
                        if in_band.is_none_or(|(_, best)| m < best) {
                            in_band = Some((square_id, m));
                        }
                    } else if m < band_floor && below_band.is_none_or(|(_, best)| m > best) {
                        below_band = Some((square_id, m));
                    }
                }

                if let Some((square_id, m)) = in_band.or(below_band) {
                    points.push(RoutePoint {
                        location_id: location_id.clone(),
                        location_name: location.name.clone(),
                        direction_key: direction_key.clone(),
                        direction_name: direction.name.clone(),
                        square_id: square_id.clone(),
                        mob_level: m,
                    });
                }
            }
        }

        info!("route built: {} points for level {}", points.len(), level);
        Route {
            points,
            current_index: 0,
            kills_on_current_square: 0,
            kills_per_square: cfg.kills_per_square,
        }
    }

    /// Placeholder before the player level is known.
    pub fn empty(kills_per_square: u32) -> Self {
        Route {
            points: Vec::new(),
            current_index: 0,
            kills_on_current_square: 0,
            kills_per_square,
        }
    }

    #[cfg(test)]
    pub fn from_points(points: Vec<RoutePoint>, kills_per_square: u32) -> Self {
        Route {
            points,
            current_index: 0,
            kills_on_current_square: 0,
            kills_per_square,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn kills_on_current_square(&self) -> u32 {
        self.kills_on_current_square
    }

    pub fn kills_per_square(&self) -> u32 {
        self.kills_per_square
    }

    pub fn current_point(&self) -> Option<&RoutePoint> {
        self.points.get(self.current_index)
    }

    /// Step to the next point, wrapping at the end; the kill counter
    /// restarts for the new square.
    pub fn advance(&mut self) {
        if self.points.is_empty() {
            return;
        }
        self.current_index = (self.current_index + 1) % self.points.len();
        self.kills_on_current_square = 0;
    }

    pub fn record_kill(&mut self) {
        self.kills_on_current_square += 1;
    }

    pub fn should_advance(&self) -> bool {
        self.kills_on_current_square >= self.kills_per_square
    }

    /// Persist the cursor before leaving the route (city excursions).
    pub fn save_index(&self, path: &str) -> std::io::Result<()> {
        write_text_atomic(Path::new(path), &format!("{}\n", self.current_index))
    }

    /// Restore the cursor from a previous run. Missing files and
    /// out-of-range values leave the route at its start.
    pub fn restore_index(&mut self, path: &str) {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return,
            Err(e) => {
                warn!("failed to read route index {}: {}", path, e);
                return;
            }
        };
        match content.trim().parse::<usize>() {
            Ok(idx) if idx < self.points.len() => {
                info!("route resumed at point {}", idx);
                self.current_index = idx;
            }
            Ok(idx) => {
                warn!("route index {} out of range ({} points), ignored", idx, self.points.len());
            }
            Err(_) => {
                warn!("route index file {} is not an integer, ignored", path);
            }
        }
    }
}
