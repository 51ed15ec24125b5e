//! # Display Module
//!
//! Terminal panels and session statistics. Everything here is a pure sink:
//! the engine pushes events and hands over read-only views of the game
//! state once a second; nothing flows back.
//!
//! Panels are plain `String` builders so they stay testable without a
//! terminal. Layout follows the compact fixed-label style of the rest of
//! the client.

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, VecDeque};
use std::io::Write;
use std::time::Instant;

use crate::game::items;
use crate::game::player::{Action, Player};
use crate::game::{BotState, MobGroup, Route};

/// Running counters for one bot session.
#[derive(Debug)]
pub struct SessionStats {
    pub mobs_killed: u64,
    pub xp_gained: i64,
    pub gold_gained: i64,
    pub events_found: u64,
    pub heal_potions_used: u64,
    pub mana_potions_used: u64,
    pub city_visits: u64,
    pub items_sold: u64,
    pub gold_from_sales: i64,
    pub kills_by_name: BTreeMap<String, u64>,
    pub drops_by_item: BTreeMap<String, i64>,
    pub total_damage: i64,
    pub total_attacks: u64,
    pub started_at: DateTime<Utc>,
}

impl SessionStats {
    pub fn new() -> Self {
        SessionStats {
            mobs_killed: 0,
            xp_gained: 0,
            gold_gained: 0,
            events_found: 0,
            heal_potions_used: 0,
            mana_potions_used: 0,
            city_visits: 0,
            items_sold: 0,
            gold_from_sales: 0,
            kills_by_name: BTreeMap::new(),
            drops_by_item: BTreeMap::new(),
            total_damage: 0,
            total_attacks: 0,
            started_at: Utc::now(),
        }
    }

    pub fn record_attack_damage(&mut self, damage: i64) {
        self.total_damage += damage;
        self.total_attacks += 1;
    }

    pub fn record_kill_of(&mut self, name: &str) {
        *self.kills_by_name.entry(name.to_string()).or_insert(0) += 1;
    }

    /// Count one drop entry; gold is accounted as currency, not as an item.
    pub fn record_drop(&mut self, item_id: &str, count: i64) {
        if item_id == items::GOLD {
            self.gold_gained += count;
        } else {
            *self.drops_by_item.entry(item_id.to_string()).or_insert(0) += count;
        }
    }

    pub fn average_damage(&self) -> f64 {
        if self.total_attacks > 0 {
            self.total_damage as f64 / self.total_attacks as f64
        } else {
            0.0
        }
    }

    pub fn uptime(&self) -> chrono::Duration {
        Utc::now() - self.started_at
    }
}

impl Default for SessionStats {
    fn default() -> Self {
        Self::new()
    }
}

const MESSAGE_CAP: usize = 8;

/// Owns the stats and the recent-message ring; renders the frame.
#[derive(Debug, Default)]
pub struct Display {
    pub stats: SessionStats,
    messages: VecDeque<String>,
}

impl Display {
    pub fn new() -> Self {
        Display {
            stats: SessionStats::new(),
            messages: VecDeque::new(),
        }
    }

    pub fn push_message(&mut self, message: impl Into<String>) {
        if self.messages.len() == MESSAGE_CAP {
            self.messages.pop_front();
        }
        self.messages
            .push_back(format!("{} {}", Utc::now().format("%H:%M:%S"), message.into()));
    }

    pub fn messages(&self) -> impl Iterator<Item = &String> {
        self.messages.iter()
    }

    /// Build one full frame from the current game state.
    pub fn render_frame(
        &self,
        player: &Player,
        state: BotState,
        group: Option<&MobGroup>,
        route: &Route,
        now: Instant,
    ) -> String {
        let mut frame = String::new();
        frame.push_str(&format!("== rubybot [{}] ==\n", state));
        frame.push_str(&player_panel(player));
        frame.push_str(&cooldown_panel(player, now));
        if let Some(group) = group {
            frame.push_str(&combat_panel(group));
        }
        frame.push_str(&route_panel(route));
        frame.push_str(&stats_panel(&self.stats));
        frame.push_str(&drops_panel(&self.stats));
        frame.push_str(&kills_panel(&self.stats));
        frame.push_str(&self.messages_panel());
        frame
    }

    fn messages_panel(&self) -> String {
        if self.messages.is_empty() {
            return String::new();
        }
        let mut out = String::from("-- log --\n");
        for msg in &self.messages {
            out.push_str(msg);
            out.push('\n');
        }
        out
    }

    /// Print the frame. Stdout only; no terminal control beyond a leading
    /// blank line to separate frames.
    pub fn refresh(
        &self,
        player: &Player,
        state: BotState,
        group: Option<&MobGroup>,
        route: &Route,
        now: Instant,
    ) {
        let frame = self.render_frame(player, state, group, route, now);
        let mut stdout = std::io::stdout();
        let _ = writeln!(stdout, "\n{}", frame);
        let _ = stdout.flush();
    }
}

pub fn player_panel(player: &Player) -> String {
    let mut out = format!(
        "Lvl {}  XP {}/{}  Morale {}\n",
        player.level, player.xp, player.xp_to_next, player.morale
    );
    out.push_str(&format!(
        "HP {}/{} ({:.0}%)  MP {}/{} ({:.0}%)  Stam {}/{}\n",
        player.hp,
        player.max_hp,
        player.hp_percent(),
        player.mp,
        player.max_mp,
        player.mp_percent(),
        player.stamina,
        player.max_stamina
    ));
    out.push_str(&format!(
        "Heal pots {}  Mana pots {}  Gold {}\n",
        player.count(items::HEAL_POTION),
        player.count(items::MANA_POTION),
        player.count(items::GOLD)
    ));
    out
}

pub fn cooldown_panel(player: &Player, now: Instant) -> String {
    let mut parts = Vec::new();
    for action in [Action::Attack, Action::Skill, Action::Heal, Action::Mana] {
        let left = player.ready_in(action, now);
        if left.is_zero() {
            parts.push(format!("{} rdy", action.label()));
        } else {
            parts.push(format!("{} {:.1}s", action.label(), left.as_secs_f64()));
        }
    }
    format!("CD: {}\n", parts.join(" | "))
}

pub fn combat_panel(group: &MobGroup) -> String {
    let mut out = String::new();
    match group.current_target() {
        Some(target) => {
            out.push_str(&format!(
                "Target: {} (lvl {})  HP {}/{}\n",
                target.name, target.level, target.hp, target.max_hp
            ));
        }
        None => out.push_str("Target: none\n"),
    }
    out.push_str(&format!(
        "Group: {}/{} alive\n",
        group.alive_count(),
        group.mobs.len()
    ));
    out
}

pub fn route_panel(route: &Route) -> String {
    match route.current_point() {
        Some(p) => format!(
            "Route {}/{}: {} {} sq {} (mob lvl {})  kills {}/{}\n",
            route.current_index() + 1,
            route.len(),
            p.location_name,
            p.direction_name,
            p.square_id,
            p.mob_level,
            route.kills_on_current_square(),
            route.kills_per_square()
        ),
        None => "Route: empty\n".to_string(),
    }
}

pub fn stats_panel(stats: &SessionStats) -> String {
    let uptime = stats.uptime();
    let hours = uptime.num_hours();
    let minutes = uptime.num_minutes() % 60;
    let mut out = format!(
        "Session {}h{:02}m  kills {}  xp {}  gold {}  events {}\n",
        hours, minutes, stats.mobs_killed, stats.xp_gained, stats.gold_gained, stats.events_found
    );
    out.push_str(&format!(
        "Pots used h/m {}/{}  city visits {}  sold {} (+{} gold)  avg dmg {:.1}\n",
        stats.heal_potions_used,
        stats.mana_potions_used,
        stats.city_visits,
        stats.items_sold,
        stats.gold_from_sales,
        stats.average_damage()
    ));
    out
}

pub fn drops_panel(stats: &SessionStats) -> String {
    if stats.drops_by_item.is_empty() {
        return String::new();
    }
    let items: Vec<String> = stats
        .drops_by_item
        .iter()
        .map(|(id, count)| format!("{}: {}", id, count))
        .collect();
    format!("Drops: {}\n", items.join("  "))
}

pub fn kills_panel(stats: &SessionStats) -> String {
    if stats.kills_by_name.is_empty() {
        return String::new();
    }
    let names: Vec<String> = stats
        .kills_by_name
        .iter()
        .map(|(name, count)| format!("{}: {}", name, count))
        .collect();
    format!("Killed: {}\n", names.join("  "))
}
