//! The player snapshot and its per-action cooldown clocks.
//!
//! The player is created once at session start and reconciled in place from
//! server payloads; it is never rebuilt. Cooldowns are pure time-since
//! checks against `Instant` clocks, which keeps them independent of server
//! time and trivially testable.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::api::types::PlayerSnapshot;
use crate::game::items::InventoryEntry;

/// Duration of a campfire rest.
pub const REST_DURATION: Duration = Duration::from_secs(1200);

/// The four combat actions plus rest, each with its own cooldown clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Attack,
    Skill,
    Heal,
    Mana,
    Rest,
}

impl Action {
    pub fn cooldown(self) -> Duration {
        match self {
            Action::Attack => Duration::from_millis(5_100),
            Action::Skill => Duration::from_millis(11_000),
            Action::Heal => Duration::from_millis(5_500),
            Action::Mana => Duration::from_millis(5_500),
            Action::Rest => REST_DURATION,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Action::Attack => "attack",
            Action::Skill => "skill",
            Action::Heal => "heal",
            Action::Mana => "mana",
            Action::Rest => "rest",
        }
    }
}

/// Mutable player state for the session.
#[derive(Debug, Clone, Default)]
pub struct Player {
    pub hp: i64,
    pub max_hp: i64,
    pub mp: i64,
    pub max_mp: i64,
    pub morale: i64,
    pub stamina: i64,
    pub max_stamina: i64,
    pub level: u32,
    pub xp: i64,
    pub xp_to_next: i64,
    pub inventory: HashMap<String, InventoryEntry>,
    last_attack: Option<Instant>,
    last_skill: Option<Instant>,
    last_heal: Option<Instant>,
    last_mana: Option<Instant>,
    last_rest: Option<Instant>,
}

impl Player {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reconcile from a server payload. Only fields the payload carried are
    /// touched, so applying the same snapshot twice is a no-op.
    pub fn apply(&mut self, snap: &PlayerSnapshot) {
        if let Some(v) = snap.max_hp {
            self.max_hp = v.max(0);
        }
        if let Some(v) = snap.hp {
            self.hp = v;
        }
        if let Some(v) = snap.max_mp {
            self.max_mp = v.max(0);
        }
        if let Some(v) = snap.mp {
            self.mp = v;
        }
        if let Some(v) = snap.max_stamina {
            self.max_stamina = v.max(0);
        }
        if let Some(v) = snap.stamina {
            self.stamina = v;
        }
        if let Some(v) = snap.morale {
            self.morale = v.clamp(0, 100);
        }
        if let Some(v) = snap.level {
            self.level = v;
        }
        if let Some(v) = snap.xp {
            self.xp = v;
        }
        if let Some(v) = snap.xp_to_next {
            self.xp_to_next = v;
        }
        if let Some(inv) = &snap.inventory {
            self.inventory = inv.clone();
        }
        self.hp = if self.max_hp > 0 {
            self.hp.clamp(0, self.max_hp)
        } else {
            self.hp.max(0)
        };
        self.mp = if self.max_mp > 0 {
            self.mp.clamp(0, self.max_mp)
        } else {
            self.mp.max(0)
        };
    }

    pub fn hp_percent(&self) -> f64 {
        if self.max_hp > 0 {
            self.hp as f64 * 100.0 / self.max_hp as f64
        } else {
            0.0
        }
    }

    pub fn mp_percent(&self) -> f64 {
        if self.max_mp > 0 {
            self.mp as f64 * 100.0 / self.max_mp as f64
        } else {
            0.0
        }
    }

    /// Count of an inventory item, 0 when absent.
    pub fn count(&self, item_id: &str) -> i64 {
        self.inventory.get(item_id).map_or(0, |e| e.count)
    }

    /// Drop an item count by one, for potion-use replies that carry no
    /// inventory to reconcile from.
    pub fn decrement(&mut self, item_id: &str) {
        if let Some(entry) = self.inventory.get_mut(item_id) {
            entry.count = (entry.count - 1).max(0);
        }
    }

    fn clock(&self, action: Action) -> Option<Instant> {
        match action {
            Action::Attack => self.last_attack,
            Action::Skill => self.last_skill,
            Action::Heal => self.last_heal,
            Action::Mana => self.last_mana,
            Action::Rest => self.last_rest,
        }
    }

    /// An action is ready iff its clock is unset or the cooldown has fully
    /// elapsed.
    pub fn can(&self, action: Action, now: Instant) -> bool {
        match self.clock(action) {
            None => true,
            Some(t) => now.saturating_duration_since(t) >= action.cooldown(),
        }
    }

    /// Stamp the last-use clock for an action.
    pub fn record(&mut self, action: Action, now: Instant) {
        let slot = match action {
            Action::Attack => &mut self.last_attack,
            Action::Skill => &mut self.last_skill,
            Action::Heal => &mut self.last_heal,
            Action::Mana => &mut self.last_mana,
            Action::Rest => &mut self.last_rest,
        };
        *slot = Some(now);
    }

    /// Remaining wait before an action is ready; zero when ready.
    pub fn ready_in(&self, action: Action, now: Instant) -> Duration {
        match self.clock(action) {
            None => Duration::ZERO,
            Some(t) => action
                .cooldown()
                .saturating_sub(now.saturating_duration_since(t)),
        }
    }

    /// Clear every cooldown clock. Used on combat entry so all actions are
    /// immediately available.
    pub fn reset_cooldowns(&mut self) {
        self.last_attack = None;
        self.last_skill = None;
        self.last_heal = None;
        self.last_mana = None;
        self.last_rest = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::PlayerSnapshot;

    #[test]
    fn cooldown_is_monotonic_around_the_boundary() {
        let mut player = Player::new();
        let t0 = Instant::now();
        player.record(Action::Attack, t0);

        let cd = Action::Attack.cooldown();
        assert!(!player.can(Action::Attack, t0));
        assert!(!player.can(Action::Attack, t0 + cd - Duration::from_millis(1)));
        assert!(player.can(Action::Attack, t0 + cd));
        assert!(player.can(Action::Attack, t0 + cd + Duration::from_secs(5)));
    }

    #[test]
    fn fresh_player_has_everything_ready() {
        let player = Player::new();
        let now = Instant::now();
        for action in [
            Action::Attack,
            Action::Skill,
            Action::Heal,
            Action::Mana,
            Action::Rest,
        ] {
            assert!(player.can(action, now), "{} not ready", action.label());
        }
    }

    #[test]
    fn reset_clears_all_clocks() {
        let mut player = Player::new();
        let t0 = Instant::now();
        player.record(Action::Attack, t0);
        player.record(Action::Skill, t0);
        assert!(!player.can(Action::Attack, t0));
        player.reset_cooldowns();
        assert!(player.can(Action::Attack, t0));
        assert!(player.can(Action::Skill, t0));
    }

    #[test]
    fn ready_in_counts_down() {
        let mut player = Player::new();
        let t0 = Instant::now();
        player.record(Action::Heal, t0);
        let half = Duration::from_millis(2_750);
        assert_eq!(player.ready_in(Action::Heal, t0 + half), half);
        assert_eq!(
            player.ready_in(Action::Heal, t0 + Action::Heal.cooldown()),
            Duration::ZERO
        );
    }

    #[test]
    fn apply_is_idempotent() {
        let mut player = Player::new();
        let snap = PlayerSnapshot {
            hp: Some(80),
            max_hp: Some(100),
            morale: Some(90),
            level: Some(7),
            ..Default::default()
        };
        player.apply(&snap);
        let first = player.clone();
        player.apply(&snap);
        assert_eq!(player.hp, first.hp);
        assert_eq!(player.max_hp, first.max_hp);
        assert_eq!(player.morale, first.morale);
        assert_eq!(player.level, first.level);
    }

    #[test]
    fn apply_skips_absent_fields() {
        let mut player = Player::new();
        player.apply(&PlayerSnapshot {
            hp: Some(50),
            max_hp: Some(100),
            mp: Some(30),
            max_mp: Some(60),
            ..Default::default()
        });
        player.apply(&PlayerSnapshot {
            hp: Some(45),
            ..Default::default()
        });
        assert_eq!(player.hp, 45);
        assert_eq!(player.max_hp, 100);
        assert_eq!(player.mp, 30);
    }

    #[test]
    fn apply_clamps_vitals() {
        let mut player = Player::new();
        player.apply(&PlayerSnapshot {
            hp: Some(150),
            max_hp: Some(100),
            morale: Some(240),
            ..Default::default()
        });
        assert_eq!(player.hp, 100);
        assert_eq!(player.morale, 100);
        player.apply(&PlayerSnapshot {
            hp: Some(-5),
            ..Default::default()
        });
        assert_eq!(player.hp, 0);
    }

    #[test]
    fn count_and_decrement() {
        let mut player = Player::new();
        player.inventory.insert(
            "m_1".to_string(),
            InventoryEntry {
                count: 2,
                ..Default::default()
            },
        );
        assert_eq!(player.count("m_1"), 2);
        assert_eq!(player.count("m_3"), 0);
        player.decrement("m_1");
        assert_eq!(player.count("m_1"), 1);
        player.decrement("m_1");
        player.decrement("m_1");
        assert_eq!(player.count("m_1"), 0);
    }
}
