//! The combat micro-loop: one decision per tick.
//!
//! Decision order, first applicable wins: abort to recovery, heal, mana,
//! skill, basic attack. A skill consumes the tick, so the basic attack can
//! never fire in the same tick. The handler also tracks hit damage across
//! the session to catch the weak-hit streaks that signal a mob too tough
//! for the current gear.

use log::debug;
use serde_json::json;
use std::collections::VecDeque;
use std::fmt;
use std::time::Instant;

use crate::api::types::{CombatReply, FailKind, JsonMap, PlayerSnapshot};
use crate::api::{ApiClient, ApiError, Endpoint};
use crate::config::CombatConfig;
use crate::display::Display;
use crate::game::items;
use crate::game::player::Action;
use crate::game::{MobGroup, Player};

/// Why combat is being abandoned for a city excursion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoverReason {
    LowPotions,
    WeakHits,
}

impl fmt::Display for RecoverReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecoverReason::LowPotions => f.write_str("potion stock low"),
            RecoverReason::WeakHits => f.write_str("weak hit streak"),
        }
    }
}

/// What a combat tick decided.
#[derive(Debug)]
pub enum CombatOutcome {
    /// Nothing final happened; keep ticking.
    Continue,
    /// All mobs dead. `kills` feeds the route's per-square counter.
    Victory { kills: u32 },
    /// Combat ended without a win; back to the city state with a clean slate.
    Failure(String),
    /// Degraded conditions; the engine should run a recovery excursion.
    Recover(RecoverReason),
}

/// Per-session combat state: damage bookkeeping and the weak-hit window.
pub struct CombatHandler {
    cfg: CombatConfig,
    recent_damage: VecDeque<i64>,
    damage_sum: i64,
    damage_count: u64,
}

impl CombatHandler {
    pub fn new(cfg: CombatConfig) -> Self {
        CombatHandler {
            cfg,
            recent_damage: VecDeque::new(),
            damage_sum: 0,
            damage_count: 0,
        }
    }

    /// Run one combat tick. At most one of heal, mana, skill, or attack is
    /// issued.
    pub async fn tick(
        &mut self,
        api: &mut ApiClient,
        player: &mut Player,
        group: &mut MobGroup,
        display: &mut Display,
        now: Instant,
    ) -> Result<CombatOutcome, ApiError> {
        if player.count(items::HEAL_POTION) <= self.cfg.min_potion_stock
            || player.count(items::MANA_POTION) <= self.cfg.min_potion_stock
        {
            return Ok(CombatOutcome::Recover(RecoverReason::LowPotions));
        }
        if self.weak_hit_streak() {
            return Ok(CombatOutcome::Recover(RecoverReason::WeakHits));
        }

        if player.hp_percent() < self.cfg.heal_threshold_pct && player.can(Action::Heal, now) {
            let reply = api
                .request(
                    Endpoint::UseHealPotion,
                    Some(json!({ "elemId": items::HEAL_POTION })),
                )
                .await?;
            player.record(Action::Heal, now);
            apply_potion_reply(&reply, player, items::HEAL_POTION);
            display.stats.heal_potions_used += 1;
            display.push_message(format!("Heal potion ({} HP)", player.hp));
            return Ok(CombatOutcome::Continue);
        }

        if player.mp_percent() < self.cfg.mana_threshold_pct && player.can(Action::Mana, now) {
            let reply = api
                .request(
                    Endpoint::UseManaPotion,
                    Some(json!({ "elemId": items::MANA_POTION })),
                )
                .await?;
            player.record(Action::Mana, now);
            apply_potion_reply(&reply, player, items::MANA_POTION);
            display.stats.mana_potions_used += 1;
            display.push_message(format!("Mana potion ({} MP)", player.mp));
            return Ok(CombatOutcome::Continue);
        }

        let (farm_id, target_hp, target_alive) = match group.current_target() {
            Some(t) => (t.farm_id.clone(), t.hp, t.is_alive),
            None => return Ok(CombatOutcome::Failure("no target in group".to_string())),
        };

        // Strictly greater: a target at the threshold gets the basic attack.
        if target_alive && target_hp > self.cfg.skill_hp_threshold && player.can(Action::Skill, now)
        {
            let reply = api
                .request(
                    Endpoint::UseSkill,
                    Some(json!({ "mobId": farm_id, "skillId": self.cfg.skill_id })),
                )
                .await?;
            player.record(Action::Skill, now);
            return Ok(self.process_reply(&reply, player, group, display, false));
        }

        if target_alive && player.can(Action::Attack, now) {
            let reply = api
                .request(Endpoint::Attack, Some(json!({ "mobId": farm_id })))
                .await?;
            player.record(Action::Attack, now);
            return Ok(self.process_reply(&reply, player, group, display, true));
        }

        Ok(CombatOutcome::Continue)
    }

    /// Digest one attack/skill reply: damage extraction, reconciliation,
    /// kill events, victory detection.
    fn process_reply(
        &mut self,
        map: &JsonMap,
        player: &mut Player,
        group: &mut MobGroup,
        display: &mut Display,
        basic_attack: bool,
    ) -> CombatOutcome {
        let reply = CombatReply::parse(map);

        if reply.is_victory() {
            return self.handle_victory(&reply, group, display);
        }
        if reply.is_fail() {
            let message = reply.message.clone().unwrap_or_default();
            return match FailKind::classify(&message) {
                FailKind::StaleTarget => CombatOutcome::Failure("target gone".to_string()),
                _ => CombatOutcome::Failure(message),
            };
        }
        if !reply.is_success() {
            debug!("combat reply with no status; ignoring");
            return CombatOutcome::Continue;
        }

        let target_hp_before = group.current_target().map(|t| t.hp);
        let player_hp_before = player.hp;

        if let Some(snap) = PlayerSnapshot::from_reply(map) {
            player.apply(&snap);
        }
        group.update_from_combat(&reply);

        let dealt = reply
            .logs
            .iter()
            .filter(|l| !l.is_mob())
            .find_map(|l| l.damage())
            .or_else(|| {
                let after = group.current_target().map(|t| t.hp);
                match (target_hp_before, after) {
                    (Some(before), Some(after)) if before > after => Some(before - after),
                    _ => None,
                }
            });
        if basic_attack {
            let damage = dealt.unwrap_or(0);
            display.stats.record_attack_damage(damage);
            self.record_basic_damage(damage);
        }

        let mut received = (player_hp_before - player.hp).max(0);
        if received == 0 {
            received = reply
                .logs
                .iter()
                .filter(|l| l.is_mob())
                .filter_map(|l| l.damage())
                .sum();
        }
        if dealt.is_some() || received > 0 {
            display.push_message(format!(
                "Hit for {}, took {}",
                dealt.unwrap_or(0),
                received
            ));
        }

        if group.current_target().is_some_and(|t| !t.is_alive) {
            let name = group
                .current_target()
                .map(|t| t.name.clone())
                .unwrap_or_default();
            display.stats.mobs_killed += 1;
            display.stats.record_kill_of(&name);
            display.push_message(format!("{} died", name));
            if !group.switch_to_next_alive() {
                return self.handle_victory(&reply, group, display);
            }
        }

        CombatOutcome::Continue
    }

    /// Account a won battle: remaining kills, drops, gold, experience.
    fn handle_victory(
        &mut self,
        reply: &CombatReply,
        group: &MobGroup,
        display: &mut Display,
    ) -> CombatOutcome {
        // Mobs still marked alive die with this reply; anything already
        // dead was tallied when its killing blow landed.
        for mob in group.mobs.iter().filter(|m| m.is_alive) {
            display.stats.mobs_killed += 1;
            display.stats.record_kill_of(&mob.name);
        }
        if let Some(win) = &reply.data_win {
            for drop in &win.drop {
                display.stats.record_drop(&drop.id, drop.count());
            }
            display.stats.xp_gained += win.exp_win();
        }
        self.reset_streak();
        display.push_message("Victory");
        CombatOutcome::Victory {
            kills: group.mobs.len() as u32,
        }
    }

    fn record_basic_damage(&mut self, damage: i64) {
        if damage <= 0 {
            return;
        }
        self.damage_sum += damage;
        self.damage_count += 1;
        if self.recent_damage.len() == self.cfg.low_damage_window {
            self.recent_damage.pop_front();
        }
        self.recent_damage.push_back(damage);
    }

    /// The last `low_damage_window` basic hits all landed at or below the
    /// session-average fraction. Skills are excluded from the window; their
    /// damage is disproportionate.
    fn weak_hit_streak(&self) -> bool {
        if self.recent_damage.len() < self.cfg.low_damage_window || self.damage_count == 0 {
            return false;
        }
        let average = self.damage_sum as f64 / self.damage_count as f64;
        if average <= 0.0 {
            return false;
        }
        let cut = average * self.cfg.low_damage_ratio;
        self.recent_damage.iter().all(|d| (*d as f64) <= cut)
    }

    /// Forget the weak-hit window (kept across battles otherwise).
    pub fn reset_streak(&mut self) {
        self.recent_damage.clear();
    }
}

fn apply_potion_reply(map: &JsonMap, player: &mut Player, potion_id: &str) {
    match PlayerSnapshot::from_reply(map) {
        Some(snap) => {
            let carried_inventory = snap.inventory.is_some();
            player.apply(&snap);
            // The server did not report the stock; assume one was consumed.
            if !carried_inventory {
                player.decrement(potion_id);
            }
        }
        None => player.decrement(potion_id),
    }
}
