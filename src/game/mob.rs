//! Mobs and mob groups for a single battle.
//!
//! A [`Mob`] carries two ids: `id` names the species (stable across
//! battles, used by the observation database) and `farm_id` names this
//! instance in the current battle (used to aim attacks). HP is reconciled
//! from combat replies; `is_alive` always derives from the reconciled HP.

use crate::api::types::{CombatReply, MobSpawn};

#[derive(Debug, Clone, PartialEq)]
pub struct Mob {
    pub id: String,
    pub farm_id: String,
    pub name: String,
    pub hp: i64,
    pub max_hp: i64,
    pub level: u32,
    pub is_alive: bool,
}

impl Mob {
    pub fn from_spawn(spawn: &MobSpawn) -> Self {
        let level = spawn.level.unwrap_or(1);
        // The spawn payload does not always carry HP; synthesize a level-
        // scaled default so the combat panel stays meaningful until the
        // first reply reconciles the real value.
        let hp = spawn
            .initial_hp()
            .unwrap_or_else(|| default_hp(level));
        let max_hp = spawn.initial_max_hp().unwrap_or(hp);
        Mob {
            id: spawn.id.clone().unwrap_or_default(),
            farm_id: spawn.farm_id.clone().unwrap_or_default(),
            name: spawn.name.clone().unwrap_or_else(|| "?".to_string()),
            hp,
            max_hp,
            level,
            is_alive: hp > 0,
        }
    }

    fn set_hp(&mut self, hp: i64) {
        self.hp = hp.max(0);
        if self.hp > self.max_hp {
            self.max_hp = self.hp;
        }
        self.is_alive = self.hp > 0;
    }

    /// Reconcile this mob from a combat reply. Preference order:
    /// `mobTargetHP` when it names this mob, then a `farm_id` match in the
    /// `mobs` array, then the singular `mob` field.
    pub fn reconcile_from_combat(&mut self, reply: &CombatReply) {
        if let Some(target) = &reply.mob_target {
            if target.id.as_deref() == Some(self.farm_id.as_str()) {
                if let Some(hp) = target.hp() {
                    self.set_hp(hp);
                    return;
                }
            }
        }
        if let Some(entry) = reply
            .mobs
            .iter()
            .find(|m| m.farm_id.as_deref() == Some(self.farm_id.as_str()))
        {
            if let Some(hp) = entry.hp() {
                self.set_hp(hp);
                return;
            }
        }
        if let Some(single) = &reply.mob {
            if let Some(hp) = single.hp() {
                self.set_hp(hp);
            }
        }
    }
}

fn default_hp(level: u32) -> i64 {
    50 + 25 * i64::from(level)
}

/// All enemies of one encounter plus the current-target pointer.
#[derive(Debug, Clone)]
pub struct MobGroup {
    pub mobs: Vec<Mob>,
    pub current_target_index: usize,
}

impl MobGroup {
    pub fn from_spawns(spawns: &[MobSpawn]) -> Self {
        MobGroup {
            mobs: spawns.iter().map(Mob::from_spawn).collect(),
            current_target_index: 0,
        }
    }

    pub fn current_target(&self) -> Option<&Mob> {
        self.mobs.get(self.current_target_index)
    }

    pub fn current_target_mut(&mut self) -> Option<&mut Mob> {
        self.mobs.get_mut(self.current_target_index)
    }

    pub fn all_dead(&self) -> bool {
        self.mobs.iter().all(|m| !m.is_alive)
    }

    pub fn alive_count(&self) -> usize {
        self.mobs.iter().filter(|m| m.is_alive).count()
    }

    /// Retarget the first alive mob, scanning from the head of the list
    /// rather than from the current index. Returns false when none is left.
    pub fn switch_to_next_alive(&mut self) -> bool {
        match self.mobs.iter().position(|m| m.is_alive) {
            Some(idx) => {
                self.current_target_index = idx;
                true
            }
            None => false,
        }
    }

    /// Reconcile the whole group from one combat reply: the current target
    /// gets the full reconcile, the rest only take HP updates from the
    /// `mobs` array. No target switching happens here.
    pub fn update_from_combat(&mut self, reply: &CombatReply) {
        let target_index = self.current_target_index;
        if let Some(target) = self.current_target_mut() {
            target.reconcile_from_combat(reply);
        }
        for entry in &reply.mobs {
            let Some(farm_id) = entry.farm_id.as_deref() else {
                continue;
            };
            let Some(hp) = entry.hp() else { continue };
            for (i, mob) in self.mobs.iter_mut().enumerate() {
                if i != target_index && mob.farm_id == farm_id {
                    mob.set_hp(hp);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::JsonMap;
    use serde_json::json;

    fn spawn(farm_id: &str, level: u32) -> MobSpawn {
        serde_json::from_value(json!({
            "id": "mob_9",
            "farmId": farm_id,
            "name": "Волк",
            "lvl": level
        }))
        .unwrap()
    }

    fn combat_reply(v: serde_json::Value) -> CombatReply {
        let map: JsonMap = v.as_object().unwrap().clone();
        CombatReply::parse(&map)
    }

    #[test]
    fn spawn_without_hp_synthesizes_from_level() {
        let mob = Mob::from_spawn(&spawn("f_1", 4));
        assert_eq!(mob.hp, 50 + 25 * 4);
        assert_eq!(mob.max_hp, mob.hp);
        assert!(mob.is_alive);
    }

    #[test]
    fn spawn_with_stats_pair_takes_both_hp_fields() {
        let s: MobSpawn = serde_json::from_value(json!({
            "id": "mob_2",
            "farmId": "f_7",
            "name": "Паук",
            "lvl": 3,
            "stats": { "userCurrentHP": [77, 0] }
        }))
        .unwrap();
        let mob = Mob::from_spawn(&s);
        assert_eq!(mob.hp, 77);
        assert_eq!(mob.max_hp, 77);
    }

    #[test]
    fn reconcile_prefers_mob_target_hp() {
        let mut mob = Mob::from_spawn(&spawn("f_1", 2));
        let reply = combat_reply(json!({
            "status": "success",
            "mobTargetHP": { "id": "f_1", "hp": 12 },
            "mobs": [ { "farmId": "f_1", "hp": 99 } ]
        }));
        mob.reconcile_from_combat(&reply);
        assert_eq!(mob.hp, 12);
    }

    #[test]
    fn reconcile_falls_back_to_mobs_array() {
        let mut mob = Mob::from_spawn(&spawn("f_2", 2));
        let reply = combat_reply(json!({
            "status": "success",
            "mobTargetHP": { "id": "f_other", "hp": 5 },
            "mobs": [ { "farmId": "f_2", "hp": 31 } ]
        }));
        mob.reconcile_from_combat(&reply);
        assert_eq!(mob.hp, 31);
    }

    #[test]
    fn reconcile_to_zero_marks_dead() {
        let mut mob = Mob::from_spawn(&spawn("f_1", 2));
        let reply = combat_reply(json!({
            "status": "success",
            "mobTargetHP": { "id": "f_1", "hp": 0 }
        }));
        mob.reconcile_from_combat(&reply);
        assert!(!mob.is_alive);
        assert_eq!(mob.hp, 0);
    }

    #[test]
    fn switch_scans_from_the_head() {
        let spawns = vec![spawn("f_1", 1), spawn("f_2", 1), spawn("f_3", 1)];
        let mut group = MobGroup::from_spawns(&spawns);
        group.current_target_index = 2;
        // f_1 is alive; a rescan from the head must pick it even though the
        // pointer sits past it.
        assert!(group.switch_to_next_alive());
        assert_eq!(group.current_target_index, 0);
    }

    #[test]
    fn target_switching_walks_the_group_in_order() {
        let spawns = vec![spawn("f_1", 1), spawn("f_2", 1), spawn("f_3", 1)];
        let mut group = MobGroup::from_spawns(&spawns);

        group.mobs[0].set_hp(0);
        assert!(group.switch_to_next_alive());
        assert_eq!(group.current_target_index, 1);

        group.mobs[1].set_hp(0);
        assert!(group.switch_to_next_alive());
        assert_eq!(group.current_target_index, 2);

        group.mobs[2].set_hp(0);
        assert!(!group.switch_to_next_alive());
        assert!(group.all_dead());
    }

    #[test]
    fn group_update_touches_other_mobs_hp_only() {
        let spawns = vec![spawn("f_1", 1), spawn("f_2", 1)];
        let mut group = MobGroup::from_spawns(&spawns);
        let reply = combat_reply(json!({
            "status": "success",
            "mobTargetHP": { "id": "f_1", "hp": 40 },
            "mobs": [
                { "farmId": "f_1", "hp": 40 },
                { "farmId": "f_2", "hp": 8 }
            ]
        }));
        group.update_from_combat(&reply);
        assert_eq!(group.mobs[0].hp, 40);
        assert_eq!(group.mobs[1].hp, 8);
        assert_eq!(group.current_target_index, 0);
    }
}
