//! Typed views over the loosely shaped server JSON.
//!
//! The server mixes scalars, `[value, extra]` pairs, and optional
//! sub-objects freely. Everything is converted to typed replies here, at
//! the transport boundary; no raw JSON bags travel past this module.

use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::game::items::InventoryEntry;

/// Normalized response object, as produced by the transport.
pub type JsonMap = Map<String, Value>;

/// Read an integer out of a scalar, a numeric string, or a `[value, extra]`
/// pair (the scalar is the first element).
pub fn scalar_or_pair(value: &Value) -> Option<i64> {
    match value {
        Value::Array(items) => items.first().and_then(value_to_i64),
        other => value_to_i64(other),
    }
}

pub(crate) fn value_to_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_i64() == Some(1),
        Value::String(s) => s == "true" || s == "1",
        _ => false,
    }
}

/// Player fields present in a server payload. Absent fields stay `None`
/// and leave the corresponding player state untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerSnapshot {
    pub hp: Option<i64>,
    pub max_hp: Option<i64>,
    pub mp: Option<i64>,
    pub max_mp: Option<i64>,
    pub stamina: Option<i64>,
    pub max_stamina: Option<i64>,
    pub morale: Option<i64>,
    pub level: Option<u32>,
    pub xp: Option<i64>,
    pub xp_to_next: Option<i64>,
    pub inventory: Option<HashMap<String, InventoryEntry>>,
}

impl PlayerSnapshot {
    /// Extract the player from a reply carrying a `user` (or `player`)
    /// sub-object. Prefers the `stats.userCurrentHP`-style pairs, falling
    /// back to flat fields.
    pub fn from_reply(reply: &JsonMap) -> Option<Self> {
        let user = reply
            .get("user")
            .or_else(|| reply.get("player"))?
            .as_object()?;
        let stats = user.get("stats").and_then(Value::as_object);

        let pick = |stat_key: &str, flat_keys: &[&str]| -> Option<i64> {
            if let Some(v) = stats.and_then(|s| s.get(stat_key)).and_then(scalar_or_pair) {
                return Some(v);
            }
            flat_keys
                .iter()
                .find_map(|k| user.get(*k).and_then(scalar_or_pair))
        };

        let inventory = user
            .get("inventory")
            .and_then(|v| serde_json::from_value(v.clone()).ok());

        Some(PlayerSnapshot {
            hp: pick("userCurrentHP", &["hp"]),
            max_hp: pick("userMaxHP", &["maxHp", "max_hp"]),
            mp: pick("userCurrentMP", &["mp"]),
            max_mp: pick("userMaxMP", &["maxMp", "max_mp"]),
            stamina: pick("userCurrentStamina", &["stamina"]),
            max_stamina: pick("userMaxStamina", &["maxStamina", "max_stamina"]),
            morale: pick("userMorale", &["morale"]),
            level: pick("userLevel", &["lvl", "level"]).and_then(|v| u32::try_from(v).ok()),
            xp: pick("userExp", &["xp", "exp"]),
            xp_to_next: pick("userExpToNext", &["xpToNext", "expToNext"]),
            inventory,
        })
    }
}

/// Families of server failure messages the bot reacts to. The server
/// speaks Russian; matching is case-insensitive substring so minor wording
/// drift does not break the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailKind {
    MoraleDepleted,
    TooFast,
    WrongLocation,
    StaleTarget,
    Other,
}

impl FailKind {
    pub fn classify(message: &str) -> Self {
        let msg = message.to_lowercase();
        if msg.contains("боевой дух") {
            FailKind::MoraleDepleted
        } else if msg.contains("быстро") {
            FailKind::TooFast
        } else if msg.contains("локаци") {
            FailKind::WrongLocation
        } else if msg.contains("не найден") || msg.contains("уже мертв") {
            FailKind::StaleTarget
        } else {
            FailKind::Other
        }
    }
}

/// A mob as first reported by a successful exploration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MobSpawn {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, alias = "farmId")]
    pub farm_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, alias = "lvl")]
    pub level: Option<u32>,
    #[serde(default)]
    pub hp: Option<Value>,
    #[serde(default, alias = "maxHp")]
    pub max_hp: Option<Value>,
    #[serde(default)]
    pub photo: Option<String>,
    #[serde(default)]
    pub desc: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default, alias = "sideRu", alias = "side_ru")]
    pub side: Option<String>,
    #[serde(default)]
    pub stats: Option<Value>,
    #[serde(default)]
    pub drop: Vec<DropInfo>,
}

impl MobSpawn {
    /// Initial HP as the spawn payload reports it: a flat `hp` field, or a
    /// `stats.userCurrentHP` pair. `None` when the payload carries neither.
    pub fn initial_hp(&self) -> Option<i64> {
        if let Some(v) = self.hp.as_ref().and_then(scalar_or_pair) {
            return Some(v);
        }
        self.stats
            .as_ref()
            .and_then(Value::as_object)
            .and_then(|s| s.get("userCurrentHP"))
            .and_then(scalar_or_pair)
    }

    pub fn initial_max_hp(&self) -> Option<i64> {
        self.max_hp.as_ref().and_then(scalar_or_pair)
    }
}

/// A drop table entry attached to a mob spawn.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DropInfo {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, alias = "typeElement")]
    pub type_element: Option<String>,
    #[serde(default)]
    pub count: Option<Value>,
    #[serde(default)]
    pub chance: Option<Value>,
}

/// Outcome of one exploration request.
#[derive(Debug)]
pub enum ExploreReply {
    /// The area produced a battle; mobs listed in encounter order.
    Mobs(Vec<MobSpawn>),
    /// The bat event interrupted exploration; must be dismissed.
    Bats,
    /// A non-combat event or an empty area.
    Event,
    /// The server rejected the request.
    Fail(FailKind, String),
}

impl ExploreReply {
    pub fn parse(reply: &JsonMap) -> Self {
        if reply.get("action").and_then(Value::as_str) == Some("SPEC_BATS") {
            return ExploreReply::Bats;
        }
        if let Some(mob_field) = reply.get("mob") {
            let spawns: Vec<MobSpawn> = match mob_field {
                Value::Array(items) => items
                    .iter()
                    .filter_map(|m| serde_json::from_value(m.clone()).ok())
                    .collect(),
                Value::Object(_) => serde_json::from_value(mob_field.clone())
                    .ok()
                    .into_iter()
                    .collect(),
                _ => Vec::new(),
            };
            if !spawns.is_empty() {
                return ExploreReply::Mobs(spawns);
            }
        }
        if reply.get("status").and_then(Value::as_str) == Some("fail") {
            let message = reply
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string();
            return ExploreReply::Fail(FailKind::classify(&message), message);
        }
        ExploreReply::Event
    }
}

/// One line of the server battle log.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BattleLogEntry {
    #[serde(default)]
    pub damage: Value,
    #[serde(default)]
    pub defname: Option<String>,
    #[serde(default, rename = "winAll")]
    win_all: Value,
    #[serde(default, rename = "isMob")]
    is_mob: Value,
}

impl BattleLogEntry {
    pub fn damage(&self) -> Option<i64> {
        value_to_i64(&self.damage)
    }

    pub fn win_all(&self) -> bool {
        truthy(&self.win_all)
    }

    pub fn is_mob(&self) -> bool {
        truthy(&self.is_mob)
    }
}

/// Victory payload: experience and the dropped item list.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DataWin {
    #[serde(default, rename = "expWin")]
    exp_win: Value,
    #[serde(default)]
    pub drop: Vec<DropEntry>,
}

impl DataWin {
    pub fn exp_win(&self) -> i64 {
        value_to_i64(&self.exp_win).unwrap_or(0)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DropEntry {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    count: Value,
}

impl DropEntry {
    /// Dropped item count; a bare entry counts once.
    pub fn count(&self) -> i64 {
        value_to_i64(&self.count).unwrap_or(1)
    }
}

/// Authoritative HP of the attacked target.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MobTargetHp {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    hp: Value,
}

impl MobTargetHp {
    pub fn hp(&self) -> Option<i64> {
        value_to_i64(&self.hp)
    }
}

/// A mob's state inside a combat reply `mobs` array.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MobHp {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, alias = "farmId")]
    pub farm_id: Option<String>,
    #[serde(default)]
    hp: Value,
}

impl MobHp {
    pub fn hp(&self) -> Option<i64> {
        value_to_i64(&self.hp)
    }
}

/// Typed view of one combat request reply.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CombatReply {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, rename = "statusBattle")]
    pub status_battle: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, rename = "arrLogs")]
    pub logs: Vec<BattleLogEntry>,
    #[serde(default, rename = "dataWin")]
    pub data_win: Option<DataWin>,
    #[serde(default, rename = "mobTargetHP")]
    pub mob_target: Option<MobTargetHp>,
    #[serde(default)]
    pub mobs: Vec<MobHp>,
    #[serde(default)]
    pub mob: Option<MobHp>,
}

impl CombatReply {
    pub fn parse(reply: &JsonMap) -> Self {
        match serde_json::from_value(Value::Object(reply.clone())) {
            Ok(parsed) => parsed,
            Err(e) => {
                log::debug!("combat reply did not parse cleanly: {}", e);
                CombatReply {
                    status: reply
                        .get("status")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                    message: reply
                        .get("message")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                    ..Default::default()
                }
            }
        }
    }

    /// The battle closed in the player's favor.
    pub fn is_victory(&self) -> bool {
        self.status.as_deref() == Some("close") || self.status_battle.as_deref() == Some("win")
    }

    pub fn is_fail(&self) -> bool {
        self.status.as_deref() == Some("fail")
    }

    pub fn is_success(&self) -> bool {
        self.status.as_deref() == Some("success")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn to_map(v: Value) -> JsonMap {
        v.as_object().unwrap().clone()
    }

    #[test]
    fn scalar_or_pair_takes_first_of_array() {
        assert_eq!(scalar_or_pair(&json!([120, 7])), Some(120));
        assert_eq!(scalar_or_pair(&json!(55)), Some(55));
        assert_eq!(scalar_or_pair(&json!("42")), Some(42));
        assert_eq!(scalar_or_pair(&json!([])), None);
        assert_eq!(scalar_or_pair(&json!({"a": 1})), None);
    }

    #[test]
    fn snapshot_prefers_stats_pairs_over_flat_fields() {
        let reply = to_map(json!({
            "user": {
                "hp": 1,
                "stats": { "userCurrentHP": [90, 0], "userMaxHP": [120, 0] },
                "morale": 80,
                "lvl": 14
            }
        }));
        let snap = PlayerSnapshot::from_reply(&reply).unwrap();
        assert_eq!(snap.hp, Some(90));
        assert_eq!(snap.max_hp, Some(120));
        assert_eq!(snap.morale, Some(80));
        assert_eq!(snap.level, Some(14));
        assert_eq!(snap.mp, None);
    }

    #[test]
    fn snapshot_accepts_player_key_and_flat_fields() {
        let reply = to_map(json!({
            "player": { "hp": 33, "maxHp": 50, "mp": 10, "maxMp": 20 }
        }));
        let snap = PlayerSnapshot::from_reply(&reply).unwrap();
        assert_eq!(snap.hp, Some(33));
        assert_eq!(snap.max_mp, Some(20));
    }

    #[test]
    fn snapshot_reads_inventory() {
        let reply = to_map(json!({
            "user": {
                "inventory": {
                    "m_1": { "count": 250 },
                    "eq_9": { "count": 1, "kind": "weapon", "position": "inventory" }
                }
            }
        }));
        let snap = PlayerSnapshot::from_reply(&reply).unwrap();
        let inv = snap.inventory.unwrap();
        assert_eq!(inv["m_1"].count, 250);
        assert!(inv["eq_9"].is_sellable_equipment());
    }

    #[test]
    fn missing_user_yields_no_snapshot() {
        let reply = to_map(json!({ "status": "success" }));
        assert!(PlayerSnapshot::from_reply(&reply).is_none());
    }

    #[test]
    fn classify_fail_messages() {
        assert_eq!(
            FailKind::classify("Иссяк боевой дух"),
            FailKind::MoraleDepleted
        );
        assert_eq!(
            FailKind::classify("Вы слишком быстро совершаете действия"),
            FailKind::TooFast
        );
        assert_eq!(
            FailKind::classify("Вы находитесь не в той локации"),
            FailKind::WrongLocation
        );
        assert_eq!(FailKind::classify("Моб не найден"), FailKind::StaleTarget);
        assert_eq!(FailKind::classify("Моб уже мертв"), FailKind::StaleTarget);
        assert_eq!(FailKind::classify("что-то пошло не так"), FailKind::Other);
    }

    #[test]
    fn explore_parses_mob_list() {
        let reply = to_map(json!({
            "mob": [
                { "id": "mob_3", "farmId": "f_1", "name": "Кабан", "lvl": 5 },
                { "id": "mob_3", "farmId": "f_2", "name": "Кабан", "lvl": 5 }
            ]
        }));
        match ExploreReply::parse(&reply) {
            ExploreReply::Mobs(spawns) => {
                assert_eq!(spawns.len(), 2);
                assert_eq!(spawns[0].farm_id.as_deref(), Some("f_1"));
                assert_eq!(spawns[1].level, Some(5));
            }
            other => panic!("expected mobs, got {:?}", other),
        }
    }

    #[test]
    fn explore_parses_bats_action() {
        let reply = to_map(json!({ "action": "SPEC_BATS" }));
        assert!(matches!(ExploreReply::parse(&reply), ExploreReply::Bats));
    }

    #[test]
    fn explore_parses_morale_failure() {
        let reply = to_map(json!({ "status": "fail", "message": "иссяк боевой дух" }));
        match ExploreReply::parse(&reply) {
            ExploreReply::Fail(FailKind::MoraleDepleted, msg) => {
                assert!(msg.contains("боевой дух"));
            }
            other => panic!("expected morale failure, got {:?}", other),
        }
    }

    #[test]
    fn explore_defaults_to_event() {
        let reply = to_map(json!({ "status": "success", "find": "nothing" }));
        assert!(matches!(ExploreReply::parse(&reply), ExploreReply::Event));
    }

    #[test]
    fn combat_reply_victory_fields() {
        let reply = to_map(json!({
            "status": "close",
            "statusBattle": "win",
            "arrLogs": [
                { "defname": "Boar", "winAll": true, "damage": 17 },
                { "defname": "Boar", "isMob": true, "damage": 4 }
            ],
            "dataWin": {
                "expWin": 42,
                "drop": [
                    { "id": "m_0_1", "count": 7 },
                    { "id": "res_25", "count": 2 }
                ]
            }
        }));
        let parsed = CombatReply::parse(&reply);
        assert!(parsed.is_victory());
        assert_eq!(parsed.logs.len(), 2);
        assert!(parsed.logs[0].win_all());
        assert!(!parsed.logs[0].is_mob());
        assert!(parsed.logs[1].is_mob());
        assert_eq!(parsed.logs[0].damage(), Some(17));
        let win = parsed.data_win.unwrap();
        assert_eq!(win.exp_win(), 42);
        assert_eq!(win.drop.len(), 2);
        assert_eq!(win.drop[0].count(), 7);
    }

    #[test]
    fn combat_reply_target_hp() {
        let reply = to_map(json!({
            "status": "success",
            "mobTargetHP": { "id": "f_1", "hp": "61" },
            "mobs": [ { "farmId": "f_2", "hp": 80 } ]
        }));
        let parsed = CombatReply::parse(&reply);
        assert!(parsed.is_success());
        assert_eq!(parsed.mob_target.as_ref().unwrap().hp(), Some(61));
        assert_eq!(parsed.mobs[0].hp(), Some(80));
    }

    #[test]
    fn combat_reply_tolerates_odd_shapes() {
        let reply = to_map(json!({
            "status": "success",
            "arrLogs": [ { "damage": "not-a-number", "winAll": "yes" } ]
        }));
        let parsed = CombatReply::parse(&reply);
        assert_eq!(parsed.logs[0].damage(), None);
        assert!(!parsed.logs[0].win_all());
    }
}
