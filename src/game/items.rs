//! Distinguished item ids and inventory entry types.
//!
//! The server keys inventory on opaque item ids; the handful the bot makes
//! decisions about are named here. Equipment entries additionally carry a
//! kind and a body position, which the sell step uses to avoid selling
//! anything currently equipped.

use serde::{Deserialize, Serialize};

/// Healing potion, restores HP.
pub const HEAL_POTION: &str = "m_1";
/// Mana potion, restores MP.
pub const MANA_POTION: &str = "m_3";
/// Gold. Dropped like an item but accounted as currency.
pub const GOLD: &str = "m_0_1";
/// Skulls, a rare currency drop. Counted with ordinary drops.
pub const SKULL: &str = "m_5";

/// Purchasable resource collection name on the trader.
pub const RESOURCES_COLLECTION: &str = "resources";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum EquipmentKind {
    Weapon,
    Armor,
    Jewelry,
    /// Unrecognized kinds pass through without breaking inventory parsing.
    Other,
}

impl From<String> for EquipmentKind {
    fn from(s: String) -> Self {
        match s.as_str() {
            "weapon" => EquipmentKind::Weapon,
            "armor" => EquipmentKind::Armor,
            "jewelry" => EquipmentKind::Jewelry,
            _ => EquipmentKind::Other,
        }
    }
}

impl EquipmentKind {
    /// Whether the sell step offers this kind to the trader.
    pub fn sellable(self) -> bool {
        matches!(
            self,
            EquipmentKind::Weapon | EquipmentKind::Armor | EquipmentKind::Jewelry
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum EquipPosition {
    Inventory,
    OnBody,
    Other,
}

impl From<String> for EquipPosition {
    fn from(s: String) -> Self {
        match s.as_str() {
            "inventory" => EquipPosition::Inventory,
            "on_body" | "onBody" => EquipPosition::OnBody,
            _ => EquipPosition::Other,
        }
    }
}

/// One inventory slot as the server reports it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InventoryEntry {
    #[serde(default)]
    pub count: i64,
    #[serde(default, alias = "uniqueId", skip_serializing_if = "Option::is_none")]
    pub unique_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<EquipmentKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<EquipPosition>,
}

impl InventoryEntry {
    /// Unequipped weapon, armor, or jewelry: safe to sell.
    pub fn is_sellable_equipment(&self) -> bool {
        self.kind.is_some_and(|k| k.sellable()) && self.position == Some(EquipPosition::Inventory)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_equipment_entry() {
        let entry: InventoryEntry = serde_json::from_str(
            r#"{"count":1,"uniqueId":"eq_77","kind":"weapon","position":"inventory"}"#,
        )
        .unwrap();
        assert_eq!(entry.unique_id.as_deref(), Some("eq_77"));
        assert!(entry.is_sellable_equipment());
    }

    #[test]
    fn equipped_items_are_not_sellable() {
        let entry: InventoryEntry = serde_json::from_str(
            r#"{"count":1,"uniqueId":"eq_78","kind":"armor","position":"on_body"}"#,
        )
        .unwrap();
        assert!(!entry.is_sellable_equipment());
    }

    #[test]
    fn on_body_camel_case_alias() {
        let entry: InventoryEntry =
            serde_json::from_str(r#"{"count":1,"kind":"jewelry","position":"onBody"}"#).unwrap();
        assert_eq!(entry.position, Some(EquipPosition::OnBody));
    }

    #[test]
    fn unknown_kind_does_not_break_parsing() {
        let entry: InventoryEntry =
            serde_json::from_str(r#"{"count":3,"kind":"artifact"}"#).unwrap();
        assert_eq!(entry.kind, Some(EquipmentKind::Other));
        assert!(!entry.is_sellable_equipment());
    }

    #[test]
    fn plain_stack_has_no_equipment_fields() {
        let entry: InventoryEntry = serde_json::from_str(r#"{"count":120}"#).unwrap();
        assert_eq!(entry.count, 120);
        assert!(entry.kind.is_none());
        assert!(!entry.is_sellable_equipment());
    }
}
