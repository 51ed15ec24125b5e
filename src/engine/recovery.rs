//! The recovery excursion: leave the route, resupply in the city, return.
//!
//! Eight linear steps with a short pause between them. Every step is
//! idempotent, so a failed step is logged and skipped rather than rolled
//! back; if the excursion leaves the bot short, the next recovery trigger
//! simply runs it again.

use log::{info, warn};
use serde_json::{json, Value};
use std::time::Duration;
use tokio::time::sleep;

use crate::api::types::{JsonMap, PlayerSnapshot};
use crate::api::{ApiClient, Endpoint};
use crate::config::RecoveryConfig;
use crate::display::Display;
use crate::game::items;
use crate::game::{Player, Route};

/// Issue one request, logging and surfacing a failure instead of
/// propagating it. `None` means the step did not complete.
pub(crate) async fn checked_call(
    api: &mut ApiClient,
    display: &mut Display,
    label: &str,
    endpoint: Endpoint,
    body: Option<Value>,
) -> Option<JsonMap> {
    match api.request(endpoint, body).await {
        Ok(reply) => Some(reply),
        Err(e) => {
            warn!("{} failed: {}", label, e);
            display.push_message(format!("{} failed", label));
            None
        }
    }
}

/// Which farm location fits the player's level.
fn farm_location<'a>(player: &Player, cfg: &'a RecoveryConfig) -> &'a str {
    if player.level >= cfg.advanced_from_level {
        &cfg.advanced_location
    } else {
        &cfg.beginner_location
    }
}

/// The full excursion: safe square, geo reset, city, sell, buy, farm,
/// location, square.
pub async fn run_excursion(
    api: &mut ApiClient,
    player: &mut Player,
    route: &Route,
    display: &mut Display,
    cfg: &RecoveryConfig,
) {
    let pause = Duration::from_secs(cfg.step_pause_secs);
    info!("recovery excursion started");
    display.push_message("Recovery: heading to the city");

    // 1. Stand on the known-safe square before touching geo.
    checked_call(
        api,
        display,
        "Recovery: safe square",
        Endpoint::ChangeSquare,
        Some(json!({ "square": cfg.safe_square })),
    )
    .await;
    sleep(pause).await;

    // 2. Reset geo so the main-geo change is accepted.
    let (loco, direction) = match route.current_point() {
        Some(p) => (p.location_id.clone(), p.direction_key.clone()),
        None => (
            farm_location(player, cfg).to_string(),
            cfg.default_direction.clone(),
        ),
    };
    checked_call(
        api,
        display,
        "Recovery: geo reset",
        Endpoint::ChangeGeo,
        Some(json!({ "loco": loco, "direction": direction, "typeAction": "reset" })),
    )
    .await;
    sleep(pause).await;

    go_to_city(api, display, pause).await;
    sell_loot(api, player, display, pause).await;
    buy_potions(api, player, display, cfg, pause).await;
    return_to_route(api, player, route, display, cfg, pause).await;

    info!("recovery excursion finished");
    display.push_message("Recovery: back on the route");
}

/// The startup tail of the excursion: city, potions, farm, location,
/// square. Run once before the first exploration so farming always starts
/// fully stocked and correctly positioned.
pub async fn ensure_supplies(
    api: &mut ApiClient,
    player: &mut Player,
    route: &Route,
    display: &mut Display,
    cfg: &RecoveryConfig,
) {
    let pause = Duration::from_secs(cfg.step_pause_secs);
    go_to_city(api, display, pause).await;
    buy_potions(api, player, display, cfg, pause).await;
    return_to_route(api, player, route, display, cfg, pause).await;
}

async fn go_to_city(api: &mut ApiClient, display: &mut Display, pause: Duration) {
    checked_call(
        api,
        display,
        "Recovery: to city",
        Endpoint::ChangeMainGeo,
        Some(json!({ "position": "city" })),
    )
    .await;
    sleep(pause).await;
}

/// Sell every unequipped weapon, armor, and jewelry piece in one call.
async fn sell_loot(
    api: &mut ApiClient,
    player: &mut Player,
    display: &mut Display,
    pause: Duration,
) {
    if let Some(reply) = checked_call(
        api,
        display,
        "Recovery: inventory refresh",
        Endpoint::UserInfo,
        None,
    )
    .await
    {
        if let Some(snap) = PlayerSnapshot::from_reply(&reply) {
            player.apply(&snap);
        }
    }
    sleep(pause).await;

    let to_sell: Vec<Value> = player
        .inventory
        .iter()
        .filter(|(_, entry)| entry.is_sellable_equipment())
        .map(|(item_id, entry)| {
            let id = entry.unique_id.as_deref().unwrap_or(item_id);
            json!({ "id": id, "count": entry.count.max(1) })
        })
        .collect();
    if to_sell.is_empty() {
        info!("recovery: nothing to sell");
        return;
    }

    let sold_count = to_sell.len() as u64;
    let gold_before = player.count(items::GOLD);
    if let Some(reply) = checked_call(
        api,
        display,
        "Recovery: sell",
        Endpoint::SellItems,
        Some(json!({ "items": to_sell })),
    )
    .await
    {
        if let Some(snap) = PlayerSnapshot::from_reply(&reply) {
            player.apply(&snap);
        }
        let earned = (player.count(items::GOLD) - gold_before).max(0);
        display.stats.items_sold += sold_count;
        display.stats.gold_from_sales += earned;
        display.push_message(format!("Sold {} items (+{} gold)", sold_count, earned));
    }
    sleep(pause).await;
}

/// Top both potion stocks up to the configured target.
async fn buy_potions(
    api: &mut ApiClient,
    player: &mut Player,
    display: &mut Display,
    cfg: &RecoveryConfig,
    pause: Duration,
) {
    for (potion_id, label) in [(items::HEAL_POTION, "heal"), (items::MANA_POTION, "mana")] {
        let current = player.count(potion_id);
        if current >= cfg.potion_target {
            continue;
        }
        let amount = cfg.potion_target - current;
        let reply = checked_call(
            api,
            display,
            "Recovery: buy potions",
            Endpoint::BuyItems,
            Some(json!({
                "elemId": potion_id,
                "nameCollection": items::RESOURCES_COLLECTION,
                "count": amount,
            })),
        )
        .await;
        match reply {
            Some(map) if map.get("status").and_then(Value::as_str) == Some("fail") => {
                let msg = map.get("message").and_then(Value::as_str).unwrap_or("");
                warn!("buying {} potions failed: {}", label, msg);
                display.push_message(format!("Could not buy {} potions", label));
            }
            Some(map) => {
                match PlayerSnapshot::from_reply(&map) {
                    Some(snap) if snap.inventory.is_some() => player.apply(&snap),
                    _ => {
                        // No inventory echoed back; trust the accepted buy.
                        player
                            .inventory
                            .entry(potion_id.to_string())
                            .or_default()
                            .count = cfg.potion_target;
                    }
                }
                display.push_message(format!("Bought {} {} potions", amount, label));
            }
            None => {}
        }
        sleep(pause).await;
    }
}

/// Back to the farm zone, the level-appropriate location, and the current
/// route square.
async fn return_to_route(
    api: &mut ApiClient,
    player: &mut Player,
    route: &Route,
    display: &mut Display,
    cfg: &RecoveryConfig,
    pause: Duration,
) {
    checked_call(
        api,
        display,
        "Recovery: to farm",
        Endpoint::ChangeMainGeo,
        Some(json!({ "position": "farm" })),
    )
    .await;
    sleep(pause).await;

    let loco = farm_location(player, cfg);
    checked_call(
        api,
        display,
        "Recovery: location",
        Endpoint::ChangeGeo,
        Some(json!({
            "loco": loco,
            "direction": cfg.default_direction,
            "typeAction": "change",
        })),
    )
    .await;
    sleep(pause).await;

    let square = route
        .current_point()
        .map(|p| p.square_id.clone())
        .unwrap_or_else(|| cfg.safe_square.clone());
    checked_call(
        api,
        display,
        "Recovery: square",
        Endpoint::ChangeSquare,
        Some(json!({ "square": square })),
    )
    .await;
    sleep(pause).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::items::{EquipPosition, EquipmentKind, InventoryEntry};

    #[test]
    fn farm_location_splits_on_level() {
        let cfg = RecoveryConfig::default();
        let mut player = Player::new();
        player.level = 9;
        assert_eq!(farm_location(&player, &cfg), cfg.beginner_location);
        player.level = 10;
        assert_eq!(farm_location(&player, &cfg), cfg.advanced_location);
    }

    #[test]
    fn sell_filter_matches_only_unequipped_gear() {
        let mut player = Player::new();
        player.inventory.insert(
            "eq_1".to_string(),
            InventoryEntry {
                count: 1,
                unique_id: Some("u_1".to_string()),
                kind: Some(EquipmentKind::Weapon),
                position: Some(EquipPosition::Inventory),
            },
        );
        player.inventory.insert(
            "eq_2".to_string(),
            InventoryEntry {
                count: 1,
                unique_id: Some("u_2".to_string()),
                kind: Some(EquipmentKind::Armor),
                position: Some(EquipPosition::OnBody),
            },
        );
        player.inventory.insert(
            "m_1".to_string(),
            InventoryEntry {
                count: 200,
                ..Default::default()
            },
        );
        let sellable: Vec<_> = player
            .inventory
            .iter()
            .filter(|(_, e)| e.is_sellable_equipment())
            .collect();
        assert_eq!(sellable.len(), 1);
        assert_eq!(sellable[0].1.unique_id.as_deref(), Some("u_1"));
    }
}
