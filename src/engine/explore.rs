//! Exploration: find a mob on the current route square.
//!
//! Exploration is gated on HP so a battle never starts on a weakened
//! player, and it owns the bat-event side channel: the special encounter
//! must be dismissed (however many times it reappears) before a normal
//! exploration result can come back.

use log::{debug, info};
use serde_json::json;
use std::time::Duration;
use tokio::time::sleep;

use crate::api::types::{ExploreReply, FailKind, MobSpawn};
use crate::api::{ApiClient, ApiError, Endpoint};
use crate::game::route::RoutePoint;
use crate::game::MobGroup;

/// Pause before dismissing a bat encounter.
const BATS_PAUSE: Duration = Duration::from_secs(2);

/// Pure HP gate evaluated before any exploration request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateStatus {
    /// Healthy enough to pull a mob.
    Ready,
    /// Critically low; exploration paused.
    Paused,
    /// Recovering; waiting for HP to pass the explore bar.
    Waiting,
}

pub fn explore_gate(hp_percent: f64) -> GateStatus {
    if hp_percent <= 40.0 {
        GateStatus::Paused
    } else if hp_percent < 80.0 {
        GateStatus::Waiting
    } else {
        GateStatus::Ready
    }
}

/// What one (bats-resolved) exploration produced.
#[derive(Debug)]
pub enum ExploreOutcome {
    /// Mobs found; battle starts. Spawns are kept for observation records.
    Battle(MobGroup, Vec<MobSpawn>),
    /// Empty area or a non-combat event.
    Event,
    MoraleDepleted,
    TooFast,
    WrongLocation,
    Rejected(String),
}

/// Explore the current route square, dismissing bat encounters until the
/// server returns a normal result. No iteration cap: the event usually
/// clears in two rounds but the server decides.
pub async fn explore(
    api: &mut ApiClient,
    point: &RoutePoint,
) -> Result<ExploreOutcome, ApiError> {
    let body = json!({
        "loco": point.location_id,
        "direction": point.direction_key,
    });
    let mut reply = api.request(Endpoint::Explore, Some(body.clone())).await?;
    loop {
        match ExploreReply::parse(&reply) {
            ExploreReply::Bats => {
                info!("bat encounter, dismissing");
                sleep(BATS_PAUSE).await;
                api.request(Endpoint::CompleteBats, Some(json!({}))).await?;
                reply = api.request(Endpoint::Explore, Some(body.clone())).await?;
            }
            ExploreReply::Mobs(spawns) => {
                debug!("exploration found {} mobs", spawns.len());
                return Ok(ExploreOutcome::Battle(MobGroup::from_spawns(&spawns), spawns));
            }
            ExploreReply::Event => return Ok(ExploreOutcome::Event),
            ExploreReply::Fail(kind, message) => {
                return Ok(match kind {
                    FailKind::MoraleDepleted => ExploreOutcome::MoraleDepleted,
                    FailKind::TooFast => ExploreOutcome::TooFast,
                    FailKind::WrongLocation => ExploreOutcome::WrongLocation,
                    FailKind::StaleTarget | FailKind::Other => ExploreOutcome::Rejected(message),
                });
            }
        }
    }
}
