//! # Game Engine Module
//!
//! The tick scheduler that drives everything else.
//!
//! ## Loop Shape
//!
//! One cooperative loop: every ~0.1 s it refreshes the display (at most
//! once a second), dispatches on the top-level state, and sleeps. Each
//! handler issues at most one request per tick through the shared
//! throttled transport, so request order is exactly tick order.
//!
//! ## Error Boundary
//!
//! Handlers express success paths; anything that escapes a tick is caught
//! here, surfaced to the display, and answered with a 60 second pause.
//! Nothing short of Ctrl-C stops the loop.

pub mod combat;
pub mod explore;
pub mod recovery;
pub mod rest;

use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use std::time::{Duration, Instant};
use tokio::time::sleep;

use crate::api::types::PlayerSnapshot;
use crate::api::{ApiClient, Endpoint};
use crate::config::Config;
use crate::content::{MobDatabase, WorldMap};
use crate::display::Display;
use crate::game::player::REST_DURATION;
use crate::game::{BotState, MobGroup, Player, Route, StateManager};
use combat::{CombatHandler, CombatOutcome};
use explore::{ExploreOutcome, GateStatus};

/// Pause between ticks.
const TICK_PACE: Duration = Duration::from_millis(100);
/// Pause after a tick-level error before resuming.
const ERROR_PAUSE: Duration = Duration::from_secs(60);
/// Back-off after the server complains about action pace.
const TOO_FAST_PAUSE: Duration = Duration::from_secs(5);
/// Back-off after a wrong-location rejection, before repositioning.
const WRONG_LOCATION_PAUSE: Duration = Duration::from_secs(10);

/// The session-scoped controller: owns the transport, the player, the
/// route, and the display, and runs the tick loop until interrupted.
pub struct Engine {
    config: Config,
    api: ApiClient,
    player: Player,
    route: Route,
    state: StateManager,
    display: Display,
    combat: CombatHandler,
    mob_db: MobDatabase,
    group: Option<MobGroup>,
    rest_end: Option<Instant>,
    last_render: Instant,
    last_gate: Option<GateStatus>,
    needs_reposition: bool,
}

impl Engine {
    pub async fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let api = ApiClient::new(&config.api).context("failed to build the API client")?;
        let mob_db = MobDatabase::load(&config.data.mob_db).await?;
        let combat = CombatHandler::new(config.combat.clone());
        let kills_per_square = config.route.kills_per_square;
        Ok(Engine {
            config,
            api,
            player: Player::new(),
            route: Route::empty(kills_per_square),
            state: StateManager::new(),
            display: Display::new(),
            combat,
            mob_db,
            group: None,
            rest_end: None,
            last_render: Instant::now(),
            last_gate: None,
            needs_reposition: false,
        })
    }

    /// Load the player, build the route, and put the bot on its first
    /// square with full potion stocks.
    async fn startup(&mut self) -> Result<()> {
        info!("loading player state");
        let reply = self.api.request(Endpoint::UserCityInfo, None).await?;
        match PlayerSnapshot::from_reply(&reply) {
            Some(snap) => self.player.apply(&snap),
            None => warn!("city info reply carried no player object"),
        }
        info!(
            "player: level {} hp {}/{} morale {}",
            self.player.level, self.player.hp, self.player.max_hp, self.player.morale
        );

        let world = WorldMap::load(&self.config.data.world_map).await?;
        self.route = Route::build(self.player.level, &world, &self.config.route);
        if self.route.is_empty() {
            warn!("route is empty for level {}", self.player.level);
        }
        self.route.restore_index(&self.config.route.index_file);

        recovery::ensure_supplies(
            &mut self.api,
            &mut self.player,
            &self.route,
            &mut self.display,
            &self.config.recovery,
        )
        .await;

        self.display.push_message("Session started");
        Ok(())
    }

    /// Run until Ctrl-C.
    pub async fn run(&mut self) -> Result<()> {
        self.startup().await?;
        info!("engine loop started");
        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("Received shutdown signal");
                    break;
                }
                _ = self.step() => {}
            }
        }
        self.log_summary();
        Ok(())
    }

    async fn step(&mut self) {
        if let Err(e) = self.tick().await {
            error!("tick failed: {:#} (pausing {:?})", e, ERROR_PAUSE);
            self.display.push_message(format!("Error: {}", e));
            sleep(ERROR_PAUSE).await;
        }
        sleep(TICK_PACE).await;
    }

    async fn tick(&mut self) -> Result<()> {
        let now = Instant::now();
        if now.duration_since(self.last_render) >= Duration::from_secs(1) {
            self.display.refresh(
                &self.player,
                self.state.state(),
                self.group.as_ref(),
                &self.route,
                now,
            );
            self.last_render = now;
        }
        match self.state.state() {
            BotState::City => self.handle_city().await?,
            BotState::Combat => self.handle_combat(now).await?,
            BotState::Resting => self.handle_rest(now),
        }
        Ok(())
    }

    /// The only place the route advances and exploration is triggered.
    async fn handle_city(&mut self) -> Result<()> {
        if self.route.is_empty() {
            sleep(Duration::from_secs(5)).await;
            return Ok(());
        }

        if self.route.should_advance() {
            self.route.advance();
            self.needs_reposition = true;
            if let Some(p) = self.route.current_point() {
                self.display.push_message(format!(
                    "Square cleared, moving to {} {} sq {}",
                    p.location_name, p.direction_name, p.square_id
                ));
            }
        }
        if self.needs_reposition {
            self.move_to_current_point().await;
            self.needs_reposition = false;
        }

        let gate = explore::explore_gate(self.player.hp_percent());
        if self.last_gate != Some(gate) {
            match gate {
                GateStatus::Paused => self.display.push_message("Exploration paused: HP critical"),
                GateStatus::Waiting => self.display.push_message("Waiting for HP to recover"),
                GateStatus::Ready => {}
            }
            self.last_gate = Some(gate);
        }
        if gate != GateStatus::Ready {
            return Ok(());
        }

        let Some(point) = self.route.current_point().cloned() else {
            return Ok(());
        };
        match explore::explore(&mut self.api, &point).await? {
            ExploreOutcome::Battle(group, spawns) => {
                for spawn in &spawns {
                    self.mob_db.observe(spawn, self.player.level);
                }
                if let Err(e) = self.mob_db.save() {
                    warn!("mob database save failed: {}", e);
                }
                self.display
                    .push_message(format!("Engaging {} mobs", group.mobs.len()));
                // Fresh battle: every action starts ready.
                self.player.reset_cooldowns();
                self.group = Some(group);
                self.transition(BotState::Combat, "mobs found");
            }
            ExploreOutcome::Event => {
                self.display.stats.events_found += 1;
            }
            ExploreOutcome::MoraleDepleted => {
                rest::start_rest(&mut self.api).await?;
                self.rest_end = Some(Instant::now() + REST_DURATION);
                self.display.push_message("Morale depleted, resting");
                self.transition(BotState::Resting, "morale depleted");
            }
            ExploreOutcome::TooFast => {
                debug!("server says too fast, backing off");
                sleep(TOO_FAST_PAUSE).await;
            }
            ExploreOutcome::WrongLocation => {
                debug!("wrong location, will reposition");
                self.needs_reposition = true;
                sleep(WRONG_LOCATION_PAUSE).await;
            }
            ExploreOutcome::Rejected(message) => {
                self.display
                    .push_message(format!("Explore rejected: {}", message));
            }
        }
        Ok(())
    }

    async fn handle_combat(&mut self, now: Instant) -> Result<()> {
        let Some(group) = self.group.as_mut() else {
            self.transition(BotState::City, "no mob group");
            return Ok(());
        };
        let outcome = self
            .combat
            .tick(&mut self.api, &mut self.player, group, &mut self.display, now)
            .await?;
        match outcome {
            CombatOutcome::Continue => {}
            CombatOutcome::Victory { kills } => {
                for _ in 0..kills {
                    self.route.record_kill();
                }
                self.group = None;
                self.transition(BotState::City, "victory");
            }
            CombatOutcome::Failure(message) => {
                self.display
                    .push_message(format!("Combat ended: {}", message));
                self.group = None;
                self.transition(BotState::City, "combat failed");
            }
            CombatOutcome::Recover(reason) => {
                self.display.push_message(format!("Recovery: {}", reason));
                if let Err(e) = self.route.save_index(&self.config.route.index_file) {
                    warn!("could not persist route index: {}", e);
                }
                recovery::run_excursion(
                    &mut self.api,
                    &mut self.player,
                    &self.route,
                    &mut self.display,
                    &self.config.recovery,
                )
                .await;
                self.display.stats.city_visits += 1;
                self.combat.reset_streak();
                self.group = None;
                self.transition(BotState::City, "recovery");
            }
        }
        Ok(())
    }

    /// Change state and mirror the transition record into the message log.
    fn transition(&mut self, to: BotState, reason: &str) {
        self.state.transition(to, reason);
        if let Some(t) = self.state.last_transition() {
            self.display
                .push_message(format!("{} -> {} ({})", t.from, t.to, t.reason));
        }
    }

    fn handle_rest(&mut self, now: Instant) {
        match self.rest_end {
            Some(end) if rest::rest_finished(now, end) => {
                self.rest_end = None;
                self.display.push_message("Rest finished");
                self.transition(BotState::City, "rest finished");
            }
            Some(_) => {}
            None => self.transition(BotState::City, "no rest deadline"),
        }
    }

    /// Re-issue the geo and square changes for the current route point.
    async fn move_to_current_point(&mut self) {
        let Some(point) = self.route.current_point().cloned() else {
            return;
        };
        recovery::checked_call(
            &mut self.api,
            &mut self.display,
            "Move: location",
            Endpoint::ChangeGeo,
            Some(serde_json::json!({
                "loco": point.location_id,
                "direction": point.direction_key,
                "typeAction": "change",
            })),
        )
        .await;
        recovery::checked_call(
            &mut self.api,
            &mut self.display,
            "Move: square",
            Endpoint::ChangeSquare,
            Some(serde_json::json!({ "square": point.square_id })),
        )
        .await;
    }

    fn log_summary(&self) {
        let stats = &self.display.stats;
        let uptime = stats.uptime();
        info!(
            "session summary: {}h{:02}m up, {} kills, {} xp, {} gold, {} events, {} city visits",
            uptime.num_hours(),
            uptime.num_minutes() % 60,
            stats.mobs_killed,
            stats.xp_gained,
            stats.gold_gained,
            stats.events_found,
            stats.city_visits
        );
    }
}

/// One-shot status report: player vitals and the route that would be built.
pub async fn show_status(config: &Config) -> Result<()> {
    let mut api = ApiClient::new(&config.api)?;
    let reply = api.request(Endpoint::UserCityInfo, None).await?;
    let mut player = Player::new();
    match PlayerSnapshot::from_reply(&reply) {
        Some(snap) => player.apply(&snap),
        None => warn!("city info reply carried no player object"),
    }
    println!(
        "Player: level {}  HP {}/{}  MP {}/{}  morale {}",
        player.level, player.hp, player.max_hp, player.mp, player.max_mp, player.morale
    );
    println!(
        "Potions: heal {}  mana {}  gold {}",
        player.count(crate::game::items::HEAL_POTION),
        player.count(crate::game::items::MANA_POTION),
        player.count(crate::game::items::GOLD)
    );
    match WorldMap::load(&config.data.world_map).await {
        Ok(world) => {
            let mut route = Route::build(player.level, &world, &config.route);
            route.restore_index(&config.route.index_file);
            match route.current_point() {
                Some(p) => println!(
                    "Route: {} points, at {}/{} ({} {} sq {})",
                    route.len(),
                    route.current_index() + 1,
                    route.len(),
                    p.location_name,
                    p.direction_name,
                    p.square_id
                ),
                None => println!("Route: empty"),
            }
        }
        Err(e) => println!("World map unavailable: {}", e),
    }
    Ok(())
}
