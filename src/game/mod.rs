//! Domain state: the player, the enemies of the current battle, the
//! farming route, and the top-level state machine.

pub mod items;
pub mod mob;
pub mod player;
pub mod route;
pub mod state;

pub use mob::{Mob, MobGroup};
pub use player::Player;
pub use route::{Route, RoutePoint};
pub use state::{BotState, StateManager};
