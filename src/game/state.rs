//! Top-level state machine: city, combat, resting.

use log::info;
use std::collections::VecDeque;
use std::fmt;

/// Where the game loop currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotState {
    City,
    Combat,
    Resting,
}

impl fmt::Display for BotState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BotState::City => "CITY",
            BotState::Combat => "COMBAT",
            BotState::Resting => "RESTING",
        };
        f.write_str(label)
    }
}

/// One recorded state change.
#[derive(Debug, Clone)]
pub struct Transition {
    pub from: BotState,
    pub to: BotState,
    pub reason: String,
}

/// Keep enough history to explain recent behavior without growing forever.
const HISTORY_CAP: usize = 100;

/// Holds the current state and a bounded transition history.
#[derive(Debug)]
pub struct StateManager {
    state: BotState,
    history: VecDeque<Transition>,
}

impl StateManager {
    pub fn new() -> Self {
        StateManager {
            state: BotState::City,
            history: VecDeque::new(),
        }
    }

    pub fn state(&self) -> BotState {
        self.state
    }

    pub fn transition(&mut self, to: BotState, reason: &str) {
        let from = self.state;
        info!("state {} -> {} ({})", from, to, reason);
        self.state = to;
        if self.history.len() == HISTORY_CAP {
            self.history.pop_front();
        }
        self.history.push_back(Transition {
            from,
            to,
            reason: reason.to_string(),
        });
    }

    pub fn history(&self) -> impl Iterator<Item = &Transition> {
        self.history.iter()
    }

    pub fn last_transition(&self) -> Option<&Transition> {
        self.history.back()
    }
}

impl Default for StateManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_in_city() {
        let mgr = StateManager::new();
        assert_eq!(mgr.state(), BotState::City);
        assert_eq!(mgr.history().count(), 0);
    }

    #[test]
    fn transitions_are_recorded_with_reason() {
        let mut mgr = StateManager::new();
        mgr.transition(BotState::Combat, "mobs found");
        mgr.transition(BotState::City, "victory");
        assert_eq!(mgr.state(), BotState::City);
        let last = mgr.last_transition().unwrap();
        assert_eq!(last.from, BotState::Combat);
        assert_eq!(last.to, BotState::City);
        assert_eq!(last.reason, "victory");
    }

    #[test]
    fn history_is_bounded() {
        let mut mgr = StateManager::new();
        for i in 0..(HISTORY_CAP + 25) {
            let to = if i % 2 == 0 {
                BotState::Combat
            } else {
                BotState::City
            };
            mgr.transition(to, "tick");
        }
        assert_eq!(mgr.history().count(), HISTORY_CAP);
    }
}
