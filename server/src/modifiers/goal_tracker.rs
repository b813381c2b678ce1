use crate::error::Result;
use crate::game::Pong;
use crate::modifier::{ActivationMode, Modifier, ModifierCore};
use log::debug;

/// Score bookkeeping: every goal adds one point to the player it names.
///
/// The same unit is registered as `goalTakeTracker` for modes where the goal
/// names the scorer and as `goalTakenTracker` for modes where it names the
/// player who conceded.
pub struct GoalTracker {
    core: ModifierCore,
}

impl GoalTracker {
    pub fn new(name: &'static str) -> Self {
        GoalTracker {
            core: ModifierCore::new(name, ActivationMode::Auto),
        }
    }
}

impl Modifier for GoalTracker {
    fn core(&self) -> &ModifierCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ModifierCore {
        &mut self.core
    }

    fn on_goal(&mut self, game: &mut Pong, player_id: usize) -> Result<()> {
        if player_id >= game.player_count {
            debug!("{}: player {} out of bounds", self.name(), player_id);
            return Ok(());
        }
        game.edit_score(player_id, 1);
        Ok(())
    }
}
