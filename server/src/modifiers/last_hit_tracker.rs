use crate::error::Result;
use crate::game::Pong;
use crate::modifier::{ActivationMode, Modifier, ModifierCore};
use log::debug;

/// Remembers which player touched the ball last, so picked-up power-ups
/// know who they belong to.
pub struct LastHitTracker {
    core: ModifierCore,
}

impl LastHitTracker {
    pub fn new() -> Self {
        LastHitTracker {
            core: ModifierCore::new("lastHitTracker", ActivationMode::Auto),
        }
    }
}

impl Default for LastHitTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl Modifier for LastHitTracker {
    fn core(&self) -> &ModifierCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ModifierCore {
        &mut self.core
    }

    fn on_paddle_bounce(&mut self, game: &mut Pong, _ball_id: usize, player_id: usize) -> Result<()> {
        if player_id >= game.player_count {
            debug!("lastHitTracker: player {} out of bounds", player_id);
            return Ok(());
        }
        game.last_hit = Some(player_id);
        Ok(())
    }
}
