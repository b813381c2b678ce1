use crate::error::Result;
use crate::game::Pong;
use crate::modifier::{ActivationMode, Modifier, ModifierCore};
use log::info;

/// Ends the match when at most one player is left unranked.
pub struct SurvivalGame {
    core: ModifierCore,
}

impl SurvivalGame {
    pub fn new() -> Self {
        SurvivalGame {
            core: ModifierCore::new("survivalGame", ActivationMode::Auto),
        }
    }
}

impl Default for SurvivalGame {
    fn default() -> Self {
        Self::new()
    }
}

impl Modifier for SurvivalGame {
    fn core(&self) -> &ModifierCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ModifierCore {
        &mut self.core
    }

    fn on_result_update(&mut self, game: &mut Pong, _player_id: usize) -> Result<()> {
        let standing = game.results.iter().filter(|&&rank| rank == 0).count();
        if standing <= 1 {
            info!("Last player standing, ending the match");
            game.finish();
        }
        Ok(())
    }
}
