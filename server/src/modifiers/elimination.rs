use crate::config::{Config, ConfigManager};
use crate::error::Result;
use crate::game::Pong;
use crate::modifier::{ActivationMode, GameEvent, Modifier, ModifierCore};
use log::info;
use serde::Deserialize;

const NAME: &str = "elimination";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EliminationSettings {
    threshold: i64,
}

/// Knocks a player out once they have conceded `threshold` goals.
///
/// The eliminated paddle disappears and the player's final rank is the
/// number of players still standing at that moment.
pub struct Elimination {
    core: ModifierCore,
    threshold: i64,
}

impl Elimination {
    pub fn from_config(defaults: &Config, custom: &Config) -> Result<Self> {
        let settings: EliminationSettings = ConfigManager::new().resolve(defaults, custom)?;
        Ok(Elimination {
            core: ModifierCore::new(NAME, ActivationMode::Auto),
            threshold: settings.threshold,
        })
    }
}

impl Modifier for Elimination {
    fn core(&self) -> &ModifierCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ModifierCore {
        &mut self.core
    }

    fn on_goal(&mut self, game: &mut Pong, player_id: usize) -> Result<()> {
        let Some(&score) = game.scores.get(player_id) else {
            return Ok(());
        };
        if score >= self.threshold {
            game.trigger(GameEvent::PlayerElimination { player_id });
        }
        Ok(())
    }

    fn on_player_elimination(&mut self, game: &mut Pong, player_id: usize) -> Result<()> {
        if player_id >= game.player_count || game.is_eliminated(player_id) {
            return Ok(());
        }

        if let Some(paddle) = game.world.paddles.get_mut(player_id) {
            paddle.body.is_visible = false;
        }
        let rank = (game.player_count - game.eliminated.len()) as u32;
        game.results[player_id] = rank;
        game.eliminated.push(player_id);
        info!("Player {} eliminated, finishing #{}", player_id, rank);

        game.trigger(GameEvent::ResultUpdate { player_id });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::game::tests::polygon_with;
    use crate::modifier::GameEvent;
    use serde_json::json;

    #[test]
    fn test_player_is_eliminated_at_threshold() {
        let mut game = polygon_with(
            4,
            json!({ "goalTakenTracker": {}, "elimination": { "threshold": 2 } }),
        );
        game.start_game();

        game.trigger(GameEvent::Goal { player_id: 2 });
        assert!(game.eliminated.is_empty());

        game.trigger(GameEvent::Goal { player_id: 2 });
        assert_eq!(game.eliminated, vec![2]);
        assert_eq!(game.results, vec![0, 0, 4, 0]);
        assert!(!game.world.paddles[2].body.is_visible);
    }

    #[test]
    fn test_elimination_happens_once() {
        let mut game = polygon_with(3, json!({ "elimination": {} }));
        game.start_game();

        game.trigger(GameEvent::PlayerElimination { player_id: 1 });
        game.trigger(GameEvent::PlayerElimination { player_id: 1 });
        game.trigger(GameEvent::PlayerElimination { player_id: 0 });

        assert_eq!(game.eliminated, vec![1, 0]);
        assert_eq!(game.results, vec![2, 3, 0]);
    }
}
