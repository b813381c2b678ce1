use crate::config::{Config, ConfigManager};
use crate::error::Result;
use crate::game::Pong;
use crate::modifier::{ActivationMode, Modifier, ModifierCore};
use log::{debug, info};
use serde::Deserialize;

const NAME: &str = "scoredGame";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScoredGameSettings {
    goal_objective: i64,
}

/// Ends the match as soon as a player reaches the goal objective.
pub struct ScoredGame {
    core: ModifierCore,
    goal_objective: i64,
}

impl ScoredGame {
    pub fn from_config(defaults: &Config, custom: &Config) -> Result<Self> {
        let settings: ScoredGameSettings = ConfigManager::new().resolve(defaults, custom)?;
        Ok(ScoredGame {
            core: ModifierCore::new(NAME, ActivationMode::Auto),
            goal_objective: settings.goal_objective,
        })
    }
}

impl Modifier for ScoredGame {
    fn core(&self) -> &ModifierCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ModifierCore {
        &mut self.core
    }

    fn on_goal(&mut self, game: &mut Pong, player_id: usize) -> Result<()> {
        let Some(score) = game.scores.get(player_id).copied() else {
            debug!("Goal for unknown player {}", player_id);
            return Ok(());
        };

        if score >= self.goal_objective {
            info!("Player {} reached {} goals", player_id, self.goal_objective);
            game.finish();
            game.remove_modifier(self.id());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::game::tests::classic_with;
    use crate::game::GameStatus;
    use crate::modifier::GameEvent;
    use serde_json::json;

    #[test]
    fn test_finishes_on_objective_and_removes_itself() {
        let mut game = classic_with(json!({ "goalTakeTracker": {}, "scoredGame": { "goalObjective": 3 } }));
        game.start_game();

        for _ in 0..2 {
            game.trigger(GameEvent::Goal { player_id: 1 });
        }
        assert_eq!(game.status, GameStatus::Running);
        assert!(game.modifiers.has_unit("scoredGame"));

        game.trigger(GameEvent::Goal { player_id: 1 });
        assert_eq!(game.status, GameStatus::Finished);
        assert!(!game.modifiers.has_unit("scoredGame"));
        assert_eq!(game.results(), vec![2, 1]);
    }

    #[test]
    fn test_out_of_range_goal_is_ignored() {
        let mut game = classic_with(json!({ "scoredGame": { "goalObjective": 0 } }));
        game.start_game();
        game.trigger(GameEvent::Goal { player_id: 9 });
        assert_eq!(game.status, GameStatus::Running);
    }
}
