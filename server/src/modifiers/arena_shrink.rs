use crate::error::Result;
use crate::game::{GameMode, Pong};
use crate::modifier::{ActivationMode, GameEvent, Modifier, ModifierCore};
use log::debug;

/// Closes the goal of every eliminated player in the polygon arena.
///
/// The goal wall is replaced by a plain wall bridging its two neighbours,
/// so the arena keeps a closed outline around the remaining players.
pub struct ArenaShrink {
    core: ModifierCore,
    shrunk: Vec<usize>,
}

impl ArenaShrink {
    pub fn new() -> Self {
        ArenaShrink {
            core: ModifierCore::new("arenaShrink", ActivationMode::Auto),
            shrunk: Vec::new(),
        }
    }
}

impl Default for ArenaShrink {
    fn default() -> Self {
        Self::new()
    }
}

impl Modifier for ArenaShrink {
    fn core(&self) -> &ModifierCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ModifierCore {
        &mut self.core
    }

    fn on_player_elimination(&mut self, game: &mut Pong, player_id: usize) -> Result<()> {
        let count = 2 * game.player_count;
        if game.mode != GameMode::Multiplayer || game.world.walls.len() < count {
            return Ok(());
        }

        let goal = 2 * player_id;
        if goal >= count || self.shrunk.contains(&goal) {
            return Ok(());
        }
        let prev = game.world.walls[(goal + count - 1) % count].clone();
        let next = game.world.walls[(goal + 1) % count].clone();

        let wall = &mut game.world.walls[goal];
        wall.pos = prev.pos.add(&next.pos).scale(0.5);
        wall.abs_pos = prev.abs_pos.add(&next.abs_pos).scale(0.5);
        wall.width = prev.pos.distance(&next.pos);
        wall.is_goal = false;
        wall.is_visible = true;
        self.shrunk.push(goal);

        debug!("Closed the goal of player {}", player_id);
        game.trigger(GameEvent::ArenaModification);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::game::tests::{classic_with, polygon_with};
    use crate::modifier::GameEvent;
    use assert_approx_eq::assert_approx_eq;
    use serde_json::json;

    #[test]
    fn test_eliminated_goal_becomes_a_wall() {
        let mut game = polygon_with(4, json!({ "arenaShrink": {} }));
        game.start_game();
        let prev = game.world.walls[1].clone();
        let next = game.world.walls[3].clone();

        game.trigger(GameEvent::PlayerElimination { player_id: 1 });

        let wall = &game.world.walls[2];
        assert!(!wall.is_goal);
        assert_approx_eq!(wall.pos.x, (prev.pos.x + next.pos.x) / 2.0, 1e-9);
        assert_approx_eq!(wall.pos.y, (prev.pos.y + next.pos.y) / 2.0, 1e-9);
        assert_approx_eq!(wall.width, prev.pos.distance(&next.pos), 1e-9);
        // Neighbours are left as they were.
        assert_eq!(game.world.walls[1], prev);
        assert_eq!(game.world.walls[3], next);
    }

    #[test]
    fn test_first_goal_wraps_around() {
        let mut game = polygon_with(3, json!({ "arenaShrink": {} }));
        game.start_game();
        let prev = game.world.walls[5].clone();
        let next = game.world.walls[1].clone();

        game.trigger(GameEvent::PlayerElimination { player_id: 0 });
        assert_approx_eq!(game.world.walls[0].width, prev.pos.distance(&next.pos), 1e-9);

        let shrunk = game.world.walls[0].clone();
        game.trigger(GameEvent::PlayerElimination { player_id: 0 });
        assert_eq!(game.world.walls[0], shrunk);
    }

    #[test]
    fn test_classic_arena_is_untouched() {
        let mut game = classic_with(json!({ "arenaShrink": {} }));
        game.start_game();
        let walls = game.world.walls.clone();
        game.trigger(GameEvent::PlayerElimination { player_id: 0 });
        assert_eq!(game.world.walls, walls);
    }
}
