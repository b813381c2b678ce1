use super::activation_mode;
use crate::config::{percent_to_factor, Config, ConfigManager};
use crate::error::Result;
use crate::game::Pong;
use crate::modifier::{Modifier, ModifierCore};
use crate::physics::Rectangle;
use log::debug;
use serde::Deserialize;

const NAME: &str = "bumperShield";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BumperShieldSettings {
    self_activation: bool,
    walls_hit_threshold: u32,
    wall_total_width: f64,
    speed_multiplier: f64,
    wall_junction: f64,
    wall_goal_offset: f64,
}

/// Guards one goal with two slanted walls that shrink every time the main
/// ball hits them, speeding it up, until they break.
pub struct BumperShield {
    core: ModifierCore,
    walls_hit_threshold: u32,
    wall_total_width: f64,
    speed_multiplier: f64,
    wall_junction: f64,
    wall_goal_offset: f64,
    hits: u32,
}

impl BumperShield {
    pub fn from_config(defaults: &Config, custom: &Config, _tick_rate: f64) -> Result<Self> {
        let mut manager = ConfigManager::new();
        manager
            .register_property_config(
                "wallTotalWidth",
                percent_to_factor("wallTotalWidthArenaWidthPercent"),
                &[],
            )
            .register_property_config("speedMultiplier", percent_to_factor("speedMultiplierPercent"), &[])
            .register_property_config(
                "wallJunction",
                percent_to_factor("wallJunctionArenaWidthPercent"),
                &[],
            )
            .register_property_config(
                "wallGoalOffset",
                percent_to_factor("wallGoalOffsetArenaWidthPercent"),
                &[],
            );
        let settings: BumperShieldSettings = manager.resolve(defaults, custom)?;

        Ok(BumperShield {
            core: ModifierCore::new(NAME, activation_mode(settings.self_activation)),
            walls_hit_threshold: settings.walls_hit_threshold.max(1),
            wall_total_width: settings.wall_total_width,
            speed_multiplier: settings.speed_multiplier,
            wall_junction: settings.wall_junction,
            wall_goal_offset: settings.wall_goal_offset,
            hits: 0,
        })
    }

    fn build_walls(&self, game: &mut Pong) {
        let Some(player_id) = self.core.player_id else {
            return;
        };
        let goal_id = game.mode.own_goal_wall(player_id);
        let (Some(goal), Some(paddle)) = (game.world.walls.get(goal_id), game.world.paddles.get(player_id)) else {
            return;
        };

        let arena_width = game.settings.arena_width;
        let center = goal
            .pos
            .add(&goal.normal.scale(self.wall_goal_offset * arena_width / 2.0 + goal.height / 2.0));
        let junction = center.add(&paddle.body.normal.scale(self.wall_junction * arena_width / 2.0));

        let left = (self.walls_hit_threshold - self.hits) as f64 / self.walls_hit_threshold as f64;
        let width = self.wall_total_width * arena_width / 2.0 * left;
        let height = game.settings.paddle_height / 2.0;

        let walls = [1.0, -1.0]
            .into_iter()
            .map(|side| {
                let end = center.add(&goal.dir.scale(side * goal.width / 2.0));
                let dir = junction.sub(&end).normalize();
                Rectangle::new(end.add(&dir.scale(width / 2.0)), dir, width, height)
            })
            .collect();
        game.world.add_unit_walls(self.id(), walls);
    }
}

impl Modifier for BumperShield {
    fn core(&self) -> &ModifierCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ModifierCore {
        &mut self.core
    }

    fn on_activation(&mut self, game: &mut Pong) -> Result<()> {
        if self.core.player_id.is_none() {
            let survivors: Vec<usize> = (0..game.player_count).filter(|p| !game.is_eliminated(*p)).collect();
            if survivors.is_empty() {
                return self.deactivate(game);
            }
            let index = game.rng.random_int(0, survivors.len() as i64 - 1) as usize;
            self.core.player_id = Some(survivors[index]);
        }
        debug!("Shielding the goal of player {:?}", self.core.player_id);
        self.build_walls(game);
        Ok(())
    }

    fn on_deactivation(&mut self, game: &mut Pong) -> Result<()> {
        game.world.remove_unit_walls(self.id());
        game.delete_power_up(self.id(), NAME);
        Ok(())
    }

    fn on_wall_bounce(&mut self, game: &mut Pong, wall_id: usize, ball_id: usize) -> Result<()> {
        if ball_id != 0 || game.world.unit_wall_rank(self.id(), wall_id).is_none() {
            return Ok(());
        }
        if let Some(ball) = game.world.balls.first_mut() {
            ball.speed += ball.speed * self.speed_multiplier;
        }

        self.hits += 1;
        if self.hits >= self.walls_hit_threshold {
            return self.deactivate(game);
        }
        game.world.remove_unit_walls(self.id());
        self.build_walls(game);
        Ok(())
    }

    fn on_player_elimination(&mut self, game: &mut Pong, player_id: usize) -> Result<()> {
        if self.core.player_id == Some(player_id) {
            self.deactivate(game)?;
        }
        Ok(())
    }

    fn on_arena_modification(&mut self, game: &mut Pong) -> Result<()> {
        game.world.remove_unit_walls(self.id());
        self.build_walls(game);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::modifier::GameEvent;
    use crate::power_ups::tests::{pick_up, power_up_match};
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_shields_the_last_hitter_goal() {
        let mut game = power_up_match();
        let outline = game.world.walls.len();
        game.last_hit = Some(0);
        pick_up(&mut game, "bumperShield");

        assert_eq!(game.world.walls.len(), outline + 2);
        for wall in &game.world.walls[outline..] {
            // Player 0 defends the left goal.
            assert!(wall.pos.x < 20.0, "shield wall at {:?}", wall.pos);
            assert_approx_eq!(wall.width, 20.0, 1e-9);
        }
    }

    #[test]
    fn test_walls_shrink_then_break() {
        let mut game = power_up_match();
        let outline = game.world.walls.len();
        game.last_hit = Some(1);
        pick_up(&mut game, "bumperShield");
        game.world.balls[0].speed = 1.0;

        game.trigger(GameEvent::WallBounce { wall_id: outline, ball_id: 0 });
        assert_approx_eq!(game.world.balls[0].speed, 1.1, 1e-9);
        assert_approx_eq!(game.world.walls[outline].width, 20.0 * 2.0 / 3.0, 1e-9);

        // Extra balls do not wear the shield.
        game.trigger(GameEvent::WallBounce { wall_id: outline, ball_id: 1 });
        assert_approx_eq!(game.world.walls[outline].width, 20.0 * 2.0 / 3.0, 1e-9);

        game.trigger(GameEvent::WallBounce { wall_id: outline, ball_id: 0 });
        game.trigger(GameEvent::WallBounce { wall_id: outline, ball_id: 0 });
        assert!(!game.modifiers.has_unit("bumperShield"));
        assert_eq!(game.world.walls.len(), outline);
        assert_eq!(game.modifiers.counter("bumperShield"), 0);
    }

    #[test]
    fn test_owner_elimination_ends_shield() {
        let mut game = power_up_match();
        game.last_hit = Some(0);
        pick_up(&mut game, "bumperShield");

        game.trigger(GameEvent::PlayerElimination { player_id: 1 });
        assert!(game.modifiers.has_unit("bumperShield"));
        game.trigger(GameEvent::PlayerElimination { player_id: 0 });
        assert!(!game.modifiers.has_unit("bumperShield"));
    }
}
