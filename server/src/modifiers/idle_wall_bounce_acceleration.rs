use crate::config::{percent_to_factor, Config, ConfigManager};
use crate::error::Result;
use crate::game::Pong;
use crate::modifier::{ActivationMode, Modifier, ModifierCore};
use serde::Deserialize;

const NAME: &str = "idleWallBounceAcceleration";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdleWallBounceSettings {
    bumper_velocity_factor: f64,
}

/// Walls that nobody defends act as bumpers and speed the ball up.
pub struct IdleWallBounceAcceleration {
    core: ModifierCore,
    factor: f64,
}

impl IdleWallBounceAcceleration {
    pub fn from_config(defaults: &Config, custom: &Config) -> Result<Self> {
        let mut manager = ConfigManager::new();
        manager.register_property_config(
            "bumperVelocityFactor",
            percent_to_factor("bumperVelocityPercent"),
            &[],
        );
        let settings: IdleWallBounceSettings = manager.resolve(defaults, custom)?;

        Ok(IdleWallBounceAcceleration {
            core: ModifierCore::new(NAME, ActivationMode::Auto),
            factor: settings.bumper_velocity_factor,
        })
    }
}

impl Modifier for IdleWallBounceAcceleration {
    fn core(&self) -> &ModifierCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ModifierCore {
        &mut self.core
    }

    fn on_wall_bounce(&mut self, game: &mut Pong, wall_id: usize, ball_id: usize) -> Result<()> {
        // Only the arena outline bumps.
        let on_outline = wall_id < 2 * game.player_count
            && game.world.walls.get(wall_id).is_some_and(|w| w.owner.is_none());
        if !on_outline {
            return Ok(());
        }
        // Even walls are goals; they only bump once their owner is out.
        if wall_id % 2 == 0 && !game.is_eliminated(wall_id / 2) {
            return Ok(());
        }
        if let Some(ball) = game.world.balls.get_mut(ball_id) {
            ball.speed += self.factor * ball.speed;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::game::tests::polygon_with;
    use crate::modifier::{GameEvent, UnitId};
    use assert_approx_eq::assert_approx_eq;
    use serde_json::json;

    #[test]
    fn test_side_walls_accelerate() {
        let mut game = polygon_with(3, json!({ "idleWallBounceAcceleration": { "bumperVelocityPercent": 10.0 } }));
        game.start_game();
        let speed = game.world.balls[0].speed;

        game.trigger(GameEvent::WallBounce { wall_id: 1, ball_id: 0 });
        assert_approx_eq!(game.world.balls[0].speed, speed * 1.1, 1e-9);
    }

    #[test]
    fn test_goal_walls_accelerate_only_once_eliminated() {
        let mut game = polygon_with(3, json!({ "idleWallBounceAcceleration": { "bumperVelocityPercent": 10.0 } }));
        game.start_game();
        let speed = game.world.balls[0].speed;

        game.trigger(GameEvent::WallBounce { wall_id: 2, ball_id: 0 });
        assert_approx_eq!(game.world.balls[0].speed, speed, 1e-9);

        game.eliminated.push(1);
        game.trigger(GameEvent::WallBounce { wall_id: 2, ball_id: 0 });
        assert_approx_eq!(game.world.balls[0].speed, speed * 1.1, 1e-9);
    }

    #[test]
    fn test_unit_walls_do_not_accelerate() {
        let mut game = polygon_with(3, json!({ "idleWallBounceAcceleration": { "bumperVelocityPercent": 10.0 } }));
        game.start_game();
        let extra = game.world.walls[1].clone();
        game.world.add_unit_walls(UnitId(99), vec![extra]);
        let speed = game.world.balls[0].speed;

        game.trigger(GameEvent::WallBounce { wall_id: 6, ball_id: 0 });
        assert_approx_eq!(game.world.balls[0].speed, speed, 1e-9);
    }
}
