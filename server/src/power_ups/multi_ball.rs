use super::activation_mode;
use crate::config::{number, percent_to_factor, seconds_to_ticks, Config, ConfigManager};
use crate::error::Result;
use crate::game::Pong;
use crate::modifier::{Modifier, ModifierCore};
use crate::physics::{Ball, Vector2};
use log::debug;
use serde::Deserialize;
use serde_json::Value;

const NAME: &str = "multiBall";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MultiBallSettings {
    duration: i64,
    self_activation: bool,
    ball_count: usize,
    total_angle: f64,
    radius_factor: f64,
}

/// Splits the main ball into a fan of balls. Only one of them, picked at
/// random, can score; the decoys just bounce around until the power-up
/// ends.
pub struct MultiBall {
    core: ModifierCore,
    ball_count: usize,
    total_angle: f64,
    radius_factor: f64,
}

impl MultiBall {
    pub fn from_config(defaults: &Config, custom: &Config, tick_rate: f64) -> Result<Self> {
        let mut manager = ConfigManager::new();
        manager
            .register_property_config("duration", seconds_to_ticks("durationS", tick_rate), &[])
            .register_property_config(
                "totalAngle",
                |_, context| Value::from(number(context, "totalAngleDeg").to_radians()),
                &[],
            )
            .register_property_config("radiusFactor", percent_to_factor("radiusFactorPercent"), &[]);
        let settings: MultiBallSettings = manager.resolve(defaults, custom)?;

        Ok(MultiBall {
            core: ModifierCore::time_limited(
                NAME,
                activation_mode(settings.self_activation),
                settings.duration,
            ),
            ball_count: settings.ball_count,
            total_angle: settings.total_angle,
            radius_factor: settings.radius_factor,
        })
    }
}

impl Modifier for MultiBall {
    fn core(&self) -> &ModifierCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ModifierCore {
        &mut self.core
    }

    fn on_activation(&mut self, game: &mut Pong) -> Result<()> {
        let Some(main) = game.world.balls.first().cloned() else {
            return Ok(());
        };

        let origin = main.dir.angle();
        let step = self.total_angle / (self.ball_count + 1) as f64;
        let angles: Vec<f64> = (0..=self.ball_count)
            .map(|index| origin + index as f64 * step - self.total_angle / 2.0)
            .collect();
        let real = game.rng.random_int(0, self.ball_count as i64) as usize;

        for (index, angle) in angles.iter().enumerate() {
            if index == real {
                continue;
            }
            let mut decoy = Ball::new(
                main.pos,
                Vector2::from_angle(*angle),
                main.radius * self.radius_factor,
                main.speed,
            );
            decoy.do_goal = false;
            game.world.balls.push(decoy);
        }

        if let Some(ball) = game.world.balls.first_mut() {
            ball.dir = Vector2::from_angle(angles[real]);
        }
        debug!("Split the ball into {} balls", self.ball_count + 1);
        Ok(())
    }

    fn on_deactivation(&mut self, game: &mut Pong) -> Result<()> {
        game.delete_power_up(self.id(), NAME);
        game.reset_ball(None);
        Ok(())
    }

    fn on_goal(&mut self, game: &mut Pong, _player_id: usize) -> Result<()> {
        self.deactivate(game)
    }

    fn on_player_elimination(&mut self, game: &mut Pong, _player_id: usize) -> Result<()> {
        self.deactivate(game)
    }
}

#[cfg(test)]
mod tests {
    use crate::modifier::GameEvent;
    use crate::power_ups::tests::{park_ball, pick_up, power_up_match};
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_splits_main_ball_into_fan() {
        let mut game = power_up_match();
        park_ball(&mut game);
        let main = game.world.balls[0].clone();

        pick_up(&mut game, "multiBall");

        assert_eq!(game.world.balls.len(), 3);
        let mut angles: Vec<f64> = game.world.balls.iter().map(|b| b.dir.angle()).collect();
        angles.sort_by(f64::total_cmp);
        let step = 40f64.to_radians() / 3.0;
        assert_approx_eq!(angles[0], main.dir.angle() - 20f64.to_radians(), 1e-9);
        assert_approx_eq!(angles[1] - angles[0], step, 1e-9);
        assert_approx_eq!(angles[2] - angles[1], step, 1e-9);

        assert!(game.world.balls[0].do_goal);
        for decoy in &game.world.balls[1..] {
            assert!(!decoy.do_goal);
            assert_approx_eq!(decoy.radius, main.radius * 0.8, 1e-9);
            assert_approx_eq!(decoy.speed, main.speed, 1e-9);
        }
    }

    #[test]
    fn test_goal_ends_multi_ball() {
        let mut game = power_up_match();
        pick_up(&mut game, "multiBall");
        assert_eq!(game.world.balls.len(), 3);

        game.trigger(GameEvent::Goal { player_id: 0 });
        assert_eq!(game.world.balls.len(), 1);
        assert!(!game.modifiers.has_unit("multiBall"));
        assert_eq!(game.modifiers.counter("multiBall"), 0);
    }

    #[test]
    fn test_expiry_removes_decoys() {
        let mut game = power_up_match();
        pick_up(&mut game, "multiBall");

        for _ in 0..480 {
            game.update();
        }
        assert_eq!(game.world.balls.len(), 1);
        assert!(!game.modifiers.has_unit("multiBall"));
    }
}
