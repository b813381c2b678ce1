use super::activation_mode;
use crate::config::{number, percent_to_factor, seconds_to_ticks, Config, ConfigManager};
use crate::error::Result;
use crate::game::Pong;
use crate::modifier::{Modifier, ModifierCore, ModifierStatus};
use crate::physics::Rectangle;
use log::debug;
use serde::Deserialize;
use serde_json::Value;

const NAME: &str = "bumper";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BumperSettings {
    duration: i64,
    self_activation: bool,
    junction_distance: f64,
    wall_junction_distance: f64,
    velocity: f64,
    max_velocity: f64,
    acceleration: f64,
}

/// Raises a wedge in front of every side wall. Each hit on a wedge adds
/// speed to the ball, and the extra speed slowly wears off.
pub struct Bumper {
    core: ModifierCore,
    /// Fraction of half the arena height between a wall and its wedge tip.
    junction_distance: f64,
    /// Fraction of the wall covered by the wedge base.
    wall_junction_distance: f64,
    velocity: f64,
    max_velocity: f64,
    /// Change of the velocity factor per tick, usually negative.
    acceleration: f64,
    velocity_factor: f64,
}

impl Bumper {
    pub fn from_config(defaults: &Config, custom: &Config, tick_rate: f64) -> Result<Self> {
        let mut manager = ConfigManager::new();
        manager
            .register_property_config("duration", seconds_to_ticks("durationS", tick_rate), &[])
            .register_property_config(
                "junctionDistance",
                percent_to_factor("bumperJunctionDistanceFromCenterPercent"),
                &[],
            )
            .register_property_config(
                "wallJunctionDistance",
                percent_to_factor("bumperWallJunctionDistancePercent"),
                &[],
            )
            .register_property_config("velocity", percent_to_factor("bumperVelocityPercent"), &[])
            .register_property_config("maxVelocity", percent_to_factor("bumperMaxVelocityPercent"), &[])
            .register_property_config(
                "acceleration",
                move |_, context| Value::from(number(context, "bumperAccelerationPercentS") / (100.0 * tick_rate)),
                &[],
            );
        let settings: BumperSettings = manager.resolve(defaults, custom)?;

        Ok(Bumper {
            core: ModifierCore::time_limited(
                NAME,
                activation_mode(settings.self_activation),
                settings.duration,
            ),
            junction_distance: settings.junction_distance,
            wall_junction_distance: settings.wall_junction_distance,
            velocity: settings.velocity,
            max_velocity: settings.max_velocity,
            acceleration: settings.acceleration,
            velocity_factor: 0.0,
        })
    }

    fn build_wedges(&mut self, game: &mut Pong) -> Result<()> {
        if game.world.balls.is_empty() {
            return self.deactivate(game);
        }

        let reach = self.junction_distance * game.settings.arena_height / 2.0;
        let outline = 2 * game.player_count;
        let mut wedges = Vec::new();

        for wall in game.world.walls.iter().take(outline) {
            if wall.is_goal || wall.owner.is_some() {
                continue;
            }
            let junction = wall.pos.add(&wall.normal.scale(reach));
            let half_base = self.wall_junction_distance * wall.width / 2.0;
            for side in [-1.0, 1.0] {
                let end = wall.pos.add(&wall.dir.scale(side * half_base));
                wedges.push(Rectangle::between(&junction, &end, wall.height));
            }
        }

        debug!("Raised {} bumper walls", wedges.len());
        game.world.add_unit_walls(self.id(), wedges);
        Ok(())
    }
}

impl Modifier for Bumper {
    fn core(&self) -> &ModifierCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ModifierCore {
        &mut self.core
    }

    fn on_activation(&mut self, game: &mut Pong) -> Result<()> {
        self.build_wedges(game)
    }

    fn on_deactivation(&mut self, game: &mut Pong) -> Result<()> {
        game.world.remove_unit_walls(self.id());
        game.delete_power_up(self.id(), NAME);
        Ok(())
    }

    fn on_update(&mut self, game: &mut Pong) -> Result<()> {
        self.tick_countdown(game)?;
        if self.status() != ModifierStatus::Active {
            return Ok(());
        }

        self.velocity_factor = (self.velocity_factor + self.acceleration).max(0.0);
        if self.velocity_factor > 0.0 {
            if let Some(ball) = game.world.balls.first_mut() {
                ball.speed += self.acceleration * ball.speed;
            }
        }
        Ok(())
    }

    fn on_wall_bounce(&mut self, game: &mut Pong, wall_id: usize, ball_id: usize) -> Result<()> {
        if game.world.unit_wall_rank(self.id(), wall_id).is_none() {
            return Ok(());
        }
        self.velocity_factor = (self.velocity_factor + self.velocity).min(self.max_velocity);
        if let Some(ball) = game.world.balls.get_mut(ball_id) {
            ball.speed += self.velocity_factor * ball.speed;
        }
        Ok(())
    }

    fn on_ball_reset(&mut self, _game: &mut Pong, ball_id: Option<usize>) -> Result<()> {
        if matches!(ball_id, None | Some(0)) {
            self.velocity_factor = 0.0;
        }
        Ok(())
    }

    fn on_arena_modification(&mut self, game: &mut Pong) -> Result<()> {
        game.world.remove_unit_walls(self.id());
        self.build_wedges(game)
    }
}
