use super::activation_mode;
use crate::config::{percent_to_factor, seconds_to_ticks, Config, ConfigManager};
use crate::error::Result;
use crate::game::{PlayerSampler, Pong};
use crate::modifier::{Modifier, ModifierCore, ModifierStatus};
use crate::physics::Vector2;
use crate::registry::StrategyRegistry;
use log::debug;
use serde::Deserialize;
use std::f64::consts::PI;

const NAME: &str = "shooter";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ShooterSettings {
    duration: i64,
    self_activation: bool,
    charge_duration: i64,
    charge_radius: f64,
    shoot_additional_velocity: f64,
    shoot_angular_offset: f64,
    shoot_angular_deviation: f64,
    shoot_target_width: f64,
    player_sampler: String,
    #[serde(default)]
    player_sampler_params: Config,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Charging,
    Shot,
}

/// Grabs the main ball, spins it around a nearby point for a moment, then
/// fires it faster at the goal of a sampled player.
pub struct Shooter {
    core: ModifierCore,
    charge_duration: i64,
    charge_radius: f64,
    shoot_additional_velocity: f64,
    shoot_angular_offset: f64,
    shoot_angular_deviation: f64,
    /// Share of the goal width the shot aims within.
    shoot_target_width: f64,
    player_sampler: PlayerSampler,
    phase: Phase,
    /// 1 counter-clockwise, -1 clockwise.
    orbit: f64,
    charge_center: Vector2,
}

impl Shooter {
    pub fn from_config(defaults: &Config, custom: &Config, tick_rate: f64) -> Result<Self> {
        let mut manager = ConfigManager::new();
        manager
            .register_property_config("duration", seconds_to_ticks("durationS", tick_rate), &[])
            .register_property_config("chargeDuration", seconds_to_ticks("chargeDurationS", tick_rate), &[])
            .register_property_config(
                "shootAdditionalVelocity",
                percent_to_factor("shootAdditionalVelocityPercent"),
                &[],
            )
            .register_property_config(
                "shootAngularOffset",
                percent_to_factor("shootAngularOffsetPercent"),
                &[],
            )
            .register_property_config(
                "shootAngularDeviation",
                percent_to_factor("shootStandardAngularDeviationPercent"),
                &[],
            )
            .register_property_config("shootTargetWidth", percent_to_factor("shootTargetWidthPercent"), &[]);
        let settings: ShooterSettings = manager.resolve(defaults, custom)?;

        let mut strategies = StrategyRegistry::default();
        strategies
            .player_sampler
            .insert(settings.player_sampler.clone(), settings.player_sampler_params);

        Ok(Shooter {
            core: ModifierCore::time_limited(
                NAME,
                activation_mode(settings.self_activation),
                settings.duration,
            ),
            charge_duration: settings.charge_duration,
            charge_radius: settings.charge_radius,
            shoot_additional_velocity: settings.shoot_additional_velocity,
            shoot_angular_offset: settings.shoot_angular_offset,
            shoot_angular_deviation: settings.shoot_angular_deviation,
            shoot_target_width: settings.shoot_target_width,
            player_sampler: PlayerSampler::from_registry(&settings.player_sampler, &strategies)?,
            phase: Phase::Charging,
            orbit: 1.0,
            charge_center: Vector2::default(),
        })
    }

    /// Turns the main ball so it keeps circling the charge center.
    fn steer(&self, game: &mut Pong) {
        let Some(ball) = game.world.balls.first_mut() else {
            return;
        };
        let angle = ball.pos.sub(&self.charge_center).angle();
        let next = angle + self.orbit * ball.speed / self.charge_radius;
        let target = self.charge_center.add(&Vector2::from_angle(next).scale(self.charge_radius));
        let step = target.sub(&ball.pos);
        if step.magnitude() > 0.0 {
            ball.dir = step.normalize();
        }
    }

    fn shoot(&mut self, game: &mut Pong) {
        let target = game.sample_player(&self.player_sampler);
        let goal_id = game.mode.own_goal_wall(target);
        let (Some(goal), Some(ball)) = (game.world.walls.get(goal_id), game.world.balls.first()) else {
            return;
        };

        let to_goal = goal.pos.sub(&ball.pos);
        let to_edge = goal
            .pos
            .add(&goal.dir.scale(self.shoot_target_width * goal.width / 2.0))
            .sub(&ball.pos);
        let cos = to_goal.dot(&to_edge) / (to_goal.magnitude() * to_edge.magnitude());
        let half_angle = cos.clamp(-1.0, 1.0).acos();
        let to_goal = to_goal.normalize();

        let angle = game
            .rng
            .random_gaussian(
                half_angle * self.shoot_angular_offset,
                half_angle * self.shoot_angular_deviation,
            )
            .clamp(0.0, half_angle)
            * game.rng.random_sign(0.5);

        if let Some(ball) = game.world.balls.first_mut() {
            ball.dir = to_goal.rotate(angle);
            ball.speed += self.shoot_additional_velocity * ball.speed;
        }
        self.phase = Phase::Shot;
        debug!("Shot the ball at the goal of player {}", target);
    }
}

impl Modifier for Shooter {
    fn core(&self) -> &ModifierCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ModifierCore {
        &mut self.core
    }

    fn on_activation(&mut self, game: &mut Pong) -> Result<()> {
        let Some(ball) = game.world.balls.first() else {
            return self.deactivate(game);
        };
        let ball_pos = ball.pos;
        self.orbit = game.rng.random_sign(0.5);
        self.phase = Phase::Charging;

        let to_center = game.mode.center(&game.settings).sub(&ball_pos);
        let offset = if to_center.magnitude() <= self.charge_radius {
            Vector2::from_angle(game.rng.random() * 2.0 * PI).scale(self.charge_radius)
        } else {
            to_center.normalize().scale(self.charge_radius)
        };
        self.charge_center = ball_pos.add(&offset);
        Ok(())
    }

    fn on_deactivation(&mut self, game: &mut Pong) -> Result<()> {
        game.delete_power_up(self.id(), NAME);
        Ok(())
    }

    fn on_update(&mut self, game: &mut Pong) -> Result<()> {
        self.tick_countdown(game)?;
        if self.status() != ModifierStatus::Active {
            return Ok(());
        }
        if game.world.balls.is_empty() {
            return self.deactivate(game);
        }

        if self.phase == Phase::Charging {
            let duration = self.core.countdown.map_or(0, |c| c.duration);
            if self.core.ticks() <= duration - self.charge_duration {
                self.shoot(game);
            } else {
                self.steer(game);
            }
        }
        Ok(())
    }

    fn on_ball_reset(&mut self, game: &mut Pong, ball_id: Option<usize>) -> Result<()> {
        if matches!(ball_id, None | Some(0)) {
            self.deactivate(game)?;
        }
        Ok(())
    }
}
