use super::activation_mode;
use crate::config::{percent_to_factor, seconds_to_ticks, Config, ConfigManager};
use crate::error::Result;
use crate::game::Pong;
use crate::modifier::{Modifier, ModifierCore};
use crate::physics::{Rectangle, Vector2};
use log::debug;
use serde::Deserialize;
use std::f64::consts::PI;

const NAME: &str = "speedGate";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpeedGateSettings {
    duration: i64,
    self_activation: bool,
    small_gate_width: f64,
    big_gate_width: f64,
    gate_distance: f64,
    mean_distance_from_center: f64,
    std_dev_distance_from_center: f64,
    portal_use_threshold: u32,
    size_factor: f64,
    speed_factor: f64,
}

/// A trapezoid with a narrow gate at one end and a wide one at the other.
/// Entering the wide gate shrinks the ball and speeds it up, and it leaves
/// through the narrow one; the narrow gate does the reverse.
pub struct SpeedGate {
    core: ModifierCore,
    /// Gate widths as multiples of the ball diameter.
    small_gate_width: f64,
    big_gate_width: f64,
    /// Gap between the gates as a share of half the arena height.
    gate_distance: f64,
    mean_distance_from_center: f64,
    std_dev_distance_from_center: f64,
    portal_use_threshold: u32,
    size_factor: f64,
    speed_factor: f64,
    uses: u32,
    /// Largest turn of an exiting ball away from the gate normal.
    spread: f64,
}

impl SpeedGate {
    pub fn from_config(defaults: &Config, custom: &Config, tick_rate: f64) -> Result<Self> {
        let mut manager = ConfigManager::new();
        manager
            .register_property_config("duration", seconds_to_ticks("durationS", tick_rate), &[])
            .register_property_config(
                "smallGateWidth",
                percent_to_factor("initialBallSizeSmallPortalWidthPercent"),
                &[],
            )
            .register_property_config(
                "bigGateWidth",
                percent_to_factor("initialBallSizeBigPortalWidthPercent"),
                &[],
            )
            .register_property_config("gateDistance", percent_to_factor("portalWidthArenaHeightPercent"), &[])
            .register_property_config(
                "meanDistanceFromCenter",
                percent_to_factor("meanSpeedGateDstFromCenterPercent"),
                &[],
            )
            .register_property_config(
                "stdDevDistanceFromCenter",
                percent_to_factor("stdDevSpeedGateDstFromCenterPercent"),
                &[],
            );
        let settings: SpeedGateSettings = manager.resolve(defaults, custom)?;

        Ok(SpeedGate {
            core: ModifierCore::time_limited(
                NAME,
                activation_mode(settings.self_activation),
                settings.duration,
            ),
            small_gate_width: settings.small_gate_width,
            big_gate_width: settings.big_gate_width,
            gate_distance: settings.gate_distance,
            mean_distance_from_center: settings.mean_distance_from_center,
            std_dev_distance_from_center: settings.std_dev_distance_from_center,
            portal_use_threshold: settings.portal_use_threshold.max(1),
            size_factor: settings.size_factor.max(f64::EPSILON),
            speed_factor: settings.speed_factor.max(f64::EPSILON),
            uses: 0,
            spread: 0.0,
        })
    }

    fn build(&mut self, game: &mut Pong) {
        let settings = &game.settings;
        let small = self.small_gate_width * settings.ball_radius * 2.0;
        let big = self.big_gate_width * settings.ball_radius * 2.0;
        let length = self.gate_distance * settings.arena_height / 2.0;
        let gate_height = settings.paddle_height / 2.0;
        let leg_height = settings.paddle_height;
        let safe = (settings.arena_height / 2.0 - big / 2.0).max(0.0);

        let distance = game
            .rng
            .random_gaussian(self.mean_distance_from_center * safe, self.std_dev_distance_from_center * safe)
            .clamp(0.0, safe);
        let center = game
            .mode
            .center(&game.settings)
            .add(&Vector2::from_angle(game.rng.random() * 2.0 * PI).scale(distance));

        // Two players face each other across the width, so the gates do too.
        let angle = if game.player_count == 2 {
            if game.rng.random_sign(0.5) > 0.0 {
                0.0
            } else {
                PI
            }
        } else {
            game.rng.random() * 2.0 * PI
        };
        let axis = Vector2::from_angle(angle);
        let across = Vector2::new(axis.y, -axis.x);
        let reach = length / 2.0 - 2.0 * gate_height;

        let mut small_gate = Rectangle::new(center.add(&axis.scale(reach)), across, small, gate_height);
        small_gate.do_resolve_collision = false;
        let mut big_gate = Rectangle::new(center.sub(&axis.scale(reach)), across.scale(-1.0), big, gate_height);
        big_gate.do_resolve_collision = false;

        let legs = [1.0, -1.0].map(|side| {
            let outward = across.scale(side * 2.0 * leg_height);
            let start = small_gate.pos.add(&across.scale(side * small / 2.0)).add(&outward);
            let end = big_gate.pos.add(&across.scale(side * big / 2.0)).add(&outward);
            let mut leg = Rectangle::between(&start, &end, leg_height);
            leg.width *= 1.05;
            leg
        });

        self.spread = ((big - small) / 2.0).atan2(length);
        let [left, right] = legs;
        game.world.add_unit_walls(self.id(), vec![small_gate, big_gate, left, right]);
        debug!("Speed gate opened at ({:.1}, {:.1})", center.x, center.y);
    }
}

impl Modifier for SpeedGate {
    fn core(&self) -> &ModifierCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ModifierCore {
        &mut self.core
    }

    fn on_activation(&mut self, game: &mut Pong) -> Result<()> {
        self.build(game);
        Ok(())
    }

    fn on_deactivation(&mut self, game: &mut Pong) -> Result<()> {
        game.world.remove_unit_walls(self.id());
        game.delete_power_up(self.id(), NAME);
        Ok(())
    }

    fn on_wall_bounce(&mut self, game: &mut Pong, wall_id: usize, ball_id: usize) -> Result<()> {
        // Ranks 0 and 1 are the gates, the legs are plain walls.
        let rank = match game.world.unit_wall_rank(self.id(), wall_id) {
            Some(rank @ (0 | 1)) => rank,
            _ => return Ok(()),
        };
        let Some(dst_id) = game.world.unit_wall_ids(self.id()).get(1 - rank).copied() else {
            return Ok(());
        };
        let dst = game.world.walls[dst_id].clone();
        let turn = game.rng.random_range(-self.spread, self.spread);
        let walls_height = game.settings.walls_height;
        let Some(ball) = game.world.balls.get_mut(ball_id) else {
            return Ok(());
        };

        if rank == 1 {
            ball.radius /= self.size_factor;
            ball.speed *= self.speed_factor;
        } else {
            ball.radius *= self.size_factor;
            ball.speed /= self.speed_factor;
        }
        ball.pos = dst
            .pos
            .add(&dst.normal.scale(dst.height / 2.0 + ball.radius + walls_height / 2.0));
        ball.dir = dst.normal.rotate(turn);

        if ball_id == 0 {
            self.uses += 1;
            if self.uses >= self.portal_use_threshold {
                self.deactivate(game)?;
            }
        }
        Ok(())
    }
}
