use super::activation_mode;
use crate::config::{percent_to_factor, seconds_to_ticks, Config, ConfigManager};
use crate::error::Result;
use crate::game::Pong;
use crate::modifier::{Modifier, ModifierCore};
use crate::physics::{resolve_collision, Rectangle, Vector2, EPSILON};
use pong_shared::round_snapshot;
use serde::Deserialize;
use serde_json::{json, Value};
use std::f64::consts::PI;

const NAME: &str = "portals";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PortalsSettings {
    duration: i64,
    self_activation: bool,
    portal_wall_width: f64,
    directional_offset: f64,
    directional_offset_deviation: f64,
    normal_offset: f64,
    normal_offset_deviation: f64,
    use_natural_side: bool,
    use_both_sides: bool,
    teleportation_count_threshold: u32,
}

/// Opens two linked portals, placed symmetrically around the arena center.
/// A ball running into one leaves the other at the matching point.
///
/// With the natural side the ball comes back out on the face it went in,
/// as if mirrored; otherwise it carries on through the far face. Without
/// both sides the back faces are plain walls.
pub struct Portals {
    core: ModifierCore,
    portal_wall_width: f64,
    directional_offset: f64,
    directional_offset_deviation: f64,
    normal_offset: f64,
    normal_offset_deviation: f64,
    use_natural_side: bool,
    use_both_sides: bool,
    teleportation_count_threshold: u32,
    teleportations: u32,
    centers: Vec<Vector2>,
}

impl Portals {
    pub fn from_config(defaults: &Config, custom: &Config, tick_rate: f64) -> Result<Self> {
        let mut manager = ConfigManager::new();
        manager
            .register_property_config("duration", seconds_to_ticks("durationS", tick_rate), &[])
            .register_property_config(
                "portalWallWidth",
                percent_to_factor("portalWallWidthHeightPercent"),
                &[],
            )
            .register_property_config("directionalOffset", percent_to_factor("directionalOffsetPercent"), &[])
            .register_property_config(
                "directionalOffsetDeviation",
                percent_to_factor("directionalOffsetStandardDeviationPercent"),
                &[],
            )
            .register_property_config("normalOffset", percent_to_factor("normalOffsetPercent"), &[])
            .register_property_config(
                "normalOffsetDeviation",
                percent_to_factor("normalOffsetStandardDeviationPercent"),
                &[],
            );
        let settings: PortalsSettings = manager.resolve(defaults, custom)?;

        Ok(Portals {
            core: ModifierCore::time_limited(
                NAME,
                activation_mode(settings.self_activation),
                settings.duration,
            ),
            portal_wall_width: settings.portal_wall_width,
            directional_offset: settings.directional_offset,
            directional_offset_deviation: settings.directional_offset_deviation,
            normal_offset: settings.normal_offset,
            normal_offset_deviation: settings.normal_offset_deviation,
            use_natural_side: settings.use_natural_side,
            use_both_sides: settings.use_both_sides,
            teleportation_count_threshold: settings.teleportation_count_threshold.max(1),
            teleportations: 0,
            centers: Vec::new(),
        })
    }

    fn open(&mut self, game: &mut Pong) {
        let height = game.settings.arena_height;
        let width = self.portal_wall_width * height / 2.0;
        let reach = (height / 2.0 - width).max(0.0);

        let axis = Vector2::from_angle(game.rng.random() * 2.0 * PI);
        let across = Vector2::new(-axis.y, axis.x);
        let along = game
            .rng
            .random_gaussian(self.directional_offset * reach, self.directional_offset_deviation * reach)
            .clamp(0.0, reach);
        let aside = game
            .rng
            .random_gaussian(self.normal_offset * reach, self.normal_offset_deviation * reach)
            .clamp(0.0, (reach * reach - along * along).max(0.0).sqrt());

        let center = game.mode.center(&game.settings);
        let thickness = game.settings.paddle_height * 1.25;
        let offset = axis.scale(along).add(&across.scale(aside));
        self.centers = vec![center.add(&offset), center.sub(&offset)];

        let portals = self
            .centers
            .iter()
            .map(|pos| {
                let dir = Vector2::from_angle(PI / 2.0 + game.rng.random() * PI);
                let mut portal = Rectangle::new(*pos, dir, width, thickness);
                portal.do_resolve_collision = false;
                portal
            })
            .collect();
        game.world.add_unit_walls(self.id(), portals);
    }
}

impl Modifier for Portals {
    fn core(&self) -> &ModifierCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ModifierCore {
        &mut self.core
    }

    fn on_activation(&mut self, game: &mut Pong) -> Result<()> {
        self.open(game);
        Ok(())
    }

    fn on_deactivation(&mut self, game: &mut Pong) -> Result<()> {
        game.world.remove_unit_walls(self.id());
        self.centers.clear();
        game.delete_power_up(self.id(), NAME);
        Ok(())
    }

    fn on_wall_bounce(&mut self, game: &mut Pong, wall_id: usize, ball_id: usize) -> Result<()> {
        let Some(rank) = game.world.unit_wall_rank(self.id(), wall_id) else {
            return Ok(());
        };
        let Some(dst_id) = game.world.unit_wall_ids(self.id()).get(1 - rank).copied() else {
            return Ok(());
        };
        let src = game.world.walls[wall_id].clone();
        let dst = game.world.walls[dst_id].clone();
        let Some(ball) = game.world.balls.get_mut(ball_id) else {
            return Ok(());
        };

        let local = Vector2::new(ball.dir.dot(&src.dir), ball.dir.dot(&src.normal));
        let entered_front = local.y < 0.0;
        if !self.use_both_sides && !entered_front {
            resolve_collision(ball, &src.normal.scale(-1.0));
            return Ok(());
        }

        let share = (src.to_local(&ball.pos).x / (src.width / 2.0)).clamp(-1.0, 1.0);
        let exit = dst.pos.add(&dst.dir.scale(share * dst.width / 2.0));
        let out = if self.use_natural_side {
            Vector2::new(local.x, -local.y)
        } else {
            local
        };
        let side = if out.y >= 0.0 { 1.0 } else { -1.0 };

        ball.pos = exit.add(&dst.normal.scale(side * (dst.height / 2.0 + ball.radius + 10.0 * EPSILON)));
        ball.dir = dst.to_world_vector(&out).normalize();

        if ball_id == 0 {
            self.teleportations += 1;
            if self.teleportations >= self.teleportation_count_threshold {
                self.deactivate(game)?;
            }
        }
        Ok(())
    }

    fn state(&self) -> Option<Value> {
        let [p1, p2] = self.centers.as_slice() else {
            return None;
        };
        Some(json!({
            "p1": { "x": round_snapshot(p1.x), "y": round_snapshot(p1.y) },
            "p2": { "x": round_snapshot(p2.x), "y": round_snapshot(p2.y) },
        }))
    }
}
