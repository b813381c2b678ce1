use super::activation_mode;
use crate::config::{percent_to_factor, Config, ConfigManager};
use crate::error::Result;
use crate::game::Pong;
use crate::modifier::{Modifier, ModifierCore};
use crate::physics::{Rectangle, Vector2};
use crate::registry::PowerUpKind;
use log::debug;
use serde::Deserialize;
use std::f64::consts::PI;

const NAME: &str = "protectedPowerUp";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProtectedPowerUpSettings {
    self_activation: bool,
    power_up_name: String,
    power_up_radius: f64,
    well_radius: f64,
    speed_multiplier: f64,
    mean_spawn_radius: f64,
    std_dev_spawn_radius: f64,
}

/// Drops a large power-up token inside a ring of breakable walls. Every
/// wall the main ball breaks speeds it up; the unit ends once the token is
/// taken.
pub struct ProtectedPowerUp {
    core: ModifierCore,
    power_up_name: String,
    power_up_radius: f64,
    well_radius: f64,
    speed_multiplier: f64,
    mean_spawn_radius: f64,
    std_dev_spawn_radius: f64,
    token: Option<u32>,
}

impl ProtectedPowerUp {
    pub fn from_config(defaults: &Config, custom: &Config, _tick_rate: f64) -> Result<Self> {
        let mut manager = ConfigManager::new();
        manager
            .register_property_config("powerUpRadius", percent_to_factor("powerUpRadiusWidthPercent"), &[])
            .register_property_config("wellRadius", percent_to_factor("wellRadiusWidthPercent"), &[])
            .register_property_config("speedMultiplier", percent_to_factor("speedMultiplierPercent"), &[])
            .register_property_config(
                "meanSpawnRadius",
                percent_to_factor("meanSpawnRadiusHeightPercent"),
                &[],
            )
            .register_property_config(
                "stdDevSpawnRadius",
                percent_to_factor("stdDevSpawnRadiusHeightPercent"),
                &[],
            );
        let settings: ProtectedPowerUpSettings = manager.resolve(defaults, custom)?;
        PowerUpKind::from_name(&settings.power_up_name)?;

        Ok(ProtectedPowerUp {
            core: ModifierCore::new(NAME, activation_mode(settings.self_activation)),
            power_up_name: settings.power_up_name,
            power_up_radius: settings.power_up_radius,
            well_radius: settings.well_radius,
            speed_multiplier: settings.speed_multiplier,
            mean_spawn_radius: settings.mean_spawn_radius,
            std_dev_spawn_radius: settings.std_dev_spawn_radius,
            token: None,
        })
    }

    fn build_well(&mut self, game: &mut Pong) {
        let settings = &game.settings;
        let inner = self.power_up_radius * settings.arena_width / 2.0;
        let outer = self.well_radius * settings.arena_width / 2.0;
        let closest = 2.0 * outer;
        let spread = settings.arena_height / 2.0 - closest;
        // The whole ring stays clear of the outline.
        let farthest = (settings.arena_height / 2.0 - outer - settings.walls_height).max(0.0);

        let drawn = game
            .rng
            .random_gaussian(self.mean_spawn_radius * spread, self.std_dev_spawn_radius * spread);
        let distance = (closest + drawn.clamp(0.0, spread.max(0.0))).min(farthest);
        let angle = game.rng.random() * 2.0 * PI;
        let center = game
            .mode
            .center(&game.settings)
            .add(&Vector2::from_angle(angle).scale(distance));

        let count = game.player_count.max(5);
        let width = 2.0 * outer * (PI / count as f64).sin();
        let height = game.settings.paddle_height / 2.0;
        let ring = (0..count)
            .map(|index| {
                let offset = Vector2::from_angle(2.0 * PI * index as f64 / count as f64).scale(outer);
                let inward = offset.scale(-1.0).normalize();
                Rectangle::new(center.add(&offset), Vector2::new(inward.y, -inward.x), width, height)
            })
            .collect();
        game.world.add_unit_walls(self.id(), ring);

        self.token = Some(game.place_power_up(&self.power_up_name, center, inner));
        debug!("Protected {} behind {} walls", self.power_up_name, count);
    }
}

impl Modifier for ProtectedPowerUp {
    fn core(&self) -> &ModifierCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ModifierCore {
        &mut self.core
    }

    fn on_activation(&mut self, game: &mut Pong) -> Result<()> {
        self.build_well(game);
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
        game.world.walls.remove(wall_id);
        if let Some(ball) = game.world.balls.first_mut() {
            ball.speed += ball.speed * self.speed_multiplier;
        }
        Ok(())
    }

    fn on_power_up_pickup(&mut self, game: &mut Pong, _name: &str, _player_id: Option<usize>) -> Result<()> {
        match self.token {
            Some(token) if !game.modifiers.is_spawned(token) => self.deactivate(game),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::modifier::GameEvent;
    use crate::power_ups::tests::{pick_up, power_up_match};
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_token_sits_inside_its_ring() {
        let mut game = power_up_match();
        let outline = game.world.walls.len();
        let counter = game.modifiers.counter("multiBall");
        pick_up(&mut game, "protectedPowerUp");

        assert_eq!(game.world.walls.len(), outline + 5);
        let token = game.modifiers.spawned().last().unwrap().clone();
        assert_eq!(token.name, "multiBall");
        assert_approx_eq!(token.body.radius, 4.0, 1e-9);
        assert_eq!(game.modifiers.counter("multiBall"), counter + 1);
        for wall in &game.world.walls[outline..] {
            assert_approx_eq!(wall.pos.distance(&token.body.pos), 10.0, 1e-9);
            assert!(wall.pos.y > 0.0 && wall.pos.y < game.settings.arena_height);
        }
    }

    #[test]
    fn test_main_ball_breaks_ring_walls() {
        let mut game = power_up_match();
        let outline = game.world.walls.len();
        pick_up(&mut game, "protectedPowerUp");
        game.world.balls[0].speed = 1.0;

        game.trigger(GameEvent::WallBounce { wall_id: outline + 2, ball_id: 0 });
        assert_eq!(game.world.walls.len(), outline + 4);
        assert_approx_eq!(game.world.balls[0].speed, 1.05, 1e-9);

        game.trigger(GameEvent::WallBounce { wall_id: outline, ball_id: 1 });
        assert_eq!(game.world.walls.len(), outline + 4);
    }

    #[test]
    fn test_taking_the_token_ends_it() {
        let mut game = power_up_match();
        let outline = game.world.walls.len();
        pick_up(&mut game, "protectedPowerUp");

        let index = game.modifiers.spawned().len() - 1;
        game.pickup_power_up(index);
        assert!(game.modifiers.has_unit("multiBall"));
        assert!(!game.modifiers.has_unit("protectedPowerUp"));
        assert_eq!(game.world.walls.len(), outline);
        assert_eq!(game.modifiers.counter("protectedPowerUp"), 0);
    }
}
