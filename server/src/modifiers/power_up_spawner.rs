use crate::config::{percent_to_factor, seconds_to_ticks, Config, ConfigManager};
use crate::error::Result;
use crate::game::Pong;
use crate::modifier::{ActivationMode, Modifier, ModifierCore, ModifierStatus};
use log::{debug, info};
use serde::Deserialize;

const NAME: &str = "powerUpSpawner";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PowerUpSpawnerSettings {
    mean_delay: i64,
    delay_span: i64,
    mayhem_chance: f64,
}

/// Drops power-ups into the arena after random delays.
///
/// Each delay is drawn from a gaussian around `meanDelayS`. Once in a while
/// a "mayhem" round spawns one of everything that still has room. When
/// nothing can spawn the spawner pauses until the distribution changes.
pub struct PowerUpSpawner {
    core: ModifierCore,
    mean_delay: f64,
    delay_span: f64,
    mayhem_chance: f64,
}

impl PowerUpSpawner {
    pub fn from_config(defaults: &Config, custom: &Config, tick_rate: f64) -> Result<Self> {
        let mut manager = ConfigManager::new();
        manager
            .register_property_config("meanDelay", seconds_to_ticks("meanDelayS", tick_rate), &[])
            .register_property_config("delaySpan", seconds_to_ticks("delaySpanS", tick_rate), &[])
            .register_property_config("mayhemChance", percent_to_factor("mayhemChancePercent"), &[]);
        let settings: PowerUpSpawnerSettings = manager.resolve(defaults, custom)?;

        Ok(PowerUpSpawner {
            core: ModifierCore::time_limited(NAME, ActivationMode::Auto, 0),
            mean_delay: settings.mean_delay as f64,
            delay_span: settings.delay_span as f64,
            mayhem_chance: settings.mayhem_chance,
        })
    }

    fn spawn_everything(game: &mut Pong) {
        let names: Vec<String> = game
            .modifiers
            .spawnable_names()
            .into_iter()
            .map(str::to_string)
            .collect();
        info!("Mayhem! Spawning {} power-ups", names.len());
        for name in names {
            game.spawn_power_up(&name);
        }
    }
}

impl Modifier for PowerUpSpawner {
    fn core(&self) -> &ModifierCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ModifierCore {
        &mut self.core
    }

    fn on_activation(&mut self, game: &mut Pong) -> Result<()> {
        let delay = game.rng.random_gaussian(self.mean_delay, self.delay_span).round();
        self.core.set_duration((delay as i64).max(1));
        Ok(())
    }

    fn on_deactivation(&mut self, game: &mut Pong) -> Result<()> {
        if game.rng.random() < self.mayhem_chance {
            Self::spawn_everything(game);
            return self.activate(game);
        }

        let spawned = game.spawn_random_power_up();
        self.activate(game)?;
        if !spawned {
            debug!("Nothing to spawn, pausing");
            self.pause();
        }
        Ok(())
    }

    fn on_cdf_computation(&mut self, game: &mut Pong) -> Result<()> {
        if !game.modifiers.cdf().is_empty() && self.status() == ModifierStatus::Paused {
            debug!("Power-ups available again, resuming");
            self.resume();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::game::Pong;
    use crate::modifier::{ModifierStatus, UnitId};
    use crate::registry::{GameRegistry, MatchConfig};
    use serde_json::json;

    fn spawner_match(mayhem_percent: f64) -> Pong {
        let mut config = MatchConfig::new("classicPong", 2);
        config.use_default_modifiers = false;
        config.seed = Some(3);
        if let serde_json::Value::Object(map) = json!({
            "powerUpSpawner": { "meanDelayS": 0.1, "delaySpanS": 0.0, "mayhemChancePercent": mayhem_percent }
        }) {
            config.modifiers = map;
        }
        let mut game = Pong::new(&GameRegistry::builtin().unwrap(), &config).unwrap();
        game.start_game();
        // Keep the ball from picking anything up.
        game.world.balls[0].do_collision = false;
        game
    }

    #[test]
    fn test_spawns_after_delay() {
        let mut game = spawner_match(0.0);
        for _ in 0..5 {
            game.update();
        }
        assert!(game.modifiers.spawned().is_empty());

        game.update();
        assert_eq!(game.modifiers.spawned().len(), 1);
    }

    #[test]
    fn test_pauses_when_full_and_resumes_on_free_slot() {
        let mut game = spawner_match(0.0);
        for _ in 0..200 {
            game.update();
        }
        // Capacities of the classic mode: 2 + 1 + 1.
        assert_eq!(game.modifiers.spawned().len(), 4);
        assert!(game.modifiers.cdf().is_empty());
        assert_eq!(game.modifiers.unit_status("powerUpSpawner"), Some(ModifierStatus::Paused));

        game.delete_power_up(UnitId(999), "speedBoost");
        assert_eq!(game.modifiers.unit_status("powerUpSpawner"), Some(ModifierStatus::Active));
    }

    #[test]
    fn test_mayhem_spawns_one_of_everything() {
        let mut game = spawner_match(100.0);
        for _ in 0..6 {
            game.update();
        }
        let mut names: Vec<_> = game.modifiers.spawned().iter().map(|p| p.name.clone()).collect();
        names.sort();
        assert_eq!(names, vec!["blinkingBall", "multiBall", "speedBoost"]);
        assert_eq!(game.modifiers.unit_status("powerUpSpawner"), Some(ModifierStatus::Active));
    }
}
