use super::activation_mode;
use crate::config::{percent_to_factor, seconds_to_ticks, Config, ConfigManager};
use crate::error::Result;
use crate::game::Pong;
use crate::modifier::{Modifier, ModifierCore, ModifierStatus};
use serde::Deserialize;

const NAME: &str = "speedBoost";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpeedBoostSettings {
    duration: i64,
    self_activation: bool,
    ramp_up_frequency: i64,
    ramp_up_strength: f64,
}

/// Speeds the main ball up in steps for as long as it lasts.
pub struct SpeedBoost {
    core: ModifierCore,
    ramp_up_frequency: i64,
    ramp_up_strength: f64,
}

impl SpeedBoost {
    pub fn from_config(defaults: &Config, custom: &Config, tick_rate: f64) -> Result<Self> {
        let mut manager = ConfigManager::new();
        manager
            .register_property_config("duration", seconds_to_ticks("durationS", tick_rate), &[])
            .register_property_config(
                "rampUpFrequency",
                seconds_to_ticks("rampUpFrequencyS", tick_rate),
                &[],
            )
            .register_property_config("rampUpStrength", percent_to_factor("rampUpStrengthPercent"), &[]);
        let settings: SpeedBoostSettings = manager.resolve(defaults, custom)?;

        Ok(SpeedBoost {
            core: ModifierCore::time_limited(
                NAME,
                activation_mode(settings.self_activation),
                settings.duration,
            ),
            ramp_up_frequency: settings.ramp_up_frequency,
            ramp_up_strength: settings.ramp_up_strength,
        })
    }
}

impl Modifier for SpeedBoost {
    fn core(&self) -> &ModifierCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ModifierCore {
        &mut self.core
    }

    fn on_update(&mut self, game: &mut Pong) -> Result<()> {
        self.tick_countdown(game)?;
        if self.status() != ModifierStatus::Active || self.ramp_up_frequency <= 0 {
            return Ok(());
        }

        if self.core.ticks() % self.ramp_up_frequency == 0 {
            if let Some(ball) = game.world.balls.first_mut() {
                ball.speed += self.ramp_up_strength * ball.speed;
            }
        }
        Ok(())
    }

    fn on_deactivation(&mut self, game: &mut Pong) -> Result<()> {
        game.delete_power_up(self.id(), NAME);
        Ok(())
    }

    fn on_ball_reset(&mut self, game: &mut Pong, ball_id: Option<usize>) -> Result<()> {
        // Only a reset of the main ball ends the boost.
        if matches!(ball_id, None | Some(0)) {
            self.deactivate(game)?;
        }
        Ok(())
    }
}
