use crate::config::{seconds_to_ticks, Config, ConfigManager};
use crate::error::Result;
use crate::game::Pong;
use crate::modifier::{ActivationMode, Modifier, ModifierCore};
use log::info;
use serde::Deserialize;

const NAME: &str = "timedGame";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TimedGameSettings {
    duration: i64,
}

/// Ends the match when its clock runs out.
pub struct TimedGame {
    core: ModifierCore,
}

impl TimedGame {
    pub fn from_config(defaults: &Config, custom: &Config, tick_rate: f64) -> Result<Self> {
        let mut manager = ConfigManager::new();
        manager.register_property_config("duration", seconds_to_ticks("durationS", tick_rate), &[]);
        let settings: TimedGameSettings = manager.resolve(defaults, custom)?;

        Ok(TimedGame {
            core: ModifierCore::time_limited(NAME, ActivationMode::Auto, settings.duration),
        })
    }
}

impl Modifier for TimedGame {
    fn core(&self) -> &ModifierCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ModifierCore {
        &mut self.core
    }

    fn on_deactivation(&mut self, game: &mut Pong) -> Result<()> {
        info!("Time is up after {} ticks", game.tick);
        game.finish();
        game.remove_modifier(self.id());
        Ok(())
    }
}
