use crate::config::{seconds_to_ticks, Config, ConfigManager};
use crate::error::Result;
use crate::game::Pong;
use crate::modifier::{ActivationMode, GameEvent, Modifier, ModifierCore};
use log::debug;
use serde::Deserialize;
use serde_json::{json, Value};

const NAME: &str = "timedStart";
const COUNTDOWN_FROM: u32 = 3;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TimedStartSettings {
    step: i64,
}

/// Counts down from three before the first serve, holding the ball hidden
/// in the meantime. The current digit is published in the snapshot.
pub struct TimedStart {
    core: ModifierCore,
    digit: u32,
}

impl TimedStart {
    pub fn from_config(defaults: &Config, custom: &Config, tick_rate: f64) -> Result<Self> {
        let mut manager = ConfigManager::new();
        manager.register_property_config("step", seconds_to_ticks("stepS", tick_rate), &[]);
        let settings: TimedStartSettings = manager.resolve(defaults, custom)?;

        Ok(TimedStart {
            core: ModifierCore::time_limited(NAME, ActivationMode::Auto, settings.step),
            digit: COUNTDOWN_FROM,
        })
    }

    fn freeze_ball(game: &mut Pong) {
        if let Some(ball) = game.world.balls.first_mut() {
            ball.speed = 0.0;
            ball.is_visible = false;
        }
    }
}

impl Modifier for TimedStart {
    fn core(&self) -> &ModifierCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ModifierCore {
        &mut self.core
    }

    fn state(&self) -> Option<Value> {
        (self.digit > 0).then(|| json!({ "countdown": self.digit }))
    }

    fn on_game_start(&mut self, game: &mut Pong) -> Result<()> {
        Self::freeze_ball(game);
        Ok(())
    }

    fn on_update(&mut self, game: &mut Pong) -> Result<()> {
        Self::freeze_ball(game);
        self.tick_countdown(game)
    }

    fn on_deactivation(&mut self, game: &mut Pong) -> Result<()> {
        if self.digit > 1 {
            self.digit -= 1;
            debug!("Countdown {}", self.digit);
            return self.activate(game);
        }

        self.digit = 0;
        game.reset_ball(None);
        game.trigger(GameEvent::BallReset { ball_id: None });
        Ok(())
    }
}
