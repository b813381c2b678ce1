use crate::config::{seconds_to_ticks, Config, ConfigManager};
use crate::error::Result;
use crate::game::Pong;
use crate::modifier::{ActivationMode, GameEvent, Modifier, ModifierCore, ModifierStatus};
use log::debug;
use serde::Deserialize;

const NAME: &str = "goalReset";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoalResetSettings {
    delay: i64,
}

/// Serves a fresh ball after every goal, holding it still for a short delay.
///
/// While the delay runs the unit sits in `Paused` and keeps the ball frozen;
/// the saved serve speed is restored once the delay is over.
pub struct GoalReset {
    core: ModifierCore,
    delay: i64,
    ticks: i64,
    ball_speed: f64,
}

impl GoalReset {
    pub fn from_config(defaults: &Config, custom: &Config, tick_rate: f64) -> Result<Self> {
        let mut manager = ConfigManager::new();
        manager.register_property_config("delay", seconds_to_ticks("delayS", tick_rate), &[]);
        let settings: GoalResetSettings = manager.resolve(defaults, custom)?;

        Ok(GoalReset {
            core: ModifierCore::new(NAME, ActivationMode::Auto),
            delay: settings.delay,
            ticks: 0,
            ball_speed: 0.0,
        })
    }

    fn reset(&mut self, game: &mut Pong) {
        self.ticks = self.delay;
        self.pause();
        game.reset_ball(None);

        if let Some(ball) = game.world.balls.first_mut() {
            self.ball_speed = ball.speed;
            ball.speed = 0.0;
        }
        debug!("Ball held for {} ticks", self.delay);
    }
}

impl Modifier for GoalReset {
    fn core(&self) -> &ModifierCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ModifierCore {
        &mut self.core
    }

    fn on_update(&mut self, game: &mut Pong) -> Result<()> {
        if self.status() != ModifierStatus::Paused {
            return Ok(());
        }

        self.ticks -= 1;
        let Some(ball) = game.world.balls.first_mut() else {
            return Ok(());
        };
        if self.ticks < 0 {
            ball.speed = self.ball_speed;
            self.resume();
        } else {
            ball.speed = 0.0;
        }
        Ok(())
    }

    fn on_goal(&mut self, game: &mut Pong, _player_id: usize) -> Result<()> {
        game.trigger(GameEvent::BallReset { ball_id: None });
        self.reset(game);
        Ok(())
    }

    fn on_ball_out_of_bounds(&mut self, game: &mut Pong, ball_id: usize) -> Result<()> {
        if ball_id != 0 {
            return Ok(());
        }
        game.trigger(GameEvent::BallReset { ball_id: Some(0) });
        self.reset(game);
        Ok(())
    }
}
