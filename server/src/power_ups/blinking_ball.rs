use super::activation_mode;
use crate::config::{number, seconds_to_ticks, Config, ConfigManager};
use crate::error::Result;
use crate::game::Pong;
use crate::modifier::{Modifier, ModifierCore, ModifierStatus};
use serde::Deserialize;
use serde_json::Value;

const NAME: &str = "blinkingBall";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BlinkingBallSettings {
    duration: i64,
    self_activation: bool,
    blink_interval: i64,
    blink_duration: f64,
}

/// Makes the main ball disappear for part of every blink interval.
pub struct BlinkingBall {
    core: ModifierCore,
    blink_interval: i64,
    blink_duration: f64,
    ball_visible: bool,
}

impl BlinkingBall {
    pub fn from_config(defaults: &Config, custom: &Config, tick_rate: f64) -> Result<Self> {
        let mut manager = ConfigManager::new();
        manager
            .register_property_config("duration", seconds_to_ticks("durationS", tick_rate), &[])
            .register_property_config("blinkInterval", seconds_to_ticks("blinkIntervalS", tick_rate), &[])
            .register_property_config(
                "blinkDuration",
                |_, context| {
                    Value::from(number(context, "blinkDurationPercent") / 100.0 * number(context, "blinkInterval"))
                },
                &["blinkInterval"],
            );
        let settings: BlinkingBallSettings = manager.resolve(defaults, custom)?;

        Ok(BlinkingBall {
            core: ModifierCore::time_limited(
                NAME,
                activation_mode(settings.self_activation),
                settings.duration,
            ),
            blink_interval: settings.blink_interval,
            blink_duration: settings.blink_duration,
            ball_visible: true,
        })
    }

    fn set_ball_visible(&mut self, game: &mut Pong, visible: bool) {
        if let Some(ball) = game.world.balls.first_mut() {
            ball.is_visible = visible;
        }
        self.ball_visible = visible;
    }
}

impl Modifier for BlinkingBall {
    fn core(&self) -> &ModifierCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ModifierCore {
        &mut self.core
    }

    fn on_update(&mut self, game: &mut Pong) -> Result<()> {
        self.tick_countdown(game)?;
        if self.status() != ModifierStatus::Active || self.blink_interval <= 0 {
            return Ok(());
        }

        let phase = self.core.ticks() % self.blink_interval;
        if !self.ball_visible && (phase as f64) < self.blink_interval as f64 - self.blink_duration {
            self.set_ball_visible(game, true);
        }
        if phase == 0 {
            self.set_ball_visible(game, false);
        }
        Ok(())
    }

    fn on_deactivation(&mut self, game: &mut Pong) -> Result<()> {
        self.set_ball_visible(game, true);
        game.delete_power_up(self.id(), NAME);
        Ok(())
    }

    fn on_goal(&mut self, game: &mut Pong, _player_id: usize) -> Result<()> {
        self.deactivate(game)
    }
}

#[cfg(test)]
mod tests {
    use crate::modifier::GameEvent;
    use crate::power_ups::tests::{park_ball, pick_up, power_up_match};

    #[test]
    fn test_ball_blinks_within_each_interval() {
        let mut game = power_up_match();
        park_ball(&mut game);
        pick_up(&mut game, "blinkingBall");

        // 0.5 s interval at 60 ticks per second, hidden for 40% of it.
        for _ in 0..29 {
            game.update();
            assert!(game.world.balls[0].is_visible);
        }
        game.update();
        assert!(!game.world.balls[0].is_visible);
        assert!(game.state_snapshot().balls.is_empty());

        for _ in 0..12 {
            game.update();
            assert!(!game.world.balls[0].is_visible);
        }
        game.update();
        assert!(game.world.balls[0].is_visible);
    }

    #[test]
    fn test_goal_restores_visibility() {
        let mut game = power_up_match();
        pick_up(&mut game, "blinkingBall");
        game.world.balls[0].is_visible = false;

        game.trigger(GameEvent::Goal { player_id: 1 });
        assert!(game.world.balls[0].is_visible);
        assert!(!game.modifiers.has_unit("blinkingBall"));
    }
}
