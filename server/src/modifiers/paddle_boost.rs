use crate::config::{number, percent_to_factor, Config, ConfigManager};
use crate::error::Result;
use crate::game::Pong;
use crate::modifier::{ActivationMode, Modifier, ModifierCore};
use log::debug;
use pong_shared::{InputType, UserInput};
use serde::Deserialize;
use serde_json::Value;

const NAME: &str = "paddleBoost";
/// Extension travel, in percent, from fully retracted to the rest position
/// and from there to fully extended.
const MAX_DISPLACEMENT: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AnimationStatus {
    Idle,
    Extending,
    Retracting,
    Extended,
}

impl AnimationStatus {
    fn is_stable(self) -> bool {
        matches!(self, AnimationStatus::Idle | AnimationStatus::Extended)
    }
}

#[derive(Debug, Clone)]
struct PaddleAnimation {
    initial_speed: f64,
    displacement: f64,
    status: AnimationStatus,
    buffered: Option<AnimationStatus>,
    did_boost: bool,
}

impl PaddleAnimation {
    /// Applies the buffered transition if the paddle is at rest.
    fn process_buffered(&mut self) {
        if !self.status.is_stable() {
            return;
        }
        match (self.status, self.buffered.take()) {
            (AnimationStatus::Idle, Some(AnimationStatus::Extending)) => {
                self.status = AnimationStatus::Extending;
                self.did_boost = false;
            }
            (AnimationStatus::Extended, Some(AnimationStatus::Retracting)) => {
                self.status = AnimationStatus::Retracting;
            }
            _ => {}
        }
    }

    fn buffer(&mut self, status: AnimationStatus) {
        self.buffered = Some(status);
        self.process_buffered();
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PaddleBoostSettings {
    paddle_extension_length: f64,
    extended_speed_multiplier: f64,
    extension_velocity: f64,
    retraction_velocity: f64,
    extension_velocity_transmission_factor: f64,
}

/// Lets players punch their paddle forward while holding SPACE.
///
/// The punch pushes the paddle out along its normal, slows its sliding
/// while extended, and gives the ball one extra kick if it is hit during
/// the extension.
pub struct PaddleBoost {
    core: ModifierCore,
    settings: PaddleBoostSettings,
    paddles: Vec<PaddleAnimation>,
}

/// Displacement percent per tick covering the whole travel in `source`
/// seconds.
fn travel_velocity(
    source: &'static str,
    tick_rate: f64,
) -> impl Fn(&Value, &Config) -> Value + Send + Sync + 'static {
    move |_, context| {
        let ticks = number(context, source) * tick_rate;
        let full_travel = 2.0 * MAX_DISPLACEMENT;
        Value::from(if ticks > 0.0 { full_travel / ticks } else { full_travel })
    }
}

impl PaddleBoost {
    pub fn from_config(defaults: &Config, custom: &Config, tick_rate: f64) -> Result<Self> {
        let mut manager = ConfigManager::new();
        manager
            .register_property_config(
                "extendedSpeedMultiplier",
                percent_to_factor("paddleExtendedSpeedMultiplierPercent"),
                &[],
            )
            .register_property_config(
                "extensionVelocity",
                travel_velocity("paddleExtensionDurationS", tick_rate),
                &[],
            )
            .register_property_config(
                "retractionVelocity",
                travel_velocity("paddleRetractionDurationS", tick_rate),
                &[],
            )
            .register_property_config(
                "extensionVelocityTransmissionFactor",
                percent_to_factor("extensionVelocityTransmissionPercent"),
                &[],
            );

        Ok(PaddleBoost {
            core: ModifierCore::new(NAME, ActivationMode::Auto),
            settings: manager.resolve(defaults, custom)?,
            paddles: Vec::new(),
        })
    }

    /// Moves the paddle along its normal by `delta` displacement percent.
    fn push_paddle(&self, game: &mut Pong, player_id: usize, animation: &mut PaddleAnimation, delta: f64) {
        let target = (animation.displacement + delta).clamp(-MAX_DISPLACEMENT, MAX_DISPLACEMENT);
        let step = target - animation.displacement;
        animation.displacement = target;

        let Some(normal) = game.world.paddles.get(player_id).map(|p| p.body.normal) else {
            return;
        };
        let offset = normal.scale(step / 100.0 * self.settings.paddle_extension_length);
        game.world.shift_paddle(player_id, offset);
    }
}

impl Modifier for PaddleBoost {
    fn core(&self) -> &ModifierCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ModifierCore {
        &mut self.core
    }

    fn on_activation(&mut self, game: &mut Pong) -> Result<()> {
        self.paddles = game
            .world
            .paddles
            .iter()
            .map(|paddle| PaddleAnimation {
                initial_speed: paddle.speed,
                displacement: -MAX_DISPLACEMENT,
                status: AnimationStatus::Idle,
                buffered: None,
                did_boost: false,
            })
            .collect();
        Ok(())
    }

    fn on_user_input(&mut self, _game: &mut Pong, input: &UserInput) -> Result<()> {
        let Some(animation) = self.paddles.get_mut(input.player_id) else {
            return Ok(());
        };
        match input.input_type {
            InputType::Space => animation.buffer(AnimationStatus::Extending),
            InputType::StopSpace => animation.buffer(AnimationStatus::Retracting),
            _ => {}
        }
        Ok(())
    }

    fn on_paddle_update(&mut self, game: &mut Pong, player_id: usize) -> Result<()> {
        let Some(mut animation) = self.paddles.get(player_id).cloned() else {
            return Ok(());
        };
        let initial = animation.initial_speed;
        let extended = initial * self.settings.extended_speed_multiplier;

        let speed = match animation.status {
            AnimationStatus::Extending => {
                self.push_paddle(game, player_id, &mut animation, self.settings.extension_velocity);
                if animation.displacement >= MAX_DISPLACEMENT {
                    animation.status = AnimationStatus::Extended;
                    extended
                } else {
                    0.0
                }
            }
            AnimationStatus::Retracting => {
                self.push_paddle(game, player_id, &mut animation, -self.settings.retraction_velocity);
                if animation.displacement <= -MAX_DISPLACEMENT {
                    animation.status = AnimationStatus::Idle;
                    initial
                } else {
                    0.0
                }
            }
            AnimationStatus::Extended => extended,
            AnimationStatus::Idle => initial,
        };

        if let Some(paddle) = game.world.paddles.get_mut(player_id) {
            paddle.speed = speed;
        }

        animation.process_buffered();
        self.paddles[player_id] = animation;
        Ok(())
    }

    fn on_paddle_bounce(&mut self, game: &mut Pong, ball_id: usize, player_id: usize) -> Result<()> {
        let factor = self.settings.extension_velocity_transmission_factor;
        let Some(animation) = self.paddles.get_mut(player_id) else {
            return Ok(());
        };
        if animation.status != AnimationStatus::Extending || animation.did_boost {
            return Ok(());
        }

        if let Some(ball) = game.world.balls.get_mut(ball_id) {
            ball.speed *= 1.0 + factor;
            animation.did_boost = true;
            debug!("Boosted hit by player {}, ball speed {:.2}", player_id, ball.speed);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::game::tests::classic_with;
    use crate::modifier::GameEvent;
    use assert_approx_eq::assert_approx_eq;
    use pong_shared::{InputType, UserInput};
    use serde_json::json;

    fn boosted_match() -> crate::game::Pong {
        let mut game = classic_with(json!({
            "paddleBoost": {
                "paddleExtensionLength": 3.0,
                "paddleExtensionDurationS": 0.1,
                "paddleRetractionDurationS": 0.1
            }
        }));
        game.start_game();
        game
    }

    #[test]
    fn test_space_extends_then_retracts_paddle() {
        let mut game = boosted_match();
        let rest = game.world.paddles[0].body.pos;
        let initial_speed = game.world.paddles[0].speed;

        game.handle_input(UserInput::new(InputType::Space, 1, 0)).unwrap();
        game.update();
        assert_approx_eq!(game.world.paddles[0].speed, 0.0);

        for _ in 0..10 {
            game.update();
        }
        assert_approx_eq!(game.world.paddles[0].body.pos.x, rest.x + 3.0, 1e-6);
        assert_approx_eq!(game.world.paddles[0].body.pos.y, rest.y, 1e-6);
        assert_approx_eq!(game.world.paddles[0].speed, initial_speed * 0.5, 1e-9);

        game.handle_input(UserInput::new(InputType::StopSpace, 2, 0)).unwrap();
        for _ in 0..10 {
            game.update();
        }
        assert_approx_eq!(game.world.paddles[0].body.pos.x, rest.x, 1e-6);
        assert_approx_eq!(game.world.paddles[0].speed, initial_speed, 1e-9);
    }

    #[test]
    fn test_paddle_cannot_slide_while_extending() {
        let mut game = boosted_match();
        let rest = game.world.paddles[0].body.pos;

        game.handle_input(UserInput::new(InputType::Up, 1, 0)).unwrap();
        game.handle_input(UserInput::new(InputType::Space, 1, 0)).unwrap();
        game.update();
        game.update();

        assert_approx_eq!(game.world.paddles[0].body.pos.y, rest.y, 1e-9);
    }

    #[test]
    fn test_extending_paddle_boosts_ball_once() {
        let mut game = boosted_match();
        game.handle_input(UserInput::new(InputType::Space, 1, 1)).unwrap();
        game.update();
        let speed = game.world.balls[0].speed;

        game.trigger(GameEvent::PaddleBounce { ball_id: 0, player_id: 1 });
        assert_approx_eq!(game.world.balls[0].speed, speed * 1.25, 1e-9);

        game.trigger(GameEvent::PaddleBounce { ball_id: 0, player_id: 1 });
        assert_approx_eq!(game.world.balls[0].speed, speed * 1.25, 1e-9);
    }

    #[test]
    fn test_idle_paddle_does_not_boost() {
        let mut game = boosted_match();
        let speed = game.world.balls[0].speed;
        game.trigger(GameEvent::PaddleBounce { ball_id: 0, player_id: 0 });
        assert_approx_eq!(game.world.balls[0].speed, speed, 1e-9);
    }
}
