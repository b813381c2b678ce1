use crate::config::{seconds_to_ticks, Config, ConfigManager};
use crate::error::Result;
use crate::game::Pong;
use crate::modifier::{ActivationMode, Modifier, ModifierCore};
use log::debug;
use serde::Deserialize;

const NAME: &str = "paceBreaker";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PaceBreakerSettings {
    no_reset_threshold: i64,
    no_paddle_bounce_threshold: u32,
    two_paddles_bounce_threshold: u32,
}

/// Breaks up stale rallies in matches of three or more.
///
/// The main ball is redirected towards the farthest live paddle when
/// nobody touched it for a while, when it keeps bouncing between walls, or
/// when the same two paddles keep trading it back and forth.
pub struct PaceBreaker {
    core: ModifierCore,
    no_paddle_bounce_threshold: u32,
    no_paddle_bounce_count: u32,
    two_paddles_bounce_threshold: u32,
    two_paddles_bounce_count: u32,
    /// The last two distinct paddles that touched the ball.
    last_paddles: Vec<usize>,
}

impl PaceBreaker {
    pub fn from_config(defaults: &Config, custom: &Config, tick_rate: f64) -> Result<Self> {
        let mut manager = ConfigManager::new();
        manager.register_property_config(
            "noResetThreshold",
            seconds_to_ticks("noResetThresholdS", tick_rate),
            &[],
        );
        let settings: PaceBreakerSettings = manager.resolve(defaults, custom)?;

        Ok(PaceBreaker {
            core: ModifierCore::time_limited(NAME, ActivationMode::Auto, settings.no_reset_threshold),
            no_paddle_bounce_threshold: settings.no_paddle_bounce_threshold,
            no_paddle_bounce_count: 0,
            two_paddles_bounce_threshold: settings.two_paddles_bounce_threshold,
            two_paddles_bounce_count: 0,
            last_paddles: Vec::new(),
        })
    }

    fn reset_trackers(&mut self) {
        let duration = self.core.countdown.map_or(0, |c| c.duration);
        self.core.set_ticks(duration);
        self.no_paddle_bounce_count = 0;
        self.two_paddles_bounce_count = 0;
        self.last_paddles.clear();
    }

    /// Points the main ball at the farthest paddle still in play.
    fn nudge_ball(game: &mut Pong) {
        let Some(ball_pos) = game.world.balls.first().map(|b| b.pos) else {
            return;
        };

        let target = game
            .world
            .paddles
            .iter()
            .enumerate()
            .filter(|(player_id, _)| !game.is_eliminated(*player_id))
            .map(|(_, paddle)| paddle.body.pos.sub(&ball_pos))
            .max_by(|a, b| a.magnitude().total_cmp(&b.magnitude()));

        if let (Some(offset), Some(ball)) = (target, game.world.balls.first_mut()) {
            if offset.magnitude() > 0.0 {
                ball.dir = offset.normalize();
                debug!("Nudged the ball towards ({:.1}, {:.1})", offset.x, offset.y);
            }
        }
    }
}

impl Modifier for PaceBreaker {
    fn core(&self) -> &ModifierCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ModifierCore {
        &mut self.core
    }

    fn on_deactivation(&mut self, game: &mut Pong) -> Result<()> {
        Self::nudge_ball(game);
        self.reset_trackers();
        self.activate(game)
    }

    fn on_ball_reset(&mut self, _game: &mut Pong, _ball_id: Option<usize>) -> Result<()> {
        self.reset_trackers();
        Ok(())
    }

    fn on_paddle_bounce(&mut self, game: &mut Pong, _ball_id: usize, player_id: usize) -> Result<()> {
        if game.player_count < 3 {
            self.reset_trackers();
            return Ok(());
        }

        let duration = self.core.countdown.map_or(0, |c| c.duration);
        self.core.set_ticks(duration);
        self.no_paddle_bounce_count = 0;

        match self.last_paddles[..] {
            [_, last] if last == player_id => return Ok(()),
            [] | [_] => self.last_paddles.push(player_id),
            [before, _] if before == player_id => {
                // A-B-A: the same pair keeps trading the ball.
                self.two_paddles_bounce_count += 1;
                self.last_paddles.remove(0);
                self.last_paddles.push(player_id);
            }
            [_, last] => {
                self.two_paddles_bounce_count = 0;
                self.last_paddles = vec![last, player_id];
            }
            _ => self.last_paddles = vec![player_id],
        }

        if self.two_paddles_bounce_count >= self.two_paddles_bounce_threshold {
            Self::nudge_ball(game);
            self.reset_trackers();
        }
        Ok(())
    }

    fn on_wall_bounce(&mut self, game: &mut Pong, _wall_id: usize, _ball_id: usize) -> Result<()> {
        self.no_paddle_bounce_count += 1;
        if self.no_paddle_bounce_count >= self.no_paddle_bounce_threshold {
            self.deactivate(game)?;
        }
        Ok(())
    }
}
