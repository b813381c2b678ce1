//! Behavior-unit contract.
//!
//! Every game rule, arena effect and power-up is a [`Modifier`]: a small
//! state machine with a lifecycle and a set of event hooks. Hooks default to
//! doing nothing, so a unit only implements the events it cares about. The
//! match never knows what a unit does; it only fires [`GameEvent`]s.

use crate::error::Result;
use crate::game::Pong;
use pong_shared::UserInput;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModifierStatus {
    Inactive,
    Paused,
    Active,
}

/// Whether a unit is activated by the match or activates itself later.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationMode {
    Auto,
    SelfActivated,
}

/// Stable handle of a unit inside one match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize)]
pub struct UnitId(pub u32);

/// Tick budget of a time-limited unit. A non-positive `duration` never
/// expires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Countdown {
    pub ticks: i64,
    pub duration: i64,
}

/// State shared by every unit.
#[derive(Debug, Clone)]
pub struct ModifierCore {
    pub id: UnitId,
    pub name: &'static str,
    pub status: ModifierStatus,
    pub activation_mode: ActivationMode,
    /// Player the unit is bound to, for units picked up by someone.
    pub player_id: Option<usize>,
    pub countdown: Option<Countdown>,
}

impl ModifierCore {
    pub fn new(name: &'static str, activation_mode: ActivationMode) -> Self {
        ModifierCore {
            id: UnitId::default(),
            name,
            status: ModifierStatus::Inactive,
            activation_mode,
            player_id: None,
            countdown: None,
        }
    }

    pub fn time_limited(name: &'static str, activation_mode: ActivationMode, duration: i64) -> Self {
        ModifierCore {
            countdown: Some(Countdown { ticks: 0, duration }),
            ..ModifierCore::new(name, activation_mode)
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == ModifierStatus::Active
    }

    pub fn set_duration(&mut self, duration: i64) {
        let countdown = self.countdown.get_or_insert_with(Countdown::default);
        countdown.duration = duration;
    }

    pub fn ticks(&self) -> i64 {
        self.countdown.map_or(0, |c| c.ticks)
    }

    pub fn set_ticks(&mut self, ticks: i64) {
        let countdown = self.countdown.get_or_insert_with(Countdown::default);
        countdown.ticks = ticks;
    }
}

/// Everything a unit can react to.
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    GameStart,
    Update,
    PaddleUpdate { player_id: usize },
    UserInput(UserInput),
    Goal { player_id: usize },
    PaddleBounce { ball_id: usize, player_id: usize },
    WallBounce { wall_id: usize, ball_id: usize },
    PlayerElimination { player_id: usize },
    ResultUpdate { player_id: usize },
    ArenaModification,
    /// `None` resets every ball.
    BallReset { ball_id: Option<usize> },
    BallOutOfBounds { ball_id: usize },
    PowerUpSpawn { power_up_id: u32 },
    FailedPowerUpSpawn { reason: String },
    PowerUpPickup { name: String, player_id: Option<usize> },
    CdfComputation,
}

impl GameEvent {
    pub fn name(&self) -> &'static str {
        match self {
            GameEvent::GameStart => "onGameStart",
            GameEvent::Update => "onUpdate",
            GameEvent::PaddleUpdate { .. } => "onPaddleUpdate",
            GameEvent::UserInput(_) => "onUserInput",
            GameEvent::Goal { .. } => "onGoal",
            GameEvent::PaddleBounce { .. } => "onPaddleBounce",
            GameEvent::WallBounce { .. } => "onWallBounce",
            GameEvent::PlayerElimination { .. } => "onPlayerElimination",
            GameEvent::ResultUpdate { .. } => "onResultUpdate",
            GameEvent::ArenaModification => "onArenaModification",
            GameEvent::BallReset { .. } => "onBallReset",
            GameEvent::BallOutOfBounds { .. } => "onBallOutOfBounds",
            GameEvent::PowerUpSpawn { .. } => "onPowerUpSpawn",
            GameEvent::FailedPowerUpSpawn { .. } => "onFailedPowerUpSpawn",
            GameEvent::PowerUpPickup { .. } => "onPowerUpPickup",
            GameEvent::CdfComputation => "onCDFComputation",
        }
    }
}

pub trait Modifier: Send {
    fn core(&self) -> &ModifierCore;
    fn core_mut(&mut self) -> &mut ModifierCore;

    fn id(&self) -> UnitId {
        self.core().id
    }

    fn name(&self) -> &'static str {
        self.core().name
    }

    fn status(&self) -> ModifierStatus {
        self.core().status
    }

    fn activation_mode(&self) -> ActivationMode {
        self.core().activation_mode
    }

    /// Marks the unit active, runs its activation hook and arms the
    /// countdown of time-limited units.
    fn activate(&mut self, game: &mut Pong) -> Result<()> {
        self.core_mut().status = ModifierStatus::Active;
        self.on_activation(game)?;
        if let Some(countdown) = self.core_mut().countdown.as_mut() {
            countdown.ticks = countdown.duration;
        }
        Ok(())
    }

    /// Runs the deactivation hook once; deactivating an inactive unit does
    /// nothing.
    fn deactivate(&mut self, game: &mut Pong) -> Result<()> {
        if self.status() == ModifierStatus::Inactive {
            return Ok(());
        }
        self.core_mut().status = ModifierStatus::Inactive;
        self.on_deactivation(game)
    }

    /// Only an active unit can be paused.
    fn pause(&mut self) {
        if self.status() == ModifierStatus::Active {
            self.core_mut().status = ModifierStatus::Paused;
        }
    }

    /// Only a paused unit can be resumed.
    fn resume(&mut self) {
        if self.status() == ModifierStatus::Paused {
            self.core_mut().status = ModifierStatus::Active;
        }
    }

    /// One step of the countdown. Deactivates the unit on the tick the
    /// countdown reaches zero.
    fn tick_countdown(&mut self, game: &mut Pong) -> Result<()> {
        if self.status() != ModifierStatus::Active {
            return Ok(());
        }

        let expired = match self.core_mut().countdown.as_mut() {
            Some(countdown) if countdown.duration > 0 => {
                countdown.ticks -= 1;
                countdown.ticks <= 0
            }
            _ => false,
        };

        if expired {
            self.deactivate(game)?;
        }
        Ok(())
    }

    /// Extra state published in the snapshot under the unit's name.
    fn state(&self) -> Option<Value> {
        None
    }

    fn on_activation(&mut self, _game: &mut Pong) -> Result<()> {
        Ok(())
    }

    fn on_deactivation(&mut self, _game: &mut Pong) -> Result<()> {
        Ok(())
    }

    fn on_update(&mut self, game: &mut Pong) -> Result<()> {
        self.tick_countdown(game)
    }

    fn on_game_start(&mut self, _game: &mut Pong) -> Result<()> {
        Ok(())
    }

    fn on_paddle_update(&mut self, _game: &mut Pong, _player_id: usize) -> Result<()> {
        Ok(())
    }

    fn on_user_input(&mut self, _game: &mut Pong, _input: &UserInput) -> Result<()> {
        Ok(())
    }

    fn on_goal(&mut self, _game: &mut Pong, _player_id: usize) -> Result<()> {
        Ok(())
    }

    fn on_paddle_bounce(&mut self, _game: &mut Pong, _ball_id: usize, _player_id: usize) -> Result<()> {
        Ok(())
    }

    fn on_wall_bounce(&mut self, _game: &mut Pong, _wall_id: usize, _ball_id: usize) -> Result<()> {
        Ok(())
    }

    fn on_player_elimination(&mut self, _game: &mut Pong, _player_id: usize) -> Result<()> {
        Ok(())
    }

    fn on_result_update(&mut self, _game: &mut Pong, _player_id: usize) -> Result<()> {
        Ok(())
    }

    fn on_arena_modification(&mut self, _game: &mut Pong) -> Result<()> {
        Ok(())
    }

    fn on_ball_reset(&mut self, _game: &mut Pong, _ball_id: Option<usize>) -> Result<()> {
        Ok(())
    }

    fn on_ball_out_of_bounds(&mut self, _game: &mut Pong, _ball_id: usize) -> Result<()> {
        Ok(())
    }

    fn on_power_up_spawn(&mut self, _game: &mut Pong, _power_up_id: u32) -> Result<()> {
        Ok(())
    }

    fn on_failed_power_up_spawn(&mut self, _game: &mut Pong, _reason: &str) -> Result<()> {
        Ok(())
    }

    fn on_power_up_pickup(&mut self, _game: &mut Pong, _name: &str, _player_id: Option<usize>) -> Result<()> {
        Ok(())
    }

    fn on_cdf_computation(&mut self, _game: &mut Pong) -> Result<()> {
        Ok(())
    }

    /// Routes an event to its hook.
    fn handle_event(&mut self, game: &mut Pong, event: &GameEvent) -> Result<()> {
        match event {
            GameEvent::GameStart => self.on_game_start(game),
            GameEvent::Update => self.on_update(game),
            GameEvent::PaddleUpdate { player_id } => self.on_paddle_update(game, *player_id),
            GameEvent::UserInput(input) => self.on_user_input(game, input),
            GameEvent::Goal { player_id } => self.on_goal(game, *player_id),
            GameEvent::PaddleBounce { ball_id, player_id } => {
                self.on_paddle_bounce(game, *ball_id, *player_id)
            }
            GameEvent::WallBounce { wall_id, ball_id } => self.on_wall_bounce(game, *wall_id, *ball_id),
            GameEvent::PlayerElimination { player_id } => self.on_player_elimination(game, *player_id),
            GameEvent::ResultUpdate { player_id } => self.on_result_update(game, *player_id),
            GameEvent::ArenaModification => self.on_arena_modification(game),
            GameEvent::BallReset { ball_id } => self.on_ball_reset(game, *ball_id),
            GameEvent::BallOutOfBounds { ball_id } => self.on_ball_out_of_bounds(game, *ball_id),
            GameEvent::PowerUpSpawn { power_up_id } => self.on_power_up_spawn(game, *power_up_id),
            GameEvent::FailedPowerUpSpawn { reason } => self.on_failed_power_up_spawn(game, reason),
            GameEvent::PowerUpPickup { name, player_id } => {
                self.on_power_up_pickup(game, name, *player_id)
            }
            GameEvent::CdfComputation => self.on_cdf_computation(game),
        }
    }
}
