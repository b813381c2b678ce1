//! Static catalogue of game modes, behavior units and power-ups.
//!
//! The registry is plain data: default parameter blocks keyed by name. The
//! kinds below map those names to the units compiled into the server, so an
//! unknown name is rejected before a match is ever built.

use crate::ai::AiStrategy;
use crate::config::Config;
use crate::error::{GameError, Result};
use crate::game::samplers::PlayerSampler;
use crate::game::{BallResetSampler, PowerUpPositionSampler};
use crate::modifier::Modifier;
use crate::modifiers::{
    ArenaShrink, Elimination, GoalReset, GoalTracker, IdleWallBounceAcceleration, LastHitTracker,
    PaceBreaker, PaddleBoost, PowerUpSpawner, ScoredGame, SurvivalGame, TimedGame, TimedStart,
};
use crate::power_ups::{
    BlinkingBall, Bumper, BumperShield, MultiBall, Portals, ProtectedPowerUp, Shooter, SpeedBoost, SpeedGate,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

const BUILTIN_REGISTRY: &str = include_str!("../registry/pong.json");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameModeEntry {
    pub min_players: usize,
    pub max_players: usize,
    /// Arena and physics defaults, see [`crate::game::GameSettings`].
    pub settings: Config,
    #[serde(default)]
    pub default_modifiers: Vec<String>,
    #[serde(default)]
    pub default_power_ups: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameRegistry {
    /// Ticks per second.
    pub server_tickrate_s: f64,
    pub game_modes: BTreeMap<String, GameModeEntry>,
    #[serde(default)]
    pub game_modifiers: BTreeMap<String, Config>,
    #[serde(default)]
    pub power_ups: BTreeMap<String, Config>,
    #[serde(default)]
    pub strategies: StrategyRegistry,
}

/// Parameter blocks of the named strategies, by family. A strategy without
/// a block runs on its built-in parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StrategyRegistry {
    pub ball_reset_sampler: BTreeMap<String, Config>,
    pub power_up_position_sampler: BTreeMap<String, Config>,
    pub player_sampler: BTreeMap<String, Config>,
    pub ai: BTreeMap<String, Config>,
}

impl GameRegistry {
    /// The registry shipped with the server.
    pub fn builtin() -> Result<Self> {
        let registry: GameRegistry = serde_json::from_str(BUILTIN_REGISTRY)?;
        registry.validate()?;
        Ok(registry)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let registry: GameRegistry = serde_json::from_str(&text)?;
        registry.validate()?;
        Ok(registry)
    }

    /// Checks that every name the registry mentions is backed by a unit
    /// compiled into the server.
    pub fn validate(&self) -> Result<()> {
        for name in self.game_modifiers.keys() {
            ModifierKind::from_name(name)?;
        }
        for name in self.power_ups.keys() {
            PowerUpKind::from_name(name)?;
        }

        for name in self.strategies.ball_reset_sampler.keys() {
            BallResetSampler::from_registry(name, &self.strategies)?;
        }
        for name in self.strategies.power_up_position_sampler.keys() {
            PowerUpPositionSampler::from_registry(name, &self.strategies)?;
        }
        for name in self.strategies.player_sampler.keys() {
            PlayerSampler::from_registry(name, &self.strategies)?;
        }
        for name in self.strategies.ai.keys() {
            AiStrategy::from_registry(name, &self.strategies)?;
        }

        for (mode, entry) in &self.game_modes {
            crate::game::GameMode::from_name(mode)?;
            for key in ["ballResetSampler", "powerUpPositionSampler"] {
                let Some(name) = entry.settings.get(key).and_then(|v| v.as_str()) else {
                    continue;
                };
                if key == "ballResetSampler" {
                    BallResetSampler::from_registry(name, &self.strategies)?;
                } else {
                    PowerUpPositionSampler::from_registry(name, &self.strategies)?;
                }
            }
            if entry.min_players == 0 || entry.min_players > entry.max_players {
                return Err(GameError::InvalidPlayerCount {
                    mode: mode.clone(),
                    count: entry.min_players,
                });
            }
            for name in &entry.default_modifiers {
                if !self.game_modifiers.contains_key(name) {
                    return Err(GameError::MissingRegistryEntry(name.clone()));
                }
            }
            for name in &entry.default_power_ups {
                if !self.power_ups.contains_key(name) {
                    return Err(GameError::MissingRegistryEntry(name.clone()));
                }
            }
        }
        Ok(())
    }
}

/// Every behavior unit the server knows how to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModifierKind {
    ScoredGame,
    GoalTakeTracker,
    GoalTakenTracker,
    LastHitTracker,
    GoalReset,
    Elimination,
    SurvivalGame,
    TimedGame,
    TimedStart,
    IdleWallBounceAcceleration,
    PaceBreaker,
    PaddleBoost,
    PowerUpSpawner,
    ArenaShrink,
}

impl ModifierKind {
    pub fn from_name(name: &str) -> Result<Self> {
        let kind = match name {
            "scoredGame" => ModifierKind::ScoredGame,
            "goalTakeTracker" => ModifierKind::GoalTakeTracker,
            "goalTakenTracker" => ModifierKind::GoalTakenTracker,
            "lastHitTracker" => ModifierKind::LastHitTracker,
            "goalReset" => ModifierKind::GoalReset,
            "elimination" => ModifierKind::Elimination,
            "survivalGame" => ModifierKind::SurvivalGame,
            "timedGame" => ModifierKind::TimedGame,
            "timedStart" => ModifierKind::TimedStart,
            "idleWallBounceAcceleration" => ModifierKind::IdleWallBounceAcceleration,
            "paceBreaker" => ModifierKind::PaceBreaker,
            "paddleBoost" => ModifierKind::PaddleBoost,
            "powerUpSpawner" => ModifierKind::PowerUpSpawner,
            "arenaShrink" => ModifierKind::ArenaShrink,
            other => return Err(GameError::UnknownModifier(other.to_string())),
        };
        Ok(kind)
    }

    pub fn name(&self) -> &'static str {
        match self {
            ModifierKind::ScoredGame => "scoredGame",
            ModifierKind::GoalTakeTracker => "goalTakeTracker",
            ModifierKind::GoalTakenTracker => "goalTakenTracker",
            ModifierKind::LastHitTracker => "lastHitTracker",
            ModifierKind::GoalReset => "goalReset",
            ModifierKind::Elimination => "elimination",
            ModifierKind::SurvivalGame => "survivalGame",
            ModifierKind::TimedGame => "timedGame",
            ModifierKind::TimedStart => "timedStart",
            ModifierKind::IdleWallBounceAcceleration => "idleWallBounceAcceleration",
            ModifierKind::PaceBreaker => "paceBreaker",
            ModifierKind::PaddleBoost => "paddleBoost",
            ModifierKind::PowerUpSpawner => "powerUpSpawner",
            ModifierKind::ArenaShrink => "arenaShrink",
        }
    }

    /// Dispatch order inside a match. Bookkeeping runs before the rules that
    /// read it, spawners run last.
    pub fn priority(&self) -> u8 {
        match self {
            ModifierKind::GoalTakeTracker | ModifierKind::GoalTakenTracker | ModifierKind::LastHitTracker => 0,
            ModifierKind::PowerUpSpawner => 2,
            _ => 1,
        }
    }

    pub fn build(&self, defaults: &Config, custom: &Config, tick_rate: f64) -> Result<Box<dyn Modifier>> {
        let unit: Box<dyn Modifier> = match self {
            ModifierKind::ScoredGame => Box::new(ScoredGame::from_config(defaults, custom)?),
            ModifierKind::GoalTakeTracker => Box::new(GoalTracker::new("goalTakeTracker")),
            ModifierKind::GoalTakenTracker => Box::new(GoalTracker::new("goalTakenTracker")),
            ModifierKind::LastHitTracker => Box::new(LastHitTracker::new()),
            ModifierKind::GoalReset => Box::new(GoalReset::from_config(defaults, custom, tick_rate)?),
            ModifierKind::Elimination => Box::new(Elimination::from_config(defaults, custom)?),
            ModifierKind::SurvivalGame => Box::new(SurvivalGame::new()),
            ModifierKind::TimedGame => Box::new(TimedGame::from_config(defaults, custom, tick_rate)?),
            ModifierKind::TimedStart => Box::new(TimedStart::from_config(defaults, custom, tick_rate)?),
            ModifierKind::IdleWallBounceAcceleration => {
                Box::new(IdleWallBounceAcceleration::from_config(defaults, custom)?)
            }
            ModifierKind::PaceBreaker => Box::new(PaceBreaker::from_config(defaults, custom, tick_rate)?),
            ModifierKind::PaddleBoost => Box::new(PaddleBoost::from_config(defaults, custom, tick_rate)?),
            ModifierKind::PowerUpSpawner => Box::new(PowerUpSpawner::from_config(defaults, custom, tick_rate)?),
            ModifierKind::ArenaShrink => Box::new(ArenaShrink::new()),
        };
        Ok(unit)
    }
}

/// Every power-up the server knows how to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerUpKind {
    SpeedBoost,
    MultiBall,
    BlinkingBall,
    Bumper,
    BumperShield,
    Portals,
    ProtectedPowerUp,
    Shooter,
    SpeedGate,
}

impl PowerUpKind {
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "speedBoost" => Ok(PowerUpKind::SpeedBoost),
            "multiBall" => Ok(PowerUpKind::MultiBall),
            "blinkingBall" => Ok(PowerUpKind::BlinkingBall),
            "bumper" => Ok(PowerUpKind::Bumper),
            "bumperShield" => Ok(PowerUpKind::BumperShield),
            "portals" => Ok(PowerUpKind::Portals),
            "protectedPowerUp" => Ok(PowerUpKind::ProtectedPowerUp),
            "shooter" => Ok(PowerUpKind::Shooter),
            "speedGate" => Ok(PowerUpKind::SpeedGate),
            other => Err(GameError::UnknownPowerUp(other.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PowerUpKind::SpeedBoost => "speedBoost",
            PowerUpKind::MultiBall => "multiBall",
            PowerUpKind::BlinkingBall => "blinkingBall",
            PowerUpKind::Bumper => "bumper",
            PowerUpKind::BumperShield => "bumperShield",
            PowerUpKind::Portals => "portals",
            PowerUpKind::ProtectedPowerUp => "protectedPowerUp",
            PowerUpKind::Shooter => "shooter",
            PowerUpKind::SpeedGate => "speedGate",
        }
    }

    pub fn build(&self, defaults: &Config, custom: &Config, tick_rate: f64) -> Result<Box<dyn Modifier>> {
        let unit: Box<dyn Modifier> = match self {
            PowerUpKind::SpeedBoost => Box::new(SpeedBoost::from_config(defaults, custom, tick_rate)?),
            PowerUpKind::MultiBall => Box::new(MultiBall::from_config(defaults, custom, tick_rate)?),
            PowerUpKind::BlinkingBall => Box::new(BlinkingBall::from_config(defaults, custom, tick_rate)?),
            PowerUpKind::Bumper => Box::new(Bumper::from_config(defaults, custom, tick_rate)?),
            PowerUpKind::BumperShield => Box::new(BumperShield::from_config(defaults, custom, tick_rate)?),
            PowerUpKind::Portals => Box::new(Portals::from_config(defaults, custom, tick_rate)?),
            PowerUpKind::ProtectedPowerUp => Box::new(ProtectedPowerUp::from_config(defaults, custom, tick_rate)?),
            PowerUpKind::Shooter => Box::new(Shooter::from_config(defaults, custom, tick_rate)?),
            PowerUpKind::SpeedGate => Box::new(SpeedGate::from_config(defaults, custom, tick_rate)?),
        };
        Ok(unit)
    }
}

fn default_true() -> bool {
    true
}

/// What a single match is made of: its mode, its seats and the units enabled
/// on top of (or instead of) the mode defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchConfig {
    pub mode: String,
    pub player_count: usize,
    #[serde(default = "default_true")]
    pub use_default_modifiers: bool,
    /// Extra units, each with its custom parameter block.
    #[serde(default)]
    pub modifiers: Config,
    #[serde(default = "default_true")]
    pub use_default_power_ups: bool,
    #[serde(default)]
    pub power_ups: Config,
    /// Overrides of the mode settings.
    #[serde(default)]
    pub mode_config: Config,
    #[serde(default)]
    pub seed: Option<u64>,
}

impl MatchConfig {
    pub fn new(mode: impl Into<String>, player_count: usize) -> Self {
        MatchConfig {
            mode: mode.into(),
            player_count,
            use_default_modifiers: true,
            modifiers: Config::new(),
            use_default_power_ups: true,
            power_ups: Config::new(),
            mode_config: Config::new(),
            seed: None,
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn enabled_modifiers(&self, defaults: &[String]) -> Vec<String> {
        enabled(self.use_default_modifiers, defaults, &self.modifiers)
    }

    pub fn enabled_power_ups(&self, defaults: &[String]) -> Vec<String> {
        enabled(self.use_default_power_ups, defaults, &self.power_ups)
    }
}

fn enabled(use_defaults: bool, defaults: &[String], extra: &Config) -> Vec<String> {
    let mut names: Vec<String> = if use_defaults { defaults.to_vec() } else { Vec::new() };
    for name in extra.keys() {
        if !names.contains(name) {
            names.push(name.clone());
        }
    }
    names
}
