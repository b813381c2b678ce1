//! Computer-controlled players.
//!
//! An AI only sees the match once per planning period. Its strategy turns
//! the predicted crossings of the main ball into waypoints, paddle
//! displacements to reach by a given tick, and the opponent schedules the
//! key presses that get there, the same way a human would send them.

use crate::config::{percent_to_factor, Config, ConfigManager};
use crate::error::{GameError, Result};
use crate::game::{GameStatus, Paddle, PredictedCollision, Pong};
use crate::physics::Vector2;
use crate::registry::StrategyRegistry;
use crate::rng::Rng;
use crate::utils::get_timestamp;
use log::debug;
use pong_shared::{InputType, UserInput};
use serde::Deserialize;

/// How far ahead, in seconds, the naive AI looks for a ball crossing its goal.
pub const LOOKAHEAD_S: f64 = 3.0;

/// Seconds between two plans.
pub const PLANNING_PERIOD_S: f64 = 1.0;

/// Displacement to reach by `tick`, an absolute match tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Waypoint {
    pub tick: u64,
    pub displacement: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImprovedNaiveParams {
    /// Share of the paddle coverage treated as already in place.
    pub width_factor: f64,
    /// Share of the time before the first crossing a detour to the rest
    /// position may take.
    pub idle_margin: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForesightParams {
    pub width_factor: f64,
    pub look_ahead_time_s: f64,
    /// Crossings further away than this leave the paddle at rest.
    pub idle_threshold_s: f64,
    /// Delay after the last crossing before moving back towards the middle.
    pub preparation_time_s: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AiStrategy {
    /// Leaves for every crossing as soon as the previous one is played.
    Naive,
    /// Short look-ahead, tolerant of near misses, rests between crossings.
    ImprovedNaive(ImprovedNaiveParams),
    /// Long look-ahead, drops crossings it cannot reach in time.
    Foresight(ForesightParams),
    /// Wanders to random displacements.
    Random,
}

impl AiStrategy {
    pub fn from_registry(name: &str, strategies: &StrategyRegistry) -> Result<Self> {
        let block = strategies.ai.get(name).cloned().unwrap_or_default();
        match name {
            "naive" => Ok(AiStrategy::Naive),
            "random" => Ok(AiStrategy::Random),
            "improvedNaive" => {
                let mut manager = ConfigManager::new();
                manager
                    .register_property_config("widthFactor", percent_to_factor("widthPercentFactor"), &[])
                    .register_property_config("idleMargin", percent_to_factor("idleMarginPercent"), &[]);
                Ok(AiStrategy::ImprovedNaive(manager.resolve(&block, &Config::new())?))
            }
            "foresight" => {
                let mut manager = ConfigManager::new();
                manager.register_property_config("widthFactor", percent_to_factor("widthPercentFactor"), &[]);
                Ok(AiStrategy::Foresight(manager.resolve(&block, &Config::new())?))
            }
            other => Err(GameError::UnknownStrategy(other.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AiStrategy::Naive => "naive",
            AiStrategy::ImprovedNaive(_) => "improvedNaive",
            AiStrategy::Foresight(_) => "foresight",
            AiStrategy::Random => "random",
        }
    }

    /// Waypoints for `player_id` in chronological order.
    pub fn waypoints(&self, game: &Pong, player_id: usize, rng: &mut Rng) -> Vec<Waypoint> {
        let Some(paddle) = game.world.paddles.get(player_id) else {
            return Vec::new();
        };
        let now = game.tick;
        let goal = game.mode.own_goal_wall(player_id);
        let ticks = |seconds: f64| (seconds * game.tick_rate).round().max(0.0) as u64;
        let rest = Waypoint {
            tick: now,
            displacement: 0.0,
        };

        match self {
            AiStrategy::Naive => {
                let collisions = game.find_next_collisions(ticks(LOOKAHEAD_S) as u32, goal);
                if collisions.is_empty() {
                    return vec![rest];
                }
                let mut leave = now;
                collisions
                    .iter()
                    .map(|collision| {
                        let waypoint = Waypoint {
                            tick: leave,
                            displacement: reach(paddle, &collision.position),
                        };
                        leave = now + collision.tick as u64;
                        waypoint
                    })
                    .collect()
            }
            AiStrategy::ImprovedNaive(params) => improved_naive(params, game, paddle, goal),
            AiStrategy::Foresight(params) => {
                let collisions = game.find_next_collisions(ticks(params.look_ahead_time_s) as u32, goal);
                match collisions.first() {
                    Some(first) if (first.tick as u64) <= ticks(params.idle_threshold_s) => {
                        foresight(params, now, paddle, &collisions, ticks(params.preparation_time_s))
                    }
                    _ => vec![rest],
                }
            }
            AiStrategy::Random => {
                let displacement = rng.random_sign(0.5) * rng.random() * paddle.max_displacement;
                let delay = rng.random_int(0, 999) as f64 / 1000.0;
                vec![Waypoint {
                    tick: now + ticks(delay),
                    displacement,
                }]
            }
        }
    }
}

/// Displacement that puts the paddle center in line with `point`.
fn reach(paddle: &Paddle, point: &Vector2) -> f64 {
    let offset = point.sub(&paddle.body.pos).dot(&paddle.body.dir);
    (paddle.displacement + offset / paddle.amplitude * 100.0).clamp(-paddle.max_displacement, paddle.max_displacement)
}

/// Ticks needed to travel `distance` percent of the track.
fn travel_ticks(paddle: &Paddle, distance: f64) -> u64 {
    if paddle.speed > 0.0 {
        (distance.abs() / paddle.speed).round() as u64
    } else {
        0
    }
}

fn improved_naive(params: &ImprovedNaiveParams, game: &Pong, paddle: &Paddle, goal: usize) -> Vec<Waypoint> {
    let now = game.tick;
    let collisions = game.find_next_collisions(game.tick_rate.round() as u32, goal);
    let Some(first) = collisions.first() else {
        return vec![Waypoint {
            tick: now,
            displacement: 0.0,
        }];
    };

    let tolerance = paddle.coverage * params.width_factor / 2.0;
    let mut waypoints: Vec<Waypoint> = collisions
        .iter()
        .map(|collision| {
            let target = reach(paddle, &collision.position);
            let gap = target - paddle.displacement;
            // Stop as soon as the crossing is under the paddle.
            let displacement = if gap.abs() <= tolerance {
                paddle.displacement
            } else {
                target - gap.signum() * tolerance
            };
            Waypoint {
                tick: now + collision.tick as u64,
                displacement,
            }
        })
        .collect();

    if paddle.displacement != 0.0 {
        let to_rest = travel_ticks(paddle, paddle.displacement);
        let from_rest = travel_ticks(paddle, waypoints[0].displacement) + 1;
        if ((to_rest + from_rest) as f64) < params.idle_margin * first.tick as f64 {
            waypoints.insert(
                0,
                Waypoint {
                    tick: now + to_rest,
                    displacement: 0.0,
                },
            );
        }
    }

    if let Some(last) = waypoints.last().copied() {
        waypoints.push(Waypoint {
            tick: last.tick + travel_ticks(paddle, last.displacement) + 1,
            displacement: 0.0,
        });
    }
    waypoints
}

fn foresight(
    params: &ForesightParams,
    now: u64,
    paddle: &Paddle,
    collisions: &[PredictedCollision],
    preparation: u64,
) -> Vec<Waypoint> {
    let tolerance = paddle.coverage * params.width_factor / 2.0;
    // Projections start from the rest position so moving paddles plan alike.
    let rest = paddle
        .body
        .pos
        .sub(&paddle.body.dir.scale(paddle.displacement * paddle.amplitude / 100.0));
    let mut waypoints: Vec<Waypoint> = Vec::new();

    for (index, collision) in collisions.iter().enumerate() {
        let tick = now + collision.tick as u64;
        let projected = collision.position.sub(&rest).dot(&paddle.body.dir) / paddle.amplitude * 100.0;
        let mut displacement = projected.clamp(-paddle.max_displacement, paddle.max_displacement);
        if (displacement - paddle.displacement).abs() <= tolerance {
            displacement = paddle.displacement;
        }

        let reachable = match waypoints.last() {
            None => true,
            Some(previous) => {
                tick.saturating_sub(previous.tick) > travel_ticks(paddle, displacement - previous.displacement)
            }
        };
        if reachable {
            waypoints.push(Waypoint { tick, displacement });
        }

        if index == collisions.len() - 1 {
            let prepared = (displacement * 0.5 - displacement.signum() * 0.3)
                .clamp(-paddle.max_displacement, paddle.max_displacement);
            waypoints.push(Waypoint {
                tick: tick + preparation,
                displacement: prepared,
            });
        }
    }
    waypoints
}

#[derive(Debug, Clone)]
pub struct AiOpponent {
    pub player_id: usize,
    pub strategy: AiStrategy,
    rng: Rng,
    /// Inputs waiting for their tick, in planning order.
    schedule: Vec<(u64, InputType)>,
}

impl AiOpponent {
    pub fn new(player_id: usize) -> Self {
        Self {
            player_id,
            strategy: AiStrategy::Naive,
            rng: Rng::from_entropy(),
            schedule: Vec::new(),
        }
    }

    pub fn with_strategy(mut self, strategy: AiStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Replaces the schedule with a fresh plan for the current state.
    pub fn plan(&mut self, game: &Pong) {
        self.schedule.clear();
        if game.status != GameStatus::Running || game.is_eliminated(self.player_id) {
            return;
        }
        let Some(paddle) = game.world.paddles.get(self.player_id) else {
            return;
        };

        let now = game.tick;
        self.schedule.push((now, InputType::StopUp));
        self.schedule.push((now, InputType::StopDown));

        let waypoints = self.strategy.waypoints(game, self.player_id, &mut self.rng);
        let mut position = paddle.displacement;
        let mut free_at = now;
        for waypoint in &waypoints {
            let delta = waypoint.displacement - position;
            let hold = travel_ticks(paddle, delta);
            if hold == 0 {
                continue;
            }
            let (press, release) = if delta > 0.0 {
                (InputType::Up, InputType::StopUp)
            } else {
                (InputType::Down, InputType::StopDown)
            };
            let start = waypoint.tick.saturating_sub(hold).max(free_at);
            self.schedule.push((start, press));
            self.schedule.push((start + hold, release));
            free_at = start + hold;
            position = waypoint.displacement;
        }

        debug!(
            "AI {} ({}) planned {} waypoints, last at {:.1}",
            self.player_id,
            self.strategy.name(),
            waypoints.len(),
            position
        );
    }

    /// Removes and returns every input due at or before `tick`.
    pub fn due_inputs(&mut self, tick: u64) -> Vec<UserInput> {
        let timestamp = get_timestamp();
        let player_id = self.player_id;
        let mut due = Vec::new();
        self.schedule.retain(|&(at, input_type)| {
            if at <= tick {
                due.push(UserInput::new(input_type, timestamp, player_id));
                false
            } else {
                true
            }
        });
        due
    }

    pub fn pending(&self) -> usize {
        self.schedule.len()
    }
}
