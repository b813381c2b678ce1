//! Authoritative match state.
//!
//! [`Pong`] owns everything about one match and advances it one tick at a
//! time. Rules live in behavior units; this module only moves things, detects
//! contacts and fires the matching [`GameEvent`]s.

pub mod mode;
pub mod samplers;
pub mod settings;
pub mod world;

use crate::client_manager::InputQueue;
use crate::config::Config;
use crate::error::{GameError, Result};
use crate::modifier::{ActivationMode, GameEvent, Modifier, ModifierStatus, UnitId};
use crate::modifier_manager::ModifierManager;
use crate::physics::{detect_collision, Ball, CollisionKind, Vector2, EPSILON};
use crate::registry::{GameRegistry, MatchConfig, ModifierKind};
use crate::rng::Rng;
use log::{debug, info, warn};
use pong_shared::{
    round_snapshot, BallState, GameStateSnapshot, InputType, PaddleState, PowerUpState, UserInput,
    WallState,
};
use serde_json::Value;

pub use mode::GameMode;
pub use samplers::{BallResetSampler, PlayerSampler, PowerUpPositionSampler, SampleContext};
pub use settings::GameSettings;
pub use world::{Contact, KeyState, Paddle, World};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameStatus {
    Created,
    Running,
    Paused,
    Finished,
}

/// Where and when the main ball is expected to touch a wall.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PredictedCollision {
    /// Ticks from now.
    pub tick: u32,
    pub position: Vector2,
    pub normal: Vector2,
}

pub struct Pong {
    pub mode: GameMode,
    pub settings: GameSettings,
    /// Ticks per second.
    pub tick_rate: f64,
    pub status: GameStatus,
    pub tick: u64,
    pub world: World,
    pub rng: Rng,
    pub player_count: usize,
    pub scores: Vec<i64>,
    /// Finish rank per player, 0 while still playing.
    pub results: Vec<u32>,
    /// Eliminated players, in elimination order.
    pub eliminated: Vec<usize>,
    pub last_hit: Option<usize>,
    pub last_goal: Option<usize>,
    pub modifiers: ModifierManager,
    pub inputs: InputQueue,
    pub ball_reset_sampler: BallResetSampler,
    pub power_up_sampler: PowerUpPositionSampler,
}

impl Pong {
    /// Builds a match from the registry. Every name in `config` must be
    /// known, and every unit's parameters must resolve.
    pub fn new(registry: &GameRegistry, config: &MatchConfig) -> Result<Self> {
        let mode = GameMode::from_name(&config.mode)?;
        let entry = registry
            .game_modes
            .get(&config.mode)
            .ok_or_else(|| GameError::MissingRegistryEntry(config.mode.clone()))?;

        let player_count = config.player_count;
        if player_count < entry.min_players || player_count > entry.max_players {
            return Err(GameError::InvalidPlayerCount {
                mode: config.mode.clone(),
                count: player_count,
            });
        }

        let tick_rate = registry.server_tickrate_s;
        let settings = GameSettings::resolve(&entry.settings, &config.mode_config, tick_rate)?;
        let ball_reset_sampler = BallResetSampler::from_registry(&settings.ball_reset_sampler, &registry.strategies)?;
        let power_up_sampler =
            PowerUpPositionSampler::from_registry(&settings.power_up_position_sampler, &registry.strategies)?;

        let mut modifiers = ModifierManager::new(tick_rate, settings.power_up_radius);

        let mut units: Vec<(ModifierKind, Box<dyn Modifier>)> = Vec::new();
        for name in config.enabled_modifiers(&entry.default_modifiers) {
            let kind = ModifierKind::from_name(&name)?;
            let defaults = registry
                .game_modifiers
                .get(&name)
                .ok_or_else(|| GameError::MissingRegistryEntry(name.clone()))?;
            let unit = kind.build(defaults, &custom_block(&config.modifiers, &name), tick_rate)?;
            units.push((kind, unit));
        }
        units.sort_by_key(|(kind, _)| kind.priority());
        for (_, unit) in units {
            modifiers.add_unit(unit);
        }

        for name in config.enabled_power_ups(&entry.default_power_ups) {
            let kind = crate::registry::PowerUpKind::from_name(&name)?;
            let defaults = registry
                .power_ups
                .get(&name)
                .ok_or_else(|| GameError::MissingRegistryEntry(name.clone()))?;
            let custom = custom_block(&config.power_ups, &name);
            // Resolve once so broken parameters fail here rather than on pickup.
            kind.build(defaults, &custom, tick_rate)?;

            let capacity = settings.power_up_capacities.get(&name).copied();
            modifiers.register_power_up(&name, kind, defaults.clone(), custom, capacity);
        }
        modifiers.compute_cdf();

        let rng = config.seed.map(Rng::new).unwrap_or_else(Rng::from_entropy);
        let world = mode.build_world(&settings, player_count);

        let mut game = Pong {
            mode,
            settings,
            tick_rate,
            status: GameStatus::Created,
            tick: 0,
            world,
            rng,
            player_count,
            scores: vec![0; player_count],
            results: vec![0; player_count],
            eliminated: Vec::new(),
            last_hit: None,
            last_goal: None,
            modifiers,
            inputs: InputQueue::new(),
            ball_reset_sampler,
            power_up_sampler,
        };
        // Nothing is active yet, so this only drains construction events.
        game.flush_events();

        debug!(
            "Created {} match for {} players with {} units (seed {})",
            game.mode.name(),
            player_count,
            game.modifiers.unit_count(),
            game.rng.seed()
        );
        Ok(game)
    }

    /// Serves the first ball, activates every auto unit and fires
    /// `GameStart`. Does nothing once the match has started.
    pub fn start_game(&mut self) {
        if self.status != GameStatus::Created {
            return;
        }
        self.status = GameStatus::Running;
        self.reset_ball(None);

        self.with_units(|game, units| {
            for unit in units.iter_mut() {
                if unit.activation_mode() != ActivationMode::Auto {
                    continue;
                }
                if let Err(e) = unit.activate(game) {
                    warn!("Failed to activate {}: {}", unit.name(), e);
                }
            }
        });
        self.trigger(GameEvent::GameStart);

        info!("{} match started with {} players", self.mode.name(), self.player_count);
    }

    /// Ends the match. Finishing twice is a no-op.
    pub fn finish(&mut self) {
        if self.status == GameStatus::Finished {
            return;
        }
        self.status = GameStatus::Finished;
        info!(
            "{} match finished after {} ticks, scores {:?}",
            self.mode.name(),
            self.tick,
            self.scores
        );
    }

    /// Queues a player input for the next tick.
    pub fn handle_input(&mut self, input: UserInput) -> Result<()> {
        if input.player_id >= self.player_count {
            return Err(GameError::InvalidInput(format!(
                "player {} is not part of this match",
                input.player_id
            )));
        }
        self.inputs.push(input);
        Ok(())
    }

    /// Advances the match by one tick.
    pub fn update(&mut self) {
        if self.status != GameStatus::Running {
            return;
        }

        self.process_inputs();

        for player_id in 0..self.world.paddles.len() {
            self.trigger(GameEvent::PaddleUpdate { player_id });
            if let Some(paddle) = self.world.paddles.get_mut(player_id) {
                paddle.apply_keys();
                if paddle.velocity != 0.0 {
                    self.world.move_paddle(player_id);
                }
            }
        }

        let mut ball_id = 0;
        while ball_id < self.world.balls.len() {
            if self.world.balls[ball_id].do_collision {
                self.advance_ball(ball_id);
            }
            ball_id += 1;
        }

        self.check_out_of_bounds();

        self.trigger(GameEvent::Update);
        self.tick += 1;
    }

    fn process_inputs(&mut self) {
        for input in self.inputs.drain() {
            if input.player_id >= self.player_count {
                warn!("Dropping input for unknown player {}", input.player_id);
                continue;
            }
            if let Some(paddle) = self.world.paddles.get_mut(input.player_id) {
                let keys = &mut paddle.keys;
                match input.input_type {
                    InputType::Up => keys.up = true,
                    InputType::Down => keys.down = true,
                    InputType::Space => keys.space = true,
                    InputType::StopUp => keys.up = false,
                    InputType::StopDown => keys.down = false,
                    InputType::StopSpace => keys.space = false,
                }
            }
            self.trigger(GameEvent::UserInput(input));
        }
    }

    /// Moves one ball through its whole tick, one contact at a time.
    fn advance_ball(&mut self, ball_id: usize) {
        let Some(ball) = self.world.balls.get(ball_id) else {
            return;
        };
        let mut remaining = ball.speed;
        let cap = world::substep_cap(ball.speed);

        for _ in 0..cap {
            if remaining <= EPSILON {
                break;
            }
            let step = self
                .world
                .step_ball(ball_id, remaining, self.modifiers.spawned(), &self.settings);
            let Some((contact, travelled)) = step else {
                break;
            };
            remaining -= travelled;

            match contact {
                Contact::PowerUp { index } => self.pickup_power_up(index),
                Contact::Paddle { player_id } => {
                    self.trigger(GameEvent::PaddleBounce { ball_id, player_id });
                }
                Contact::Wall { wall_id, is_goal: true } => {
                    let player_id = wall_id / 2;
                    self.last_goal = Some(player_id);
                    self.trigger(GameEvent::Goal { player_id });
                    break;
                }
                Contact::Wall { wall_id, .. } => {
                    self.trigger(GameEvent::WallBounce { wall_id, ball_id });
                }
            }

            // Units may have reset or removed the ball.
            if self.world.balls.get(ball_id).is_none() {
                break;
            }
        }
    }

    fn check_out_of_bounds(&mut self) {
        for ball_id in (0..self.world.balls.len()).rev() {
            if !self.ball_is_out(ball_id) {
                if let Some(ball) = self.world.balls.get_mut(ball_id) {
                    ball.speed = ball.speed.max(self.settings.min_ball_speed);
                }
                continue;
            }

            self.trigger(GameEvent::BallOutOfBounds { ball_id });
            if self.ball_is_out(ball_id) {
                debug!("Ball {} escaped the arena, resetting it", ball_id);
                self.reset_ball(Some(ball_id));
            }
        }
    }

    fn ball_is_out(&self, ball_id: usize) -> bool {
        self.world
            .balls
            .get(ball_id)
            .map_or(false, |ball| self.mode.is_out_of_bounds(&self.settings, ball))
    }

    /// Serves a fresh ball. `None` replaces every ball with a single new
    /// one. Resetting an extra ball removes it instead.
    pub fn reset_ball(&mut self, ball_id: Option<usize>) {
        match ball_id {
            None => {
                let ball = self.serve();
                self.world.balls = vec![ball];
            }
            Some(0) => {
                let ball = self.serve();
                match self.world.balls.first_mut() {
                    Some(first) => *first = ball,
                    None => self.world.balls.push(ball),
                }
            }
            Some(index) if index < self.world.balls.len() => {
                self.world.balls.remove(index);
            }
            Some(_) => {}
        }
    }

    fn serve(&mut self) -> Ball {
        let context = SampleContext::new(
            &self.settings,
            self.mode.center(&self.settings),
            &self.world.paddles,
            &self.scores,
            &self.results,
            self.last_goal,
        );
        let (pos, dir) = self.ball_reset_sampler.sample(&context, &mut self.rng);
        Ball::new(pos, dir, self.settings.ball_radius, self.settings.ball_speed)
    }

    pub fn edit_score(&mut self, player_id: usize, delta: i64) {
        if let Some(score) = self.scores.get_mut(player_id) {
            *score += delta;
        }
    }

    pub fn is_eliminated(&self, player_id: usize) -> bool {
        self.eliminated.contains(&player_id)
    }

    /// Final ranking of every player, 1 being the winner.
    pub fn results(&self) -> Vec<u32> {
        self.mode.results(&self.scores, &self.results)
    }

    /// Picks a player with `sampler` from the current scores and results.
    pub fn sample_player(&mut self, sampler: &PlayerSampler) -> usize {
        let context = SampleContext::new(
            &self.settings,
            self.mode.center(&self.settings),
            &self.world.paddles,
            &self.scores,
            &self.results,
            self.last_goal,
        );
        sampler.sample(&context, &mut self.rng)
    }

    // ---- power-ups ----

    fn sample_power_up_position(&mut self) -> Vector2 {
        let context = SampleContext::new(
            &self.settings,
            self.mode.center(&self.settings),
            &self.world.paddles,
            &self.scores,
            &self.results,
            self.last_goal,
        );
        self.power_up_sampler.sample(&context, &mut self.rng)
    }

    /// Spawns a random power-up somewhere in the arena.
    pub fn spawn_random_power_up(&mut self) -> bool {
        let position = self.sample_power_up_position();
        let spawned = self.modifiers.spawn_random_power_up(&mut self.rng, position);
        self.flush_events();
        spawned
    }

    /// Spawns a given power-up somewhere in the arena.
    pub fn spawn_power_up(&mut self, name: &str) -> bool {
        let position = self.sample_power_up_position();
        let spawned = self.modifiers.spawn_power_up(name, position);
        self.flush_events();
        spawned
    }

    /// Places a given power-up at a fixed point with its own radius,
    /// regardless of its capacity.
    pub fn place_power_up(&mut self, name: &str, position: Vector2, radius: f64) -> u32 {
        let id = self.modifiers.place_power_up(name, position, radius);
        self.flush_events();
        id
    }

    /// Turns the spawned power-up at `index` into a live unit bound to the
    /// last player who hit the ball.
    pub fn pickup_power_up(&mut self, index: usize) {
        let Some(spawned) = self.modifiers.take_spawned(index) else {
            return;
        };
        let mut unit = match self.modifiers.instantiate(&spawned.name) {
            Ok(unit) => unit,
            Err(e) => {
                warn!("Failed to instantiate power-up {}: {}", spawned.name, e);
                self.modifiers.release_slot(&spawned.name);
                self.flush_events();
                return;
            }
        };

        // The id exists before activation so the unit can delete itself.
        let id = self.modifiers.allocate_id();
        unit.core_mut().id = id;
        unit.core_mut().player_id = self.last_hit;

        if unit.activation_mode() == ActivationMode::Auto {
            if let Err(e) = unit.activate(self) {
                warn!("Failed to activate power-up {}: {}", spawned.name, e);
            }
        }
        self.modifiers.add_unit(unit);

        info!("Player {:?} picked up {}", self.last_hit, spawned.name);
        self.trigger(GameEvent::PowerUpPickup {
            name: spawned.name,
            player_id: self.last_hit,
        });
    }

    /// Drops a finished power-up unit and frees its capacity slot.
    pub fn delete_power_up(&mut self, id: UnitId, name: &str) {
        self.modifiers.delete_power_up(id, name);
        self.flush_events();
    }

    pub fn remove_modifier(&mut self, id: UnitId) {
        self.modifiers.remove_unit(id);
    }

    // ---- events ----

    /// Fires an event at every unit that is not inactive. Events fired from
    /// inside a hook are queued and delivered after the current one.
    pub fn trigger(&mut self, event: GameEvent) {
        self.modifiers.queue(event);
        self.flush_events();
    }

    fn flush_events(&mut self) {
        if self.modifiers.is_dispatching() {
            return;
        }

        while let Some(event) = self.modifiers.next_event() {
            let mut units = self.modifiers.begin_dispatch();
            for unit in units.iter_mut() {
                if unit.status() == ModifierStatus::Inactive || self.modifiers.is_removed(unit.id()) {
                    continue;
                }
                if let Err(e) = unit.handle_event(self, &event) {
                    warn!("{} failed on {}: {}", unit.name(), event.name(), e);
                }
            }
            self.modifiers.end_dispatch(units);
        }
    }

    /// Runs `f` over every unit with the match borrowed mutably, then
    /// delivers whatever it queued.
    fn with_units<F>(&mut self, f: F)
    where
        F: FnOnce(&mut Pong, &mut Vec<Box<dyn Modifier>>),
    {
        let mut units = self.modifiers.begin_dispatch();
        f(self, &mut units);
        self.modifiers.end_dispatch(units);
        self.flush_events();
    }

    // ---- look-ahead ----

    /// Predicts when the main ball will touch wall `wall_id` within
    /// `max_ticks`, simulating a copy of the world without any rules.
    pub fn find_next_collisions(&self, max_ticks: u32, wall_id: usize) -> Vec<PredictedCollision> {
        let mut world = self.world.clone();
        let mut found = Vec::new();

        for tick in 0..max_ticks {
            let (Some(ball), Some(wall)) = (world.balls.first(), world.walls.get(wall_id)) else {
                break;
            };
            if let Some(collision) =
                detect_collision(ball, ball.speed, std::slice::from_ref(wall), CollisionKind::Wall)
            {
                found.push(PredictedCollision {
                    tick,
                    position: ball.pos.add(&ball.dir.scale(collision.distance)),
                    normal: collision.normal,
                });
            }
            world.simulate_tick(&self.settings);
        }
        found
    }

    // ---- snapshot ----

    /// Serializable view of every visible object.
    pub fn state_snapshot(&self) -> GameStateSnapshot {
        let balls = self
            .world
            .balls
            .iter()
            .filter(|b| b.is_visible)
            .map(|b| BallState {
                r: round_snapshot(b.radius),
                x: round_snapshot(b.pos.x),
                y: round_snapshot(b.pos.y),
            })
            .collect();

        let paddles = self
            .world
            .paddles
            .iter()
            .filter(|p| p.body.is_visible)
            .map(|p| PaddleState {
                a: round_snapshot(p.body.alpha),
                x: round_snapshot(p.body.pos.x),
                y: round_snapshot(p.body.pos.y),
                w: round_snapshot(p.body.width),
                h: round_snapshot(p.body.height),
            })
            .collect();

        let walls = self
            .world
            .walls
            .iter()
            .filter(|w| w.is_visible)
            .map(|w| WallState {
                x: round_snapshot(w.pos.x),
                y: round_snapshot(w.pos.y),
                dx: round_snapshot(w.dir.x),
                dy: round_snapshot(w.dir.y),
                w: round_snapshot(w.width),
                h: round_snapshot(w.height),
                do_rot: w.do_rotation,
            })
            .collect();

        let spawned_power_ups = self
            .modifiers
            .spawned()
            .iter()
            .map(|p| PowerUpState {
                id: p.id,
                name: p.name.clone(),
                x: round_snapshot(p.body.pos.x),
                y: round_snapshot(p.body.pos.y),
                r: round_snapshot(p.body.radius),
            })
            .collect();

        GameStateSnapshot {
            balls,
            paddles,
            walls,
            spawned_power_ups,
            scores: self.scores.clone(),
            modifiers_state: self.modifiers.modifiers_state(),
        }
    }
}

fn custom_block(blocks: &Config, name: &str) -> Config {
    blocks
        .get(name)
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default()
}
