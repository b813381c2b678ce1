//! Per-match registry of behavior units and spawned power-ups.
//!
//! Units live in a vector of boxed trait objects and are addressed by their
//! [`UnitId`]. Events are queued here and flushed by the match, which takes
//! the unit vector out for the duration of a dispatch so every hook can
//! borrow the match mutably. Units added or removed during a dispatch are
//! applied once it ends.

use crate::config::Config;
use crate::error::Result;
use crate::modifier::{GameEvent, Modifier, ModifierStatus, UnitId};
use crate::physics::{ball_circle_collision, Ball, Collider, Vector2};
use crate::registry::PowerUpKind;
use crate::rng::Rng;
use log::{debug, info};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// Reason reported when nothing can be spawned.
pub const NONE_AVAILABLE: &str = "NONE_AVAILABLE";

/// A power-up lying in the arena, waiting to be picked up.
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnedPowerUp {
    pub id: u32,
    pub name: String,
    pub body: Ball,
}

impl Collider for SpawnedPowerUp {
    fn is_collidable(&self) -> bool {
        self.body.is_visible && self.body.do_collision
    }

    fn sweep(&self, ball: &Ball, distance: f64) -> Option<(f64, Vector2)> {
        ball_circle_collision(ball, distance, &self.body.pos, self.body.radius)
    }
}

struct PowerUpEntry {
    kind: PowerUpKind,
    defaults: Config,
    custom: Config,
    spawn_weight: f64,
    capacity: i64,
    counter: i64,
}

pub struct ModifierManager {
    units: Vec<Box<dyn Modifier>>,
    incoming: Vec<Box<dyn Modifier>>,
    removed: BTreeSet<UnitId>,
    dispatching: bool,
    events: VecDeque<GameEvent>,
    next_unit_id: u32,
    next_power_up_id: u32,
    tick_rate: f64,
    power_up_radius: f64,
    entries: BTreeMap<String, PowerUpEntry>,
    available: Vec<String>,
    unavailable: Vec<String>,
    pdf: Vec<f64>,
    cdf: Vec<f64>,
    spawned: Vec<SpawnedPowerUp>,
}

impl ModifierManager {
    pub fn new(tick_rate: f64, power_up_radius: f64) -> Self {
        ModifierManager {
            units: Vec::new(),
            incoming: Vec::new(),
            removed: BTreeSet::new(),
            dispatching: false,
            events: VecDeque::new(),
            next_unit_id: 1,
            next_power_up_id: 0,
            tick_rate,
            power_up_radius,
            entries: BTreeMap::new(),
            available: Vec::new(),
            unavailable: Vec::new(),
            pdf: Vec::new(),
            cdf: Vec::new(),
            spawned: Vec::new(),
        }
    }

    // ---- units ----

    /// Hands out the next unit id.
    pub fn allocate_id(&mut self) -> UnitId {
        let id = UnitId(self.next_unit_id);
        self.next_unit_id += 1;
        id
    }

    /// Stores a unit, assigning an id if it has none yet. Units added during
    /// a dispatch join once the dispatch ends.
    pub fn add_unit(&mut self, mut unit: Box<dyn Modifier>) -> UnitId {
        if unit.id() == UnitId::default() {
            let id = self.allocate_id();
            unit.core_mut().id = id;
        }
        let id = unit.id();

        if self.removed.remove(&id) {
            debug!("Unit {} was removed before being added", unit.name());
            return id;
        }

        if self.dispatching {
            self.incoming.push(unit);
        } else {
            self.units.push(unit);
        }
        id
    }

    pub fn remove_unit(&mut self, id: UnitId) {
        self.removed.insert(id);
        if !self.dispatching {
            self.apply_removals();
        }
    }

    /// Drops removed units. Ids that matched nothing stay recorded so a
    /// unit removed before being added is still skipped by `add_unit`.
    fn apply_removals(&mut self) {
        if self.removed.is_empty() {
            return;
        }
        let mut dropped = Vec::new();
        let removed = &self.removed;
        self.units.retain(|unit| {
            let keep = !removed.contains(&unit.id());
            if !keep {
                dropped.push(unit.id());
            }
            keep
        });
        for id in dropped {
            self.removed.remove(&id);
        }
    }

    /// Ids removed but not yet applied.
    pub fn pending_removals(&self) -> usize {
        self.removed.len()
    }

    pub fn is_removed(&self, id: UnitId) -> bool {
        self.removed.contains(&id)
    }

    pub fn is_dispatching(&self) -> bool {
        self.dispatching
    }

    /// Takes the units out for a dispatch.
    pub fn begin_dispatch(&mut self) -> Vec<Box<dyn Modifier>> {
        self.dispatching = true;
        std::mem::take(&mut self.units)
    }

    /// Puts the units back, merging the ones added meanwhile and dropping
    /// the ones removed meanwhile.
    pub fn end_dispatch(&mut self, mut units: Vec<Box<dyn Modifier>>) {
        units.append(&mut self.units);
        units.append(&mut self.incoming);
        self.units = units;
        self.dispatching = false;
        self.apply_removals();
    }

    pub fn queue(&mut self, event: GameEvent) {
        self.events.push_back(event);
    }

    pub fn next_event(&mut self) -> Option<GameEvent> {
        self.events.pop_front()
    }

    pub fn unit_count(&self) -> usize {
        self.units.len() + self.incoming.len()
    }

    pub fn has_unit(&self, name: &str) -> bool {
        self.units
            .iter()
            .chain(self.incoming.iter())
            .any(|unit| unit.name() == name && !self.removed.contains(&unit.id()))
    }

    pub fn unit_status(&self, name: &str) -> Option<ModifierStatus> {
        self.units
            .iter()
            .find(|unit| unit.name() == name)
            .map(|unit| unit.status())
    }

    /// Unit-visible state keyed by unit name.
    pub fn modifiers_state(&self) -> Map<String, Value> {
        let mut state = Map::new();
        for unit in &self.units {
            if let Some(value) = unit.state() {
                state.insert(unit.name().to_string(), value);
            }
        }
        state
    }

    // ---- power-ups ----

    /// Enables a power-up for this match. Power-ups without a capacity can
    /// never spawn.
    pub fn register_power_up(
        &mut self,
        name: &str,
        kind: PowerUpKind,
        defaults: Config,
        custom: Config,
        capacity: Option<i64>,
    ) {
        let spawn_weight = custom
            .get("spawnWeight")
            .or_else(|| defaults.get("spawnWeight"))
            .and_then(Value::as_f64)
            .unwrap_or(0.0);

        let Some(capacity) = capacity else {
            info!("Power-up {} has no capacity in this game mode", name);
            return;
        };

        self.entries.insert(
            name.to_string(),
            PowerUpEntry {
                kind,
                defaults,
                custom,
                spawn_weight,
                capacity,
                counter: 0,
            },
        );
        if !self.available.iter().any(|n| n == name) {
            self.available.push(name.to_string());
        }
    }

    /// Names that can currently be sampled, in registration order.
    pub fn spawnable_names(&self) -> Vec<&str> {
        self.available
            .iter()
            .filter(|name| !self.unavailable.contains(*name))
            .map(String::as_str)
            .collect()
    }

    pub fn is_available(&self, name: &str) -> bool {
        self.available.iter().any(|n| n == name) && !self.unavailable.iter().any(|n| n == name)
    }

    pub fn counter(&self, name: &str) -> i64 {
        self.entries.get(name).map_or(0, |e| e.counter)
    }

    pub fn pdf(&self) -> &[f64] {
        &self.pdf
    }

    pub fn cdf(&self) -> &[f64] {
        &self.cdf
    }

    pub fn spawned(&self) -> &[SpawnedPowerUp] {
        &self.spawned
    }

    /// Rebuilds the distribution over spawnable power-ups and queues a
    /// `CdfComputation` event. A zero total weight empties the CDF.
    pub fn compute_cdf(&mut self) {
        let weights: Vec<f64> = self
            .spawnable_names()
            .iter()
            .map(|name| self.entries.get(*name).map_or(0.0, |e| e.spawn_weight.max(0.0)))
            .collect();
        let total: f64 = weights.iter().sum();

        if total <= 0.0 {
            self.pdf.clear();
            self.cdf.clear();
        } else {
            self.pdf = weights.iter().map(|w| w / total).collect();
            let mut cumulative = 0.0;
            self.cdf = self
                .pdf
                .iter()
                .map(|p| {
                    cumulative += p;
                    cumulative
                })
                .collect();
        }

        self.queue(GameEvent::CdfComputation);
    }

    /// Samples a spawnable power-up name.
    ///
    /// Falls back to a uniform pick when rounding leaves the draw past the
    /// last CDF entry.
    pub fn sample_random_power_up(&self, rng: &mut Rng) -> Option<String> {
        if self.cdf.is_empty() {
            return None;
        }

        let names = self.spawnable_names();
        let draw = rng.random();
        if let Some(index) = self.cdf.iter().position(|c| draw < *c) {
            return names.get(index).map(|n| n.to_string());
        }

        let index = rng.random_int(0, names.len() as i64 - 1) as usize;
        names.get(index).map(|n| n.to_string())
    }

    /// Samples and spawns a power-up at `position`. Returns whether
    /// something was spawned.
    pub fn spawn_random_power_up(&mut self, rng: &mut Rng, position: Vector2) -> bool {
        let Some(name) = self.sample_random_power_up(rng) else {
            debug!("Can't spawn any power-up");
            self.queue(GameEvent::FailedPowerUpSpawn {
                reason: NONE_AVAILABLE.to_string(),
            });
            return false;
        };
        self.spawn_power_up(&name, position)
    }

    /// Spawns `name` at `position` if it still has room.
    pub fn spawn_power_up(&mut self, name: &str, position: Vector2) -> bool {
        if !self.is_available(name) {
            self.queue(GameEvent::FailedPowerUpSpawn {
                reason: format!("{} is not available", name),
            });
            return false;
        }

        self.place_power_up(name, position, self.power_up_radius);
        true
    }

    /// Places `name` at `position` with its own token radius, ignoring its
    /// capacity. The slot is still counted, so deleting the unit it turns
    /// into stays balanced. Returns the spawned id.
    pub fn place_power_up(&mut self, name: &str, position: Vector2, radius: f64) -> u32 {
        if let Some(entry) = self.entries.get_mut(name) {
            entry.counter += 1;
        }
        self.update_availability(name);

        let id = self.next_power_up_id;
        self.next_power_up_id += 1;

        let mut body = Ball::new(position, Vector2::default(), radius, 0.0);
        body.do_goal = false;
        self.spawned.push(SpawnedPowerUp {
            id,
            name: name.to_string(),
            body,
        });

        debug!("Placed {} #{} with radius {:.1}", name, id, radius);
        self.queue(GameEvent::PowerUpSpawn { power_up_id: id });
        id
    }

    pub fn is_spawned(&self, power_up_id: u32) -> bool {
        self.spawned.iter().any(|p| p.id == power_up_id)
    }

    /// Removes the spawned power-up at `index`.
    pub fn take_spawned(&mut self, index: usize) -> Option<SpawnedPowerUp> {
        if index < self.spawned.len() {
            Some(self.spawned.remove(index))
        } else {
            None
        }
    }

    /// Builds a fresh unit for a picked-up power-up.
    pub fn instantiate(&self, name: &str) -> Result<Box<dyn Modifier>> {
        let entry = self
            .entries
            .get(name)
            .ok_or_else(|| crate::error::GameError::UnknownPowerUp(name.to_string()))?;
        entry.kind.build(&entry.defaults, &entry.custom, self.tick_rate)
    }

    /// Forgets a finished power-up unit and frees its capacity slot.
    pub fn delete_power_up(&mut self, id: UnitId, name: &str) {
        self.remove_unit(id);
        self.release_slot(name);
    }

    /// Frees one capacity slot of `name`.
    pub fn release_slot(&mut self, name: &str) {
        if let Some(entry) = self.entries.get_mut(name) {
            entry.counter -= 1;
        }
        self.update_availability(name);
    }

    /// Moves `name` between the available and unavailable sets according to
    /// its counter. Every transition recomputes the CDF.
    pub fn update_availability(&mut self, name: &str) {
        let Some(entry) = self.entries.get(name) else {
            return;
        };
        let full = entry.counter >= entry.capacity;
        let listed_unavailable = self.unavailable.iter().any(|n| n == name);

        if listed_unavailable && !full {
            self.unavailable.retain(|n| n != name);
            self.compute_cdf();
        } else if !listed_unavailable && full {
            self.unavailable.push(name.to_string());
            self.compute_cdf();
        }
    }
}
