//! Strategies for where balls restart, where power-ups appear and which
//! player something is aimed at.
//!
//! Samplers are chosen by name in the game settings and resolved once when
//! the match is built, with their parameters read from the strategy blocks
//! of the registry. An unknown name fails at construction.

use crate::config::{percent_to_factor, Config, ConfigManager};
use crate::error::{GameError, Result};
use crate::game::settings::GameSettings;
use crate::game::world::Paddle;
use crate::physics::Vector2;
use crate::registry::StrategyRegistry;
use crate::rng::Rng;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::f64::consts::PI;

/// Mean serve angle away from the horizontal for quadrant serves.
const QUADRANT_ANGULAR_OFFSET: f64 = 30.0 * PI / 180.0;
/// 95% spread of the serve angle for quadrant serves.
const QUADRANT_ANGULAR_SPAN: f64 = 20.0 * PI / 180.0;

/// Read-only view of the match a sampler draws from.
#[derive(Debug, Clone, Copy)]
pub struct SampleContext<'a> {
    pub settings: &'a GameSettings,
    pub center: Vector2,
    pub paddles: &'a [Paddle],
    pub scores: &'a [i64],
    /// Finish rank per player, 0 while still playing.
    pub results: &'a [u32],
    pub last_goal: Option<usize>,
}

impl<'a> SampleContext<'a> {
    pub fn new(
        settings: &'a GameSettings,
        center: Vector2,
        paddles: &'a [Paddle],
        scores: &'a [i64],
        results: &'a [u32],
        last_goal: Option<usize>,
    ) -> Self {
        SampleContext {
            settings,
            center,
            paddles,
            scores,
            results,
            last_goal,
        }
    }

    pub fn player_count(&self) -> usize {
        self.scores.len()
    }

    /// Players without a final rank, or everyone once nobody is left.
    fn survivors(&self) -> Vec<usize> {
        let survivors: Vec<usize> = (0..self.player_count())
            .filter(|id| self.results.get(*id).copied().unwrap_or(0) == 0)
            .collect();
        if survivors.is_empty() {
            (0..self.player_count()).collect()
        } else {
            survivors
        }
    }

    /// Outward angle of a player's paddle, falling back to the angle of its
    /// seat around the arena.
    fn paddle_angle(&self, player_id: usize) -> f64 {
        match self.paddles.get(player_id) {
            Some(paddle) => paddle.body.alpha,
            None => PI + 2.0 * PI * player_id as f64 / self.player_count().max(1) as f64,
        }
    }
}

/// Resolves the parameter block of `name` through `manager`. Strategies
/// missing from the registry resolve from an empty block.
fn strategy_params<T: DeserializeOwned>(
    blocks: &BTreeMap<String, Config>,
    name: &str,
    manager: &ConfigManager,
) -> Result<T> {
    let block = blocks.get(name).cloned().unwrap_or_default();
    manager.resolve(&block, &Config::new())
}

fn string_param(blocks: &BTreeMap<String, Config>, strategy: &str, key: &str) -> Option<String> {
    blocks
        .get(strategy)
        .and_then(|block| block.get(key))
        .and_then(Value::as_str)
        .map(str::to_string)
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BiasedGaussianParams {
    /// Mean angle away from the picked paddle, as a share of half a sector.
    pub angular_offset: f64,
    pub angular_deviation: f64,
    /// Spread of the serve distance, as a share of the ball speed.
    pub velocity_deviation: f64,
    pub max_velocity: f64,
    pub min_velocity: f64,
    /// How much less likely the last goal player is to be served at.
    pub last_goal_bias: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BallResetSampler {
    /// Random point of the inner disc, moving straight outwards.
    UniformCA,
    /// Arena center, served into a random vertical half towards the side
    /// picked from the last goal.
    BiasedQuadrantGaussianRA,
    /// Close to the center, moving towards a paddle picked with a bias
    /// against the last goal player.
    BiasedGaussianCA(BiasedGaussianParams),
}

impl BallResetSampler {
    pub fn from_registry(name: &str, strategies: &StrategyRegistry) -> Result<Self> {
        match name {
            "uniformCA" => Ok(BallResetSampler::UniformCA),
            "biasedQuadrantGaussianRA" => Ok(BallResetSampler::BiasedQuadrantGaussianRA),
            "biasedGaussianCA" => {
                let mut manager = ConfigManager::new();
                manager
                    .register_property_config("angularOffset", percent_to_factor("angularOffsetPercent"), &[])
                    .register_property_config(
                        "angularDeviation",
                        percent_to_factor("stdAngularVariationPercent"),
                        &[],
                    )
                    .register_property_config(
                        "velocityDeviation",
                        percent_to_factor("stdVelocityVariationPercent"),
                        &[],
                    )
                    .register_property_config("maxVelocity", percent_to_factor("maxVelocityPercent"), &[])
                    .register_property_config("minVelocity", percent_to_factor("minVelocityPercent"), &[])
                    .register_property_config("lastGoalBias", percent_to_factor("lastGoalBiasPercent"), &[]);
                let params = strategy_params(&strategies.ball_reset_sampler, name, &manager)?;
                Ok(BallResetSampler::BiasedGaussianCA(params))
            }
            other => Err(GameError::UnknownSampler(other.to_string())),
        }
    }

    /// Returns the position and unit direction of a fresh ball.
    pub fn sample(&self, context: &SampleContext, rng: &mut Rng) -> (Vector2, Vector2) {
        let settings = context.settings;
        let center = context.center;

        match self {
            BallResetSampler::UniformCA => {
                let angle = rng.random() * PI * 2.0;
                let reach = (settings.arena_radius - settings.power_up_radius - settings.walls_height).max(0.0);
                let magnitude = rng.random() * reach;
                let dir = Vector2::from_angle(angle);
                (center.add(&dir.scale(magnitude)), dir)
            }
            BallResetSampler::BiasedQuadrantGaussianRA => {
                let player_id = match context.last_goal {
                    Some(player_id) => player_id,
                    None => rng.random_int(0, context.player_count().max(1) as i64 - 1) as usize,
                };

                let mut angle = rng.random_gaussian(QUADRANT_ANGULAR_OFFSET, QUADRANT_ANGULAR_SPAN);
                if rng.random_int(0, 1) == 1 {
                    angle = 2.0 * PI - angle;
                }
                if player_id == 1 {
                    angle = PI - angle;
                }
                (center, Vector2::from_angle(angle))
            }
            BallResetSampler::BiasedGaussianCA(params) => {
                let count = context.player_count().max(1);
                let sector = PI / count as f64;
                let last = match context.last_goal {
                    Some(player_id) if player_id < count => player_id,
                    _ => rng.random_int(0, count as i64 - 1) as usize,
                };

                let rest = 1.0 / (count as f64 - params.last_goal_bias);
                let mut weights = vec![rest; count];
                weights[last] = (1.0 - params.last_goal_bias) * rest;
                let target = rng.random_weighted(&weights).unwrap_or(last);

                let mut angle = rng.random_gaussian(
                    params.angular_offset * sector,
                    params.angular_deviation * sector / 2.0,
                );
                if rng.random_int(0, 1) == 1 {
                    angle = -angle;
                }
                let dir = Vector2::from_angle(angle + context.paddle_angle(target));

                let speed = settings.ball_speed;
                let magnitude = rng
                    .random_gaussian(speed, params.velocity_deviation * speed)
                    .clamp(speed * (1.0 - params.min_velocity), speed * (1.0 + params.max_velocity))
                    .max(0.0);
                (center.add(&dir.scale(magnitude)), dir)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowerParams {
    /// Spread of the petal angle, in radians.
    pub angle_deviation: f64,
    /// Mean distance from the center, as a share of the arena radius.
    pub base_radius_factor: f64,
    /// How strongly the mean distance follows the petals.
    pub variation_strength: f64,
    /// Spread of the distance, as a share of the arena radius.
    pub distance_deviation: f64,
}

impl FlowerParams {
    fn resolve(strategies: &StrategyRegistry, name: &str) -> Result<Self> {
        let mut manager = ConfigManager::new();
        manager
            .register_property_config(
                "angleDeviation",
                |_, context| Value::from(crate::config::number(context, "stdAngleDeviationDeg").to_radians()),
                &[],
            )
            .register_property_config(
                "distanceDeviation",
                percent_to_factor("stdDistanceDeviationPercent"),
                &[],
            );
        strategy_params(&strategies.power_up_position_sampler, name, &manager)
    }

    /// Point along a petal centered on `angle_center`, kept clear of the
    /// outline.
    fn sample(&self, context: &SampleContext, angle_center: f64, rng: &mut Rng) -> Vector2 {
        let settings = context.settings;
        let radius = if settings.arena_radius > 0.0 {
            settings.arena_radius
        } else {
            settings.arena_width / 2.0
        };
        let margin = settings.walls_height + settings.walls_offset + settings.power_up_radius;
        let petals = context.player_count().max(1) as f64;

        let angle = rng.random_gaussian(angle_center, self.angle_deviation);
        let mean = radius * (self.base_radius_factor + self.variation_strength * (petals * angle).cos());
        let distance = rng
            .random_gaussian(mean, radius * self.distance_deviation)
            .clamp(margin.min(radius - margin), (radius - margin).max(margin));
        context.center.add(&Vector2::from_angle(angle).scale(distance))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PowerUpPositionSampler {
    /// Uniform over the disc of a polygonal arena.
    UniformCA,
    /// Uniform over a rectangular arena.
    UniformRA,
    /// Gaussian around the center of a rectangular arena.
    ElipticGaussianRectangularArena,
    /// Petals pointing at paddles, the paddle picked by a player sampler.
    FlowerGaussianCA {
        params: FlowerParams,
        player_sampler: PlayerSampler,
    },
    /// Petals pointing at the seats of a circular arena.
    FlowerGaussianCircularArena(FlowerParams),
}

impl PowerUpPositionSampler {
    pub fn from_registry(name: &str, strategies: &StrategyRegistry) -> Result<Self> {
        match name {
            "uniformCA" => Ok(PowerUpPositionSampler::UniformCA),
            "uniformRA" => Ok(PowerUpPositionSampler::UniformRA),
            "elipticGaussianRectangularArena" => Ok(PowerUpPositionSampler::ElipticGaussianRectangularArena),
            "flowerGaussianCA" => {
                let sampler = string_param(&strategies.power_up_position_sampler, name, "playerSampler")
                    .unwrap_or_else(|| "uniformIncomplete".to_string());
                Ok(PowerUpPositionSampler::FlowerGaussianCA {
                    params: FlowerParams::resolve(strategies, name)?,
                    player_sampler: PlayerSampler::from_registry(&sampler, strategies)?,
                })
            }
            "flowerGaussianCircularArena" => Ok(PowerUpPositionSampler::FlowerGaussianCircularArena(
                FlowerParams::resolve(strategies, name)?,
            )),
            other => Err(GameError::UnknownSampler(other.to_string())),
        }
    }

    /// Samples a spawn point that keeps the power-up clear of the walls.
    pub fn sample(&self, context: &SampleContext, rng: &mut Rng) -> Vector2 {
        let settings = context.settings;
        let margin = settings.power_up_radius + settings.walls_height;

        match self {
            PowerUpPositionSampler::UniformCA => {
                let radius = settings.arena_radius;
                let angle = rng.random() * PI * 2.0;
                let magnitude = rng.random() * (radius - margin).max(0.0);
                let point = Vector2::new(radius, radius).add(&Vector2::from_angle(angle).scale(magnitude));
                let upper = (2.0 * radius - margin).max(margin);
                Vector2::new(point.x.clamp(margin, upper), point.y.clamp(margin, upper))
            }
            PowerUpPositionSampler::UniformRA => {
                let x = rng.random() * settings.arena_width;
                let y = rng.random() * settings.arena_height;
                Vector2::new(
                    x.clamp(margin, (settings.arena_width - margin).max(margin)),
                    y.clamp(margin, (settings.arena_height - margin).max(margin)),
                )
            }
            PowerUpPositionSampler::ElipticGaussianRectangularArena => {
                let (w, h) = (settings.arena_width, settings.arena_height);
                let x = rng.random_gaussian(w / 2.0, w / 4.0);
                let y = rng.random_gaussian(h / 2.0, h / 4.0);
                Vector2::new(
                    x.clamp(margin, (w - margin).max(margin)),
                    y.clamp(margin, (h - margin).max(margin)),
                )
            }
            PowerUpPositionSampler::FlowerGaussianCA { params, player_sampler } => {
                let player_id = player_sampler.sample(context, rng);
                params.sample(context, context.paddle_angle(player_id), rng)
            }
            PowerUpPositionSampler::FlowerGaussianCircularArena(params) => {
                let count = context.player_count().max(1);
                let seat = rng.random_int(0, count as i64 - 1) as f64;
                params.sample(context, seat / count as f64 * 2.0 * PI, rng)
            }
        }
    }
}

/// Picks a player, always returning a real player id.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlayerSampler {
    /// Any seat, finished or not.
    UniformComplete,
    /// Any player still in the match.
    UniformIncomplete,
    /// Players still in the match, weighted by score.
    HighestScoreBiased,
    /// Players still in the match, the lowest scores weighted most.
    LowestScoreBiased,
    /// Every seat, with extra weight on the last goal player.
    LastGoalBiased { bias: f64 },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LastGoalBiasParams {
    bias: f64,
}

impl PlayerSampler {
    pub fn from_registry(name: &str, strategies: &StrategyRegistry) -> Result<Self> {
        match name {
            "uniformComplete" => Ok(PlayerSampler::UniformComplete),
            "uniformIncomplete" => Ok(PlayerSampler::UniformIncomplete),
            "highestScoreBiased" => Ok(PlayerSampler::HighestScoreBiased),
            "lowestScoreBiased" => Ok(PlayerSampler::LowestScoreBiased),
            "lastGoalBiased" => {
                let mut manager = ConfigManager::new();
                manager.register_property_config("bias", percent_to_factor("lastGoalBiasPercent"), &[]);
                let params: LastGoalBiasParams = strategy_params(&strategies.player_sampler, name, &manager)?;
                Ok(PlayerSampler::LastGoalBiased { bias: params.bias })
            }
            other => Err(GameError::UnknownSampler(other.to_string())),
        }
    }

    pub fn sample(&self, context: &SampleContext, rng: &mut Rng) -> usize {
        let count = context.player_count().max(1);

        match self {
            PlayerSampler::UniformComplete => rng.random_int(0, count as i64 - 1) as usize,
            PlayerSampler::UniformIncomplete => {
                let survivors = context.survivors();
                let index = rng.random_int(0, survivors.len() as i64 - 1) as usize;
                survivors.get(index).copied().unwrap_or(0)
            }
            PlayerSampler::HighestScoreBiased => {
                let survivors = context.survivors();
                let weights: Vec<f64> = survivors
                    .iter()
                    .map(|id| context.scores.get(*id).copied().unwrap_or(0).max(0) as f64)
                    .collect();
                pick(&survivors, &weights, rng)
            }
            PlayerSampler::LowestScoreBiased => {
                let survivors = context.survivors();
                let scores: Vec<i64> = survivors
                    .iter()
                    .map(|id| context.scores.get(*id).copied().unwrap_or(0))
                    .collect();
                let low = scores.iter().copied().min().unwrap_or(0);
                let high = scores.iter().copied().max().unwrap_or(0);
                let weights: Vec<f64> = scores.iter().map(|score| (low + high - score) as f64).collect();
                pick(&survivors, &weights, rng)
            }
            PlayerSampler::LastGoalBiased { bias } => {
                let last = match context.last_goal {
                    Some(player_id) if player_id < count => player_id,
                    _ => rng.random_int(0, count as i64 - 1) as usize,
                };
                let mut weights = vec![1.0; count];
                weights[last] += bias;
                rng.random_weighted(&weights).unwrap_or(last)
            }
        }
    }
}

fn pick(players: &[usize], weights: &[f64], rng: &mut Rng) -> usize {
    rng.random_weighted(weights)
        .and_then(|index| players.get(index).copied())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::settings::tests::classic_defaults;
    use crate::registry::GameRegistry;
    use crate::game::GameMode;
    use assert_approx_eq::assert_approx_eq;

    fn settings() -> GameSettings {
        GameSettings::resolve(&classic_defaults(), &Config::new(), 60.0).unwrap()
    }

    fn strategies() -> StrategyRegistry {
        GameRegistry::builtin().unwrap().strategies
    }

    fn context<'a>(settings: &'a GameSettings, center: Vector2, scores: &'a [i64], results: &'a [u32]) -> SampleContext<'a> {
        SampleContext::new(settings, center, &[], scores, results, None)
    }

    #[test]
    fn test_unknown_names_fail() {
        let strategies = strategies();
        assert!(matches!(
            BallResetSampler::from_registry("spiral", &strategies),
            Err(GameError::UnknownSampler(_))
        ));
        assert!(PowerUpPositionSampler::from_registry("uniformRA", &strategies).is_ok());
        assert!(PowerUpPositionSampler::from_registry("gaussian", &strategies).is_err());
        assert!(PlayerSampler::from_registry("strongest", &strategies).is_err());
    }

    #[test]
    fn test_registry_strategies_resolve() {
        let strategies = strategies();
        for name in ["uniformCA", "biasedQuadrantGaussianRA", "biasedGaussianCA"] {
            assert!(BallResetSampler::from_registry(name, &strategies).is_ok(), "{}", name);
        }
        for name in [
            "uniformCA",
            "uniformRA",
            "elipticGaussianRectangularArena",
            "flowerGaussianCA",
            "flowerGaussianCircularArena",
        ] {
            assert!(PowerUpPositionSampler::from_registry(name, &strategies).is_ok(), "{}", name);
        }
        assert!(matches!(
            PlayerSampler::from_registry("lastGoalBiased", &strategies),
            Ok(PlayerSampler::LastGoalBiased { bias }) if bias > 0.0
        ));
    }

    #[test]
    fn test_uniform_ca_ball_stays_inside_disc() {
        let settings = settings();
        let mut rng = Rng::new(17);
        let center = Vector2::new(100.0, 100.0);
        let scores = [0; 4];
        let results = [0; 4];
        let context = context(&settings, center, &scores, &results);
        let reach = settings.arena_radius - settings.power_up_radius - settings.walls_height;

        for _ in 0..1_000 {
            let (pos, dir) = BallResetSampler::UniformCA.sample(&context, &mut rng);
            assert!(pos.distance(&center) <= reach + 1e-9);
            assert_approx_eq!(dir.magnitude(), 1.0);
        }
    }

    #[test]
    fn test_quadrant_serve_heads_to_picked_side() {
        let settings = settings();
        let center = Vector2::new(100.0, 50.0);
        let mut rng = Rng::new(3);
        let scores = [0; 2];
        let results = [0; 2];
        let mut context = context(&settings, center, &scores, &results);

        for _ in 0..200 {
            context.last_goal = Some(1);
            let (pos, dir) = BallResetSampler::BiasedQuadrantGaussianRA.sample(&context, &mut rng);
            assert_eq!(pos, center);
            assert!(dir.x < 0.0);

            context.last_goal = Some(0);
            let (_, dir) = BallResetSampler::BiasedQuadrantGaussianRA.sample(&context, &mut rng);
            assert!(dir.x > 0.0);
        }
    }

    #[test]
    fn test_biased_gaussian_serves_towards_paddles() {
        let mut custom = Config::new();
        custom.insert("arenaHeight".into(), Value::from(200.0));
        let settings = GameSettings::resolve(&classic_defaults(), &custom, 60.0).unwrap();
        let world = GameMode::Multiplayer.build_world(&settings, 4);
        let center = GameMode::Multiplayer.center(&settings);
        let scores = [0; 4];
        let results = [0; 4];
        let mut context = SampleContext::new(&settings, center, &world.paddles, &scores, &results, Some(2));

        let sampler = BallResetSampler::from_registry("biasedGaussianCA", &strategies()).unwrap();
        let BallResetSampler::BiasedGaussianCA(params) = sampler else {
            panic!("expected the biased gaussian sampler");
        };
        let speed = settings.ball_speed;
        let mut rng = Rng::new(5);
        let mut towards_last = 0;

        for _ in 0..2_000 {
            let (pos, dir) = sampler.sample(&context, &mut rng);
            let distance = pos.distance(&center);
            assert!(distance >= speed * (1.0 - params.min_velocity) - 1e-9);
            assert!(distance <= speed * (1.0 + params.max_velocity) + 1e-9);

            // Every serve heads into the sector of one paddle.
            let nearest = (0..4)
                .max_by(|a, b| {
                    let da = dir.dot(&Vector2::from_angle(world.paddles[*a].body.alpha));
                    let db = dir.dot(&Vector2::from_angle(world.paddles[*b].body.alpha));
                    da.total_cmp(&db)
                })
                .unwrap();
            if nearest == 2 {
                towards_last += 1;
            }
        }
        // Half the usual share with the default bias.
        assert!(towards_last < 2_000 / 4, "served {} times at the last goal", towards_last);
        context.last_goal = None;
        sampler.sample(&context, &mut rng);
    }

    #[test]
    fn test_power_up_positions_keep_margin() {
        let settings = settings();
        let margin = settings.power_up_radius + settings.walls_height;
        let mut rng = Rng::new(8);
        let scores = [0; 2];
        let results = [0; 2];
        let context = context(&settings, Vector2::new(100.0, 50.0), &scores, &results);

        for _ in 0..1_000 {
            let p = PowerUpPositionSampler::UniformRA.sample(&context, &mut rng);
            assert!(p.x >= margin && p.x <= settings.arena_width - margin);
            assert!(p.y >= margin && p.y <= settings.arena_height - margin);

            let p = PowerUpPositionSampler::ElipticGaussianRectangularArena.sample(&context, &mut rng);
            assert!(p.x >= margin && p.x <= settings.arena_width - margin);
            assert!(p.y >= margin && p.y <= settings.arena_height - margin);

            let p = PowerUpPositionSampler::UniformCA.sample(&context, &mut rng);
            assert!(p.x >= margin && p.x <= 2.0 * settings.arena_radius - margin);
        }
    }

    #[test]
    fn test_flower_positions_stay_in_the_disc() {
        let mut custom = Config::new();
        custom.insert("arenaHeight".into(), Value::from(200.0));
        let settings = GameSettings::resolve(&classic_defaults(), &custom, 60.0).unwrap();
        let world = GameMode::Multiplayer.build_world(&settings, 5);
        let center = GameMode::Multiplayer.center(&settings);
        let scores = [0; 5];
        let results = [0; 5];
        let context = SampleContext::new(&settings, center, &world.paddles, &scores, &results, None);
        let margin = settings.walls_height + settings.walls_offset + settings.power_up_radius;
        let mut rng = Rng::new(21);

        for name in ["flowerGaussianCA", "flowerGaussianCircularArena"] {
            let sampler = PowerUpPositionSampler::from_registry(name, &strategies()).unwrap();
            for _ in 0..1_000 {
                let p = sampler.sample(&context, &mut rng);
                assert!(p.distance(&center) <= settings.arena_radius - margin + 1e-9);
                assert!(p.distance(&center) >= margin - 1e-9);
            }
        }
    }

    #[test]
    fn test_player_samplers_skip_finished_players() {
        let settings = settings();
        let scores = [5, 0, 2, 9];
        let results = [0, 0, 0, 4];
        let context = context(&settings, Vector2::default(), &scores, &results);
        let mut rng = Rng::new(13);

        for _ in 0..500 {
            assert_ne!(PlayerSampler::UniformIncomplete.sample(&context, &mut rng), 3);
            let high = PlayerSampler::HighestScoreBiased.sample(&context, &mut rng);
            assert!(high == 0 || high == 2, "picked {}", high);
            let low = PlayerSampler::LowestScoreBiased.sample(&context, &mut rng);
            assert!(low == 1 || low == 2, "picked {}", low);
            assert!(PlayerSampler::UniformComplete.sample(&context, &mut rng) < 4);
        }
    }

    #[test]
    fn test_last_goal_bias_favors_last_goal_player() {
        let settings = settings();
        let scores = [0; 4];
        let results = [0; 4];
        let mut context = context(&settings, Vector2::default(), &scores, &results);
        context.last_goal = Some(1);
        let sampler = PlayerSampler::LastGoalBiased { bias: 1.0 };
        let mut rng = Rng::new(4);

        let picks = (0..4_000).filter(|_| sampler.sample(&context, &mut rng) == 1).count();
        // Twice the weight of any other seat: 2 / 5 of the draws.
        assert!((1_400..1_800).contains(&picks), "picked {} times", picks);
    }
}
