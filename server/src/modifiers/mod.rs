//! Game rules and arena effects, each one a [`crate::modifier::Modifier`].

mod arena_shrink;
mod elimination;
mod goal_reset;
mod goal_tracker;
mod idle_wall_bounce_acceleration;
mod last_hit_tracker;
mod pace_breaker;
mod paddle_boost;
mod power_up_spawner;
mod scored_game;
mod survival_game;
mod timed_game;
mod timed_start;

pub use arena_shrink::ArenaShrink;
pub use elimination::Elimination;
pub use goal_reset::GoalReset;
pub use goal_tracker::GoalTracker;
pub use idle_wall_bounce_acceleration::IdleWallBounceAcceleration;
pub use last_hit_tracker::LastHitTracker;
pub use pace_breaker::PaceBreaker;
pub use paddle_boost::PaddleBoost;
pub use power_up_spawner::PowerUpSpawner;
pub use scored_game::ScoredGame;
pub use survival_game::SurvivalGame;
pub use timed_game::TimedGame;
pub use timed_start::TimedStart;
