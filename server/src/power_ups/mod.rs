//! Collectible effects. A power-up is a unit created when a ball runs
//! through its spawned token, and deleted when it wears off. Some raise
//! their own walls for as long as they last.

mod blinking_ball;
mod bumper;
mod bumper_shield;
mod multi_ball;
mod portals;
mod protected_power_up;
mod shooter;
mod speed_boost;
mod speed_gate;

pub use blinking_ball::BlinkingBall;
pub use bumper::Bumper;
pub use bumper_shield::BumperShield;
pub use multi_ball::MultiBall;
pub use portals::Portals;
pub use protected_power_up::ProtectedPowerUp;
pub use shooter::Shooter;
pub use speed_boost::SpeedBoost;
pub use speed_gate::SpeedGate;

use crate::modifier::ActivationMode;

fn activation_mode(self_activation: bool) -> ActivationMode {
    if self_activation {
        ActivationMode::SelfActivated
    } else {
        ActivationMode::Auto
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use crate::game::Pong;
    use crate::physics::Vector2;
    use crate::registry::{GameRegistry, MatchConfig};

    /// Classic match with every power-up enabled and no rules.
    pub(crate) fn power_up_match() -> Pong {
        let mut config = MatchConfig::new("classicPong", 2);
        config.use_default_modifiers = false;
        config.seed = Some(11);
        let mut game = Pong::new(&GameRegistry::builtin().unwrap(), &config).unwrap();
        game.start_game();
        game
    }

    /// Spawns `name` and runs the main ball through it.
    pub(crate) fn pick_up(game: &mut Pong, name: &str) {
        assert!(game.spawn_power_up(name));
        let index = game.modifiers.spawned().len() - 1;
        game.pickup_power_up(index);
        assert!(game.modifiers.has_unit(name));
    }

    pub(crate) fn park_ball(game: &mut Pong) {
        let center = game.mode.center(&game.settings);
        let ball = &mut game.world.balls[0];
        ball.pos = center;
        ball.dir = Vector2::new(0.0, 1.0);
        ball.speed = game.settings.min_ball_speed;
    }
}
