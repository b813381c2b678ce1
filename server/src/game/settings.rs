use crate::config::{number, Config, ConfigManager};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// Arena and physics settings of one match, in world units and ticks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSettings {
    pub arena_width: f64,
    pub arena_height: f64,
    /// Radius of the polygonal arena; half the width unless given.
    pub arena_radius: f64,

    pub ball_radius: f64,
    /// Ball speed as a percentage of the arena width per second.
    pub ball_speed_width_percent_s: f64,
    /// Ball speed in world units per tick.
    pub ball_speed: f64,
    /// Floor of the ball speed, as a percentage of `ball_speed`.
    pub min_ball_speed_percent: f64,
    pub min_ball_speed: f64,

    pub paddle_offset: f64,
    pub paddle_height: f64,
    pub paddle_coverage_percent: f64,
    /// Paddle speed as a percentage of its amplitude per second.
    pub paddle_speed_width_percent_s: f64,
    /// Paddle speed in percent of its amplitude per tick.
    pub paddle_speed: f64,
    pub paddle_velocity_angular_transmission_percent: f64,
    pub paddle_velocity_speed_transmission_percent: f64,

    pub walls_height: f64,
    pub walls_offset: f64,
    /// Turn of the whole polygon arena around its center, in degrees.
    #[serde(default)]
    pub arena_rotation_deg: f64,

    pub power_up_radius: f64,

    pub ball_reset_sampler: String,
    pub power_up_position_sampler: String,
    #[serde(default)]
    pub power_up_capacities: BTreeMap<String, i64>,
}

impl GameSettings {
    /// Resolves the mode defaults overridden by a custom block.
    ///
    /// `powerUpCapacities` is merged key by key instead of being replaced.
    pub fn resolve(defaults: &Config, custom: &Config, tick_rate: f64) -> Result<Self> {
        let mut custom = custom.clone();
        if let Some(Value::Object(overrides)) = custom.remove("powerUpCapacities") {
            let mut capacities = match defaults.get("powerUpCapacities") {
                Some(Value::Object(base)) => base.clone(),
                _ => Config::new(),
            };
            capacities.extend(overrides);
            custom.insert("powerUpCapacities".into(), Value::Object(capacities));
        }

        let mut manager = ConfigManager::new();
        manager
            .create_derived_property("arenaRadius", |ctx| json!(number(ctx, "arenaWidth") / 2.0), &[])
            .register_property_config(
                "ballSpeed",
                move |_, ctx| {
                    json!(number(ctx, "arenaWidth") * number(ctx, "ballSpeedWidthPercentS") / 100.0 / tick_rate)
                },
                &[],
            )
            .register_property_config(
                "minBallSpeed",
                |_, ctx| json!(number(ctx, "minBallSpeedPercent") * number(ctx, "ballSpeed") / 100.0),
                &["ballSpeed"],
            )
            .register_property_config(
                "paddleSpeed",
                move |_, ctx| json!(number(ctx, "paddleSpeedWidthPercentS") / tick_rate),
                &[],
            );

        manager.resolve(defaults, &custom)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    pub(crate) fn classic_defaults() -> Config {
        match json!({
            "arenaWidth": 200.0,
            "arenaHeight": 100.0,
            "ballRadius": 2.0,
            "ballSpeedWidthPercentS": 60.0,
            "minBallSpeedPercent": 50.0,
            "paddleOffset": 4.0,
            "paddleHeight": 2.0,
            "paddleCoveragePercent": 20.0,
            "paddleSpeedWidthPercentS": 120.0,
            "paddleVelocityAngularTransmissionPercent": 20.0,
            "paddleVelocitySpeedTransmissionPercent": 10.0,
            "wallsHeight": 4.0,
            "wallsOffset": 0.0,
            "powerUpRadius": 3.0,
            "ballResetSampler": "biasedQuadrantGaussianRA",
            "powerUpPositionSampler": "uniformRA",
            "powerUpCapacities": { "speedBoost": 2, "multiBall": 1 }
        }) {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_derived_speeds() {
        let settings = GameSettings::resolve(&classic_defaults(), &Config::new(), 60.0).unwrap();

        assert_approx_eq!(settings.ball_speed, 2.0);
        assert_approx_eq!(settings.min_ball_speed, 1.0);
        assert_approx_eq!(settings.paddle_speed, 2.0);
        assert_approx_eq!(settings.arena_radius, 100.0);
    }

    #[test]
    fn test_custom_overrides_and_capacity_merge() {
        let custom = match json!({
            "ballSpeedWidthPercentS": 30.0,
            "arenaRadius": 40.0,
            "powerUpCapacities": { "multiBall": 3, "blinkingBall": 1 }
        }) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };
        let settings = GameSettings::resolve(&classic_defaults(), &custom, 60.0).unwrap();

        assert_approx_eq!(settings.ball_speed, 1.0);
        assert_approx_eq!(settings.min_ball_speed, 0.5);
        assert_approx_eq!(settings.arena_radius, 40.0);
        assert_eq!(settings.power_up_capacities["speedBoost"], 2);
        assert_eq!(settings.power_up_capacities["multiBall"], 3);
        assert_eq!(settings.power_up_capacities["blinkingBall"], 1);
    }
}
