//! Parameter-block resolution for behavior units and game modes.
//!
//! Every configurable unit describes its parameters as a JSON object. A
//! [`ConfigManager`] knows which properties need a transformation (seconds to
//! ticks, percent to factor, values derived from sibling properties) and
//! in which order those transformations have to run. The resolved object is
//! finally deserialized into the unit's typed settings struct.

use crate::error::Result;
use log::warn;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// A raw parameter block.
pub type Config = Map<String, Value>;

/// Maps the current value of a property to its resolved value. The second
/// argument is the resolution context: the raw configuration overlaid with
/// every property resolved so far.
pub type Transform = Box<dyn Fn(&Value, &Config) -> Value + Send + Sync>;

struct PropertyConfig {
    name: String,
    from_config: Transform,
    dependencies: Vec<String>,
}

#[derive(Default)]
pub struct ConfigManager {
    properties: Vec<PropertyConfig>,
}

impl ConfigManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) the transformation of `name`.
    pub fn register_property_config<F>(
        &mut self,
        name: &str,
        from_config: F,
        dependencies: &[&str],
    ) -> &mut Self
    where
        F: Fn(&Value, &Config) -> Value + Send + Sync + 'static,
    {
        self.properties.retain(|p| p.name != name);
        self.properties.push(PropertyConfig {
            name: name.to_string(),
            from_config: Box::new(from_config),
            dependencies: dependencies.iter().map(|d| d.to_string()).collect(),
        });
        self
    }

    /// Registers a property that keeps an explicitly provided value and is
    /// otherwise derived from its dependencies.
    pub fn create_derived_property<F>(
        &mut self,
        name: &str,
        derive: F,
        dependencies: &[&str],
    ) -> &mut Self
    where
        F: Fn(&Config) -> Value + Send + Sync + 'static,
    {
        self.register_property_config(
            name,
            move |value, context| {
                if value.is_null() {
                    derive(context)
                } else {
                    value.clone()
                }
            },
            dependencies,
        )
    }

    pub fn has_property_config(&self, name: &str) -> bool {
        self.properties.iter().any(|p| p.name == name)
    }

    /// Single-pass load.
    ///
    /// Keys unknown to the container are ignored. Keys with a registered
    /// transformation are transformed with the raw configuration as context,
    /// except those declaring at least one dependency, which are skipped
    /// because their dependencies are not resolved in this mode. An empty
    /// dependency list declares no dependency. Returns the keys that
    /// were written.
    pub fn load_simple_config_into_container(
        &self,
        config: &Config,
        container: &mut Config,
    ) -> BTreeSet<String> {
        let mut written = BTreeSet::new();

        for (key, value) in config {
            if !container.contains_key(key) {
                continue;
            }

            match self.properties.iter().find(|p| &p.name == key) {
                Some(property) if !property.dependencies.is_empty() => continue,
                Some(property) => {
                    container.insert(key.clone(), (property.from_config)(value, config));
                }
                None => {
                    container.insert(key.clone(), value.clone());
                }
            }
            written.insert(key.clone());
        }

        written
    }

    /// Two-phase load: raw assignment of every known key, then dependency
    /// ordered transformation. Returns the properties left unresolved by a
    /// dependency cycle; those keep their raw value.
    pub fn load_complex_config_into_container(
        &self,
        config: &Config,
        container: &mut Config,
    ) -> Vec<String> {
        for (key, value) in config {
            if container.contains_key(key) {
                container.insert(key.clone(), value.clone());
            }
        }

        self.apply_transformations_into_container(config, container)
    }

    /// Fixed-point resolution of every registered transformation.
    ///
    /// Each pass applies the transformations whose dependencies are all
    /// resolved (or are not transformations at all). A pass without progress
    /// means the remaining properties form a cycle.
    pub fn apply_transformations_into_container(
        &self,
        config: &Config,
        container: &mut Config,
    ) -> Vec<String> {
        let registered: BTreeSet<&str> = self.properties.iter().map(|p| p.name.as_str()).collect();
        let mut processed: BTreeSet<&str> = BTreeSet::new();
        let mut pending: Vec<&PropertyConfig> = self.properties.iter().collect();
        let mut context = config.clone();

        while !pending.is_empty() {
            let mut progress = false;
            let mut index = 0;

            while index < pending.len() {
                let property = pending[index];
                let ready = property
                    .dependencies
                    .iter()
                    .all(|d| processed.contains(d.as_str()) || !registered.contains(d.as_str()));

                if !ready {
                    index += 1;
                    continue;
                }

                let current = container.get(&property.name).cloned().unwrap_or(Value::Null);
                context.insert(property.name.clone(), current.clone());

                let resolved = (property.from_config)(&current, &context);
                context.insert(property.name.clone(), resolved.clone());
                container.insert(property.name.clone(), resolved);

                processed.insert(property.name.as_str());
                pending.remove(index);
                progress = true;
            }

            if !progress {
                let unresolved: Vec<String> = pending.iter().map(|p| p.name.clone()).collect();
                warn!("Cannot resolve transformations for: {:?}", unresolved);
                return unresolved;
            }
        }

        Vec::new()
    }

    /// Merges `custom` over `defaults`, resolves every transformation and
    /// deserializes the result.
    ///
    /// Custom keys that are neither defaults nor registered properties are
    /// ignored with a warning.
    pub fn resolve<T: DeserializeOwned>(&self, defaults: &Config, custom: &Config) -> Result<T> {
        let mut merged = defaults.clone();
        for (key, value) in custom {
            if merged.contains_key(key) || self.has_property_config(key) {
                merged.insert(key.clone(), value.clone());
            } else {
                warn!("Ignoring unknown parameter `{}`", key);
            }
        }

        let mut container = merged.clone();
        for property in &self.properties {
            container.entry(property.name.clone()).or_insert(Value::Null);
        }

        self.load_complex_config_into_container(&merged, &mut container);
        Ok(serde_json::from_value(Value::Object(container))?)
    }
}

/// Reads a numeric property, treating anything else as zero.
pub fn number(config: &Config, key: &str) -> f64 {
    config.get(key).and_then(Value::as_f64).unwrap_or(0.0)
}

/// Transformation reading a duration in seconds from `source` and turning it
/// into a whole number of ticks.
pub fn seconds_to_ticks(
    source: &'static str,
    tick_rate: f64,
) -> impl Fn(&Value, &Config) -> Value + Send + Sync + 'static {
    move |_, context| Value::from((number(context, source) * tick_rate).round() as i64)
}

/// Transformation reading a percentage from `source` and turning it into a
/// factor.
pub fn percent_to_factor(
    source: &'static str,
) -> impl Fn(&Value, &Config) -> Value + Send + Sync + 'static {
    move |_, context| Value::from(number(context, source) / 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use serde::Deserialize;
    use serde_json::json;

    fn object(value: Value) -> Config {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    fn chain_manager(order: &[&str]) -> ConfigManager {
        let mut manager = ConfigManager::new();
        for name in order {
            match *name {
                "ballSpeed" => {
                    manager.register_property_config(
                        "ballSpeed",
                        |_, ctx| json!(number(ctx, "arenaWidth") * number(ctx, "ballSpeedPercent") / 100.0),
                        &[],
                    );
                }
                "minBallSpeed" => {
                    manager.register_property_config(
                        "minBallSpeed",
                        |value, ctx| {
                            json!(value.as_f64().unwrap_or(0.0) * number(ctx, "ballSpeed") / 100.0)
                        },
                        &["ballSpeed"],
                    );
                }
                "resetSpeed" => {
                    manager.register_property_config(
                        "resetSpeed",
                        |_, ctx| json!(number(ctx, "minBallSpeed") * 2.0),
                        &["minBallSpeed"],
                    );
                }
                _ => unreachable!(),
            }
        }
        manager
    }

    #[test]
    fn test_simple_load_assigns_and_transforms() {
        let mut manager = ConfigManager::new();
        manager.register_property_config("delay", seconds_to_ticks("delay", 20.0), &[]);

        let mut container = object(json!({ "delay": 0, "goalObjective": 5 }));
        let config = object(json!({ "delay": 1.5, "goalObjective": 7, "unknown": true }));

        let written = manager.load_simple_config_into_container(&config, &mut container);

        assert_eq!(container["delay"], json!(30));
        assert_eq!(container["goalObjective"], json!(7));
        assert!(!container.contains_key("unknown"));
        assert_eq!(written.len(), 2);
    }

    #[test]
    fn test_simple_load_skips_dependent_properties() {
        let manager = chain_manager(&["ballSpeed", "minBallSpeed"]);
        let mut container = object(json!({ "minBallSpeed": 1.0 }));
        let config = object(json!({ "minBallSpeed": 50.0 }));

        let written = manager.load_simple_config_into_container(&config, &mut container);

        assert!(written.is_empty());
        assert_eq!(container["minBallSpeed"], json!(1.0));
    }

    #[test]
    fn test_simple_load_transforms_empty_dependency_list() {
        let mut manager = ConfigManager::new();
        manager.register_property_config("factor", percent_to_factor("factor"), &[]);
        let mut container = object(json!({ "factor": 0.0 }));
        let config = object(json!({ "factor": 25.0 }));

        let written = manager.load_simple_config_into_container(&config, &mut container);

        assert!(written.contains("factor"));
        assert_approx_eq!(container["factor"].as_f64().unwrap(), 0.25, 1e-12);
    }

    #[test]
    fn test_complex_load_resolves_chain() {
        let manager = chain_manager(&["resetSpeed", "minBallSpeed", "ballSpeed"]);
        let config = object(json!({ "arenaWidth": 200.0, "ballSpeedPercent": 50.0, "minBallSpeed": 10.0 }));
        let mut container = object(json!({
            "arenaWidth": 0.0, "ballSpeedPercent": 0.0,
            "ballSpeed": null, "minBallSpeed": null, "resetSpeed": null
        }));

        let unresolved = manager.load_complex_config_into_container(&config, &mut container);

        assert!(unresolved.is_empty());
        assert_approx_eq!(container["ballSpeed"].as_f64().unwrap(), 100.0, 1e-9);
        assert_approx_eq!(container["minBallSpeed"].as_f64().unwrap(), 10.0, 1e-9);
        assert_approx_eq!(container["resetSpeed"].as_f64().unwrap(), 20.0, 1e-9);
    }

    #[test]
    fn test_complex_load_is_order_independent() {
        let orders: [[&str; 3]; 3] = [
            ["ballSpeed", "minBallSpeed", "resetSpeed"],
            ["resetSpeed", "minBallSpeed", "ballSpeed"],
            ["minBallSpeed", "resetSpeed", "ballSpeed"],
        ];
        let configs = [
            object(json!({ "arenaWidth": 300.0, "ballSpeedPercent": 20.0, "minBallSpeed": 40.0 })),
            object(json!({ "minBallSpeed": 40.0, "ballSpeedPercent": 20.0, "arenaWidth": 300.0 })),
            object(json!({ "ballSpeedPercent": 20.0, "minBallSpeed": 40.0, "arenaWidth": 300.0 })),
        ];

        let mut results = Vec::new();
        for order in &orders {
            for config in &configs {
                let manager = chain_manager(order);
                let mut container = object(json!({
                    "arenaWidth": 0.0, "ballSpeedPercent": 0.0,
                    "ballSpeed": null, "minBallSpeed": null, "resetSpeed": null
                }));
                manager.load_complex_config_into_container(config, &mut container);
                results.push(Value::Object(container));
            }
        }

        let mut sorted: Vec<String> = results
            .iter()
            .map(|r| {
                let map = r.as_object().unwrap();
                let mut keys: Vec<_> = map.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
                keys.sort();
                keys.join(",")
            })
            .collect();
        sorted.dedup();
        assert_eq!(sorted.len(), 1);
    }

    #[test]
    fn test_cycle_keeps_raw_values() {
        let mut manager = ConfigManager::new();
        manager.register_property_config("a", |_, ctx| json!(number(ctx, "b") + 1.0), &["b"]);
        manager.register_property_config("b", |_, ctx| json!(number(ctx, "a") + 1.0), &["a"]);
        manager.register_property_config("c", |v, _| json!(v.as_f64().unwrap_or(0.0) * 2.0), &[]);

        let config = object(json!({ "a": 1.0, "b": 2.0, "c": 3.0 }));
        let mut container = object(json!({ "a": 0.0, "b": 0.0, "c": 0.0 }));

        let unresolved = manager.load_complex_config_into_container(&config, &mut container);

        assert_eq!(unresolved, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(container["a"], json!(1.0));
        assert_eq!(container["b"], json!(2.0));
        assert_eq!(container["c"], json!(6.0));
    }

    #[test]
    fn test_derived_property_prefers_explicit_value() {
        let mut manager = ConfigManager::new();
        manager.create_derived_property("arenaRadius", |ctx| json!(number(ctx, "arenaWidth") / 2.0), &[]);

        let mut container = object(json!({ "arenaWidth": 100.0, "arenaRadius": null }));
        let config = container.clone();
        manager.load_complex_config_into_container(&config, &mut container);
        assert_eq!(container["arenaRadius"], json!(50.0));

        let mut container = object(json!({ "arenaWidth": 100.0, "arenaRadius": 30.0 }));
        let config = container.clone();
        manager.load_complex_config_into_container(&config, &mut container);
        assert_eq!(container["arenaRadius"], json!(30.0));
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct BlinkSettings {
        blink_interval: i64,
        blink_duration: f64,
    }

    #[test]
    fn test_resolve_into_typed_settings() {
        let mut manager = ConfigManager::new();
        manager.register_property_config("blinkInterval", seconds_to_ticks("blinkIntervalS", 20.0), &[]);
        manager.register_property_config(
            "blinkDuration",
            |_, ctx| json!(number(ctx, "blinkDurationPercent") / 100.0 * number(ctx, "blinkInterval")),
            &["blinkInterval"],
        );

        let defaults = object(json!({ "blinkIntervalS": 1.0, "blinkDurationPercent": 50.0 }));
        let custom = object(json!({ "blinkIntervalS": 2.0, "bogus": 1 }));

        let settings: BlinkSettings = manager.resolve(&defaults, &custom).unwrap();
        assert_eq!(settings.blink_interval, 40);
        assert_approx_eq!(settings.blink_duration, 20.0, 1e-9);
    }
}
