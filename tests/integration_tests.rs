//! Integration tests for the simulation core and its network front end
//!
//! These tests drive whole matches through the public API and talk to a real
//! server over UDP.

use assert_approx_eq::assert_approx_eq;
use pong_server::config::{number, Config, ConfigManager};
use pong_server::game::{GameStatus, Pong};
use pong_server::modifier::{ActivationMode, GameEvent, Modifier, ModifierCore};
use pong_server::physics::{ball_rect_collision, resolve_collision, Ball, Rectangle, Vector2, EPSILON};
use pong_server::registry::{GameRegistry, MatchConfig};
use pong_server::rng::Rng;
use pong_shared::{ServerMessage, MAX_DATAGRAM_SIZE};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// PHYSICS TESTS
mod physics_tests {
    use super::*;

    /// Tests mirror reflection off an axis-aligned wall
    #[test]
    fn axis_aligned_reflection() {
        let wall = Rectangle::new(Vector2::new(100.0, -2.0), Vector2::new(1.0, 0.0), 208.0, 4.0);
        let incoming = Vector2::new(1.0, -1.0).normalize();
        let mut ball = Ball::new(Vector2::new(100.0, 10.0), incoming, 2.0, 20.0);

        let (distance, normal) = ball_rect_collision(&ball, ball.speed, &wall).expect("wall not hit");
        assert_approx_eq!(normal.x, 0.0, 1e-9);
        assert_approx_eq!(normal.y, 1.0, 1e-9);

        ball.advance(distance * (1.0 - 2.0 * EPSILON / 100.0));
        resolve_collision(&mut ball, &normal);

        // Angle of incidence equals angle of reflection.
        assert_approx_eq!(incoming.dot(&normal.scale(-1.0)), ball.dir.dot(&normal), 1e-9);
        assert_approx_eq!(incoming.x, ball.dir.x, 1e-9);

        // The ball ends up clear of the struck face.
        let face = wall.pos.y + wall.height / 2.0;
        assert!(ball.pos.y - ball.radius - face >= EPSILON);
    }

    /// Tests that a resolved contact never leaves the ball inside the wall
    #[test]
    fn resolved_contacts_keep_clearance() {
        let wall = Rectangle::new(Vector2::new(-2.0, 50.0), Vector2::new(0.0, -1.0), 108.0, 4.0);

        for step in 1..10 {
            let angle = std::f64::consts::PI - step as f64 * 0.15;
            let mut ball = Ball::new(Vector2::new(12.0, 50.0), Vector2::from_angle(angle), 2.0, 30.0);
            let Some((distance, normal)) = ball_rect_collision(&ball, ball.speed, &wall) else {
                continue;
            };
            ball.advance(distance * (1.0 - 2.0 * EPSILON / 100.0));
            resolve_collision(&mut ball, &normal);

            let signed = wall.to_local(&ball.pos).y.abs() - wall.height / 2.0 - ball.radius;
            assert!(signed >= EPSILON, "angle {} left the ball {} from the wall", angle, signed);
        }
    }
}

/// DETERMINISM AND CONFIGURATION TESTS
mod core_tests {
    use super::*;

    /// Tests that equal seeds give equal draws for the same call sequence
    #[test]
    fn rng_determinism() {
        let draw = |rng: &mut Rng| {
            let mut items: Vec<u32> = (0..10).collect();
            rng.shuffle(&mut items);
            (
                rng.random(),
                rng.random_int(-5, 5),
                rng.random_gaussian(3.0, 1.0),
                rng.random_weighted(&[0.2, 0.5, 0.3]),
                items,
            )
        };

        let mut first = Rng::new(2024);
        let mut second = Rng::new(2024);
        for _ in 0..100 {
            assert_eq!(draw(&mut first), draw(&mut second));
        }
    }

    /// Tests that the same seed replays the same match
    #[test]
    fn seeded_matches_replay() {
        let run = || {
            let mut config = MatchConfig::new("multiplayerPong", 4);
            config.seed = Some(99);
            let mut game = Pong::new(&GameRegistry::builtin().unwrap(), &config).unwrap();
            game.start_game();
            for _ in 0..600 {
                game.update();
            }
            game.state_snapshot()
        };
        assert_eq!(run(), run());
    }

    fn chained(order: &[&str]) -> ConfigManager {
        let mut manager = ConfigManager::new();
        for name in order {
            match *name {
                "a" => manager.register_property_config("a", |value, _| json!(value.as_f64().unwrap_or(0.0) * 2.0), &[]),
                "b" => manager.register_property_config("b", |_, ctx| json!(number(ctx, "a") + 1.0), &["a"]),
                _ => manager.register_property_config("c", |_, ctx| json!(number(ctx, "b") * 10.0), &["b"]),
            };
        }
        manager
    }

    /// Tests that dependent properties resolve the same whatever the order
    #[test]
    fn config_order_independence() {
        let mut forward = Config::new();
        forward.insert("a".into(), json!(3.0));
        forward.insert("b".into(), json!(0.0));
        forward.insert("c".into(), json!(0.0));
        let mut backward = Config::new();
        backward.insert("c".into(), json!(0.0));
        backward.insert("b".into(), json!(0.0));
        backward.insert("a".into(), json!(3.0));

        let expected: Config = chained(&["a", "b", "c"]).resolve(&forward, &Config::new()).unwrap();
        assert_eq!(expected.get("c"), Some(&json!(70.0)));

        for order in [["c", "b", "a"], ["b", "a", "c"], ["c", "a", "b"]] {
            for defaults in [&forward, &backward] {
                let resolved: Config = chained(&order).resolve(defaults, &Config::new()).unwrap();
                for key in ["a", "b", "c"] {
                    assert_eq!(resolved.get(key), expected.get(key), "order {:?}", order);
                }
            }
        }
    }
}

/// BEHAVIOR UNIT TESTS
mod unit_tests {
    use super::*;

    struct CountingTimer {
        core: ModifierCore,
        expirations: Arc<AtomicUsize>,
    }

    impl Modifier for CountingTimer {
        fn core(&self) -> &ModifierCore {
            &self.core
        }

        fn core_mut(&mut self) -> &mut ModifierCore {
            &mut self.core
        }

        fn on_deactivation(&mut self, _game: &mut Pong) -> pong_server::Result<()> {
            self.expirations.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn bare_classic(modifiers: Value, power_ups: bool) -> Pong {
        let mut config = MatchConfig::new("classicPong", 2);
        config.use_default_modifiers = false;
        config.use_default_power_ups = power_ups;
        config.seed = Some(3);
        if let Value::Object(map) = modifiers {
            config.modifiers = map;
        }
        Pong::new(&GameRegistry::builtin().unwrap(), &config).unwrap()
    }

    /// Tests that a time-limited unit expires exactly once
    #[test]
    fn time_limited_unit_expires_once() {
        let expirations = Arc::new(AtomicUsize::new(0));
        let mut game = bare_classic(json!({}), false);
        game.modifiers.add_unit(Box::new(CountingTimer {
            core: ModifierCore::time_limited("countingTimer", ActivationMode::Auto, 5),
            expirations: Arc::clone(&expirations),
        }));
        game.start_game();

        for _ in 0..4 {
            game.update();
        }
        assert_eq!(expirations.load(Ordering::SeqCst), 0);

        game.update();
        assert_eq!(expirations.load(Ordering::SeqCst), 1);

        for _ in 0..50 {
            game.update();
        }
        assert_eq!(expirations.load(Ordering::SeqCst), 1);
    }

    /// Tests a full first-to-7 classic match
    #[test]
    fn first_to_seven_classic_match() {
        let mut game = bare_classic(
            json!({ "goalTakeTracker": {}, "scoredGame": { "goalObjective": 7 } }),
            false,
        );
        game.start_game();

        for goal in 1..=7 {
            let ball = &mut game.world.balls[0];
            ball.pos = Vector2::new(190.0, 20.0);
            ball.dir = Vector2::new(1.0, 0.0);
            ball.speed = 2.0;

            for _ in 0..20 {
                game.update();
                if game.scores[0] == goal {
                    break;
                }
            }
            assert_eq!(game.scores[0], goal);
        }

        assert_eq!(game.status, GameStatus::Finished);
        assert_eq!(game.results()[0], 1);
        assert!(!game.modifiers.has_unit("scoredGame"));

        game.trigger(GameEvent::Goal { player_id: 0 });
        assert_eq!(game.scores[0], 8);
        assert_eq!(game.status, GameStatus::Finished);
        assert_eq!(game.results(), vec![1, 2]);
    }

    /// Tests the power-up distribution under sampling
    #[test]
    fn cdf_never_samples_unavailable_power_ups() {
        let mut game = bare_classic(json!({}), true);
        assert_approx_eq!(*game.modifiers.cdf().last().unwrap(), 1.0, 1e-9);

        assert!(game.spawn_power_up("speedBoost"));
        assert!(game.spawn_power_up("speedBoost"));
        assert_approx_eq!(*game.modifiers.cdf().last().unwrap(), 1.0, 1e-9);

        for _ in 0..10_000 {
            let name = game.modifiers.sample_random_power_up(&mut game.rng).unwrap();
            assert_ne!(name, "speedBoost");
            assert!(game.modifiers.is_available(&name));
        }
    }

    /// Tests that capacity frees up when a picked-up power-up ends
    #[test]
    fn capacity_two_power_up() {
        let mut game = bare_classic(json!({}), true);
        game.start_game();

        assert!(game.spawn_power_up("speedBoost"));
        assert!(game.spawn_power_up("speedBoost"));
        assert!(!game.modifiers.is_available("speedBoost"));
        assert!(!game.spawn_power_up("speedBoost"));

        game.pickup_power_up(0);
        assert!(game.modifiers.has_unit("speedBoost"));
        assert!(!game.modifiers.is_available("speedBoost"));

        // A full ball reset ends the boost, which deletes itself.
        game.trigger(GameEvent::BallReset { ball_id: None });
        assert!(game.modifiers.is_available("speedBoost"));
        assert_eq!(game.modifiers.counter("speedBoost"), 1);
    }
}

/// CLIENT-SERVER INTEGRATION TESTS
mod client_server_tests {
    use super::*;
    use pong_server::network::{Server, ServerConfig};
    use std::net::SocketAddr;
    use std::time::Duration;
    use tokio::net::UdpSocket;
    use tokio::time::timeout;

    async fn start_server(ai_count: usize) -> SocketAddr {
        let mut match_config = MatchConfig::new("classicPong", 2);
        match_config.seed = Some(8);
        let mut config = ServerConfig::new(GameRegistry::builtin().unwrap(), match_config);
        config.ai_count = ai_count;
        config.tick_duration = Some(Duration::from_millis(2));

        let mut server = Server::new("127.0.0.1:0", config).await.unwrap();
        let addr = server.local_addr().unwrap();
        tokio::spawn(async move { server.run().await.unwrap() });
        addr
    }

    async fn receive(socket: &UdpSocket) -> ServerMessage {
        let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
        let (size, _) = timeout(Duration::from_secs(2), socket.recv_from(&mut buf))
            .await
            .expect("server did not answer")
            .unwrap();
        ServerMessage::decode(&buf[..size]).unwrap()
    }

    /// Tests that an unknown message type gets an explicit error back
    #[tokio::test]
    async fn unknown_message_type_gets_error_reply() {
        let server_addr = start_server(0).await;
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();

        socket.send_to(br#"{"type":"teleport","x":4}"#, server_addr).await.unwrap();
        match receive(&socket).await {
            ServerMessage::Error { message } => assert!(message.contains("teleport")),
            other => panic!("Unexpected message: {:?}", other),
        }

        // The connection is still usable afterwards.
        socket.send_to(br#"{"type":"join","playerId":"zoe"}"#, server_addr).await.unwrap();
        assert_eq!(receive(&socket).await, ServerMessage::Joined { waiting_for: 1 });
    }

    /// Tests a human against an AI, with input routed to the right seat
    #[tokio::test]
    async fn match_against_ai_broadcasts_state() {
        let server_addr = start_server(1).await;
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();

        socket.send_to(br#"{"type":"join","playerId":"zoe"}"#, server_addr).await.unwrap();
        assert_eq!(receive(&socket).await, ServerMessage::Joined { waiting_for: 0 });

        let table = match receive(&socket).await {
            ServerMessage::GameStarted { reference_table } => reference_table,
            other => panic!("Unexpected message: {:?}", other),
        };
        assert!(table.contains(&"zoe".to_string()));
        assert!(table.contains(&"ai-0".to_string()));

        let input = json!({
            "type": "userInput",
            "options": { "type": "UP", "timestamp": 1, "playerId": 7 }
        });
        socket.send_to(&serde_json::to_vec(&input).unwrap(), server_addr).await.unwrap();

        let mut states = 0;
        while states < 5 {
            if let ServerMessage::GameState { data, reference_table } = receive(&socket).await {
                assert_eq!(reference_table, table);
                assert_eq!(data.paddles.len(), 2);
                states += 1;
            }
        }
    }
}
