//! Physical state of a match: balls, paddles and walls.
//!
//! [`World`] knows how things move and bounce but nothing about scoring.
//! It is cheap to clone, which is how AI opponents look ahead.

use crate::game::settings::GameSettings;
use crate::modifier::UnitId;
use crate::modifier_manager::SpawnedPowerUp;
use crate::physics::{
    detect_collision, earliest, push_out_of_rectangle, resolve_collision, Ball, Collider,
    CollisionKind, Rectangle, Vector2, EPSILON,
};

/// Keys currently held by a player.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyState {
    pub up: bool,
    pub down: bool,
    pub space: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Paddle {
    pub body: Rectangle,
    /// Signed speed in percent of `amplitude` per tick.
    pub velocity: f64,
    /// Offset from the rest position in percent of `amplitude`.
    pub displacement: f64,
    pub max_displacement: f64,
    /// Length of the track the paddle slides along.
    pub amplitude: f64,
    pub coverage: f64,
    pub speed: f64,
    pub do_move: bool,
    pub keys: KeyState,
}

impl Paddle {
    pub fn new(body: Rectangle, amplitude: f64, coverage_percent: f64, speed: f64) -> Self {
        Paddle {
            body,
            velocity: 0.0,
            displacement: 0.0,
            max_displacement: (100.0 - coverage_percent) / 2.0,
            amplitude,
            coverage: coverage_percent,
            speed,
            do_move: true,
            keys: KeyState::default(),
        }
    }

    /// Velocity implied by the held keys.
    pub fn apply_keys(&mut self) {
        let up = if self.keys.up { self.speed } else { 0.0 };
        let down = if self.keys.down { self.speed } else { 0.0 };
        self.velocity = up - down;
    }

    /// Moves the paddle one tick along its track, clamped to the allowed
    /// displacement. Returns the world-space movement.
    pub fn slide(&mut self) -> Vector2 {
        let target = (self.displacement + self.velocity).clamp(-self.max_displacement, self.max_displacement);
        let delta = (target - self.displacement).abs();
        let sign = self.velocity.signum();

        let movement = self.body.dir.scale(sign * delta / 100.0 * self.amplitude);
        self.body.pos = self.body.pos.add(&movement);
        self.displacement = target;
        movement
    }
}

impl Collider for Paddle {
    fn is_collidable(&self) -> bool {
        self.body.is_collidable()
    }

    fn sweep(&self, ball: &Ball, distance: f64) -> Option<(f64, Vector2)> {
        self.body.sweep(ball, distance)
    }
}

/// What a ball ran into during one sub-step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Contact {
    PowerUp { index: usize },
    Paddle { player_id: usize },
    Wall { wall_id: usize, is_goal: bool },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct World {
    pub balls: Vec<Ball>,
    pub paddles: Vec<Paddle>,
    pub walls: Vec<Rectangle>,
}

impl World {
    /// Slides a paddle and pushes out any ball it now overlaps. Balls moving
    /// into the paddle are bounced off it.
    pub fn move_paddle(&mut self, player_id: usize) {
        let Some(paddle) = self.paddles.get_mut(player_id) else {
            return;
        };
        if !paddle.do_move {
            return;
        }
        paddle.slide();
        self.push_balls_out_of(player_id);
    }

    /// Moves a paddle off its track by `offset`, pushing out any ball it
    /// now overlaps.
    pub fn shift_paddle(&mut self, player_id: usize, offset: Vector2) {
        let Some(paddle) = self.paddles.get_mut(player_id) else {
            return;
        };
        paddle.body.pos = paddle.body.pos.add(&offset);
        self.push_balls_out_of(player_id);
    }

    fn push_balls_out_of(&mut self, player_id: usize) {
        let Some(paddle) = self.paddles.get(player_id) else {
            return;
        };
        if !paddle.body.is_collidable() {
            return;
        }
        let body = &paddle.body;
        for ball in self.balls.iter_mut() {
            if let Some(push) = push_out_of_rectangle(ball, body) {
                if ball.dir.dot(&push) < 0.0 {
                    resolve_collision(ball, &push);
                }
            }
        }
    }

    /// Appends walls placed by a unit. Unit walls always come after the
    /// arena outline, so goal indices never move. They never rotate with the
    /// arena.
    pub fn add_unit_walls(&mut self, owner: UnitId, walls: Vec<Rectangle>) {
        self.walls.extend(walls.into_iter().map(|mut wall| {
            wall.owner = Some(owner);
            wall.is_goal = false;
            wall.do_rotation = false;
            wall
        }));
    }

    /// Removes every wall placed by `owner`. Returns how many were removed.
    pub fn remove_unit_walls(&mut self, owner: UnitId) -> usize {
        let before = self.walls.len();
        self.walls.retain(|wall| wall.owner != Some(owner));
        before - self.walls.len()
    }

    /// Indices of the walls placed by `owner`, in placement order.
    pub fn unit_wall_ids(&self, owner: UnitId) -> Vec<usize> {
        self.walls
            .iter()
            .enumerate()
            .filter(|(_, wall)| wall.owner == Some(owner))
            .map(|(index, _)| index)
            .collect()
    }

    /// Position of `wall_id` among the walls of `owner`, if it is one.
    pub fn unit_wall_rank(&self, owner: UnitId, wall_id: usize) -> Option<usize> {
        self.unit_wall_ids(owner).iter().position(|id| *id == wall_id)
    }

    /// Advances a ball until its first contact within `remaining`.
    ///
    /// Without contact the ball travels the whole distance (minus a small
    /// safety margin) and `None` is returned. Otherwise the ball stops just
    /// short of the contact, bounces off paddles and walls, and the contact
    /// is returned along with the distance travelled.
    pub fn step_ball(
        &mut self,
        ball_id: usize,
        remaining: f64,
        power_ups: &[SpawnedPowerUp],
        settings: &GameSettings,
    ) -> Option<(Contact, f64)> {
        let ball = self.balls.get(ball_id)?;

        let collision = earliest([
            detect_collision(ball, remaining, &self.paddles, CollisionKind::Paddle),
            detect_collision(ball, remaining, &self.walls, CollisionKind::Wall),
            detect_collision(ball, remaining, power_ups, CollisionKind::PowerUp),
        ]);

        let ball = self.balls.get_mut(ball_id)?;
        let Some(collision) = collision else {
            ball.advance(remaining * (1.0 - EPSILON / 100.0));
            return None;
        };

        let pass_through = collision.kind == CollisionKind::Wall
            && !self.walls[collision.object_index].do_resolve_collision;
        // A pass-through wall is entered slightly so later sweeps ignore it.
        let travelled = if pass_through {
            collision.distance + 2.0 * EPSILON
        } else {
            collision.distance * (1.0 - 2.0 * EPSILON / 100.0)
        };
        ball.advance(travelled);

        let contact = match collision.kind {
            CollisionKind::PowerUp => Contact::PowerUp {
                index: collision.object_index,
            },
            CollisionKind::Paddle => {
                resolve_collision(ball, &collision.normal);

                let paddle = &self.paddles[collision.object_index];
                let dot = ball.dir.dot(&paddle.body.dir);
                let angular = dot * settings.paddle_velocity_angular_transmission_percent / 100.0;
                let transmitted = dot * settings.paddle_velocity_speed_transmission_percent / 100.0;

                ball.dir = ball.dir.add(&paddle.body.dir.scale(angular)).normalize();
                ball.speed = (ball.speed + transmitted * paddle.velocity).max(0.0);

                Contact::Paddle {
                    player_id: collision.object_index,
                }
            }
            CollisionKind::Wall => {
                let wall = &self.walls[collision.object_index];
                if wall.do_resolve_collision {
                    resolve_collision(ball, &collision.normal);
                }
                Contact::Wall {
                    wall_id: collision.object_index,
                    is_goal: wall.is_goal && ball.do_goal,
                }
            }
        };

        Some((contact, travelled))
    }

    /// Moves a ball through a whole tick without any game logic. Stops at
    /// goals.
    pub fn coast_ball(&mut self, ball_id: usize, settings: &GameSettings) {
        let Some(ball) = self.balls.get(ball_id) else {
            return;
        };
        let mut remaining = ball.speed;
        let cap = substep_cap(ball.speed);
        let mut iterations = 0;

        while remaining > EPSILON && iterations < cap {
            iterations += 1;
            match self.step_ball(ball_id, remaining, &[], settings) {
                None => break,
                Some((Contact::Wall { is_goal: true, .. }, _)) => break,
                Some((_, travelled)) => remaining -= travelled,
            }
        }
    }

    /// One tick of pure motion, used for look-ahead.
    pub fn simulate_tick(&mut self, settings: &GameSettings) {
        for player_id in 0..self.paddles.len() {
            if self.paddles[player_id].velocity != 0.0 {
                self.move_paddle(player_id);
            }
        }
        for ball_id in 0..self.balls.len() {
            if self.balls[ball_id].do_collision {
                self.coast_ball(ball_id, settings);
            }
        }
    }
}

/// Upper bound on sub-steps for a ball moving `speed` per tick.
pub fn substep_cap(speed: f64) -> usize {
    (speed * 3.0).max(0.0) as usize + 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::settings::tests::classic_defaults;
    use crate::config::Config;
    use assert_approx_eq::assert_approx_eq;

    fn settings() -> GameSettings {
        GameSettings::resolve(&classic_defaults(), &Config::new(), 60.0).unwrap()
    }

    fn vertical_paddle(x: f64) -> Paddle {
        let body = Rectangle::new(Vector2::new(x, 50.0), Vector2::new(0.0, 1.0), 20.0, 2.0);
        Paddle::new(body, 100.0, 20.0, 2.0)
    }

    #[test]
    fn test_paddle_slide_is_clamped() {
        let mut paddle = vertical_paddle(10.0);
        paddle.keys.up = true;
        paddle.apply_keys();
        assert_approx_eq!(paddle.velocity, 2.0);

        let movement = paddle.slide();
        assert_approx_eq!(movement.y, 2.0);
        assert_approx_eq!(paddle.displacement, 2.0);

        for _ in 0..100 {
            paddle.slide();
        }
        assert_approx_eq!(paddle.displacement, 40.0);
        assert_approx_eq!(paddle.body.pos.y, 90.0);

        paddle.keys.down = true;
        paddle.apply_keys();
        assert_eq!(paddle.velocity, 0.0);
    }

    #[test]
    fn test_paddle_pushes_ball_out() {
        let mut world = World {
            balls: vec![Ball::new(Vector2::new(10.0, 62.5), Vector2::new(0.0, -1.0), 1.0, 1.0)],
            paddles: vec![vertical_paddle(10.0)],
            walls: vec![],
        };
        world.paddles[0].velocity = 2.0;
        world.move_paddle(0);

        let ball = &world.balls[0];
        assert!(!world.paddles[0].body.overlaps(ball));
        assert!(ball.dir.y > 0.0);
    }

    #[test]
    fn test_step_ball_bounces_off_paddle() {
        let settings = settings();
        let mut world = World {
            balls: vec![Ball::new(Vector2::new(30.0, 50.0), Vector2::new(-1.0, 0.0), 1.0, 30.0)],
            paddles: vec![vertical_paddle(10.0)],
            walls: vec![],
        };

        let (contact, travelled) = world.step_ball(0, 30.0, &[], &settings).unwrap();
        assert_eq!(contact, Contact::Paddle { player_id: 0 });
        assert!(travelled < 18.0);
        assert!(world.balls[0].dir.x > 0.0);
    }

    #[test]
    fn test_goal_contact_requires_scoring_ball() {
        let settings = settings();
        let mut goal = Rectangle::new(Vector2::new(-2.0, 50.0), Vector2::new(0.0, -1.0), 108.0, 4.0);
        goal.is_goal = true;

        let mut ball = Ball::new(Vector2::new(5.0, 50.0), Vector2::new(-1.0, 0.0), 1.0, 10.0);
        let mut world = World {
            balls: vec![ball.clone()],
            paddles: vec![],
            walls: vec![goal.clone()],
        };
        let (contact, _) = world.step_ball(0, 10.0, &[], &settings).unwrap();
        assert_eq!(contact, Contact::Wall { wall_id: 0, is_goal: true });

        ball.do_goal = false;
        let mut world = World {
            balls: vec![ball],
            paddles: vec![],
            walls: vec![goal],
        };
        let (contact, _) = world.step_ball(0, 10.0, &[], &settings).unwrap();
        assert_eq!(contact, Contact::Wall { wall_id: 0, is_goal: false });
    }

    #[test]
    fn test_pass_through_wall_reports_contact_only() {
        let settings = settings();
        let mut gate = Rectangle::new(Vector2::new(40.0, 50.0), Vector2::new(0.0, 1.0), 20.0, 1.0);
        gate.do_resolve_collision = false;
        let mut world = World {
            balls: vec![Ball::new(Vector2::new(30.0, 50.0), Vector2::new(1.0, 0.0), 1.0, 20.0)],
            paddles: vec![],
            walls: vec![gate],
        };

        let (contact, travelled) = world.step_ball(0, 20.0, &[], &settings).unwrap();
        assert_eq!(contact, Contact::Wall { wall_id: 0, is_goal: false });
        assert_approx_eq!(world.balls[0].dir.x, 1.0);

        // Already inside the gate, the ball now flies through it.
        assert!(world.step_ball(0, 20.0 - travelled, &[], &settings).is_none());
        assert!(world.balls[0].pos.x > 41.0);
    }

    #[test]
    fn test_unit_walls_follow_the_outline() {
        let outline = Rectangle::new(Vector2::new(0.0, 50.0), Vector2::new(0.0, -1.0), 100.0, 4.0);
        let mut world = World {
            walls: vec![outline.clone(), outline.clone()],
            ..World::default()
        };
        let first = UnitId(3);
        let second = UnitId(4);

        world.add_unit_walls(first, vec![outline.clone(), outline.clone()]);
        world.add_unit_walls(second, vec![outline.clone()]);
        assert_eq!(world.unit_wall_ids(first), vec![2, 3]);
        assert_eq!(world.unit_wall_rank(second, 4), Some(0));
        assert_eq!(world.unit_wall_rank(second, 3), None);

        assert_eq!(world.remove_unit_walls(first), 2);
        assert_eq!(world.walls.len(), 3);
        assert_eq!(world.unit_wall_ids(second), vec![2]);
        assert!(world.walls[..2].iter().all(|w| w.owner.is_none()));
    }

    #[test]
    fn test_free_flight_covers_distance() {
        let settings = settings();
        let mut world = World {
            balls: vec![Ball::new(Vector2::new(50.0, 50.0), Vector2::new(1.0, 0.0), 1.0, 5.0)],
            ..World::default()
        };
        assert!(world.step_ball(0, 5.0, &[], &settings).is_none());
        assert_approx_eq!(world.balls[0].pos.x, 55.0, 0.01);
    }

    #[test]
    fn test_simulate_tick_moves_everything() {
        let settings = settings();
        let mut world = World {
            balls: vec![Ball::new(Vector2::new(50.0, 50.0), Vector2::new(1.0, 0.0), 1.0, 5.0)],
            paddles: vec![vertical_paddle(10.0)],
            walls: vec![],
        };
        world.paddles[0].velocity = -2.0;
        world.simulate_tick(&settings);

        assert!(world.balls[0].pos.x > 54.0);
        assert_approx_eq!(world.paddles[0].body.pos.y, 48.0);
    }
}
