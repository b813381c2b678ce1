//! Arena geometry and mode-specific rules.

use crate::error::{GameError, Result};
use crate::game::settings::GameSettings;
use crate::game::world::{Paddle, World};
use crate::physics::{Ball, Rectangle, Vector2};
use std::f64::consts::PI;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameMode {
    /// Two players in a rectangle.
    ///
    /// Walls are ordered right goal, top, left goal, bottom, so the goal wall
    /// `w` credits player `w / 2`, the one attacking it.
    Classic,
    /// N players on a regular 2N-gon. Wall `2p` is the goal of player `p`.
    Multiplayer,
}

impl GameMode {
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "classicPong" => Ok(GameMode::Classic),
            "multiplayerPong" => Ok(GameMode::Multiplayer),
            other => Err(GameError::UnknownGameMode(other.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            GameMode::Classic => "classicPong",
            GameMode::Multiplayer => "multiplayerPong",
        }
    }

    pub fn center(&self, settings: &GameSettings) -> Vector2 {
        match self {
            GameMode::Classic => Vector2::new(settings.arena_width / 2.0, settings.arena_height / 2.0),
            GameMode::Multiplayer => Vector2::new(settings.arena_radius, settings.arena_radius),
        }
    }

    /// Paddles and walls of a fresh arena. Balls are added by the first reset.
    pub fn build_world(&self, settings: &GameSettings, player_count: usize) -> World {
        match self {
            GameMode::Classic => World {
                balls: Vec::new(),
                paddles: classic_paddles(settings),
                walls: classic_walls(settings),
            },
            GameMode::Multiplayer => {
                let mut world = World {
                    balls: Vec::new(),
                    paddles: multiplayer_paddles(settings, player_count),
                    walls: multiplayer_walls(settings, player_count),
                };
                let alpha = settings.arena_rotation_deg.to_radians();
                if alpha != 0.0 {
                    rotate_walls(&mut world, settings, alpha);
                    rotate_paddles(&mut world, settings, alpha);
                }
                world
            }
        }
    }

    pub fn is_out_of_bounds(&self, settings: &GameSettings, ball: &Ball) -> bool {
        match self {
            GameMode::Classic => {
                ball.pos.x <= 0.0
                    || ball.pos.x >= settings.arena_width
                    || ball.pos.y <= 0.0
                    || ball.pos.y >= settings.arena_height
            }
            GameMode::Multiplayer => {
                let limit = settings.arena_radius + settings.walls_height + ball.radius;
                ball.pos.distance(&self.center(settings)) >= limit
            }
        }
    }

    /// Final ranking, 1 being the winner.
    pub fn results(&self, scores: &[i64], results: &[u32]) -> Vec<u32> {
        match self {
            GameMode::Classic => {
                let first = if scores.first() > scores.get(1) { 1 } else { 2 };
                vec![first, first % 2 + 1]
            }
            GameMode::Multiplayer => results.iter().map(|r| if *r == 0 { 1 } else { *r }).collect(),
        }
    }

    /// Goal wall a player defends.
    pub fn own_goal_wall(&self, player_id: usize) -> usize {
        match self {
            GameMode::Classic => {
                if player_id == 0 {
                    2
                } else {
                    0
                }
            }
            GameMode::Multiplayer => 2 * player_id,
        }
    }
}

fn classic_paddles(s: &GameSettings) -> Vec<Paddle> {
    let amplitude = s.arena_height - s.walls_height;
    let width = amplitude * s.paddle_coverage_percent / 100.0;
    let x = s.paddle_height / 2.0 + s.paddle_offset;
    let center = Vector2::new(s.arena_width / 2.0, s.arena_height / 2.0);

    [
        (Vector2::new(x, s.arena_height / 2.0), Vector2::new(0.0, -1.0)),
        (Vector2::new(s.arena_width - x, s.arena_height / 2.0), Vector2::new(0.0, 1.0)),
    ]
    .into_iter()
    .map(|(pos, dir)| {
        let mut body = Rectangle::new(pos, dir, width, s.paddle_height);
        body.abs_pos = pos.sub(&center);
        Paddle::new(body, amplitude, s.paddle_coverage_percent, s.paddle_speed)
    })
    .collect()
}

fn classic_walls(s: &GameSettings) -> Vec<Rectangle> {
    let (w, h, t) = (s.arena_width, s.arena_height, s.walls_height);
    let center = Vector2::new(w / 2.0, h / 2.0);

    [
        (Vector2::new(w + t / 2.0, h / 2.0), Vector2::new(0.0, 1.0), h + 2.0 * t, true),
        (Vector2::new(w / 2.0, -t / 2.0), Vector2::new(1.0, 0.0), w + 2.0 * t, false),
        (Vector2::new(-t / 2.0, h / 2.0), Vector2::new(0.0, -1.0), h + 2.0 * t, true),
        (Vector2::new(w / 2.0, h + t / 2.0), Vector2::new(-1.0, 0.0), w + 2.0 * t, false),
    ]
    .into_iter()
    .map(|(pos, dir, width, is_goal)| {
        let mut wall = Rectangle::new(pos, dir, width, t);
        wall.abs_pos = pos.sub(&center);
        wall.is_goal = is_goal;
        wall
    })
    .collect()
}

/// Unit normal pointing from `offset` towards the arena center, with the
/// matching tangent.
fn inward_frame(offset: &Vector2) -> Vector2 {
    let normal = offset.scale(-1.0).normalize();
    Vector2::new(normal.y, -normal.x)
}

fn paddle_amplitude(s: &GameSettings, player_count: usize) -> f64 {
    (s.arena_radius - s.paddle_offset) * (PI / player_count as f64).sin()
}

fn multiplayer_paddles(s: &GameSettings, player_count: usize) -> Vec<Paddle> {
    let amplitude = paddle_amplitude(s, player_count);
    let width = amplitude * s.paddle_coverage_percent / 100.0;
    let radius = s.arena_radius - s.paddle_offset;
    let center = Vector2::new(s.arena_radius, s.arena_radius);

    (0..player_count)
        .map(|index| {
            let angle = PI + 2.0 * PI * index as f64 / player_count as f64;
            let offset = Vector2::from_angle(angle).scale(radius);
            let mut body = Rectangle::new(center.add(&offset), inward_frame(&offset), width, s.paddle_height);
            body.abs_pos = offset;
            Paddle::new(body, amplitude, s.paddle_coverage_percent, s.paddle_speed)
        })
        .collect()
}

fn multiplayer_walls(s: &GameSettings, player_count: usize) -> Vec<Rectangle> {
    let count = 2 * player_count;
    let width = 2.0 * s.arena_radius * (PI / count as f64).sin();
    let center = Vector2::new(s.arena_radius, s.arena_radius);

    let mut walls: Vec<Rectangle> = (0..count)
        .map(|index| {
            let angle = PI + PI * index as f64 / player_count as f64;
            let radius = s.arena_radius - s.walls_offset * (index % 2) as f64;
            let offset = Vector2::from_angle(angle).scale(radius);

            let mut wall = Rectangle::new(center.add(&offset), inward_frame(&offset), width, s.walls_height);
            wall.abs_pos = offset;
            wall.is_goal = index % 2 == 0;
            wall
        })
        .collect();

    // Goals span exactly the gap between their neighbours' inner corners.
    for index in (0..count).step_by(2) {
        let prev = &walls[(index + count - 1) % count];
        let next = &walls[(index + 1) % count];
        let prev_corner = inner_corner(prev, 1.0);
        let next_corner = inner_corner(next, -1.0);
        let gap = prev_corner.distance(&next_corner);
        if gap > 0.0 {
            walls[index].width = gap;
        }
    }

    walls
}

/// Outer corner of `wall` along `side * dir`, on the face turned away from
/// the arena.
pub(crate) fn inner_corner(wall: &Rectangle, side: f64) -> Vector2 {
    wall.pos
        .add(&wall.dir.scale(side * wall.width / 2.0))
        .sub(&wall.normal.scale(wall.height / 2.0))
}

/// Rotates every paddle around the arena center by `alpha`, keeping each
/// paddle's displacement along its track.
pub fn rotate_paddles(world: &mut World, settings: &GameSettings, alpha: f64) {
    let player_count = world.paddles.len();
    if player_count == 0 {
        return;
    }
    let radius = settings.arena_radius - settings.paddle_offset;
    let center = Vector2::new(settings.arena_radius, settings.arena_radius);

    for (index, paddle) in world.paddles.iter_mut().enumerate() {
        if !paddle.body.do_rotation {
            continue;
        }
        let angle = PI + 2.0 * PI * index as f64 / player_count as f64 + alpha;
        let offset = Vector2::from_angle(angle).scale(radius);
        paddle.body.set_dir(inward_frame(&offset));

        let slide = paddle.body.dir.scale(paddle.displacement / 100.0 * paddle.amplitude);
        paddle.body.pos = center.add(&offset).add(&slide);
    }
}

/// Rotates every wall around the arena center by `alpha`, starting from
/// their unrotated positions.
pub fn rotate_walls(world: &mut World, settings: &GameSettings, alpha: f64) {
    let center = Vector2::new(settings.arena_radius, settings.arena_radius);

    for wall in world.walls.iter_mut().filter(|w| w.do_rotation) {
        let offset = wall.abs_pos.rotate(alpha);
        wall.pos = center.add(&offset);
        wall.set_dir(inward_frame(&offset));
    }
}
