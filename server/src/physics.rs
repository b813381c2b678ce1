//! Swept collision math for balls against oriented rectangles and circles.
//!
//! Everything here is pure: queries take the moving ball and a sweep
//! distance and report the earliest contact, resolution mutates only the
//! ball. The tick loop in [`crate::game`] decides what a contact means.

use crate::modifier::UnitId;
use serde::Serialize;

/// World-scale tolerance. Contacts closer than this are ignored and resolved
/// balls are pushed `10 * EPSILON` away from the struck surface.
pub const EPSILON: f64 = 1e-2;

///Represents a vector in 2D space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Default)]
pub struct Vector2 {
    pub x: f64,
    pub y: f64,
}

impl Vector2 {
    pub const fn new(x: f64, y: f64) -> Self {
        Vector2 { x, y }
    }

    /// Unit vector pointing at `angle` radians.
    pub fn from_angle(angle: f64) -> Self {
        Vector2 {
            x: angle.cos(),
            y: angle.sin(),
        }
    }

    ///Returns the magnitude of the vector.
    pub fn magnitude(&self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    ///Returns the normalized vector.
    pub fn normalize(&self) -> Vector2 {
        let mag = self.magnitude();
        if mag == 0.0 {
            Vector2 { x: 0.0, y: 0.0 }
        } else {
            Vector2 {
                x: self.x / mag,
                y: self.y / mag,
            }
        }
    }

    ///Returns the scaled vector.
    pub fn scale(&self, scalar: f64) -> Vector2 {
        Vector2 {
            x: self.x * scalar,
            y: self.y * scalar,
        }
    }

    ///Returns the sum of two vectors.
    pub fn add(&self, other: &Vector2) -> Vector2 {
        Vector2 {
            x: self.x + other.x,
            y: self.y + other.y,
        }
    }

    pub fn sub(&self, other: &Vector2) -> Vector2 {
        Vector2 {
            x: self.x - other.x,
            y: self.y - other.y,
        }
    }

    pub fn dot(&self, other: &Vector2) -> f64 {
        self.x * other.x + self.y * other.y
    }

    pub fn distance(&self, other: &Vector2) -> f64 {
        self.sub(other).magnitude()
    }

    /// Counter-clockwise rotation by `angle` radians.
    pub fn rotate(&self, angle: f64) -> Vector2 {
        let (sa, ca) = angle.sin_cos();
        Vector2 {
            x: self.x * ca - self.y * sa,
            y: self.x * sa + self.y * ca,
        }
    }

    /// Angle of the vector in radians.
    pub fn angle(&self) -> f64 {
        self.y.atan2(self.x)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ball {
    pub pos: Vector2,
    /// Unit direction of travel.
    pub dir: Vector2,
    pub radius: f64,
    /// Distance travelled per tick.
    pub speed: f64,
    pub is_visible: bool,
    pub do_collision: bool,
    /// Whether the ball scores when it enters a goal. Extra balls spawned by
    /// power-ups only bounce.
    pub do_goal: bool,
}

impl Ball {
    pub fn new(pos: Vector2, dir: Vector2, radius: f64, speed: f64) -> Self {
        Ball {
            pos,
            dir: dir.normalize(),
            radius,
            speed,
            is_visible: true,
            do_collision: true,
            do_goal: true,
        }
    }

    pub fn velocity(&self) -> Vector2 {
        self.dir.scale(self.speed)
    }

    /// Moves the ball `distance` along its direction.
    pub fn advance(&mut self, distance: f64) {
        self.pos = self.pos.add(&self.dir.scale(distance));
    }
}

/// Oriented rectangle. `width` runs along `dir`, `height` along `normal`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rectangle {
    pub pos: Vector2,
    pub dir: Vector2,
    pub normal: Vector2,
    /// Rendering angle: direction the back of the rectangle faces.
    pub alpha: f64,
    pub width: f64,
    pub height: f64,
    /// Position before any arena rotation, relative to the arena center.
    pub abs_pos: Vector2,
    pub is_visible: bool,
    pub do_collision: bool,
    pub do_rotation: bool,
    pub is_goal: bool,
    /// Whether a ball bounces off it. Balls pass through walls that only
    /// report contacts.
    pub do_resolve_collision: bool,
    /// Unit that placed the wall, `None` for the arena outline.
    pub owner: Option<UnitId>,
}

impl Rectangle {
    pub fn new(pos: Vector2, dir: Vector2, width: f64, height: f64) -> Self {
        let mut rect = Rectangle {
            pos,
            dir: Vector2::default(),
            normal: Vector2::default(),
            alpha: 0.0,
            width,
            height,
            abs_pos: pos,
            is_visible: true,
            do_collision: true,
            do_rotation: true,
            is_goal: false,
            do_resolve_collision: true,
            owner: None,
        };
        rect.set_dir(dir);
        rect
    }

    /// Re-orients the rectangle. The normal is `dir` turned a quarter
    /// counter-clockwise; `alpha` is the angle of the opposite of the normal,
    /// in `[0, 2π)`.
    pub fn set_dir(&mut self, dir: Vector2) {
        self.dir = dir.normalize();
        self.normal = Vector2::new(-self.dir.y, self.dir.x);
        self.alpha = self.normal.scale(-1.0).angle().rem_euclid(2.0 * std::f64::consts::PI);
    }

    /// Converts a world point into the rectangle frame (x along `dir`).
    pub fn to_local(&self, point: &Vector2) -> Vector2 {
        let offset = point.sub(&self.pos);
        Vector2::new(offset.dot(&self.dir), offset.dot(&self.normal))
    }

    /// Rectangle spanning the segment from `start` to `end`.
    pub fn between(start: &Vector2, end: &Vector2, height: f64) -> Self {
        let span = end.sub(start);
        Rectangle::new(start.add(end).scale(0.5), span, span.magnitude(), height)
    }

    /// Converts a vector expressed in the rectangle frame back to the world.
    pub fn to_world_vector(&self, local: &Vector2) -> Vector2 {
        self.dir.scale(local.x).add(&self.normal.scale(local.y))
    }

    /// Closest point of the rectangle to `point`, in the rectangle frame.
    fn closest_local(&self, local: &Vector2) -> Vector2 {
        Vector2::new(
            local.x.clamp(-self.width / 2.0, self.width / 2.0),
            local.y.clamp(-self.height / 2.0, self.height / 2.0),
        )
    }

    pub fn overlaps(&self, ball: &Ball) -> bool {
        let local = self.to_local(&ball.pos);
        local.distance(&self.closest_local(&local)) < ball.radius
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionKind {
    Paddle,
    Wall,
    PowerUp,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Collision {
    /// Distance the ball travels before touching.
    pub distance: f64,
    pub object_index: usize,
    /// Outward unit normal of the struck surface, in world space.
    pub normal: Vector2,
    pub kind: CollisionKind,
}

/// Anything a ball can be swept against.
pub trait Collider {
    fn is_collidable(&self) -> bool;
    fn sweep(&self, ball: &Ball, distance: f64) -> Option<(f64, Vector2)>;
}

impl Collider for Rectangle {
    fn is_collidable(&self) -> bool {
        self.is_visible && self.do_collision
    }

    fn sweep(&self, ball: &Ball, distance: f64) -> Option<(f64, Vector2)> {
        ball_rect_collision(ball, distance, self)
    }
}

fn accept(t: f64, sweep: f64) -> bool {
    t > EPSILON && t <= sweep
}

/// Smaller root of `a t² + b t + c = 0`, if real.
fn smaller_root(a: f64, b: f64, c: f64) -> Option<f64> {
    if a.abs() < f64::EPSILON {
        return None;
    }
    let discriminant = b * b - 4.0 * a * c;
    if discriminant < 0.0 {
        return None;
    }
    Some((-b - discriminant.sqrt()) / (2.0 * a))
}

/// Earliest contact of a ball moving `sweep` along its direction with an
/// oriented rectangle.
///
/// The ball is moved into the rectangle frame. Each face is tested as a
/// segment offset by the radius; contacts past the face span fall back to
/// the rounded corners. A ball already overlapping the rectangle never
/// collides with it.
pub fn ball_rect_collision(ball: &Ball, sweep: f64, rect: &Rectangle) -> Option<(f64, Vector2)> {
    let p = rect.to_local(&ball.pos);
    let d = Vector2::new(ball.dir.dot(&rect.dir), ball.dir.dot(&rect.normal));
    let r = ball.radius;
    let hw = rect.width / 2.0;
    let hh = rect.height / 2.0;

    if p.distance(&rect.closest_local(&p)) < r {
        return None;
    }
    if d.x.abs() < EPSILON && d.y.abs() < EPSILON {
        return None;
    }

    let mut best: Option<(f64, Vector2)> = None;
    let mut consider = |t: f64, normal: Vector2| {
        // A ball resting closer than EPSILON still hits a surface it moves into.
        let grazing = (0.0..=EPSILON.min(sweep)).contains(&t) && d.dot(&normal) < 0.0;
        if (accept(t, sweep) || grazing) && best.map_or(true, |(bt, _)| t < bt) {
            best = Some((t, normal));
        }
    };

    if d.x.abs() >= EPSILON {
        for side in [1.0, -1.0] {
            let t = (side * (r + hw) - p.x) / d.x;
            if (p.y + t * d.y).abs() <= hh + EPSILON {
                consider(t, Vector2::new(side, 0.0));
            }
        }
    }
    if d.y.abs() >= EPSILON {
        for side in [1.0, -1.0] {
            let t = (side * (r + hh) - p.y) / d.y;
            if (p.x + t * d.x).abs() <= hw + EPSILON {
                consider(t, Vector2::new(0.0, side));
            }
        }
    }

    for corner in [
        Vector2::new(hw, hh),
        Vector2::new(-hw, hh),
        Vector2::new(hw, -hh),
        Vector2::new(-hw, -hh),
    ] {
        let offset = p.sub(&corner);
        let a = d.dot(&d);
        let b = 2.0 * d.dot(&offset);
        let c = offset.dot(&offset) - r * r;
        if let Some(t) = smaller_root(a, b, c) {
            let center = p.add(&d.scale(t));
            consider(t, center.sub(&corner).normalize());
        }
    }

    best.map(|(t, local_normal)| (t, rect.to_world_vector(&local_normal)))
}

/// Earliest contact of a ball with a circle of `radius` centered at `center`.
///
/// Overlapping shapes report a contact at distance zero.
pub fn ball_circle_collision(
    ball: &Ball,
    sweep: f64,
    center: &Vector2,
    radius: f64,
) -> Option<(f64, Vector2)> {
    let offset = ball.pos.sub(center);
    let reach = ball.radius + radius;
    let c = offset.dot(&offset) - reach * reach;

    if c <= 0.0 {
        return Some((0.0, offset.normalize()));
    }

    let a = ball.dir.dot(&ball.dir);
    let b = 2.0 * ball.dir.dot(&offset);
    let t = smaller_root(a, b, c)?;
    if !accept(t, sweep) {
        return None;
    }

    let contact = ball.pos.add(&ball.dir.scale(t));
    Some((t, contact.sub(center).normalize()))
}

/// Linear scan for the earliest contact among `candidates`.
///
/// Hidden or non-colliding candidates are skipped, as are power-ups for
/// balls that cannot score.
pub fn detect_collision<C: Collider>(
    ball: &Ball,
    sweep: f64,
    candidates: &[C],
    kind: CollisionKind,
) -> Option<Collision> {
    if kind == CollisionKind::PowerUp && !ball.do_goal {
        return None;
    }

    let mut closest: Option<Collision> = None;
    for (index, candidate) in candidates.iter().enumerate() {
        if !candidate.is_collidable() {
            continue;
        }
        if let Some((distance, normal)) = candidate.sweep(ball, sweep) {
            if closest.map_or(true, |c| distance < c.distance) {
                closest = Some(Collision {
                    distance,
                    object_index: index,
                    normal,
                    kind,
                });
            }
        }
    }
    closest
}

/// Picks the earliest of several optional contacts.
pub fn earliest(collisions: impl IntoIterator<Item = Option<Collision>>) -> Option<Collision> {
    collisions
        .into_iter()
        .flatten()
        .fold(None, |best: Option<Collision>, c| match best {
            Some(b) if b.distance <= c.distance => Some(b),
            _ => Some(c),
        })
}

/// Reflects the ball direction about the contact normal and nudges the ball
/// off the surface.
pub fn resolve_collision(ball: &mut Ball, normal: &Vector2) {
    let along = ball.dir.dot(normal);
    ball.dir = ball.dir.sub(&normal.scale(2.0 * along)).normalize();
    ball.pos = ball.pos.add(&normal.scale(10.0 * EPSILON));
}

/// Moves a ball overlapping `rect` just outside of it. Returns the world
/// direction the ball was pushed along, if it was moved.
pub fn push_out_of_rectangle(ball: &mut Ball, rect: &Rectangle) -> Option<Vector2> {
    if !rect.overlaps(ball) {
        return None;
    }

    let local = rect.to_local(&ball.pos);
    let closest = rect.closest_local(&local);
    let away = local.sub(&closest);

    let (target, push) = if away.magnitude() > f64::EPSILON {
        let push = away.normalize();
        (closest.add(&push.scale(ball.radius + 10.0 * EPSILON)), push)
    } else {
        // Center inside: leave through the face of least penetration.
        let depth_x = rect.width / 2.0 - local.x.abs();
        let depth_y = rect.height / 2.0 - local.y.abs();
        if depth_x < depth_y {
            let side = if local.x >= 0.0 { 1.0 } else { -1.0 };
            (
                Vector2::new(side * (rect.width / 2.0 + ball.radius + 10.0 * EPSILON), local.y),
                Vector2::new(side, 0.0),
            )
        } else {
            let side = if local.y >= 0.0 { 1.0 } else { -1.0 };
            (
                Vector2::new(local.x, side * (rect.height / 2.0 + ball.radius + 10.0 * EPSILON)),
                Vector2::new(0.0, side),
            )
        }
    };

    ball.pos = rect.pos.add(&rect.to_world_vector(&target));
    Some(rect.to_world_vector(&push))
}
