//! Character movement integration and capsule contacts

/// Capsule radius used for character-vs-character contacts
pub const CAPSULE_RADIUS: f32 = 42.0;
/// Capsule half height, used to ignore contacts while one side is airborne
pub const CAPSULE_HALF_HEIGHT: f32 = 96.0;
/// Launch velocity applied on jump
pub const JUMP_Z_VELOCITY: f32 = 600.0;
/// Downward acceleration while airborne
pub const GRAVITY: f32 = 980.0;

/// Sink for movement requests, consumed once per tick by the integrator
pub trait MovementSink {
    /// Queue movement along `direction` (unit vector) scaled by `scale`
    fn add_movement_input(&mut self, direction: (f32, f32), scale: f32);
}

/// Per-character movement state owned by the integrator
#[derive(Debug, Clone, Default)]
pub struct MovementComponent {
    /// Speed cap recomputed by the character every tick
    pub max_walk_speed: f32,

    pub x: f32,
    pub y: f32,
    /// Height above the floor
    pub z: f32,
    pub vel_x: f32,
    pub vel_y: f32,
    pub vel_z: f32,

    /// Input accumulated since the last integration
    pending_x: f32,
    pending_y: f32,
    jump_requested: bool,
}

impl MovementComponent {
    #[cfg(test)]
    pub fn at(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            ..Self::default()
        }
    }

    pub fn is_grounded(&self) -> bool {
        self.z <= 0.0 && self.vel_z <= 0.0
    }

    /// Request a jump, applied on the next integration if grounded
    pub fn jump(&mut self) {
        self.jump_requested = true;
    }

    /// Input accumulated so far this tick
    pub fn pending_input(&self) -> (f32, f32) {
        (self.pending_x, self.pending_y)
    }

    #[cfg(test)]
    pub fn speed(&self) -> f32 {
        (self.vel_x * self.vel_x + self.vel_y * self.vel_y).sqrt()
    }
}

impl MovementSink for MovementComponent {
    fn add_movement_input(&mut self, direction: (f32, f32), scale: f32) {
        self.pending_x += direction.0 * scale;
        self.pending_y += direction.1 * scale;
    }
}

/// Contact produced by the narrow phase
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitInfo {
    /// Contact normal pointing from the first capsule towards the second
    pub normal: (f32, f32),
    /// Overlap depth along the normal
    pub penetration: f32,
}

pub struct PhysicsSystem;

impl PhysicsSystem {
    /// Consume pending input and advance one step
    pub fn integrate(movement: &mut MovementComponent, dt: f32) {
        let (mut input_x, mut input_y) = movement.pending_input();
        movement.pending_x = 0.0;
        movement.pending_y = 0.0;

        // Input acts as an acceleration fraction, never more than full
        let magnitude = (input_x * input_x + input_y * input_y).sqrt();
        if magnitude > 1.0 {
            input_x /= magnitude;
            input_y /= magnitude;
        }

        movement.vel_x = input_x * movement.max_walk_speed;
        movement.vel_y = input_y * movement.max_walk_speed;

        if movement.jump_requested && movement.is_grounded() {
            movement.vel_z = JUMP_Z_VELOCITY;
        }
        movement.jump_requested = false;

        if !movement.is_grounded() || movement.vel_z > 0.0 {
            movement.vel_z -= GRAVITY * dt;
            movement.z += movement.vel_z * dt;
            if movement.z <= 0.0 {
                movement.z = 0.0;
                movement.vel_z = 0.0;
            }
        }

        movement.x += movement.vel_x * dt;
        movement.y += movement.vel_y * dt;
    }

    /// Test two capsules for contact
    pub fn check_capsule_contact(a: &MovementComponent, b: &MovementComponent) -> Option<HitInfo> {
        if (a.z - b.z).abs() >= CAPSULE_HALF_HEIGHT * 2.0 {
            return None;
        }

        let dx = b.x - a.x;
        let dy = b.y - a.y;
        let dist_sq = dx * dx + dy * dy;
        let combined = CAPSULE_RADIUS * 2.0;
        if dist_sq > combined * combined {
            return None;
        }

        let dist = dist_sq.sqrt();
        let normal = if dist < 0.001 {
            // Same spot, pick an arbitrary axis
            (1.0, 0.0)
        } else {
            (dx / dist, dy / dist)
        };

        Some(HitInfo {
            normal,
            penetration: combined - dist,
        })
    }

    /// Push two overlapping capsules apart by half the overlap each
    pub fn resolve_contact(a: &mut MovementComponent, b: &mut MovementComponent, hit: &HitInfo) {
        let push = hit.penetration / 2.0 + 0.1;
        a.x -= hit.normal.0 * push;
        a.y -= hit.normal.1 * push;
        b.x += hit.normal.0 * push;
        b.y += hit.normal.1 * push;
    }
}
