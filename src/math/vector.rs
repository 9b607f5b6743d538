//! Vector helpers layered on top of `glam`.

use glam::{Vec2, Vec3};

/// Tolerance used by the epsilon-based zero tests.
pub const EPSILON: f32 = 1e-6;

/// Approximate `1 / sqrt(x)` using the bit-level initial guess plus one Newton step.
///
/// Relative error stays below 0.2% for positive finite input. Returns 0 for `x <= 0`.
#[inline]
pub fn fast_inv_sqrt(x: f32) -> f32 {
    if x <= 0.0 {
        return 0.0;
    }
    let half = 0.5 * x;
    let guess = f32::from_bits(0x5f37_59df - (x.to_bits() >> 1));
    guess * (1.5 - half * guess * guess)
}

/// Extra vector operations used throughout the physics core.
pub trait VectorExt: Sized + Copy {
    /// True if every component is within [`EPSILON`] of zero.
    fn is_zero_eps(self) -> bool;

    /// Exact normalization; the zero vector normalizes to itself.
    fn normalized_or_zero(self) -> Self;

    /// Approximate normalization; the zero vector normalizes to itself.
    fn normalized_fast(self) -> Self;

    /// Scale the vector down so that its length does not exceed `max`.
    fn clamped_to_length(self, max: f32) -> Self;
}

impl VectorExt for Vec2 {
    #[inline]
    fn is_zero_eps(self) -> bool {
        self.x.abs() < EPSILON && self.y.abs() < EPSILON
    }

    #[inline]
    fn normalized_or_zero(self) -> Self {
        self.normalize_or_zero()
    }

    #[inline]
    fn normalized_fast(self) -> Self {
        if self.is_zero_eps() {
            Vec2::ZERO
        } else {
            self * fast_inv_sqrt(self.length_squared())
        }
    }

    #[inline]
    fn clamped_to_length(self, max: f32) -> Self {
        self.clamp_length_max(max.max(0.0))
    }
}

impl VectorExt for Vec3 {
    #[inline]
    fn is_zero_eps(self) -> bool {
        self.x.abs() < EPSILON && self.y.abs() < EPSILON && self.z.abs() < EPSILON
    }

    #[inline]
    fn normalized_or_zero(self) -> Self {
        self.normalize_or_zero()
    }

    #[inline]
    fn normalized_fast(self) -> Self {
        if self.is_zero_eps() {
            Vec3::ZERO
        } else {
            self * fast_inv_sqrt(self.length_squared())
        }
    }

    #[inline]
    fn clamped_to_length(self, max: f32) -> Self {
        self.clamp_length_max(max.max(0.0))
    }
}

/// Z component of the 3D cross product of two planar vectors.
#[inline]
pub fn cross_z(a: Vec2, b: Vec2) -> f32 {
    a.x * b.y - a.y * b.x
}
