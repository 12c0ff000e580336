//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Map a value from one range into another.
pub fn lin_map<T>(source_range: (T, T), target_range: (T, T), value: T) -> T
where
    T: Float,
{
    target_range.0
        + ((value - source_range.0) * (target_range.1 - target_range.0)
            / (source_range.1 - source_range.0))
}

/// Clamp a value into the `(min, max)` limits.
///
/// Unlike `f64::clamp` this never panics, an inverted or NaN pair of limits leaves the value
/// bounded by whichever limit it violates last.
pub fn clamp_to<T>(value: T, limits: (T, T)) -> T
where
    T: Float,
{
    let mut ret = value;

    if ret > limits.1 {
        ret = limits.1
    }
    if ret < limits.0 {
        ret = limits.0
    }

    ret
}

/// Calculates the least nonnegative remainder of `lhs (mod rhs)`.
///
/// `num_traits::Float` doesn't provide this so it's reproduced from the std implementation.
pub fn rem_euclid<T>(lhs: T, rhs: T) -> T
where
    T: Float,
{
    let r = lhs % rhs;
    if r < T::zero() {
        r + rhs.abs()
    } else {
        r
    }
}

/// Wrap an angle into the range (-pi, pi].
pub fn wrap_pi<T>(angle: T) -> T
where
    T: Float,
{
    let pi_t = T::from(std::f64::consts::PI).unwrap_or_else(T::zero);
    let tau_t = pi_t + pi_t;

    let wrapped = rem_euclid(angle + pi_t, tau_t) - pi_t;

    // rem_euclid maps pi onto -pi, the closed end of the range is +pi
    if wrapped <= -pi_t {
        wrapped + tau_t
    } else {
        wrapped
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
