//! The escape-time kernel.
//!
//! Unlike most Mandelbrot renderers, this one reports how many
//! iterations were *left* when the orbit escaped, not how many were
//! used.  Points that escape quickly get a high count; points inside
//! the set exhaust the budget and report zero.  The colouring policy
//! is written against this convention.

use num::Complex;

/// Iterate `z <- z*z + c` from `z = 0` until the orbit's modulus
/// exceeds `bound` or `limit` iterations have been spent, and return
/// the number of iterations remaining.
///
/// The modulus is checked before each step, so an orbit needs at
/// least one step to escape and the result is never `limit` for a
/// positive bound.  The kernel is total: a non-finite orbit fails the
/// bound check and stops.
pub fn remaining_iterations(c: Complex<f64>, limit: u32, bound: f64) -> u32 {
    let mut z: Complex<f64> = Complex { re: 0.0, im: 0.0 };
    let mut remaining = limit;
    while remaining > 0 && z.norm() <= bound {
        z = z * z + c;
        remaining -= 1;
    }
    remaining
}
