//! Hash-style pseudo-random values derived from two seeds.
//!
//! Unlike the seeded streams used for the regional scatter, this carries no
//! state at all: the same pair of inputs always lands on the same value.

const MIX_A: f64 = 12.9898;
const MIX_B: f64 = 78.233;
const SCALE: f64 = 43758.5453;

/// Returns a reproducible value in `[0, 1)` for the pair `(a, b)`.
pub fn noise(a: f64, b: f64) -> f64 {
    let x = (a * MIX_A + b * MIX_B).sin() * SCALE;
    let frac = x - x.floor();
    // floor() of a value a hair below an integer can round the fraction up to 1.0
    if frac >= 1.0 {
        0.0
    } else {
        frac
    }
}
