//! Diatonic pitch representation and arithmetic
//!
//! Pitch is stored symbolically as a (step, octave) pair and is independent of
//! any clef; a clef only enters the picture when a pitch is rendered as a
//! vertical offset (see the `geometry` module).

use serde::{Deserialize, Serialize};

/// Number of diatonic steps in an octave.
pub const STEPS_PER_OCTAVE: i32 = 7;

/// A diatonic pitch: step 1..=7 (c, d, e, f, g, a, b) plus an octave number.
///
/// The composed "diatonic integer" is `step + octave * 7`, which makes pitch
/// arithmetic a plain integer addition followed by re-normalization.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pitch {
    /// Diatonic step, 1..=7 mapping to the note letters c..b
    pub step: i32,
    /// Octave number; 3 is the reference octave on neume staves
    pub octave: i32,
}

impl Pitch {
    pub fn new(step: i32, octave: i32) -> Self {
        Self { step, octave }
    }

    /// Compose the diatonic integer encoding of this pitch.
    pub fn diatonic(&self) -> i32 {
        self.step + self.octave * STEPS_PER_OCTAVE
    }

    /// Decompose a diatonic integer back into (step, octave), with the step
    /// normalized into 1..=7 and the octave carrying the remainder.
    pub fn from_diatonic(value: i32) -> Self {
        let step = (value - 1).rem_euclid(STEPS_PER_OCTAVE) + 1;
        Self {
            step,
            octave: (value - step) / STEPS_PER_OCTAVE,
        }
    }

    /// Shift this pitch by a number of diatonic steps.
    ///
    /// Exact inverse of itself under negation: shifting by `d` then `-d`
    /// restores the original (step, octave).
    pub fn adjust_by_offset(&mut self, delta: i32) {
        *self = Self::from_diatonic(self.diatonic() + delta);
    }

    /// The note letter for this step.
    pub fn step_name(&self) -> char {
        match self.step {
            1 => 'c',
            2 => 'd',
            3 => 'e',
            4 => 'f',
            5 => 'g',
            6 => 'a',
            _ => 'b',
        }
    }

    /// Parse a note letter into a step number.
    pub fn step_from_name(name: &str) -> Option<i32> {
        match name {
            "c" => Some(1),
            "d" => Some(2),
            "e" => Some(3),
            "f" => Some(4),
            "g" => Some(5),
            "a" => Some(6),
            "b" => Some(7),
            _ => None,
        }
    }
}

impl Default for Pitch {
    fn default() -> Self {
        Self::new(1, 3)
    }
}
