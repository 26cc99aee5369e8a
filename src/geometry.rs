//! Pitch/position geometry
//!
//! The mapping between symbolic pitch and vertical position on a staff, and
//! its inverses used when placing or dragging elements. All y deltas here are
//! display-space (positive is up); conversion to image-space rectangles
//! happens in `Zone::shift_by_xy`.

use crate::models::{ClefData, Pitch, StaffMetrics};

/// Rounded integer division matching `round()` semantics (half away from
/// zero), used everywhere a pixel distance is quantized to steps or lines.
fn round_div(numerator: i32, denominator: i32) -> i32 {
    (numerator as f64 / denominator as f64).round() as i32
}

/// Vertical display offset of a pitch under a clef, in image units, positive
/// upward.
///
/// With `u` the staff unit, `b` the clef's baseline step, `l` its line and
/// `n` the staff's line count:
///
/// ```text
/// offset = u * ((step - b) + 7 * (octave - 3) + 2 * (l - n))
/// ```
///
/// One diatonic step is one unit; moving the clef up a line raises every
/// governed pitch by two units.
pub fn offset_for_pitch(pitch: Pitch, clef: ClefData, metrics: StaffMetrics) -> i32 {
    metrics.unit
        * ((pitch.step - clef.shape.baseline_step())
            + 7 * (pitch.octave - 3)
            + 2 * (clef.line - metrics.lines))
}

/// Diatonic-step correction that keeps a pitch's vertical offset unchanged
/// when its governing clef changes from `old` to `new`.
///
/// Derived from `offset_for_pitch`: the offset is invariant exactly when the
/// diatonic value shifts by `(b_new - b_old) + 2 * (l_old - l_new)`.
pub fn clef_change_delta(old: ClefData, new: ClefData) -> i32 {
    (new.shape.baseline_step() - old.shape.baseline_step()) + 2 * (old.line - new.line)
}

/// Initial pitch for a pitched element placed at display height `uly` on a
/// staff whose zone starts at `staff_uly`.
///
/// Starts from the clef's baseline step in the reference octave and shifts by
/// the rounded step distance between the drop point and where that baseline
/// pitch would sit.
pub fn pitch_for_position(
    uly: i32,
    staff_uly: i32,
    clef: ClefData,
    metrics: StaffMetrics,
) -> Pitch {
    let mut pitch = Pitch::new(clef.shape.baseline_step(), 3);
    let baseline_uly = staff_uly + 2 * metrics.unit * (metrics.lines - clef.line);
    pitch.adjust_by_offset(round_div(baseline_uly - uly, metrics.unit));
    pitch
}

/// Staff line for a clef placed at display height `uly`: the nearest line
/// counted from the top of the staff zone, two units apart.
pub fn clef_line_for_position(uly: i32, staff_uly: i32, metrics: StaffMetrics) -> i32 {
    metrics.lines - round_div(uly - staff_uly, 2 * metrics.unit)
}

/// Diatonic steps represented by a drag of `dy` display units on a staff.
pub fn steps_for_drag(dy: i32, metrics: StaffMetrics) -> i32 {
    round_div(dy, metrics.unit)
}

/// Staff lines represented by a drag of `dy` display units.
pub fn lines_for_drag(dy: i32, metrics: StaffMetrics) -> i32 {
    round_div(dy, 2 * metrics.unit)
}

/// Bounding-box height of a note glyph: one staff unit.
pub fn note_height(metrics: StaffMetrics) -> i32 {
    metrics.unit
}

/// Bounding-box width of a note glyph.
pub fn note_width(metrics: StaffMetrics) -> i32 {
    round_div(2 * metrics.unit * 10, 14)
}

/// Staff unit derived from a staff bounding box: the box spans
/// `2 * (lines - 1)` units top line to bottom line.
pub fn unit_from_height(height: i32, lines: i32) -> i32 {
    height / (2 * (lines - 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ClefShape;

    fn metrics() -> StaffMetrics {
        StaffMetrics::new(100, 4, ClefData::new(ClefShape::C, 4))
    }

    #[test]
    fn one_step_is_one_unit() {
        let clef = ClefData::new(ClefShape::C, 4);
        let low = offset_for_pitch(Pitch::new(1, 3), clef, metrics());
        let high = offset_for_pitch(Pitch::new(2, 3), clef, metrics());
        assert_eq!(high - low, 100);
    }

    #[test]
    fn clef_change_preserves_offset() {
        let m = metrics();
        let clefs = [
            ClefData::new(ClefShape::C, 2),
            ClefData::new(ClefShape::C, 4),
            ClefData::new(ClefShape::F, 3),
            ClefData::new(ClefShape::F, 1),
        ];
        for old in clefs {
            for new in clefs {
                let mut pitch = Pitch::new(5, 3);
                let before = offset_for_pitch(pitch, old, m);
                pitch.adjust_by_offset(clef_change_delta(old, new));
                let after = offset_for_pitch(pitch, new, m);
                assert_eq!(
                    before, after,
                    "offset must survive {:?} -> {:?}",
                    old, new
                );
            }
        }
    }

    #[test]
    fn pure_line_change_is_two_steps_per_line() {
        let old = ClefData::new(ClefShape::C, 3);
        let new = ClefData::new(ClefShape::C, 4);
        assert_eq!(clef_change_delta(old, new), -2);
    }

    #[test]
    fn baseline_position_yields_baseline_pitch() {
        let m = metrics();
        let clef = ClefData::new(ClefShape::C, 3);
        // Display height of the clef's line within a staff zone starting at 0.
        let line_uly = 2 * m.unit * (m.lines - clef.line);
        let pitch = pitch_for_position(line_uly, 0, clef, m);
        assert_eq!(pitch, Pitch::new(1, 3));

        // One unit above: one step up.
        let pitch = pitch_for_position(line_uly - m.unit, 0, clef, m);
        assert_eq!(pitch, Pitch::new(2, 3));
    }

    #[test]
    fn clef_line_from_position() {
        let m = metrics();
        // Top of the staff zone is the top line.
        assert_eq!(clef_line_for_position(0, 0, m), 4);
        assert_eq!(clef_line_for_position(2 * m.unit, 0, m), 3);
        // Off-line positions snap to the nearest line.
        assert_eq!(clef_line_for_position(2 * m.unit + 40, 0, m), 3);
    }

    #[test]
    fn drag_quantization() {
        let m = metrics();
        assert_eq!(steps_for_drag(100, m), 1);
        assert_eq!(steps_for_drag(-250, m), -3);
        assert_eq!(steps_for_drag(49, m), 0);
        assert_eq!(lines_for_drag(200, m), 1);
        assert_eq!(lines_for_drag(99, m), 0);
    }

    #[test]
    fn glyph_box_sizes() {
        let m = metrics();
        assert_eq!(note_height(m), 100);
        assert_eq!(note_width(m), 143);
        assert_eq!(unit_from_height(600, 4), 100);
    }
}
