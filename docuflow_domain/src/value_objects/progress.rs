// /////////////////////////////////////////////////////////////////////////////
// Docuflow
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Stage progress, canonically on a 0-100 scale.
//!
//! Handlers have historically reported progress as a 0.0-1.0 fraction; the
//! tracker auto-scales that input rather than rejecting it, but only ever
//! persists 0-100.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Progress(u8);

impl Progress {
    pub const ZERO: Progress = Progress(0);
    pub const COMPLETE: Progress = Progress(100);

    /// Accepts either a 0-100 integer-like value or a 0.0-1.0 fraction.
    /// Returns the canonical value plus whether the input was auto-scaled,
    /// so the caller can emit the one-time warning the scheduler requires.
    pub fn from_raw(value: f64) -> (Self, bool) {
        if value > 0.0 && value <= 1.0 {
            (Self::clamp((value * 100.0).round() as i64), true)
        } else {
            (Self::clamp(value.round() as i64), false)
        }
    }

    fn clamp(value: i64) -> Self {
        Progress(value.clamp(0, 100) as u8)
    }

    pub fn value(&self) -> u8 {
        self.0
    }

    pub fn is_complete(&self) -> bool {
        self.0 == 100
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_0_to_100_scale_unchanged() {
        let (p, scaled) = Progress::from_raw(42.0);
        assert_eq!(p.value(), 42);
        assert!(!scaled);
    }

    #[test]
    fn auto_scales_fractional_input() {
        let (p, scaled) = Progress::from_raw(0.5);
        assert_eq!(p.value(), 50);
        assert!(scaled);
    }

    #[test]
    fn clamps_out_of_range_values() {
        let (p, _) = Progress::from_raw(150.0);
        assert_eq!(p.value(), 100);
        let (p, _) = Progress::from_raw(-5.0);
        assert_eq!(p.value(), 0);
    }

    #[test]
    fn zero_is_not_treated_as_fractional() {
        let (p, scaled) = Progress::from_raw(0.0);
        assert_eq!(p.value(), 0);
        assert!(!scaled);
    }

    #[test]
    fn one_is_treated_as_fractional_full_scale_not_one_percent() {
        // 1.0 is ambiguous between "1%" and "100%"; the scheduler treats any
        // value in (0, 1] as a fraction, so 1.0 means "done".
        let (p, scaled) = Progress::from_raw(1.0);
        assert_eq!(p.value(), 100);
        assert!(scaled);
    }
}
