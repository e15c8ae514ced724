use std::fmt;

use crate::config::{
    STEP_INTERVAL_XY_US, STEP_INTERVAL_Z_US, STEPS_PER_MM_X, STEPS_PER_MM_Y, STEPS_PER_MM_Z,
    X_TRAVEL_MM, Y_TRAVEL_MM, Z_TRAVEL_MM,
};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    pub fn steps_per_mm(self) -> f32 {
        match self {
            Axis::X => STEPS_PER_MM_X,
            Axis::Y => STEPS_PER_MM_Y,
            Axis::Z => STEPS_PER_MM_Z,
        }
    }

    pub fn interval_us(self) -> u32 {
        match self {
            Axis::X | Axis::Y => STEP_INTERVAL_XY_US,
            Axis::Z => STEP_INTERVAL_Z_US,
        }
    }

    // level of the DIR line for travel away from the origin.
    // x is wired backwards on the driver board.
    pub fn forward_level(self) -> bool {
        match self {
            Axis::X => false,
            Axis::Y | Axis::Z => true,
        }
    }

    pub fn direction_level(self, delta: i32) -> bool {
        if delta > 0 {
            self.forward_level()
        } else {
            !self.forward_level()
        }
    }

    pub fn travel_max_steps(self) -> i32 {
        let travel = match self {
            Axis::X => X_TRAVEL_MM,
            Axis::Y => Y_TRAVEL_MM,
            Axis::Z => Z_TRAVEL_MM,
        };
        mm_to_steps(self, travel)
    }

    // bit of this axis' line in an endstop sample word
    pub(crate) fn line_mask(self) -> u32 {
        1u32 << self.index()
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Axis::X => "X",
            Axis::Y => "Y",
            Axis::Z => "Z",
        };
        f.write_str(name)
    }
}

pub fn mm_to_steps(axis: Axis, mm: f32) -> i32 {
    (mm * axis.steps_per_mm()).round() as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn travel_limits_follow_scale() {
        assert_eq!(Axis::X.travel_max_steps(), 15_000);
        assert_eq!(Axis::Y.travel_max_steps(), 12_600);
        assert_eq!(Axis::Z.travel_max_steps(), 2_250);
    }

    #[test]
    fn x_direction_is_inverted() {
        assert!(!Axis::X.direction_level(10));
        assert!(Axis::X.direction_level(-10));
        assert!(Axis::Y.direction_level(10));
        assert!(!Axis::Z.direction_level(-1));
    }
}
