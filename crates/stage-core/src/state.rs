use crate::hal::Axis;
use serde::Serialize;

/// Last commanded levels of one axis' step and direction pins.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AxisState {
    pub step: bool,
    pub dir: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SpindleState {
    pub level: u8,
    pub enabled: bool,
}

/// Copy of the motion state at one instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MotionSnapshot {
    pub x: AxisState,
    pub y: AxisState,
    pub z: AxisState,
    pub spindle: SpindleState,
}

/// The stage's memory of what it was last told.
///
/// There is no position tracking: an axis only remembers the level it last
/// toggled its pins to.
#[derive(Debug, Clone, Default)]
pub struct MotionState {
    axes: [AxisState; 3],
    spindle: SpindleState,
}

impl MotionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn axis(&self, axis: Axis) -> AxisState {
        self.axes[axis.index()]
    }

    pub fn spindle(&self) -> SpindleState {
        self.spindle
    }

    pub fn toggle_step(&mut self, axis: Axis) {
        let a = &mut self.axes[axis.index()];
        a.step = !a.step;
    }

    pub fn toggle_dir(&mut self, axis: Axis) {
        let a = &mut self.axes[axis.index()];
        a.dir = !a.dir;
    }

    pub fn spindle_on(&mut self, level: u8) {
        self.spindle = SpindleState {
            level,
            enabled: true,
        };
    }

    pub fn spindle_off(&mut self) {
        self.spindle = SpindleState {
            level: 0,
            enabled: false,
        };
    }

    pub fn snapshot(&self) -> MotionSnapshot {
        MotionSnapshot {
            x: self.axis(Axis::X),
            y: self.axis(Axis::Y),
            z: self.axis(Axis::Z),
            spindle: self.spindle,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggles_are_independent_per_axis() {
        let mut state = MotionState::new();
        state.toggle_step(Axis::Y);
        state.toggle_dir(Axis::Z);
        let snap = state.snapshot();
        assert_eq!(snap.x, AxisState::default());
        assert_eq!(snap.y, AxisState { step: true, dir: false });
        assert_eq!(snap.z, AxisState { step: false, dir: true });
    }

    #[test]
    fn spindle_off_zeroes_level() {
        let mut state = MotionState::new();
        state.spindle_on(90);
        assert_eq!(state.spindle(), SpindleState { level: 90, enabled: true });
        state.spindle_off();
        assert_eq!(state.spindle(), SpindleState::default());
    }
}
