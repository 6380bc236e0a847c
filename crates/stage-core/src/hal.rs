use serde::Serialize;

/// Motion channel of the stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
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

    pub fn as_str(self) -> &'static str {
        match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
        }
    }
}

/// Board wiring for the step/dir drivers and the spindle PWM output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinMap {
    pub x_step: u8,
    pub x_dir: u8,
    pub y_step: u8,
    pub y_dir: u8,
    pub z_step: u8,
    pub z_dir: u8,
    pub spindle: u8,
}

impl PinMap {
    /// Returns `(step_pin, dir_pin)` for an axis.
    pub fn axis_pins(&self, axis: Axis) -> (u8, u8) {
        match axis {
            Axis::X => (self.x_step, self.x_dir),
            Axis::Y => (self.y_step, self.y_dir),
            Axis::Z => (self.z_step, self.z_dir),
        }
    }
}

impl Default for PinMap {
    fn default() -> Self {
        Self {
            x_dir: 3,
            x_step: 4,
            y_dir: 6,
            y_step: 7,
            z_dir: 11,
            z_step: 10,
            spindle: 15,
        }
    }
}

/// UART as seen from the receive interrupt.
pub trait SerialPort {
    fn byte_available(&mut self) -> bool;
    fn read_byte(&mut self) -> u8;
    /// Non-blocking write. Returns `false` if the transmitter was not ready
    /// and the byte was not sent.
    fn try_write_byte(&mut self, byte: u8) -> bool;
}

pub trait AxisPins {
    fn set_axis_pins(&mut self, axis: Axis, step: bool, dir: bool);
}

pub trait Spindle {
    fn set_spindle_level(&mut self, level: u8);
    fn set_spindle_enabled(&mut self, enabled: bool);
}

/// Low-power wait used by the main loop while no line is pending.
///
/// Implementations may return early for any reason (any interrupt wakes the
/// core), so callers must re-check their condition after every return.
pub trait Idle {
    fn wait_for_interrupt(&mut self);
}

/// Everything the dispatcher drives.
pub trait StageIO: AxisPins + Spindle + Send {}

impl<T: AxisPins + Spindle + Send> StageIO for T {}
