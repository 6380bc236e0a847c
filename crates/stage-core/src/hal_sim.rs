use crate::hal::{Axis, AxisPins, Idle, PinMap, SerialPort, Spindle};
use std::collections::VecDeque;
use std::time::Duration;

const GPIO_COUNT: usize = 32;

/// Simulated stage: step/dir drivers and spindle PWM on a GPIO bank.
#[derive(Debug, Clone)]
pub struct SimulatedStage {
    pins: PinMap,
    gpio: [bool; GPIO_COUNT],
    spindle_level: u8,
    spindle_enabled: bool,
    pin_writes: u64,
}

impl SimulatedStage {
    pub fn new() -> Self {
        Self::with_pins(PinMap::default())
    }

    pub fn with_pins(pins: PinMap) -> Self {
        Self {
            pins,
            gpio: [false; GPIO_COUNT],
            spindle_level: 0,
            spindle_enabled: false,
            pin_writes: 0,
        }
    }

    pub fn pins(&self) -> &PinMap {
        &self.pins
    }

    /// Level last driven on a GPIO. Unknown pins read low.
    pub fn gpio_level(&self, pin: u8) -> bool {
        self.gpio.get(pin as usize).copied().unwrap_or(false)
    }

    /// `(step, dir)` levels currently on an axis' pins.
    pub fn axis_levels(&self, axis: Axis) -> (bool, bool) {
        let (step, dir) = self.pins.axis_pins(axis);
        (self.gpio_level(step), self.gpio_level(dir))
    }

    pub fn spindle_level(&self) -> u8 {
        self.spindle_level
    }

    pub fn spindle_enabled(&self) -> bool {
        self.spindle_enabled
    }

    /// PWM duty actually seen on the spindle pin (0 while disabled).
    pub fn spindle_duty(&self) -> u8 {
        if self.spindle_enabled {
            self.spindle_level
        } else {
            0
        }
    }

    /// Number of `set_axis_pins` calls so far.
    pub fn pin_writes(&self) -> u64 {
        self.pin_writes
    }

    fn drive(&mut self, pin: u8, level: bool) {
        if let Some(slot) = self.gpio.get_mut(pin as usize) {
            *slot = level;
        }
    }
}

impl Default for SimulatedStage {
    fn default() -> Self {
        Self::new()
    }
}

impl AxisPins for SimulatedStage {
    fn set_axis_pins(&mut self, axis: Axis, step: bool, dir: bool) {
        let (step_pin, dir_pin) = self.pins.axis_pins(axis);
        self.drive(step_pin, step);
        self.drive(dir_pin, dir);
        self.pin_writes += 1;
    }
}

impl Spindle for SimulatedStage {
    fn set_spindle_level(&mut self, level: u8) {
        self.spindle_level = level;
    }

    fn set_spindle_enabled(&mut self, enabled: bool) {
        self.spindle_enabled = enabled;
        let pin = self.pins.spindle;
        self.drive(pin, enabled && self.spindle_level > 0);
    }
}

/// UART stand-in fed from a byte script.
///
/// `tx_capacity` bounds how many bytes the transmitter accepts before
/// reporting "not writable", which lets tests exercise dropped echoes.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSerial {
    rx: VecDeque<u8>,
    tx: Vec<u8>,
    tx_capacity: Option<usize>,
}

impl ScriptedSerial {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tx_capacity(capacity: usize) -> Self {
        Self {
            tx_capacity: Some(capacity),
            ..Self::default()
        }
    }

    /// Queues bytes as if they had arrived on the wire.
    pub fn feed(&mut self, bytes: &[u8]) {
        self.rx.extend(bytes.iter().copied());
    }

    pub fn pending(&self) -> usize {
        self.rx.len()
    }

    /// Everything written back so far.
    pub fn echoed(&self) -> &[u8] {
        &self.tx
    }

    /// Drains the transmit log, freeing transmitter capacity.
    pub fn take_echo(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.tx)
    }
}

impl SerialPort for ScriptedSerial {
    fn byte_available(&mut self) -> bool {
        !self.rx.is_empty()
    }

    fn read_byte(&mut self) -> u8 {
        // An idle line reads as all ones.
        self.rx.pop_front().unwrap_or(0xFF)
    }

    fn try_write_byte(&mut self, byte: u8) -> bool {
        if let Some(cap) = self.tx_capacity {
            if self.tx.len() >= cap {
                return false;
            }
        }
        self.tx.push(byte);
        true
    }
}

/// Host stand-in for `wfi`: parks the thread until unparked or timed out.
#[derive(Debug, Clone, Copy)]
pub struct ParkIdle {
    timeout: Duration,
}

impl ParkIdle {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for ParkIdle {
    fn default() -> Self {
        Self::new(Duration::from_millis(10))
    }
}

impl Idle for ParkIdle {
    fn wait_for_interrupt(&mut self) {
        std::thread::park_timeout(self.timeout);
    }
}
