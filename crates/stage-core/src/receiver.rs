use crate::hal::SerialPort;
use crate::sync::LineProducer;

/// Value read from an idle or breaking line; never data.
pub const SENTINEL: u8 = 0xFF;
/// Delete / backspace.
pub const DELETE: u8 = 0x7F;
pub const CR: u8 = b'\r';
pub const LF: u8 = b'\n';

/// What one receive interrupt did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RxOutcome {
    pub bytes_read: u32,
    pub line_completed: bool,
    /// Bytes past the end of a full line, dropped without echo.
    pub truncated: u32,
    /// Bytes dropped because the previous line was still in flight.
    pub busy_drops: u32,
    /// Echoes the transmitter refused.
    pub echo_drops: u32,
}

/// Body of the UART receive interrupt: line editing with local echo.
pub struct LineReceiver {
    producer: LineProducer,
}

impl LineReceiver {
    pub fn new(producer: LineProducer) -> Self {
        Self { producer }
    }

    /// Drains every byte the UART has buffered.
    ///
    /// The receive interrupt is edge-triggered, so returning with bytes still
    /// pending would lose the next notification.
    pub fn on_rx<S: SerialPort + ?Sized>(&mut self, serial: &mut S) -> RxOutcome {
        let mut outcome = RxOutcome::default();
        while serial.byte_available() {
            let byte = serial.read_byte();
            outcome.bytes_read += 1;
            self.accept(byte, serial, &mut outcome);
        }
        outcome
    }

    /// Throws away a partly typed line, for when the link drops mid-line.
    ///
    /// A completed line waiting for the dispatcher is left alone. Returns the
    /// number of bytes discarded.
    pub fn discard_partial(&mut self) -> usize {
        match self.producer.buffer() {
            Some(line) => {
                let discarded = line.index();
                line.reset();
                discarded
            }
            None => 0,
        }
    }

    fn accept<S: SerialPort + ?Sized>(&mut self, byte: u8, serial: &mut S, outcome: &mut RxOutcome) {
        if byte == SENTINEL {
            return;
        }
        if self.producer.is_busy() {
            if byte != CR && byte != LF {
                self.producer.note_busy_drop();
                outcome.busy_drops += 1;
            }
            return;
        }
        let Some(line) = self.producer.buffer() else {
            return;
        };
        match byte {
            CR | LF => {
                line.terminate();
                self.producer.publish();
                outcome.line_completed = true;
            }
            DELETE => {
                line.backspace();
                self.echo(serial, DELETE, outcome);
            }
            _ => {
                if line.push(byte) {
                    self.echo(serial, byte, outcome);
                } else {
                    outcome.truncated += 1;
                }
            }
        }
    }

    fn echo<S: SerialPort + ?Sized>(&self, serial: &mut S, byte: u8, outcome: &mut RxOutcome) {
        if !serial.try_write_byte(byte) {
            self.producer.note_echo_drop();
            outcome.echo_drops += 1;
        }
    }
}
