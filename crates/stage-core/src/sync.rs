use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

/// Size of the line buffer in bytes, terminator included.
pub const LINE_CAPACITY: usize = 100;

/// Longest line that can be stored; one slot is kept for the terminator.
pub const MAX_LINE_LEN: usize = LINE_CAPACITY - 1;

/// Fixed-size, null-terminated line being edited by the receiver.
#[derive(Debug, Clone)]
pub struct LineBuffer {
    bytes: [u8; LINE_CAPACITY],
    index: usize,
    truncated: u32,
}

impl LineBuffer {
    pub const fn new() -> Self {
        Self {
            bytes: [0; LINE_CAPACITY],
            index: 0,
            truncated: 0,
        }
    }

    /// Current write index (number of content bytes).
    pub fn index(&self) -> usize {
        self.index
    }

    /// Bytes that did not fit and were dropped since the last reset.
    pub fn truncated(&self) -> u32 {
        self.truncated
    }

    /// Stores `byte` at the write index.
    ///
    /// Returns `false` and counts the byte as truncated when the line is full.
    pub fn push(&mut self, byte: u8) -> bool {
        if self.index >= MAX_LINE_LEN {
            self.truncated = self.truncated.saturating_add(1);
            return false;
        }
        self.bytes[self.index] = byte;
        self.index += 1;
        true
    }

    /// Erases the last byte. A no-op on an empty line.
    pub fn backspace(&mut self) -> bool {
        if self.index == 0 {
            return false;
        }
        self.index -= 1;
        self.bytes[self.index] = 0;
        true
    }

    /// Writes the terminator at the write index without advancing it.
    pub fn terminate(&mut self) {
        self.bytes[self.index] = 0;
    }

    /// Content up to (not including) the terminator.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.index]
    }

    pub fn reset(&mut self) {
        self.bytes = [0; LINE_CAPACITY];
        self.index = 0;
        self.truncated = 0;
    }
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Single-line handoff between the receive interrupt and the main loop.
///
/// The ready flag decides who may touch the buffer: the producer while it is
/// clear, the consumer while it is set. Both sides load it with `Acquire` and
/// flip it with `Release`, so every buffer write made by one side is visible
/// to the other once it observes the flip.
pub struct LineExchange {
    line: UnsafeCell<LineBuffer>,
    ready: AtomicBool,
    busy_drops: AtomicU32,
    echo_drops: AtomicU32,
}

// SAFETY: the buffer is only reached through `LineProducer` / `LineConsumer`,
// exactly one of each exists, and the ready flag gives them disjoint access.
unsafe impl Sync for LineExchange {}

impl LineExchange {
    /// Creates the exchange and splits it into its two endpoints.
    pub fn new_pair() -> (LineProducer, LineConsumer) {
        let shared = Arc::new(Self {
            line: UnsafeCell::new(LineBuffer::new()),
            ready: AtomicBool::new(false),
            busy_drops: AtomicU32::new(0),
            echo_drops: AtomicU32::new(0),
        });
        (
            LineProducer {
                shared: Arc::clone(&shared),
            },
            LineConsumer { shared },
        )
    }
}

/// Receiver-side endpoint. Not `Clone`.
pub struct LineProducer {
    shared: Arc<LineExchange>,
}

impl LineProducer {
    /// True while a completed line is waiting for the dispatcher.
    pub fn is_busy(&self) -> bool {
        self.shared.ready.load(Ordering::Acquire)
    }

    /// Mutable access to the line, or `None` while a line is in flight.
    pub fn buffer(&mut self) -> Option<&mut LineBuffer> {
        if self.shared.ready.load(Ordering::Acquire) {
            return None;
        }
        // SAFETY: flag is clear, so the consumer will not read the buffer
        // until `publish` below, which needs `&mut self` and thus ends this
        // borrow first.
        Some(unsafe { &mut *self.shared.line.get() })
    }

    /// Hands the current line to the consumer.
    pub fn publish(&mut self) {
        self.shared.ready.store(true, Ordering::Release);
    }

    pub fn note_busy_drop(&self) {
        self.shared.busy_drops.fetch_add(1, Ordering::Relaxed);
    }

    pub fn note_echo_drop(&self) {
        self.shared.echo_drops.fetch_add(1, Ordering::Relaxed);
    }
}

/// Dispatcher-side endpoint. Not `Clone`.
pub struct LineConsumer {
    shared: Arc<LineExchange>,
}

impl LineConsumer {
    pub fn is_ready(&self) -> bool {
        self.shared.ready.load(Ordering::Acquire)
    }

    /// Runs `f` on the pending line, then resets the buffer and clears the
    /// ready flag. Returns `None` when no line is pending.
    pub fn take_line<R>(&mut self, f: impl FnOnce(&LineBuffer) -> R) -> Option<R> {
        if !self.shared.ready.load(Ordering::Acquire) {
            return None;
        }
        // SAFETY: flag is set, the producer stays away from the buffer until
        // it observes the clear below.
        let line = unsafe { &mut *self.shared.line.get() };
        let out = f(&*line);
        line.reset();
        self.shared.ready.store(false, Ordering::Release);
        Some(out)
    }

    /// Bytes dropped because they arrived while a line was in flight.
    pub fn take_busy_drops(&self) -> u32 {
        self.shared.busy_drops.swap(0, Ordering::Relaxed)
    }

    /// Echo bytes the transmitter could not accept.
    pub fn take_echo_drops(&self) -> u32 {
        self.shared.echo_drops.swap(0, Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn push_stops_at_max_len() {
        let mut line = LineBuffer::new();
        for _ in 0..LINE_CAPACITY + 10 {
            line.push(b'k');
        }
        assert_eq!(line.index(), MAX_LINE_LEN);
        assert_eq!(line.truncated(), 11);
        line.terminate();
        assert_eq!(line.as_bytes().len(), MAX_LINE_LEN);
    }

    #[test]
    fn backspace_on_empty_is_noop() {
        let mut line = LineBuffer::new();
        assert!(!line.backspace());
        assert_eq!(line.index(), 0);
        line.push(b'a');
        assert!(line.backspace());
        assert!(line.as_bytes().is_empty());
    }

    #[test]
    fn producer_locked_out_while_ready() {
        let (mut tx, mut rx) = LineExchange::new_pair();
        tx.buffer().unwrap().push(b'a');
        tx.publish();
        assert!(tx.is_busy());
        assert!(tx.buffer().is_none());

        let seen = rx.take_line(|l| l.as_bytes().to_vec()).unwrap();
        assert_eq!(seen, b"a");
        assert!(!rx.is_ready());
        assert_eq!(tx.buffer().unwrap().index(), 0);
        assert!(rx.take_line(|_| ()).is_none());
    }

    #[test]
    fn drop_counters_reset_on_take() {
        let (tx, rx) = LineExchange::new_pair();
        tx.note_busy_drop();
        tx.note_busy_drop();
        tx.note_echo_drop();
        assert_eq!(rx.take_busy_drops(), 2);
        assert_eq!(rx.take_busy_drops(), 0);
        assert_eq!(rx.take_echo_drops(), 1);
    }

    #[test]
    fn lines_cross_threads_in_order() {
        const LINES: u32 = 500;
        let (mut tx, mut rx) = LineExchange::new_pair();

        let producer = thread::spawn(move || {
            for n in 0..LINES {
                let text = n.to_string();
                loop {
                    if let Some(buf) = tx.buffer() {
                        for b in text.bytes() {
                            buf.push(b);
                        }
                        buf.terminate();
                        break;
                    }
                    thread::yield_now();
                }
                tx.publish();
            }
        });

        let mut expected = 0u32;
        while expected < LINES {
            if let Some(text) = rx.take_line(|l| String::from_utf8(l.as_bytes().to_vec()).unwrap()) {
                assert_eq!(text, expected.to_string());
                expected += 1;
            } else {
                thread::yield_now();
            }
        }
        producer.join().unwrap();
    }
}
