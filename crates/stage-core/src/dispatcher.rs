use crate::command::Command;
use crate::hal::{Axis, Idle, StageIO};
use crate::state::{MotionSnapshot, MotionState};
use crate::sync::LineConsumer;
use log::{debug, warn};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Clone, Default, Debug, PartialEq, Eq, Serialize)]
pub struct DispatchStats {
    pub lines_consumed: u64,
    pub commands_applied: u64,
    pub lines_ignored: u64,
    pub truncated_bytes: u64,
    pub busy_drops: u64,
    pub echo_drops: u64,
    pub idle_wakes: u64,
    pub output_refreshes: u64,
}

/// Result of consuming one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Dispatched {
    pub command: Command,
    /// Bytes cut from the end of this line.
    pub truncated: u32,
    /// Bytes dropped while the previous line was in flight, since the last dispatch.
    pub busy_drops: u32,
    /// Echoes refused by the transmitter since the last dispatch.
    pub echo_drops: u32,
    pub snapshot: MotionSnapshot,
}

/// Hook for the host to observe every consumed line.
pub trait DispatchObserver {
    fn on_dispatch(&mut self, dispatched: &Dispatched, stats: &DispatchStats);
}

impl<F: FnMut(&Dispatched, &DispatchStats)> DispatchObserver for F {
    fn on_dispatch(&mut self, dispatched: &Dispatched, stats: &DispatchStats) {
        self(dispatched, stats)
    }
}

/// Main-loop side: turns completed lines into output changes.
pub struct Dispatcher<IO: StageIO> {
    io: IO,
    lines: LineConsumer,
    state: MotionState,
    stats: DispatchStats,
}

impl<IO: StageIO> Dispatcher<IO> {
    pub fn new(io: IO, lines: LineConsumer) -> Self {
        Self {
            io,
            lines,
            state: MotionState::new(),
            stats: DispatchStats::default(),
        }
    }

    /// Runs until `stop` is set.
    ///
    /// Outputs are written on every pass, whether or not a line arrived.
    pub fn run<I: Idle, O: DispatchObserver>(
        &mut self,
        idle: &mut I,
        observer: &mut O,
        stop: &AtomicBool,
    ) {
        self.apply_outputs();
        while self.wait_for_line(idle, stop) {
            if let Some(dispatched) = self.poll() {
                observer.on_dispatch(&dispatched, &self.stats);
            }
            self.apply_outputs();
        }
    }

    /// Consumes the pending line, if any, and updates the motion state.
    ///
    /// The buffer is reset and the ready flag cleared whether or not the line
    /// matched a command.
    pub fn poll(&mut self) -> Option<Dispatched> {
        let (parsed, truncated) = self
            .lines
            .take_line(|line| (Command::try_parse(line.as_bytes()), line.truncated()))?;
        self.stats.lines_consumed += 1;

        if truncated > 0 {
            self.stats.truncated_bytes += u64::from(truncated);
            warn!("line exceeded buffer, dropped {} bytes", truncated);
        }

        let command = match parsed {
            Ok(command) => command,
            Err(err) => {
                debug!("ignoring line: {}", err);
                Command::Unrecognized
            }
        };
        self.apply(command);

        let busy_drops = self.lines.take_busy_drops();
        let echo_drops = self.lines.take_echo_drops();
        if busy_drops > 0 {
            self.stats.busy_drops += u64::from(busy_drops);
            warn!("{} bytes arrived while a line was pending and were dropped", busy_drops);
        }
        self.stats.echo_drops += u64::from(echo_drops);

        Some(Dispatched {
            command,
            truncated,
            busy_drops,
            echo_drops,
            snapshot: self.state.snapshot(),
        })
    }

    /// Drives every output from the persisted state.
    pub fn apply_outputs(&mut self) {
        for axis in Axis::ALL {
            let levels = self.state.axis(axis);
            self.io.set_axis_pins(axis, levels.step, levels.dir);
        }
        let spindle = self.state.spindle();
        self.io.set_spindle_level(spindle.level);
        self.io.set_spindle_enabled(spindle.enabled);
        self.stats.output_refreshes += 1;
    }

    fn apply(&mut self, command: Command) {
        match command {
            Command::StepX(_) => self.state.toggle_step(Axis::X),
            Command::DirX(_) => self.state.toggle_dir(Axis::X),
            Command::StepY(_) => self.state.toggle_step(Axis::Y),
            Command::DirY(_) => self.state.toggle_dir(Axis::Y),
            Command::StepZ(_) => self.state.toggle_step(Axis::Z),
            Command::DirZ(_) => self.state.toggle_dir(Axis::Z),
            Command::SpindleOn(level) => self.state.spindle_on(level),
            Command::SpindleOff => self.state.spindle_off(),
            Command::Unrecognized => {
                self.stats.lines_ignored += 1;
                return;
            }
        }
        self.stats.commands_applied += 1;
        debug!("applied `{}`", command);
    }

    /// Blocks in the idle wait until a line is pending. Returns `false` on stop.
    ///
    /// Every wake refreshes the outputs, so pins are rewritten at least once
    /// per idle timeout even without traffic.
    fn wait_for_line<I: Idle>(&mut self, idle: &mut I, stop: &AtomicBool) -> bool {
        loop {
            if stop.load(Ordering::Relaxed) {
                return false;
            }
            // Any interrupt ends the wait, so this re-check is required.
            if self.lines.is_ready() {
                return true;
            }
            idle.wait_for_interrupt();
            self.stats.idle_wakes += 1;
            self.apply_outputs();
        }
    }

    pub fn state(&self) -> &MotionState {
        &self.state
    }

    pub fn snapshot(&self) -> MotionSnapshot {
        self.state.snapshot()
    }

    pub fn stats(&self) -> &DispatchStats {
        &self.stats
    }

    pub fn io(&self) -> &IO {
        &self.io
    }

    pub fn into_io(self) -> IO {
        self.io
    }
}
