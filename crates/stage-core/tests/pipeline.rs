use stage_core::{
    Axis, Command, Dispatcher, LineExchange, LineReceiver, MotionSnapshot, ScriptedSerial,
    SimulatedStage, LINE_CAPACITY, MAX_LINE_LEN,
};

struct Stage {
    receiver: LineReceiver,
    serial: ScriptedSerial,
    dispatcher: Dispatcher<SimulatedStage>,
}

impl Stage {
    fn new() -> Self {
        let (tx, rx) = LineExchange::new_pair();
        Self {
            receiver: LineReceiver::new(tx),
            serial: ScriptedSerial::new(),
            dispatcher: Dispatcher::new(SimulatedStage::new(), rx),
        }
    }

    /// One interrupt followed by one main-loop pass.
    fn send(&mut self, bytes: &[u8]) -> Option<Command> {
        self.serial.feed(bytes);
        self.receiver.on_rx(&mut self.serial);
        let command = self.dispatcher.poll().map(|d| d.command);
        self.dispatcher.apply_outputs();
        command
    }

    fn snapshot(&self) -> MotionSnapshot {
        self.dispatcher.snapshot()
    }
}

#[test]
fn step_x_line_toggles_pin_four() {
    let mut stage = Stage::new();
    assert_eq!(stage.send(b"a 5\r"), Some(Command::StepX(5)));
    assert!(stage.dispatcher.io().gpio_level(4));
    assert!(!stage.dispatcher.io().gpio_level(3));
    assert_eq!(stage.serial.echoed(), b"a 5");
}

#[test]
fn every_axis_line_reaches_its_pins() {
    let mut stage = Stage::new();
    for line in ["a 1\r", "d 1\r", "w 1\r", "s 1\r", "z 1\r", "x 1\r"] {
        stage.send(line.as_bytes());
    }
    for axis in Axis::ALL {
        assert_eq!(stage.dispatcher.io().axis_levels(axis), (true, true));
    }
}

#[test]
fn overlong_line_is_truncated_and_stage_stays_responsive() {
    let mut stage = Stage::new();
    let overlong = vec![b'z'; LINE_CAPACITY + 10];
    stage.serial.feed(&overlong);
    stage.serial.feed(b"\r");
    stage.receiver.on_rx(&mut stage.serial);

    let dispatched = stage.dispatcher.poll().unwrap();
    assert_eq!(dispatched.truncated as usize, LINE_CAPACITY + 10 - MAX_LINE_LEN);
    assert_eq!(dispatched.command, Command::Unrecognized);
    assert_eq!(stage.serial.echoed(), &vec![b'z'; MAX_LINE_LEN][..]);

    let before = stage.snapshot();
    assert_eq!(stage.send(b"on 200\r"), Some(Command::SpindleOn(200)));
    assert_eq!(stage.snapshot().spindle.level, 200);
    assert_eq!(stage.snapshot().x, before.x);
}

#[test]
fn crlf_terminated_lines_dispatch_once() {
    let mut stage = Stage::new();
    assert_eq!(stage.send(b"w 3\r\n"), Some(Command::StepY(3)));
    assert_eq!(stage.send(b"s 3\r\n"), Some(Command::DirY(3)));
    assert_eq!(stage.dispatcher.stats().lines_consumed, 2);
}

#[test]
fn unknown_line_leaves_state_untouched() {
    let mut stage = Stage::new();
    stage.send(b"on 10\r");
    stage.send(b"x 2\r");
    let before = stage.snapshot();
    assert_eq!(stage.send(b"q 1\r"), Some(Command::Unrecognized));
    assert_eq!(stage.snapshot(), before);
}

#[test]
fn snapshot_serializes_per_axis() {
    let mut stage = Stage::new();
    stage.send(b"d 0\r");
    let json = serde_json::to_value(stage.snapshot()).unwrap();
    assert_eq!(json["x"]["dir"], true);
    assert_eq!(json["x"]["step"], false);
    assert_eq!(json["spindle"]["level"], 0);
}
