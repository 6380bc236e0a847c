#[cfg(test)]
mod proptest_receiver {
    use crate::command::Command;
    use crate::dispatcher::Dispatcher;
    use crate::hal_sim::{ScriptedSerial, SimulatedStage};
    use crate::receiver::{LineReceiver, CR, DELETE, LF, SENTINEL};
    use crate::sync::{LineExchange, MAX_LINE_LEN};
    use proptest::prelude::*;

    // Bytes with no special meaning to the line editor.
    fn plain_byte() -> impl Strategy<Value = u8> {
        any::<u8>().prop_filter("plain", |b| ![SENTINEL, CR, LF, DELETE].contains(b))
    }

    fn axis_line() -> impl Strategy<Value = String> {
        (
            prop::sample::select(vec!["a", "d", "w", "s", "z", "x"]),
            any::<i32>(),
        )
            .prop_map(|(token, n)| format!("{} {}", token, n))
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(2000))]

        // Property: plain bytes land in the buffer and the echo, in order
        #[test]
        fn plain_bytes_buffered_and_echoed(bytes in prop::collection::vec(plain_byte(), 0..MAX_LINE_LEN)) {
            let (tx, mut rx) = LineExchange::new_pair();
            let mut recv = LineReceiver::new(tx);
            let mut serial = ScriptedSerial::new();
            serial.feed(&bytes);
            serial.feed(b"\r");
            recv.on_rx(&mut serial);

            let line = rx.take_line(|l| l.as_bytes().to_vec()).unwrap();
            prop_assert_eq!(&line, &bytes);
            prop_assert_eq!(serial.echoed(), &bytes[..]);
        }

        // Property: the sentinel never reaches buffer or echo, wherever it sits
        #[test]
        fn sentinel_never_observed(bytes in prop::collection::vec(any::<u8>().prop_filter("no terminator", |b| *b != CR && *b != LF), 0..200)) {
            let (tx, mut rx) = LineExchange::new_pair();
            let mut recv = LineReceiver::new(tx);
            let mut serial = ScriptedSerial::new();
            serial.feed(&bytes);
            serial.feed(b"\n");
            recv.on_rx(&mut serial);

            prop_assert!(!serial.echoed().contains(&SENTINEL));
            let line = rx.take_line(|l| l.as_bytes().to_vec()).unwrap();
            prop_assert!(!line.contains(&SENTINEL));
            prop_assert!(line.len() <= MAX_LINE_LEN);
        }

        // Property: arbitrary input never pushes the index past capacity
        #[test]
        fn index_stays_bounded(chunks in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..64), 1..16)) {
            let (tx, mut rx) = LineExchange::new_pair();
            let mut recv = LineReceiver::new(tx);
            let mut serial = ScriptedSerial::new();
            for chunk in chunks {
                serial.feed(&chunk);
                recv.on_rx(&mut serial);
                if let Some(len) = rx.take_line(|l| l.index()) {
                    prop_assert!(len <= MAX_LINE_LEN);
                }
            }
        }

        // Property: any axis command sent twice leaves the state unchanged
        #[test]
        fn double_toggle_is_identity(line in axis_line(), prefix in prop::collection::vec(axis_line(), 0..6)) {
            let (tx, rx) = LineExchange::new_pair();
            let mut recv = LineReceiver::new(tx);
            let mut serial = ScriptedSerial::new();
            let mut dispatcher = Dispatcher::new(SimulatedStage::new(), rx);

            let mut send = |text: &str, dispatcher: &mut Dispatcher<SimulatedStage>| {
                serial.feed(text.as_bytes());
                serial.feed(b"\r");
                recv.on_rx(&mut serial);
                dispatcher.poll().map(|d| d.command)
            };

            for text in &prefix {
                send(text, &mut dispatcher);
            }
            let before = dispatcher.snapshot();
            let first = send(&line, &mut dispatcher);
            prop_assert_ne!(first, Some(Command::Unrecognized));
            send(&line, &mut dispatcher);
            prop_assert_eq!(dispatcher.snapshot(), before);
        }
    }
}
