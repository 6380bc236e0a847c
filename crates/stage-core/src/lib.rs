pub mod command;
pub mod dispatcher;
pub mod hal;
#[cfg(feature = "simulation")]
pub mod hal_sim;
pub mod receiver;
mod receiver_proptest;
pub mod state;
pub mod sync;
pub mod tags;

pub use command::{Command, ParseError};
pub use dispatcher::{DispatchObserver, DispatchStats, Dispatched, Dispatcher};
pub use hal::{Axis, AxisPins, Idle, PinMap, SerialPort, Spindle, StageIO};
#[cfg(feature = "simulation")]
pub use hal_sim::{ParkIdle, ScriptedSerial, SimulatedStage};
pub use receiver::{LineReceiver, RxOutcome};
pub use state::{AxisState, MotionSnapshot, MotionState, SpindleState};
pub use sync::{LineBuffer, LineConsumer, LineExchange, LineProducer, LINE_CAPACITY, MAX_LINE_LEN};
