//! Streaming detection pipeline
//!
//! Ties one inbound transport channel (audio frames + control signals), one
//! STT adapter, and one hybrid session together into two cooperating tasks:
//! - the Receiver forwards inbound audio to the adapter and closes it on
//!   end-of-stream or disconnect,
//! - the Pump drains the adapter's transcripts through the session and emits
//!   the typed outbound events.
//!
//! The session is mutated exclusively from the Pump; the adapter's internal
//! audio queue is the only structure the two tasks share. Whatever ends the
//! run, teardown closes the adapter, resets the session (persisting its
//! log), and cancels the peer task, in that order.

pub mod event;
mod run;

pub use event::{InboundEvent, OutboundEvent};
pub use run::run_pipeline;
