//! Multiplexed output stream
//!
//! Everything the agency produces during a turn — progress events, the
//! critic's report, the director's incremental prose — travels to the client
//! over one byte channel. Text deltas are written as literal bytes; control
//! events are framed as `<DELIM>{"event":...,"meta":...}<DELIM>` where the
//! delimiter carries an ASCII control byte, so a JSON encoder can never emit
//! it unescaped inside an event payload.
//!
//! `frame` defines the producer side (encoding + the channel sink the
//! pipeline writes into); `parser` is the consumer-side decoder that
//! reassembles frames from arbitrarily chunked reads.

pub mod frame;
pub mod parser;

pub use frame::{EventName, FrameSink, StreamFrame, FRAME_DELIM};
pub use parser::FrameParser;
