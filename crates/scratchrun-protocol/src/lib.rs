//! Wire protocol between an instrumented scratch program and the host
//!
//! The instrumented program shares stdout with whatever the user's code
//! prints. Lines it emits itself carry [`markers::GENERATED_OUTPUT_PREFIX`];
//! [`demux`] turns the merged stream back into per-expression events.
//!
//! There is no escaping: a user line that happens to start with the prefix is
//! decoded as an instrumentation line.

pub mod demux;
pub mod markers;

pub use demux::{DemuxError, Demultiplexer, ScratchOutputEvent, demux, demux_with};
pub use markers::{
    END_OUTPUT_MARKER, GENERATED_OUTPUT_PREFIX, LINES_INFO_MARKER, NO_VALUE, ProtocolLine,
    decode_line,
};
