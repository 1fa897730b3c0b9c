//! WebSocket stream endpoint
//!
//! One socket per participant per session. The socket is served by three
//! tasks: a writer that owns the participant's [`LiveStream`], a reader for
//! client frames, and a heartbeat monitor. Reader and monitor talk to the
//! writer through a control channel, so only the writer touches the sink.
//!
//! [`LiveStream`]: live_service::LiveStream

mod handler;

pub use handler::{stream_handler, StreamParams};
