//! Inbox worker: consumes envelopes from the inbox queue and runs the
//! matching command handler.

pub mod dispatcher;

pub use dispatcher::{Dispatcher, Outcome};
