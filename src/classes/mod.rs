//! Native classes exposed to the host

pub mod message;

pub use message::MessageObject;
