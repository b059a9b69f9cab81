//! NATS-backed stream transport
//!
//! The media gateway speaks NATS: joins are request/reply on `<prefix>.join`,
//! stream data arrives on `<prefix>.<stream_id>.{transcript,audio,closed}` and
//! leaves are published on `<prefix>.leave`.

pub mod client;
pub mod messages;

pub use client::{NatsTransport, NatsTransportFactory};
pub use messages::{ClosedMessage, DataMessage, JoinMessage, JoinReply, LeaveMessage};
