pub mod config;
pub mod http;
pub mod nats;
pub mod poll_loop;
pub mod session;
pub mod transport;
pub mod webhook;

#[cfg(test)]
pub(crate) mod testing;

pub use config::Config;
pub use http::{create_router, AppState};
pub use nats::{NatsTransport, NatsTransportFactory};
pub use poll_loop::{PollLoop, TickSummary, DEFAULT_POLL_INTERVAL};
pub use session::{
    print_transcript, render_transcript_line, Handoff, HandoffQueue, JoinRequest, Session,
    SessionRegistry, SessionState, SessionStats,
};
pub use transport::{StreamTransport, TransportEvent, TransportFactory};
pub use webhook::{EventKind, RouteOutcome, WebhookEvent, WebhookRouter};
