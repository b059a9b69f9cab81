//! Webhook event parsing and routing
//!
//! Start events become join requests on the handoff queue; stop events
//! remove the session from the registry and hand it back to the poll loop
//! for termination.

mod event;
mod router;

pub use event::{EventKind, WebhookEvent, RTMS_STARTED, RTMS_STOPPED};
pub use router::{RouteOutcome, WebhookRouter};
