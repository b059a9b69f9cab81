//! The poll loop: the only place sessions are created, driven and torn down
//!
//! Each tick drains the handoff queue (joins and leaves), then advances every
//! registered session once, then sleeps for a fixed interval. The loop runs on
//! a dedicated OS thread with its own current-thread runtime, so every future
//! that touches a session is polled on that one thread.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tracing::{debug, error, info, warn};

use crate::session::{
    DesignatedThread, Handoff, HandoffQueue, JoinRequest, Progress, Session, SessionRegistry,
    SharedSession,
};
use crate::transport::TransportFactory;

/// Default pause between ticks
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Hook run on every new session before it joins
pub type SessionSetup = Arc<dyn Fn(&mut Session) + Send + Sync>;

enum JoinOutcome {
    Registered,
    /// Registered, but a stop for the stream arrived before it was
    Orphaned,
    Failed,
}

/// Counters for a single tick
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickSummary {
    /// Sessions joined and registered
    pub joined: usize,
    /// Of those, sessions whose stop arrived while the join was still pending
    pub orphaned: usize,
    /// Join requests abandoned
    pub join_failures: usize,
    /// Sessions terminated after a stop event
    pub left: usize,
    /// Sessions advanced
    pub advanced: usize,
    /// Sessions removed after the transport closed
    pub closed: usize,
}

impl TickSummary {
    fn is_idle(&self) -> bool {
        *self == TickSummary::default()
    }
}

pub struct PollLoop {
    registry: SessionRegistry,
    queue: HandoffQueue,
    factory: Arc<dyn TransportFactory>,
    interval: Duration,
    setup: Option<SessionSetup>,
}

impl PollLoop {
    pub fn new(
        registry: SessionRegistry,
        queue: HandoffQueue,
        factory: Arc<dyn TransportFactory>,
    ) -> Self {
        Self {
            registry,
            queue,
            factory,
            interval: DEFAULT_POLL_INTERVAL,
            setup: None,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Run `setup` on every new session before it joins (e.g. to register callbacks)
    pub fn with_session_setup<F>(mut self, setup: F) -> Self
    where
        F: Fn(&mut Session) + Send + Sync + 'static,
    {
        self.setup = Some(Arc::new(setup));
        self
    }

    /// Start the loop on a new, dedicated thread
    ///
    /// The thread exits after `shutdown` flips to `true` (or its sender is
    /// dropped) and every remaining session has been terminated.
    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> Result<thread::JoinHandle<Result<()>>> {
        thread::Builder::new()
            .name("rtms-poll".to_string())
            .spawn(move || {
                let runtime = tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .context("Failed to build poll loop runtime")?;
                runtime.block_on(self.run(shutdown))
            })
            .context("Failed to spawn poll loop thread")
    }

    /// Run the loop on the calling thread until shutdown
    ///
    /// The returned future is not `Send`; it can only be driven by `block_on`
    /// or a current-thread runtime on the thread that will own the sessions.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        let thread = DesignatedThread::claim();
        info!(
            "Poll loop started on {:?} ({}ms interval)",
            thread.id(),
            self.interval.as_millis()
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            let summary = self.tick(&thread).await;
            if !summary.is_idle() {
                debug!("Tick: {:?}", summary);
            }

            let stop = tokio::select! {
                changed = shutdown.changed() => changed.is_err() || *shutdown.borrow(),
                _ = tokio::time::sleep(self.interval) => false,
            };
            if stop {
                break;
            }
        }

        info!("Poll loop shutting down");
        let terminated = self.shutdown(&thread).await;
        info!("Poll loop stopped ({} sessions terminated)", terminated);

        Ok(())
    }

    /// One iteration: execute handoffs, then advance every registered session
    pub(crate) async fn tick(&self, thread: &DesignatedThread) -> TickSummary {
        let mut summary = TickSummary::default();

        for handoff in self.queue.drain_all() {
            match handoff {
                Handoff::Join(request) => match self.start_session(request, thread).await {
                    JoinOutcome::Registered => summary.joined += 1,
                    JoinOutcome::Orphaned => {
                        summary.joined += 1;
                        summary.orphaned += 1;
                    }
                    JoinOutcome::Failed => summary.join_failures += 1,
                },
                Handoff::Leave { stream_id, session } => {
                    Self::terminate(&stream_id, &session, thread).await;
                    summary.left += 1;
                }
            }
        }

        for (stream_id, session) in self.registry.snapshot().await {
            let progress = session.lock().await.advance(thread).await;
            summary.advanced += 1;

            if let Progress::Closed { reason } = progress {
                if self.registry.remove_if_same(&stream_id, &session).await {
                    info!("Removed stream {} ({})", stream_id, reason);
                    summary.closed += 1;
                }
            }
        }

        summary
    }

    /// Create, join and register a session
    async fn start_session(&self, request: JoinRequest, thread: &DesignatedThread) -> JoinOutcome {
        let stream_id = request.stream_id.clone();

        if self.registry.contains(&stream_id).await {
            warn!(
                "Stream {} is already registered; ignoring duplicate join",
                stream_id
            );
            return JoinOutcome::Failed;
        }

        let transport = match self.factory.create(&stream_id).await {
            Ok(transport) => transport,
            Err(e) => {
                error!("Failed to create transport for stream {}: {:#}", stream_id, e);
                return JoinOutcome::Failed;
            }
        };

        let mut session = Session::new(request, transport, thread);
        if let Some(setup) = &self.setup {
            setup(&mut session);
        }

        if let Err(e) = session.join(thread).await {
            error!("Failed to join stream {}: {}", stream_id, e);
            return JoinOutcome::Failed;
        }

        // A stop may have arrived while the join was queued or in flight
        let orphaned = self.queue.take_unmatched_stop(&stream_id);
        if orphaned {
            warn!(
                "Stream {} was stopped before its join completed; the session is orphaned",
                stream_id
            );
        }

        self.registry
            .put(stream_id, Arc::new(Mutex::new(session)))
            .await;

        if orphaned {
            JoinOutcome::Orphaned
        } else {
            JoinOutcome::Registered
        }
    }

    async fn terminate(stream_id: &str, session: &SharedSession, thread: &DesignatedThread) {
        if let Err(e) = session.lock().await.terminate(thread).await {
            warn!("Failed to leave stream {} cleanly: {}", stream_id, e);
        }
    }

    /// Terminate everything still owned by the loop, then flush the transport
    ///
    /// Returns how many sessions were terminated.
    pub(crate) async fn shutdown(&self, thread: &DesignatedThread) -> usize {
        let mut terminated = 0;

        for handoff in self.queue.drain_all() {
            match handoff {
                Handoff::Join(request) => {
                    info!("Discarding pending join for stream {}", request.stream_id);
                }
                Handoff::Leave { stream_id, session } => {
                    Self::terminate(&stream_id, &session, thread).await;
                    terminated += 1;
                }
            }
        }

        for (stream_id, session) in self.registry.drain().await {
            Self::terminate(&stream_id, &session, thread).await;
            terminated += 1;
        }

        // The runtime is dropped right after this returns
        if let Err(e) = self.factory.flush().await {
            warn!("Failed to flush transport after shutdown: {:#}", e);
        }

        terminated
    }
}
