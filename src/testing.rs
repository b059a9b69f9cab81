//! Scriptable in-memory transport for unit tests

use anyhow::{bail, Result};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use crate::session::JoinRequest;
use crate::transport::{
    JoinRejected, StreamMetadata, StreamTransport, TranscriptData, TransportEvent,
    TransportFactory,
};

#[derive(Default)]
struct MockState {
    created: Vec<String>,
    joins: Vec<String>,
    leaves: Vec<String>,
    fail_create: HashSet<String>,
    fail_join: HashSet<String>,
    break_join: HashSet<String>,
    join_gates: HashMap<String, Arc<Notify>>,
    fail_poll: HashSet<String>,
    fail_leave: HashSet<String>,
    pending: HashMap<String, Vec<TransportEvent>>,
    /// Number of leaves recorded at each flush
    flushes: Vec<usize>,
    fail_flush: bool,
}

#[derive(Clone, Default)]
pub(crate) struct MockFactory {
    state: Arc<Mutex<MockState>>,
}

impl MockFactory {
    pub(crate) fn transport(&self, stream_id: &str) -> Box<dyn StreamTransport> {
        Box::new(MockTransport {
            stream_id: stream_id.to_string(),
            state: Arc::clone(&self.state),
        })
    }

    pub(crate) fn push_event(&self, stream_id: &str, event: TransportEvent) {
        let mut state = self.state.lock().unwrap();
        state.pending.entry(stream_id.to_string()).or_default().push(event);
    }

    pub(crate) fn fail_create(&self, stream_id: &str) {
        self.state.lock().unwrap().fail_create.insert(stream_id.to_string());
    }

    pub(crate) fn fail_join(&self, stream_id: &str) {
        self.state.lock().unwrap().fail_join.insert(stream_id.to_string());
    }

    /// Make `join` fail with a plain transport error rather than a refusal
    pub(crate) fn break_join(&self, stream_id: &str) {
        self.state.lock().unwrap().break_join.insert(stream_id.to_string());
    }

    /// Hold `join` for `stream_id` until the returned gate is notified
    pub(crate) fn gate_join(&self, stream_id: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.state
            .lock()
            .unwrap()
            .join_gates
            .insert(stream_id.to_string(), Arc::clone(&gate));
        gate
    }

    pub(crate) fn fail_flush(&self) {
        self.state.lock().unwrap().fail_flush = true;
    }

    pub(crate) fn fail_poll(&self, stream_id: &str) {
        self.state.lock().unwrap().fail_poll.insert(stream_id.to_string());
    }

    pub(crate) fn fail_leave(&self, stream_id: &str) {
        self.state.lock().unwrap().fail_leave.insert(stream_id.to_string());
    }

    pub(crate) fn created(&self) -> Vec<String> {
        self.state.lock().unwrap().created.clone()
    }

    pub(crate) fn joins(&self) -> Vec<String> {
        self.state.lock().unwrap().joins.clone()
    }

    pub(crate) fn leaves(&self) -> Vec<String> {
        self.state.lock().unwrap().leaves.clone()
    }

    pub(crate) fn flushes(&self) -> Vec<usize> {
        self.state.lock().unwrap().flushes.clone()
    }
}

#[async_trait::async_trait]
impl TransportFactory for MockFactory {
    async fn create(&self, stream_id: &str) -> Result<Box<dyn StreamTransport>> {
        {
            let mut state = self.state.lock().unwrap();
            if state.fail_create.contains(stream_id) {
                bail!("no gateway for {}", stream_id);
            }
            state.created.push(stream_id.to_string());
        }
        Ok(self.transport(stream_id))
    }

    async fn flush(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let leaves = state.leaves.len();
        state.flushes.push(leaves);
        if state.fail_flush {
            bail!("connection lost");
        }
        Ok(())
    }
}

struct MockTransport {
    stream_id: String,
    state: Arc<Mutex<MockState>>,
}

#[async_trait::async_trait]
impl StreamTransport for MockTransport {
    async fn join(&mut self, request: &JoinRequest) -> Result<()> {
        let gate = {
            let state = self.state.lock().unwrap();
            if state.fail_join.contains(&request.stream_id) {
                return Err(JoinRejected {
                    reason: "invalid signature".to_string(),
                }
                .into());
            }
            if state.break_join.contains(&request.stream_id) {
                bail!("gateway unreachable");
            }
            state.join_gates.get(&request.stream_id).cloned()
        };

        if let Some(gate) = gate {
            gate.notified().await;
        }

        self.state.lock().unwrap().joins.push(request.stream_id.clone());
        Ok(())
    }

    async fn poll(&mut self) -> Result<Vec<TransportEvent>> {
        let mut state = self.state.lock().unwrap();
        if state.fail_poll.contains(&self.stream_id) {
            bail!("connection reset");
        }
        Ok(state.pending.remove(&self.stream_id).unwrap_or_default())
    }

    async fn leave(&mut self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.leaves.push(self.stream_id.clone());
        if state.fail_leave.contains(&self.stream_id) {
            bail!("leave timed out");
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "mock"
    }
}

pub(crate) fn transcript_event(data: &[u8], timestamp: u64, user_name: &str) -> TransportEvent {
    TransportEvent::Transcript(TranscriptData {
        data: data.to_vec(),
        timestamp,
        metadata: StreamMetadata {
            user_name: user_name.to_string(),
            user_id: 1,
        },
    })
}
