use std::fmt;
use std::marker::PhantomData;
use std::thread::{self, ThreadId};

/// Capability held by the poll loop for the thread it runs on
///
/// Every operation that mutates a [`Session`](super::Session) takes a
/// `&DesignatedThread`. The token is neither `Send` nor `Sync`, so it can
/// only be used on the thread that claimed it, and it can only be claimed
/// from inside this crate (the poll loop does so when it starts).
pub struct DesignatedThread {
    id: ThreadId,
    name: Option<String>,
    _not_send: PhantomData<*const ()>,
}

impl DesignatedThread {
    pub(crate) fn claim() -> Self {
        let current = thread::current();
        Self {
            id: current.id(),
            name: current.name().map(str::to_owned),
            _not_send: PhantomData,
        }
    }

    pub fn id(&self) -> ThreadId {
        self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

impl fmt::Debug for DesignatedThread {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DesignatedThread")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_captures_current_thread() {
        let token = DesignatedThread::claim();
        assert_eq!(token.id(), thread::current().id());
    }

    #[test]
    fn test_claim_on_named_thread() {
        let (id, name) = thread::Builder::new()
            .name("rtms-poll-test".to_string())
            .spawn(|| {
                let token = DesignatedThread::claim();
                (token.id(), token.name().map(str::to_owned))
            })
            .unwrap()
            .join()
            .unwrap();

        assert_ne!(id, thread::current().id());
        assert_eq!(name.as_deref(), Some("rtms-poll-test"));
    }
}
