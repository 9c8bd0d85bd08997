//! At most one live session per identity.
//!
//! The registry is the only state shared across sessions. All open,
//! displace, and remove operations go through one async mutex, so two
//! connections racing for the same identity serialize and the last writer
//! wins.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;
use voicebot_core::wire::{SharedFrameSink, TransportError};

/// Owner's view of one registered session.
pub struct SessionHandle {
    id: Uuid,
    identity: String,
    sink: SharedFrameSink,
}

impl SessionHandle {
    pub fn new(identity: String, sink: SharedFrameSink) -> Self {
        Self {
            id: Uuid::new_v4(),
            identity,
            sink,
        }
    }

    /// Unique per connection, not per identity; a reconnect gets a new id.
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Initiates the close handshake on the session's transport. After
    /// this, any pipeline arm still holding the session fails on its next
    /// write instead of reaching a displaced peer.
    pub async fn close(&self, reason: &str) -> Result<(), TransportError> {
        self.sink.lock().await.close(reason).await
    }
}

/// Identity -> live session map behind atomic open/close operations.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    inner: Arc<Mutex<HashMap<String, SessionHandle>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs `handle` as the live session for its identity.
    ///
    /// If the identity is already taken the occupant is closed first,
    /// best-effort: a failure to close the stale transport is logged and
    /// swallowed, never surfaced to the new connection. The map lock is
    /// held across the displacement so concurrent opens for one identity
    /// serialize.
    pub async fn open(&self, handle: SessionHandle) {
        let mut sessions = self.inner.lock().await;
        if let Some(previous) = sessions.remove(handle.identity()) {
            info!(
                identity = handle.identity(),
                displaced = %previous.id(),
                replacement = %handle.id(),
                "displacing existing session for identity"
            );
            if let Err(e) = previous.close("displaced by a new connection").await {
                debug!(error = %e, "stale session close failed; ignoring");
            }
        }
        sessions.insert(handle.identity().to_string(), handle);
    }

    /// Vacates the identity slot, but only if it still belongs to the
    /// caller's session. A displaced session calling in late must not evict
    /// its replacement.
    pub async fn close(&self, identity: &str, session_id: Uuid) {
        let mut sessions = self.inner.lock().await;
        if sessions.get(identity).is_some_and(|h| h.id() == session_id) {
            sessions.remove(identity);
        }
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    #[cfg(test)]
    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use voicebot_core::wire::{Frame, FrameWrite};

    /// Transport stub whose open/closed state is observable from outside.
    struct FlagSink {
        open: Arc<AtomicBool>,
    }

    #[async_trait]
    impl FrameWrite for FlagSink {
        async fn write_frame(&mut self, _frame: Frame) -> Result<(), TransportError> {
            if !self.open.load(Ordering::SeqCst) {
                return Err(TransportError::SessionNotOpen);
            }
            Ok(())
        }

        async fn close(&mut self, _reason: &str) -> Result<(), TransportError> {
            self.open.store(false, Ordering::SeqCst);
            Ok(())
        }
    }

    fn handle(identity: &str) -> (SessionHandle, Arc<AtomicBool>) {
        let open = Arc::new(AtomicBool::new(true));
        let sink: SharedFrameSink = Arc::new(Mutex::new(FlagSink { open: open.clone() }));
        (SessionHandle::new(identity.to_string(), sink), open)
    }

    #[tokio::test]
    async fn opening_a_free_identity_installs_the_session() {
        let registry = SessionRegistry::new();
        let (a, a_open) = handle("alice");
        registry.open(a).await;
        assert_eq!(registry.len().await, 1);
        assert!(a_open.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn reconnect_displaces_and_closes_the_previous_session() {
        let registry = SessionRegistry::new();
        let (a, a_open) = handle("alice");
        let (b, b_open) = handle("alice");
        registry.open(a).await;
        registry.open(b).await;

        assert_eq!(registry.len().await, 1);
        assert!(!a_open.load(Ordering::SeqCst), "displaced session must be closed");
        assert!(b_open.load(Ordering::SeqCst), "replacement must stay open");
    }

    #[tokio::test]
    async fn stale_close_does_not_evict_the_replacement() {
        let registry = SessionRegistry::new();
        let (a, _) = handle("alice");
        let a_id = a.id();
        let (b, _) = handle("alice");
        registry.open(a).await;
        registry.open(b).await;

        // The displaced session's teardown arrives after the replacement
        // has been installed.
        registry.close("alice", a_id).await;
        assert_eq!(registry.len().await, 1, "replacement entry must survive");
    }

    #[tokio::test]
    async fn own_close_removes_the_entry() {
        let registry = SessionRegistry::new();
        let (a, _) = handle("alice");
        let a_id = a.id();
        registry.open(a).await;
        registry.close("alice", a_id).await;
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn concurrent_opens_leave_exactly_one_live_session() {
        let registry = SessionRegistry::new();
        let (a, a_open) = handle("alice");
        let (b, b_open) = handle("alice");

        let r1 = registry.clone();
        let r2 = registry.clone();
        let (ra, rb) = tokio::join!(
            tokio::spawn(async move { r1.open(a).await }),
            tokio::spawn(async move { r2.open(b).await }),
        );
        ra.unwrap();
        rb.unwrap();

        assert_eq!(registry.len().await, 1);
        let survivors = [&a_open, &b_open]
            .iter()
            .filter(|f| f.load(Ordering::SeqCst))
            .count();
        assert_eq!(survivors, 1, "exactly one of the two connections stays open");
    }

    #[tokio::test]
    async fn independent_identities_do_not_interfere() {
        let registry = SessionRegistry::new();
        let (a, a_open) = handle("alice");
        let (b, b_open) = handle("bob");
        registry.open(a).await;
        registry.open(b).await;

        assert_eq!(registry.len().await, 2);
        assert!(a_open.load(Ordering::SeqCst));
        assert!(b_open.load(Ordering::SeqCst));
    }
}
