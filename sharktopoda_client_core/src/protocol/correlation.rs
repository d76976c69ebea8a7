//! Request/response correlation
//!
//! The protocol carries no request identifier, so a response is matched to an
//! outstanding call by its message kind and, when both sides name one, the
//! video UUID. When several calls share a key the oldest one is resolved
//! first.
//!
//! Flow:
//! 1. The caller registers the key it expects and gets a [`PendingReply`]
//! 2. The command is sent
//! 3. The receive loop hands each response to [`Correlator::resolve`]
//! 4. The caller awaits [`PendingReply::wait`], which times out on its own
//!
//! Dropping a `PendingReply` before it resolves removes its entry, so an
//! abandoned call never captures a later response.

use crate::protocol::error::{ProtocolError, Result};
use crate::protocol::messages::{MessageKind, Response};
use log::{debug, trace, warn};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::Instant;
use uuid::Uuid;

/// Client-local identifier of an outstanding call
///
/// Identifiers increase monotonically, so ordering by id is ordering by
/// registration time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(u64);

impl RequestId {
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What a pending call is waiting for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CorrelationKey {
    pub kind: MessageKind,
    pub uuid: Option<Uuid>,
}

impl CorrelationKey {
    pub fn new(kind: MessageKind, uuid: Option<Uuid>) -> Self {
        Self { kind, uuid }
    }

    /// A missing UUID on either side matches any UUID
    pub fn matches(&self, response: &Response) -> bool {
        if self.kind != response.kind {
            return false;
        }
        match (self.uuid, response.uuid) {
            (Some(expected), Some(actual)) => expected == actual,
            _ => true,
        }
    }
}

impl fmt::Display for CorrelationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.uuid {
            Some(uuid) => write!(f, "'{}' for {uuid}", self.kind),
            None => write!(f, "'{}'", self.kind),
        }
    }
}

struct PendingCall {
    key: CorrelationKey,
    sender: oneshot::Sender<Response>,
    registered_at: Instant,
}

#[derive(Debug, Default)]
struct Counters {
    registered: AtomicU64,
    completed: AtomicU64,
    timed_out: AtomicU64,
    cancelled: AtomicU64,
    unmatched: AtomicU64,
    failed: AtomicU64,
}

/// Correlation statistics
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CorrelationStats {
    pub registered: u64,
    pub completed: u64,
    pub timed_out: u64,
    /// Calls abandoned by their caller
    pub cancelled: u64,
    /// Responses nobody was waiting for
    pub unmatched: u64,
    /// Calls failed by shutdown
    pub failed: u64,
}

/// Table of outstanding calls
pub struct Correlator {
    pending: Mutex<BTreeMap<RequestId, PendingCall>>,
    next_id: AtomicU64,
    closed: AtomicBool,
    counters: Counters,
}

impl Correlator {
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
            closed: AtomicBool::new(false),
            counters: Counters::default(),
        }
    }

    /// Register a call waiting for `key`, failing after `timeout`
    pub fn register(
        self: &Arc<Self>,
        key: CorrelationKey,
        timeout: Duration,
    ) -> Result<PendingReply> {
        if self.closed.load(Ordering::Acquire) {
            return Err(ProtocolError::connection_closed(key.kind.as_str()));
        }

        let id = RequestId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (sender, receiver) = oneshot::channel();
        let registered_at = Instant::now();

        self.pending.lock().insert(
            id,
            PendingCall {
                key,
                sender,
                registered_at,
            },
        );
        self.counters.registered.fetch_add(1, Ordering::Relaxed);
        debug!("Registered pending call {id} for {key}");

        Ok(PendingReply {
            id,
            key,
            timeout,
            deadline: registered_at + timeout,
            receiver,
            correlator: Arc::clone(self),
        })
    }

    /// Deliver a response to the oldest matching call
    ///
    /// Gives the response back when no call is waiting for it.
    pub fn resolve(&self, mut response: Response) -> std::result::Result<RequestId, Response> {
        loop {
            let call = {
                let mut pending = self.pending.lock();
                let id = pending
                    .iter()
                    .find(|(_, call)| call.key.matches(&response))
                    .map(|(id, _)| *id);
                id.and_then(|id| pending.remove(&id).map(|call| (id, call)))
            };

            let Some((id, call)) = call else {
                self.counters.unmatched.fetch_add(1, Ordering::Relaxed);
                return Err(response);
            };

            match call.sender.send(response) {
                Ok(()) => {
                    self.counters.completed.fetch_add(1, Ordering::Relaxed);
                    debug!(
                        "Completed pending call {id} for {} after {:?}",
                        call.key,
                        call.registered_at.elapsed()
                    );
                    return Ok(id);
                }
                Err(returned) => {
                    // Waiter vanished without cancelling; try the next match
                    self.counters.cancelled.fetch_add(1, Ordering::Relaxed);
                    trace!("Pending call {id} receiver dropped");
                    response = returned;
                }
            }
        }
    }

    /// Remove a call its caller no longer wants
    pub fn cancel(&self, id: RequestId) -> bool {
        match self.pending.lock().remove(&id) {
            Some(call) => {
                self.counters.cancelled.fetch_add(1, Ordering::Relaxed);
                debug!("Cancelled pending call {id} for {}", call.key);
                true
            }
            None => false,
        }
    }

    fn expire(&self, id: RequestId) -> bool {
        match self.pending.lock().remove(&id) {
            Some(call) => {
                self.counters.timed_out.fetch_add(1, Ordering::Relaxed);
                warn!(
                    "Pending call {id} for {} timed out after {:?}",
                    call.key,
                    call.registered_at.elapsed()
                );
                true
            }
            None => false,
        }
    }

    /// Fail every outstanding call and refuse new ones
    pub fn fail_all(&self) -> usize {
        self.closed.store(true, Ordering::Release);
        let drained = std::mem::take(&mut *self.pending.lock());
        let count = drained.len();
        if count > 0 {
            debug!("Failing {count} pending calls");
        }
        self.counters
            .failed
            .fetch_add(count as u64, Ordering::Relaxed);
        // Dropping the senders wakes every waiter with ConnectionClosed
        drop(drained);
        count
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_pending(&self, id: RequestId) -> bool {
        self.pending.lock().contains_key(&id)
    }

    pub fn stats(&self) -> CorrelationStats {
        let c = &self.counters;
        CorrelationStats {
            registered: c.registered.load(Ordering::Relaxed),
            completed: c.completed.load(Ordering::Relaxed),
            timed_out: c.timed_out.load(Ordering::Relaxed),
            cancelled: c.cancelled.load(Ordering::Relaxed),
            unmatched: c.unmatched.load(Ordering::Relaxed),
            failed: c.failed.load(Ordering::Relaxed),
        }
    }
}

impl Default for Correlator {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to one outstanding call
pub struct PendingReply {
    id: RequestId,
    key: CorrelationKey,
    timeout: Duration,
    deadline: Instant,
    receiver: oneshot::Receiver<Response>,
    correlator: Arc<Correlator>,
}

impl PendingReply {
    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn key(&self) -> CorrelationKey {
        self.key
    }

    /// Wait for the matching response or the deadline
    pub async fn wait(mut self) -> Result<Response> {
        match tokio::time::timeout_at(self.deadline, &mut self.receiver).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(_)) => Err(ProtocolError::connection_closed(self.key.kind.as_str())),
            Err(_) => {
                self.correlator.expire(self.id);
                // A response may have landed between the deadline and removal
                match self.receiver.try_recv() {
                    Ok(response) => Ok(response),
                    Err(_) => Err(ProtocolError::timeout(
                        self.key.kind.as_str(),
                        self.timeout,
                    )),
                }
            }
        }
    }
}

impl Drop for PendingReply {
    fn drop(&mut self) {
        self.correlator.cancel(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn correlator() -> Arc<Correlator> {
        Arc::new(Correlator::new())
    }

    fn key(kind: MessageKind, uuid: Option<Uuid>) -> CorrelationKey {
        CorrelationKey::new(kind, uuid)
    }

    #[test]
    fn test_key_matching() {
        let video = Uuid::new_v4();
        let other = Uuid::new_v4();
        let response = Response::ok(MessageKind::Play).with_uuid(video);

        assert!(key(MessageKind::Play, Some(video)).matches(&response));
        assert!(key(MessageKind::Play, None).matches(&response));
        assert!(!key(MessageKind::Play, Some(other)).matches(&response));
        assert!(!key(MessageKind::Pause, Some(video)).matches(&response));

        let bare = Response::ok(MessageKind::Play);
        assert!(key(MessageKind::Play, Some(video)).matches(&bare));
    }

    #[test]
    fn test_request_ids_increase() {
        let correlator = correlator();
        let a = correlator
            .register(key(MessageKind::Ping, None), Duration::from_secs(1))
            .unwrap();
        let b = correlator
            .register(key(MessageKind::Ping, None), Duration::from_secs(1))
            .unwrap();
        assert!(b.id() > a.id());
        assert_eq!(correlator.pending_count(), 2);
    }

    #[tokio::test]
    async fn test_resolve_delivers_response() {
        let correlator = correlator();
        let video = Uuid::new_v4();
        let reply = correlator
            .register(key(MessageKind::Pause, Some(video)), Duration::from_secs(1))
            .unwrap();
        let id = reply.id();

        let resolved = correlator.resolve(Response::ok(MessageKind::Pause).with_uuid(video));
        assert_eq!(resolved, Ok(id));
        assert!(!correlator.is_pending(id));

        let response = reply.wait().await.unwrap();
        assert_eq!(response.kind, MessageKind::Pause);
        assert_eq!(correlator.stats().completed, 1);
    }

    #[tokio::test]
    async fn test_oldest_matching_call_wins() {
        let correlator = correlator();
        let first = correlator
            .register(key(MessageKind::Ping, None), Duration::from_secs(1))
            .unwrap();
        let second = correlator
            .register(key(MessageKind::Ping, None), Duration::from_secs(1))
            .unwrap();

        assert_eq!(correlator.resolve(Response::ok(MessageKind::Ping)), Ok(first.id()));
        assert_eq!(
            correlator.resolve(Response::ok(MessageKind::Ping)),
            Ok(second.id())
        );
        assert!(first.wait().await.is_ok());
        assert!(second.wait().await.is_ok());
    }

    #[tokio::test]
    async fn test_distinct_videos_resolve_independently() {
        let correlator = correlator();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let reply_a = correlator
            .register(key(MessageKind::Play, Some(a)), Duration::from_secs(1))
            .unwrap();
        let reply_b = correlator
            .register(key(MessageKind::Play, Some(b)), Duration::from_secs(1))
            .unwrap();

        // Answer out of order
        assert_eq!(
            correlator.resolve(Response::ok(MessageKind::Play).with_uuid(b)),
            Ok(reply_b.id())
        );
        assert_eq!(
            correlator.resolve(Response::ok(MessageKind::Play).with_uuid(a)),
            Ok(reply_a.id())
        );

        assert_eq!(reply_a.wait().await.unwrap().uuid, Some(a));
        assert_eq!(reply_b.wait().await.unwrap().uuid, Some(b));
    }

    #[test]
    fn test_unmatched_response_returned() {
        let correlator = correlator();
        let response = Response::ok(MessageKind::Show);
        assert_eq!(correlator.resolve(response.clone()), Err(response));
        assert_eq!(correlator.stats().unmatched, 1);
    }

    #[tokio::test]
    async fn test_wait_times_out_and_removes_entry() {
        let correlator = correlator();
        let reply = correlator
            .register(key(MessageKind::Play, None), Duration::from_millis(200))
            .unwrap();

        let err = reply.wait().await.unwrap_err();
        assert!(matches!(err, ProtocolError::Timeout { .. }));
        assert_eq!(correlator.pending_count(), 0);
        assert_eq!(correlator.stats().timed_out, 1);

        // A late response is not delivered to anyone
        assert!(correlator.resolve(Response::ok(MessageKind::Play)).is_err());
    }

    #[test]
    fn test_drop_cancels() {
        let correlator = correlator();
        let reply = correlator
            .register(key(MessageKind::Ping, None), Duration::from_secs(1))
            .unwrap();
        let id = reply.id();
        assert!(correlator.is_pending(id));

        drop(reply);
        assert!(!correlator.is_pending(id));
        assert_eq!(correlator.stats().cancelled, 1);
        assert!(!correlator.cancel(id));
    }

    #[tokio::test]
    async fn test_fail_all() {
        let correlator = correlator();
        let reply = correlator
            .register(key(MessageKind::Open, None), Duration::from_secs(5))
            .unwrap();

        assert_eq!(correlator.fail_all(), 1);
        let err = reply.wait().await.unwrap_err();
        assert!(matches!(err, ProtocolError::ConnectionClosed { .. }));

        assert!(correlator.is_closed());
        let refused = correlator.register(key(MessageKind::Ping, None), Duration::from_secs(1));
        assert!(matches!(refused, Err(ProtocolError::ConnectionClosed { .. })));
        assert_eq!(correlator.stats().failed, 1);
    }
}
