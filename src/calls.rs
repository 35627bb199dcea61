//! Correlation of awaited calls with their responses.
//!
//! [`PendingCalls`] is owned by the connection task and never shared, so it
//! needs no lock. Ids increase monotonically, skip the fire-and-forget
//! sentinel, wrap back to zero, and never reuse an id that is still pending.
//! Response order does not matter; only the id does.

use std::collections::HashMap;

use bytes::Bytes;
use tokio::sync::oneshot;

use crate::codec::WireBuffer;
use crate::error::{Error, Result};
use crate::protocol::{CallId, FIRE_AND_FORGET_ID};

/// Highest id handed to an awaited call.
pub const MAX_CALL_ID: u32 = FIRE_AND_FORGET_ID - 1;

/// Completion side of an awaited call. Receives the response payload with
/// the read cursor positioned after the call id.
pub type ResponseSender = oneshot::Sender<Result<WireBuffer>>;

/// Outcome of matching one response payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The waiting caller received the payload.
    Delivered(u32),
    /// The id matched but the caller had stopped waiting.
    Abandoned(u32),
    /// No call with this id is pending.
    Unmatched(u32),
    /// The payload was too short to hold a call id.
    Malformed,
}

/// In-flight awaited calls keyed by id.
#[derive(Debug)]
pub struct PendingCalls {
    next_id: u32,
    pending: HashMap<u32, ResponseSender>,
}

impl PendingCalls {
    pub fn new() -> Self {
        Self::starting_at(0)
    }

    /// Start allocation at `first_id`; used to exercise wrap-around.
    pub fn starting_at(first_id: u32) -> Self {
        Self {
            next_id: first_id.min(MAX_CALL_ID),
            pending: HashMap::new(),
        }
    }

    /// Allocate an id and register the caller's completion.
    pub fn register(&mut self, reply: ResponseSender) -> CallId {
        let id = self.allocate();
        self.pending.insert(id, reply);
        CallId::Awaited(id)
    }

    fn allocate(&mut self) -> u32 {
        loop {
            let id = self.next_id;
            self.next_id = if id >= MAX_CALL_ID { 0 } else { id + 1 };
            if !self.pending.contains_key(&id) {
                return id;
            }
        }
    }

    /// Drop a registration without completing it.
    pub fn forget(&mut self, id: CallId) -> Option<ResponseSender> {
        match id {
            CallId::Awaited(id) => self.pending.remove(&id),
            CallId::FireAndForget => None,
        }
    }

    /// Match a call-response payload (`[id: u32][return value]`) to its caller.
    pub fn resolve(&mut self, payload: Bytes) -> Resolution {
        let mut buf = WireBuffer::from(payload);
        let id = match buf.read::<u32>() {
            Ok(id) => id,
            Err(_) => return Resolution::Malformed,
        };
        match self.pending.remove(&id) {
            Some(reply) => {
                if reply.send(Ok(buf)).is_ok() {
                    Resolution::Delivered(id)
                } else {
                    Resolution::Abandoned(id)
                }
            }
            None => Resolution::Unmatched(id),
        }
    }

    /// Fail every pending call with [`Error::ConnectionClosed`].
    ///
    /// Returns how many calls were failed.
    pub fn fail_all(&mut self) -> usize {
        let count = self.pending.len();
        for (_, reply) in self.pending.drain() {
            let _ = reply.send(Err(Error::ConnectionClosed));
        }
        count
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl Default for PendingCalls {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(id: u32, value: u32) -> Bytes {
        let mut buf = WireBuffer::new();
        buf.write(&id).write(&value);
        buf.freeze()
    }

    fn awaited(id: CallId) -> u32 {
        match id {
            CallId::Awaited(id) => id,
            CallId::FireAndForget => panic!("allocated the sentinel"),
        }
    }

    #[test]
    fn test_ids_increase() {
        let mut calls = PendingCalls::new();
        let (tx1, _rx1) = oneshot::channel();
        let (tx2, _rx2) = oneshot::channel();
        assert_eq!(calls.register(tx1), CallId::Awaited(0));
        assert_eq!(calls.register(tx2), CallId::Awaited(1));
        assert_eq!(calls.len(), 2);
    }

    #[tokio::test]
    async fn test_out_of_order_responses() {
        let mut calls = PendingCalls::new();
        let (tx_a, rx_a) = oneshot::channel();
        let (tx_b, rx_b) = oneshot::channel();
        let (tx_c, rx_c) = oneshot::channel();
        let a = awaited(calls.register(tx_a));
        let b = awaited(calls.register(tx_b));
        let c = awaited(calls.register(tx_c));

        assert_eq!(calls.resolve(response(c, 300)), Resolution::Delivered(c));
        assert_eq!(calls.resolve(response(b, 200)), Resolution::Delivered(b));
        assert_eq!(calls.resolve(response(a, 100)), Resolution::Delivered(a));

        assert_eq!(rx_a.await.unwrap().unwrap().read::<u32>().unwrap(), 100);
        assert_eq!(rx_b.await.unwrap().unwrap().read::<u32>().unwrap(), 200);
        assert_eq!(rx_c.await.unwrap().unwrap().read::<u32>().unwrap(), 300);
        assert!(calls.is_empty());
    }

    #[test]
    fn test_unmatched_and_malformed() {
        let mut calls = PendingCalls::new();
        assert_eq!(calls.resolve(response(42, 0)), Resolution::Unmatched(42));
        assert_eq!(calls.resolve(Bytes::from_static(&[1, 2])), Resolution::Malformed);
    }

    #[test]
    fn test_abandoned_call_is_removed() {
        let mut calls = PendingCalls::new();
        let (tx, rx) = oneshot::channel();
        let id = awaited(calls.register(tx));
        drop(rx);
        assert_eq!(calls.resolve(response(id, 1)), Resolution::Abandoned(id));
        assert!(calls.is_empty());
    }

    #[tokio::test]
    async fn test_fail_all() {
        let mut calls = PendingCalls::new();
        let (tx1, rx1) = oneshot::channel();
        let (tx2, rx2) = oneshot::channel();
        calls.register(tx1);
        calls.register(tx2);

        assert_eq!(calls.fail_all(), 2);
        assert!(calls.is_empty());
        assert!(matches!(rx1.await.unwrap(), Err(Error::ConnectionClosed)));
        assert!(matches!(rx2.await.unwrap(), Err(Error::ConnectionClosed)));
    }

    #[test]
    fn test_wraps_before_sentinel() {
        let mut calls = PendingCalls::starting_at(MAX_CALL_ID);
        let (tx1, _rx1) = oneshot::channel();
        let (tx2, _rx2) = oneshot::channel();
        assert_eq!(calls.register(tx1), CallId::Awaited(MAX_CALL_ID));
        assert_eq!(calls.register(tx2), CallId::Awaited(0));
    }

    #[test]
    fn test_wrap_skips_ids_still_pending() {
        let mut calls = PendingCalls::new();
        let (tx0, _rx0) = oneshot::channel();
        assert_eq!(calls.register(tx0), CallId::Awaited(0));

        calls.next_id = MAX_CALL_ID;
        let (tx1, _rx1) = oneshot::channel();
        let (tx2, _rx2) = oneshot::channel();
        assert_eq!(calls.register(tx1), CallId::Awaited(MAX_CALL_ID));
        // 0 is still waiting, so the wrap lands on 1.
        assert_eq!(calls.register(tx2), CallId::Awaited(1));
    }

    #[test]
    fn test_forget() {
        let mut calls = PendingCalls::new();
        let (tx, _rx) = oneshot::channel();
        let id = calls.register(tx);
        assert!(calls.forget(id).is_some());
        assert!(calls.forget(CallId::FireAndForget).is_none());
        assert!(calls.is_empty());
    }
}
