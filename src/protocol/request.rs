//! Outbound command messages.
//!
//! ```text
//! [command name: string][arguments...][call id: u32]
//! ```
//!
//! The call id always comes last. [`Request`] only ever holds the name and
//! arguments; the id is appended by [`Request::finish`], which the
//! correlation layer calls once it knows whether the call is awaited.

use bytes::Bytes;

use super::wire_format::FIRE_AND_FORGET_ID;
use crate::codec::{Encode, WireBuffer};

/// Identifies what the remote should do with a call's result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallId {
    /// No response is expected.
    FireAndForget,
    /// A response carrying this id is expected.
    Awaited(u32),
}

impl CallId {
    /// Value written on the wire.
    #[inline]
    pub fn wire_value(self) -> u32 {
        match self {
            CallId::FireAndForget => FIRE_AND_FORGET_ID,
            CallId::Awaited(id) => id,
        }
    }

    /// Interpret a value read from the wire.
    #[inline]
    pub fn from_wire(value: u32) -> Self {
        if value == FIRE_AND_FORGET_ID {
            CallId::FireAndForget
        } else {
            CallId::Awaited(value)
        }
    }
}

/// A command being built, before its call id is known.
#[derive(Debug, Clone)]
pub struct Request {
    command: &'static str,
    buf: WireBuffer,
}

impl Request {
    /// Start a command message with its name.
    pub fn new(command: &'static str) -> Self {
        let mut buf = WireBuffer::new();
        buf.write(command);
        Self { command, buf }
    }

    /// Append one argument.
    pub fn arg<T: Encode + ?Sized>(mut self, value: &T) -> Self {
        self.buf.write(value);
        self
    }

    /// Command name, for diagnostics.
    #[inline]
    pub fn command(&self) -> &'static str {
        self.command
    }

    /// Append the call id and freeze the message.
    pub fn finish(mut self, id: CallId) -> Bytes {
        self.buf.write(&id.wire_value());
        self.buf.freeze()
    }
}
