//! The boundary to whatever carries commands to the store.

use std::collections::VecDeque;

use crate::batch::BufferedCommand;
use crate::command::CommandKind;
use crate::response::ResponseValue;
use crate::route::Route;
use crate::transport_error;

/// A blocking request/reply channel.
///
/// Server error replies may come back either as `Err(TransportError)` or as
/// a top-level [`ResponseValue::Error`]; the dispatcher treats both as
/// failures. Inside a batch reply an `Error` marks the failed slot.
pub trait Transport {
    fn send(&mut self, kind: CommandKind, args: &[&[u8]]) -> crate::Result<ResponseValue>;

    fn send_routed(
        &mut self,
        kind: CommandKind,
        args: &[&[u8]],
        route: &Route,
    ) -> crate::Result<ResponseValue>;

    /// Sends every command as one unit and returns one reply per command.
    fn send_batch(
        &mut self,
        commands: &[BufferedCommand],
        is_atomic: bool,
    ) -> crate::Result<Vec<ResponseValue>>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn send(&mut self, kind: CommandKind, args: &[&[u8]]) -> crate::Result<ResponseValue> {
        (**self).send(kind, args)
    }

    fn send_routed(
        &mut self,
        kind: CommandKind,
        args: &[&[u8]],
        route: &Route,
    ) -> crate::Result<ResponseValue> {
        (**self).send_routed(kind, args, route)
    }

    fn send_batch(
        &mut self,
        commands: &[BufferedCommand],
        is_atomic: bool,
    ) -> crate::Result<Vec<ResponseValue>> {
        (**self).send_batch(commands, is_atomic)
    }
}

/// One call recorded by [`ScriptedTransport`].
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Send {
        kind: CommandKind,
        args: Vec<Vec<u8>>,
    },
    Routed {
        kind: CommandKind,
        args: Vec<Vec<u8>>,
        route: Route,
    },
    Batch {
        commands: Vec<(CommandKind, Vec<Vec<u8>>)>,
        is_atomic: bool,
    },
}

/// A transport that answers from queued replies and records every call.
///
/// With nothing queued, single commands get `OK` and batches get one `OK`
/// per command.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    replies: VecDeque<crate::Result<ResponseValue>>,
    batch_replies: VecDeque<crate::Result<Vec<ResponseValue>>>,
    calls: Vec<Call>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_reply(&mut self, reply: ResponseValue) -> &mut Self {
        self.replies.push_back(Ok(reply));
        self
    }

    /// Queues a transport-level failure for the next single command.
    pub fn push_failure(&mut self, message: &str) -> &mut Self {
        self.replies.push_back(transport_error!(message));
        self
    }

    pub fn push_batch_reply(&mut self, replies: Vec<ResponseValue>) -> &mut Self {
        self.batch_replies.push_back(Ok(replies));
        self
    }

    pub fn push_batch_failure(&mut self, message: &str) -> &mut Self {
        self.batch_replies.push_back(transport_error!(message));
        self
    }

    pub fn calls(&self) -> &[Call] {
        &self.calls
    }

    pub fn call_count(&self) -> usize {
        self.calls.len()
    }

    fn next_reply(&mut self) -> crate::Result<ResponseValue> {
        self.replies.pop_front().unwrap_or(Ok(ResponseValue::Ok))
    }
}

fn owned(args: &[&[u8]]) -> Vec<Vec<u8>> {
    args.iter().map(|a| a.to_vec()).collect()
}

impl Transport for ScriptedTransport {
    fn send(&mut self, kind: CommandKind, args: &[&[u8]]) -> crate::Result<ResponseValue> {
        self.calls.push(Call::Send {
            kind,
            args: owned(args),
        });
        self.next_reply()
    }

    fn send_routed(
        &mut self,
        kind: CommandKind,
        args: &[&[u8]],
        route: &Route,
    ) -> crate::Result<ResponseValue> {
        self.calls.push(Call::Routed {
            kind,
            args: owned(args),
            route: route.clone(),
        });
        self.next_reply()
    }

    fn send_batch(
        &mut self,
        commands: &[BufferedCommand],
        is_atomic: bool,
    ) -> crate::Result<Vec<ResponseValue>> {
        self.calls.push(Call::Batch {
            commands: commands.iter().map(|c| (c.kind, c.args.clone())).collect(),
            is_atomic,
        });
        self.batch_replies
            .pop_front()
            .unwrap_or_else(|| Ok(vec![ResponseValue::Ok; commands.len()]))
    }
}
