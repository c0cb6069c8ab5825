//! Command execution: build arguments, send or queue, decode.

use crate::args::build;
use crate::batch::{BatchHandle, BatchMode, BatchState};
use crate::command::Command;
use crate::processor::Processor;
use crate::response::{HostValue, ResponseValue};
use crate::transport::Transport;
use crate::transport_error;

/// What `execute` hands back to the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Value(HostValue),
    /// The command joined the open batch; its result arrives with the commit.
    Queued(BatchHandle),
}

impl Reply {
    pub fn into_value(self) -> Option<HostValue> {
        match self {
            Reply::Value(v) => Some(v),
            Reply::Queued(_) => None,
        }
    }
}

/// Executes `command` with its own processor.
pub fn execute<T: Transport + ?Sized>(
    transport: &mut T,
    batch: &mut BatchState,
    command: &Command,
) -> crate::Result<Reply> {
    execute_with(transport, batch, command, command.processor())
}

/// Executes `command`, decoding its reply with `processor`.
///
/// # Arguments
/// * `transport` - Where the command goes when no batch is open
/// * `batch` - The caller's batch state; an open batch queues the command
/// * `command` - The command; its route, if any, selects `send_routed`
/// * `processor` - How the reply becomes a host value
///
/// # Returns
/// * `Ok(Reply::Value)` - The decoded reply
/// * `Ok(Reply::Queued)` - The command was buffered
/// * `Err(Error)` - ArgumentError before anything is sent, TransportError
///   for failed sends and server error replies, UnexpectedResponseType when
///   the reply does not fit the processor
pub fn execute_with<T: Transport + ?Sized>(
    transport: &mut T,
    batch: &mut BatchState,
    command: &Command,
    processor: Processor,
) -> crate::Result<Reply> {
    let args = build(command)?;

    if batch.is_active() {
        if let Some(route) = &command.route {
            log::warn!("route {route} ignored for {} inside a batch", command.kind);
        }
        return batch.enqueue(command, &args, processor).map(Reply::Queued);
    }

    let slices = args.as_slices();
    let sent = match &command.route {
        Some(route) => {
            log::debug!("{} routed to {route}", command.kind);
            transport.send_routed(command.kind, &slices, route)
        }
        None => transport.send(command.kind, &slices),
    };
    // rendered arguments are no longer needed once the call returns
    drop(slices);
    drop(args);

    let reply = match sent {
        Ok(ResponseValue::Error(message)) => {
            let message = String::from_utf8_lossy(&message).into_owned();
            log::warn!("{} failed: {message}", command.kind);
            return transport_error!(message);
        }
        Ok(reply) => reply,
        Err(e) => {
            log::warn!("{} failed: {e}", command.kind);
            return Err(e);
        }
    };

    processor.process(reply).map(Reply::Value)
}

/// A transport paired with its batch state.
pub struct Client<T> {
    transport: T,
    batch: BatchState,
}

impl<T: Transport> Client<T> {
    pub fn new(transport: T) -> Self {
        Client {
            transport,
            batch: BatchState::new(),
        }
    }

    pub fn execute(&mut self, command: &Command) -> crate::Result<Reply> {
        execute(&mut self.transport, &mut self.batch, command)
    }

    pub fn execute_with(&mut self, command: &Command, processor: Processor) -> crate::Result<Reply> {
        execute_with(&mut self.transport, &mut self.batch, command, processor)
    }

    /// Opens an atomic batch.
    pub fn multi(&mut self) -> crate::Result<()> {
        self.batch.begin(BatchMode::Atomic)
    }

    pub fn pipeline(&mut self) -> crate::Result<()> {
        self.batch.begin(BatchMode::Pipeline)
    }

    pub fn exec(&mut self) -> crate::Result<Vec<HostValue>> {
        self.batch.commit(&mut self.transport)
    }

    pub fn discard(&mut self) -> crate::Result<()> {
        self.batch.discard()
    }

    pub fn batch(&self) -> &BatchState {
        &self.batch
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }
}
