//! Client-side command buffering for MULTI/EXEC and pipelines.
//!
//! A [`BatchState`] belongs to one client handle. While a batch is open,
//! commands are copied into the buffer instead of being sent; [`commit`]
//! sends them as one unit and decodes every reply with the processor the
//! command was queued with. Results are all or nothing.
//!
//! [`commit`]: BatchState::commit

use crate::args::WireArgs;
use crate::command::{Command, CommandKind};
use crate::processor::Processor;
use crate::response::{HostValue, ResponseValue};
use crate::transport::Transport;
use crate::{Error, Inner, batch_error};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchMode {
    /// Executed by the server as a transaction.
    Atomic,
    Pipeline,
}

/// Position of a queued command in the commit result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BatchHandle(pub usize);

impl BatchHandle {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// A queued command. Owns copies of everything it needs, so the caller's
/// buffers can be dropped or reused right after `enqueue`.
#[derive(Debug, Clone, PartialEq)]
pub struct BufferedCommand {
    pub kind: CommandKind,
    pub args: Vec<Vec<u8>>,
    pub key: Option<Vec<u8>>,
    pub processor: Processor,
}

impl BufferedCommand {
    pub fn arg_slices(&self) -> Vec<&[u8]> {
        self.args.iter().map(Vec::as_slice).collect()
    }
}

#[derive(Debug, Default)]
pub struct BatchState {
    mode: Option<BatchMode>,
    pending: Vec<BufferedCommand>,
}

impl BatchState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.mode.is_some()
    }

    pub fn mode(&self) -> Option<BatchMode> {
        self.mode
    }

    /// Number of queued commands.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn pending(&self) -> &[BufferedCommand] {
        &self.pending
    }

    /// Opens a batch. Batches do not nest.
    pub fn begin(&mut self, mode: BatchMode) -> crate::Result<()> {
        if let Some(current) = self.mode {
            log::debug!("begin {mode:?} refused, {current:?} batch already open");
            return Err(Error {
                inner: Inner::AlreadyActive,
            });
        }
        log::debug!("batch begin {mode:?}");
        self.mode = Some(mode);
        Ok(())
    }

    /// Queues a command with its rendered arguments.
    ///
    /// # Arguments
    /// * `command` - The command being queued; only its kind and key are kept
    /// * `args` - Its wire arguments, deep copied into the buffer
    /// * `processor` - How its reply will be decoded at commit time
    ///
    /// # Returns
    /// * `Ok(BatchHandle)` - The index of this command's result
    /// * `Err(Error)` - NotActive when no batch is open
    pub fn enqueue(
        &mut self,
        command: &Command,
        args: &WireArgs<'_>,
        processor: Processor,
    ) -> crate::Result<BatchHandle> {
        if !self.is_active() {
            return not_active();
        }

        let handle = BatchHandle(self.pending.len());
        self.pending.push(BufferedCommand {
            kind: command.kind,
            args: args.to_owned_args(),
            key: command.key.clone(),
            processor,
        });
        log::trace!("queued {} as #{}", command.kind, handle.0);
        Ok(handle)
    }

    /// Sends the queued commands as one unit and decodes every reply.
    ///
    /// The buffer is emptied and the state returns to idle before the
    /// transport is called, so a failed commit leaves nothing behind.
    /// An empty batch returns an empty result without a transport call.
    pub fn commit<T: Transport + ?Sized>(
        &mut self,
        transport: &mut T,
    ) -> crate::Result<Vec<HostValue>> {
        let Some(mode) = self.mode.take() else {
            return not_active();
        };
        let pending = std::mem::take(&mut self.pending);

        if pending.is_empty() {
            log::debug!("batch commit {mode:?}: nothing queued");
            return Ok(Vec::new());
        }

        log::debug!("batch commit {mode:?}: {} command(s)", pending.len());

        let replies = match transport.send_batch(&pending, mode == BatchMode::Atomic) {
            Ok(replies) => replies,
            Err(e) => {
                log::warn!("batch of {} failed: {e}", pending.len());
                return batch_error!(e.to_string());
            }
        };

        if replies.len() != pending.len() {
            return batch_error!(format!(
                "expected {} replies, got {}",
                pending.len(),
                replies.len()
            ));
        }

        if let Some((index, ResponseValue::Error(message))) = replies
            .iter()
            .enumerate()
            .find(|(_, r)| matches!(r, ResponseValue::Error(_)))
        {
            let message = String::from_utf8_lossy(message);
            log::warn!("batch command #{index} failed: {message}");
            return batch_error!(format!(
                "{} (#{index}) failed: {message}",
                pending[index].kind
            ));
        }

        let mut results = Vec::with_capacity(replies.len());
        for (command, reply) in pending.iter().zip(replies) {
            match command.processor.process(reply) {
                Ok(value) => results.push(value),
                Err(e) => {
                    return batch_error!(format!("{}: {e}", command.kind));
                }
            }
        }

        Ok(results)
    }

    /// Drops the queued commands without sending anything.
    pub fn discard(&mut self) -> crate::Result<()> {
        let Some(mode) = self.mode.take() else {
            return not_active();
        };
        log::debug!("batch discard {mode:?}: {} command(s)", self.pending.len());
        self.pending.clear();
        Ok(())
    }
}

fn not_active<T>() -> crate::Result<T> {
    Err(Error {
        inner: Inner::NotActive,
    })
}
