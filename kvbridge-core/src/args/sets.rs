use super::{WireArgs, require_key};
use crate::argument_error;
use crate::command::Command;

/// SINTERSTORE, SUNIONSTORE and SDIFFSTORE: `[dest, key...]`.
pub(super) fn store(command: &Command) -> crate::Result<WireArgs<'_>> {
    let dest = require_key(command)?;

    let mut wire = WireArgs::with_capacity(command.args.len() + 1);
    wire.push_borrowed(dest);
    wire.push_args(&command.args);

    if wire.len() < 2 {
        return argument_error!(format!("{} needs at least one source key", command.kind));
    }
    Ok(wire)
}
