use super::{WireArgs, require_key, scalar_arg};
use crate::argument_error;
use crate::command::{Arg, Command, ExpireCondition};

/// `[key, time, NX|XX|GT|LT?]`. The optional condition is `args[1]`,
/// matched in any case and emitted uppercase.
pub(super) fn build(command: &Command) -> crate::Result<WireArgs<'_>> {
    let key = require_key(command)?;

    let mut wire = WireArgs::with_capacity(3);
    wire.push_borrowed(key);
    wire.push_cow(scalar_arg(command, 0, "expire time")?);

    match command.args.get(1) {
        None => {}
        Some(Arg::Str(token)) => match ExpireCondition::parse(token) {
            Some(condition) => wire.push_token(condition.as_str()),
            None => {
                return argument_error!(format!(
                    "invalid expire mode `{}`, expected NX, XX, GT or LT",
                    String::from_utf8_lossy(token)
                ));
            }
        },
        Some(_) => return argument_error!("expire mode must be a string"),
    }

    if command.args.len() > 2 {
        return argument_error!(format!("{} takes at most one mode", command.kind));
    }

    Ok(wire)
}
