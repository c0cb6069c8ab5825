//! Sorted-set commands.

use super::{WireArgs, require_key, scalar_arg};
use crate::argument_error;
use crate::command::{Command, CommandKind, Options, RangeBy};

/// `ZADD key [XX] [NX] [LT] [GT] [CH] [INCR] score member [score member ...]`.
pub(super) fn add(command: &Command) -> crate::Result<WireArgs<'_>> {
    let key = require_key(command)?;
    let options = &command.options;

    if options.nx && options.xx {
        return argument_error!("ZADD: NX and XX are mutually exclusive");
    }
    if options.nx && (options.gt || options.lt) {
        return argument_error!("ZADD: NX cannot be combined with GT or LT");
    }
    if options.gt && options.lt {
        return argument_error!("ZADD: GT and LT are mutually exclusive");
    }

    let mut wire = WireArgs::with_capacity(command.args.len() * 2 + 7);
    wire.push_borrowed(key);
    for (set, token) in [
        (options.xx, "XX"),
        (options.nx, "NX"),
        (options.lt, "LT"),
        (options.gt, "GT"),
        (options.ch, "CH"),
        (options.incr, "INCR"),
    ] {
        if set {
            wire.push_token(token);
        }
    }

    let before = wire.len();
    wire.push_args(&command.args);
    let values = wire.len() - before;

    if values == 0 || values % 2 != 0 {
        return argument_error!(format!(
            "ZADD expects score/member pairs, got {values} values"
        ));
    }
    if options.incr && values != 2 {
        return argument_error!("ZADD INCR takes exactly one score/member pair");
    }

    Ok(wire)
}

/// `ZRANGE key start stop [BYSCORE|BYLEX] [REV] [LIMIT offset count] [WITHSCORES]`.
pub(super) fn range(command: &Command) -> crate::Result<WireArgs<'_>> {
    let key = require_key(command)?;

    let mut wire = WireArgs::with_capacity(10);
    wire.push_borrowed(key);
    wire.push_cow(scalar_arg(command, 0, "start")?);
    wire.push_cow(scalar_arg(command, 1, "stop")?);
    push_range_options(&mut wire, &command.options)?;

    if command.options.with_scores {
        wire.push_token("WITHSCORES");
    }

    Ok(wire)
}

/// `ZRANGESTORE dst src start stop [BYSCORE|BYLEX] [REV] [LIMIT offset count]`.
/// The key is the destination; `args` are source, start and stop.
pub(super) fn range_store(command: &Command) -> crate::Result<WireArgs<'_>> {
    let dest = require_key(command)?;

    if command.options.with_scores {
        return argument_error!("ZRANGESTORE does not take WITHSCORES");
    }

    let mut wire = WireArgs::with_capacity(10);
    wire.push_borrowed(dest);
    wire.push_cow(scalar_arg(command, 0, "source key")?);
    wire.push_cow(scalar_arg(command, 1, "start")?);
    wire.push_cow(scalar_arg(command, 2, "stop")?);
    push_range_options(&mut wire, &command.options)?;

    Ok(wire)
}

fn push_range_options(wire: &mut WireArgs<'_>, options: &Options) -> crate::Result<()> {
    match options.range_by {
        RangeBy::Index => {}
        RangeBy::Score => wire.push_token("BYSCORE"),
        RangeBy::Lex => wire.push_token("BYLEX"),
    }
    if options.rev {
        wire.push_token("REV");
    }
    if let Some((offset, count)) = options.limit {
        if options.range_by == RangeBy::Index {
            return argument_error!("LIMIT needs BYSCORE or BYLEX");
        }
        wire.push_token("LIMIT");
        wire.push_int(offset);
        wire.push_int(count);
    }
    Ok(())
}

/// ZUNIONSTORE, ZINTERSTORE and ZDIFFSTORE:
/// `[dest, numkeys, keys..., WEIGHTS w...?, AGGREGATE SUM|MIN|MAX?]`.
pub(super) fn store(command: &Command) -> crate::Result<WireArgs<'_>> {
    let dest = require_key(command)?;
    let options = &command.options;
    let is_diff = command.kind == CommandKind::ZDiffStore;

    let mut keys = WireArgs::with_capacity(command.args.len());
    keys.push_args(&command.args);
    if keys.is_empty() {
        return argument_error!(format!("{} needs at least one source key", command.kind));
    }

    if is_diff && (options.weights.is_some() || options.aggregate.is_some()) {
        return argument_error!("ZDIFFSTORE takes neither WEIGHTS nor AGGREGATE");
    }

    let mut wire = WireArgs::with_capacity(keys.len() + 4);
    wire.push_borrowed(dest);
    wire.push_int(keys.len() as i64);
    let key_count = keys.len();
    wire.append(keys);

    if let Some(weights) = &options.weights {
        if weights.len() != key_count {
            return argument_error!(format!(
                "{} weights given for {key_count} keys",
                weights.len()
            ));
        }
        wire.push_token("WEIGHTS");
        weights.iter().for_each(|w| wire.push_float(*w));
    }
    if let Some(aggregate) = options.aggregate {
        wire.push_token("AGGREGATE");
        wire.push_token(aggregate.as_str());
    }

    Ok(wire)
}
