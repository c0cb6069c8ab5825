use super::{WireArgs, require_key, scalar_arg};
use crate::argument_error;
use crate::command::{Arg, Command, CommandKind};

const BIT_OPERATIONS: [&str; 4] = ["AND", "OR", "XOR", "NOT"];

pub(super) fn build(command: &Command) -> crate::Result<WireArgs<'_>> {
    match command.kind {
        CommandKind::BitOp => bitop(command),
        _ => single_key(command),
    }
}

/// `BITOP op dest src...`: the key is the destination, `args[0]` the
/// operation and the rest are source keys.
fn bitop(command: &Command) -> crate::Result<WireArgs<'_>> {
    let dest = require_key(command)?;

    let op = match command.args.first().and_then(Arg::as_bytes) {
        Some(op) => op,
        None => return argument_error!("BITOP needs an operation"),
    };
    let Some(token) = BIT_OPERATIONS
        .into_iter()
        .find(|t| t.as_bytes().eq_ignore_ascii_case(op))
    else {
        return argument_error!(format!(
            "unknown BITOP operation `{}`",
            String::from_utf8_lossy(op)
        ));
    };

    let mut wire = WireArgs::with_capacity(command.args.len() + 1);
    wire.push_token(token);
    wire.push_borrowed(dest);
    wire.push_args(&command.args[1..]);

    let sources = wire.len() - 2;
    match (token, sources) {
        (_, 0) => argument_error!("BITOP needs at least one source key"),
        ("NOT", n) if n != 1 => argument_error!("BITOP NOT takes exactly one source key"),
        _ => Ok(wire),
    }
}

/// BITCOUNT, BITPOS, GETBIT and SETBIT:
/// `[key, numeric args..., start end?, BIT?]`.
fn single_key(command: &Command) -> crate::Result<WireArgs<'_>> {
    let key = require_key(command)?;
    let options = &command.options;

    let expected = match command.kind {
        CommandKind::BitCount => 0,
        CommandKind::BitPos | CommandKind::GetBit => 1,
        CommandKind::SetBit => 2,
        other => return argument_error!(format!("{other} is not a bit command")),
    };
    if command.args.len() != expected {
        return argument_error!(format!(
            "{} takes {expected} argument(s), got {}",
            command.kind,
            command.args.len()
        ));
    }

    match command.kind {
        CommandKind::BitPos => require_bit(&command.args[0])?,
        CommandKind::SetBit => require_bit(&command.args[1])?,
        _ => {}
    }

    let mut wire = WireArgs::with_capacity(expected + 4);
    wire.push_borrowed(key);
    for index in 0..expected {
        wire.push_cow(scalar_arg(command, index, "numeric argument")?);
    }

    match options.range {
        Some((start, end)) => {
            if matches!(command.kind, CommandKind::GetBit | CommandKind::SetBit) {
                return argument_error!(format!("{} does not take a range", command.kind));
            }
            wire.push_int(start);
            wire.push_int(end);
            if options.bybit {
                wire.push_token("BIT");
            }
        }
        None if options.bybit => {
            return argument_error!("BIT addressing needs a start and end range");
        }
        None => {}
    }

    Ok(wire)
}

fn require_bit(arg: &Arg) -> crate::Result<()> {
    let ok = match arg {
        Arg::Int(i) => *i == 0 || *i == 1,
        Arg::Str(s) => s.as_slice() == b"0" || s.as_slice() == b"1",
        _ => false,
    };
    if ok {
        Ok(())
    } else {
        argument_error!("bit value must be 0 or 1")
    }
}

#[cfg(test)]
mod tests {
    use crate::args::build;
    use crate::args::tests::wire;
    use crate::command::{Arg, Command, CommandKind, Options};
    use crate::ErrorKind;

    fn ranged(bybit: bool) -> Options {
        Options {
            range: Some((0, 7)),
            bybit,
            ..Default::default()
        }
    }

    #[test]
    fn test_bitop_layout() {
        let cmd = Command::new(CommandKind::BitOp)
            .key("dest")
            .arg("and")
            .arg("a")
            .arg("b");
        assert_eq!(wire(&cmd), vec!["AND", "dest", "a", "b"]);
    }

    #[test]
    fn test_bitop_sources_from_array() {
        let cmd = Command::new(CommandKind::BitOp)
            .key("dest")
            .arg("XOR")
            .arg(Arg::MultiString(vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]));
        assert_eq!(wire(&cmd), vec!["XOR", "dest", "a", "b", "c"]);
    }

    #[test]
    fn test_bitop_not_takes_one_source() {
        let ok = Command::new(CommandKind::BitOp).key("d").arg("NOT").arg("a");
        assert_eq!(wire(&ok), vec!["NOT", "d", "a"]);

        let two = Command::new(CommandKind::BitOp)
            .key("d")
            .arg("NOT")
            .arg("a")
            .arg("b");
        assert!(build(&two).is_err());
    }

    #[test]
    fn test_bitop_rejects_unknown_operation() {
        let cmd = Command::new(CommandKind::BitOp).key("d").arg("NAND").arg("a");
        assert_eq!(build(&cmd).unwrap_err().kind(), ErrorKind::Argument);

        let none = Command::new(CommandKind::BitOp).key("d").arg("OR");
        assert!(build(&none).is_err());
    }

    #[test]
    fn test_bitcount_with_range_and_bit() {
        let plain = Command::new(CommandKind::BitCount).key("k");
        assert_eq!(wire(&plain), vec!["k"]);

        let cmd = Command::new(CommandKind::BitCount).key("k").options(ranged(true));
        assert_eq!(wire(&cmd), vec!["k", "0", "7", "BIT"]);

        let bytes = Command::new(CommandKind::BitCount).key("k").options(ranged(false));
        assert_eq!(wire(&bytes), vec!["k", "0", "7"]);
    }

    #[test]
    fn test_bit_without_range_fails() {
        let cmd = Command::new(CommandKind::BitCount)
            .key("k")
            .options(Options {
                bybit: true,
                ..Default::default()
            });
        assert!(build(&cmd).is_err());
    }

    #[test]
    fn test_bitpos_layout() {
        let cmd = Command::new(CommandKind::BitPos)
            .key("k")
            .arg(1i64)
            .options(ranged(true));
        assert_eq!(wire(&cmd), vec!["k", "1", "0", "7", "BIT"]);

        let bad = Command::new(CommandKind::BitPos).key("k").arg(2i64);
        assert!(build(&bad).is_err());
    }

    #[test]
    fn test_setbit_and_getbit() {
        let set = Command::new(CommandKind::SetBit).key("k").arg(7i64).arg(1i64);
        assert_eq!(wire(&set), vec!["k", "7", "1"]);

        let get = Command::new(CommandKind::GetBit).key("k").arg(7i64);
        assert_eq!(wire(&get), vec!["k", "7"]);

        let bad_value = Command::new(CommandKind::SetBit).key("k").arg(7i64).arg(5i64);
        assert!(build(&bad_value).is_err());

        let ranged_get = Command::new(CommandKind::GetBit)
            .key("k")
            .arg(7i64)
            .options(ranged(false));
        assert!(build(&ranged_get).is_err());
    }
}
