//! Generic shapes shared by the string and keyspace commands.

use super::{WireArgs, require_key, scalar_arg};
use crate::argument_error;
use crate::command::{Arg, Command};

pub(super) fn key_only(command: &Command) -> crate::Result<WireArgs<'_>> {
    let key = require_key(command)?;
    let mut wire = WireArgs::with_capacity(1);
    wire.push_borrowed(key);
    Ok(wire)
}

/// `[key, args..., option tokens...]`. Tokens always come out in the same
/// order: expiry, NX, XX, GET, KEEPTTL, IFEQ, PERSIST.
pub(super) fn key_value(command: &Command) -> crate::Result<WireArgs<'_>> {
    let key = require_key(command)?;
    let options = &command.options;

    let mut wire = WireArgs::with_capacity(2 + command.args.len() + 4);
    wire.push_borrowed(key);
    wire.push_args(&command.args);

    if let Some((token, value)) = options.expiry.effective() {
        wire.push_token(token);
        wire.push_int(value);
    }
    if options.nx {
        wire.push_token("NX");
    }
    if options.xx {
        wire.push_token("XX");
    }
    if options.get_old_value {
        wire.push_token("GET");
    }
    if options.keep_ttl {
        wire.push_token("KEEPTTL");
    }
    if let Some(expected) = &options.ifeq {
        wire.push_token("IFEQ");
        wire.push_borrowed(expected);
    }
    if options.persist {
        wire.push_token("PERSIST");
    }

    Ok(wire)
}

/// `[k1, v1, k2, v2, ...]` from associative input.
pub(super) fn key_value_pairs(command: &Command) -> crate::Result<WireArgs<'_>> {
    let mut wire = WireArgs::new();

    for arg in &command.args {
        match arg {
            Arg::Pairs(_) => wire.push_arg(arg),
            _ => {
                return argument_error!(format!(
                    "{} expects key/value pairs",
                    command.kind
                ));
            }
        }
    }

    if wire.is_empty() {
        return argument_error!(format!("{} needs at least one pair", command.kind));
    }

    Ok(wire)
}

/// `[k1, k2, ...]` flattened from array arguments.
pub(super) fn multi_key(command: &Command) -> crate::Result<WireArgs<'_>> {
    let mut wire = WireArgs::with_capacity(command.args.len());
    if let Some(key) = command.key.as_deref() {
        wire.push_borrowed(key);
    }
    wire.push_args(&command.args);

    if wire.is_empty() {
        return argument_error!(format!("{} needs at least one key", command.kind));
    }

    Ok(wire)
}

/// DEL and friends take either a key plus extra keys, or only an array of
/// keys.
pub(super) fn key_or_multi_key(command: &Command) -> crate::Result<WireArgs<'_>> {
    match command.key {
        Some(_) => {
            let key = require_key(command)?;
            let mut wire = WireArgs::with_capacity(1 + command.args.len());
            wire.push_borrowed(key);
            wire.push_args(&command.args);
            Ok(wire)
        }
        None => multi_key(command),
    }
}

/// Positional arguments only, no key.
pub(super) fn message(command: &Command) -> crate::Result<WireArgs<'_>> {
    let mut wire = WireArgs::with_capacity(command.args.len());
    wire.push_args(&command.args);
    Ok(wire)
}

/// `[key, a, b]`.
pub(super) fn range(command: &Command) -> crate::Result<WireArgs<'_>> {
    let key = require_key(command)?;
    if command.args.len() != 2 {
        return argument_error!(format!(
            "{} takes exactly two range arguments",
            command.kind
        ));
    }

    let mut wire = WireArgs::with_capacity(3);
    wire.push_borrowed(key);
    wire.push_cow(scalar_arg(command, 0, "range start")?);
    wire.push_cow(scalar_arg(command, 1, "range end")?);
    Ok(wire)
}

#[cfg(test)]
mod tests {
    use crate::args::tests::wire;
    use crate::args::build;
    use crate::command::{Arg, Command, CommandKind, Expiry, Options, Scalar};
    use crate::ErrorKind;

    #[test]
    fn test_set_with_expiry_and_nx() {
        let cmd = Command::new(CommandKind::Set)
            .key("k")
            .arg("v")
            .options(Options {
                expiry: Expiry::seconds(30),
                nx: true,
                ..Default::default()
            });
        assert_eq!(wire(&cmd), vec!["k", "v", "EX", "30", "NX"]);
    }

    #[test]
    fn test_option_order_is_fixed() {
        let options = Options {
            persist: true,
            ifeq: Some(b"old".to_vec()),
            keep_ttl: true,
            get_old_value: true,
            xx: true,
            nx: true,
            expiry: Expiry {
                pxat: Some(1700000000000),
                ..Default::default()
            },
            ..Default::default()
        };
        let cmd = Command::new(CommandKind::Set).key("k").arg("v").options(options);
        assert_eq!(
            wire(&cmd),
            vec![
                "k", "v", "PXAT", "1700000000000", "NX", "XX", "GET", "KEEPTTL", "IFEQ", "old",
                "PERSIST"
            ]
        );
    }

    #[test]
    fn test_only_one_expiry_token() {
        let all = Expiry {
            ex: Some(1),
            px: Some(2),
            exat: Some(3),
            pxat: Some(4),
        };
        let cases = [
            (all, "PXAT"),
            (Expiry { pxat: None, ..all }, "EXAT"),
            (Expiry { pxat: None, exat: None, ..all }, "PX"),
            (Expiry::seconds(1), "EX"),
        ];

        for (expiry, token) in cases {
            let cmd = Command::new(CommandKind::Set)
                .key("k")
                .arg("v")
                .options(Options {
                    expiry,
                    ..Default::default()
                });
            let args = wire(&cmd);
            let tokens: Vec<&String> = args
                .iter()
                .filter(|a| ["EX", "PX", "EXAT", "PXAT"].contains(&a.as_str()))
                .collect();
            assert_eq!(tokens, vec![token]);
        }
    }

    #[test]
    fn test_key_value_flattens_arrays() {
        let cmd = Command::new(CommandKind::SAdd).key("s").arg(Arg::Array(vec![
            Scalar::from("a"),
            Scalar::Int(2),
            Scalar::Float(0.5),
        ]));
        assert_eq!(wire(&cmd), vec!["s", "a", "2", "0.5"]);
    }

    #[test]
    fn test_hset_pairs() {
        let cmd = Command::new(CommandKind::HSet).key("h").arg(Arg::Pairs(vec![
            ("f1".into(), "v1".into()),
            ("f2".into(), Scalar::Int(2)),
        ]));
        assert_eq!(wire(&cmd), vec!["h", "f1", "v1", "f2", "2"]);
    }

    #[test]
    fn test_key_only_rejects_empty_key() {
        let err = build(&Command::new(CommandKind::Get).key("")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Argument);
        assert!(build(&Command::new(CommandKind::Get)).is_err());
    }

    #[test]
    fn test_mset_renders_numeric_keys() {
        let cmd = Command::new(CommandKind::MSet).arg(Arg::Pairs(vec![
            (Scalar::Int(1), "one".into()),
            ("two".into(), Scalar::Int(2)),
        ]));
        assert_eq!(wire(&cmd), vec!["1", "one", "two", "2"]);
    }

    #[test]
    fn test_mset_rejects_empty_input() {
        let err = build(&Command::new(CommandKind::MSet).arg(Arg::Pairs(vec![]))).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Argument);
        assert!(build(&Command::new(CommandKind::MSet)).is_err());
    }

    #[test]
    fn test_mget_coerces_elements() {
        let cmd = Command::new(CommandKind::MGet)
            .arg(Arg::Array(vec!["a".into(), Scalar::Int(7)]));
        assert_eq!(wire(&cmd), vec!["a", "7"]);
        assert!(build(&Command::new(CommandKind::MGet).arg(Arg::Array(vec![]))).is_err());
    }

    #[test]
    fn test_del_single_and_multi() {
        let single = Command::new(CommandKind::Del).key("a");
        assert_eq!(wire(&single), vec!["a"]);

        let multi = Command::new(CommandKind::Unlink)
            .arg(Arg::MultiString(vec![b"a".to_vec(), b"b".to_vec()]));
        assert_eq!(wire(&multi), vec!["a", "b"]);

        let extra = Command::new(CommandKind::PfCount).key("a").arg("b");
        assert_eq!(wire(&extra), vec!["a", "b"]);

        assert!(build(&Command::new(CommandKind::Exists)).is_err());
    }

    #[test]
    fn test_message_has_no_key() {
        let cmd = Command::new(CommandKind::Echo).key("ignored").arg("hello");
        assert_eq!(wire(&cmd), vec!["hello"]);
        assert!(wire(&Command::new(CommandKind::Ping)).is_empty());
    }

    #[test]
    fn test_range_shape() {
        let cmd = Command::new(CommandKind::GetRange).key("k").arg(0i64).arg(-1i64);
        assert_eq!(wire(&cmd), vec!["k", "0", "-1"]);

        let cmd = Command::new(CommandKind::XRange).key("s").arg("-").arg("+");
        assert_eq!(wire(&cmd), vec!["s", "-", "+"]);

        let short = Command::new(CommandKind::GetRange).key("k").arg(0i64);
        assert!(build(&short).is_err());
    }
}
