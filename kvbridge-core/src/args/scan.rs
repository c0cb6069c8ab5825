use super::{WireArgs, require_key, scalar_arg};
use crate::argument_error;
use crate::command::{Command, CommandKind};

/// SCAN: `[cursor, MATCH p, COUNT n, TYPE t]`.
/// HSCAN, SSCAN and ZSCAN: `[key, cursor, MATCH p, COUNT n]`.
///
/// The cursor is the first positional argument; `0` starts a new iteration.
/// An empty pattern is left out.
pub(super) fn build(command: &Command) -> crate::Result<WireArgs<'_>> {
    let options = &command.options;
    let keyed = command.kind != CommandKind::Scan;

    let mut wire = WireArgs::with_capacity(8);
    if keyed {
        wire.push_borrowed(require_key(command)?);
    }

    let cursor = scalar_arg(command, 0, "cursor")?;
    if cursor.is_empty() {
        return argument_error!(format!("{}: cursor must not be empty", command.kind));
    }
    wire.push_cow(cursor);

    if command.args.len() > 1 {
        return argument_error!(format!(
            "{} takes only a cursor, pass MATCH/COUNT as options",
            command.kind
        ));
    }

    if let Some(pattern) = options.pattern.as_deref().filter(|p| !p.is_empty()) {
        wire.push_token("MATCH");
        wire.push_borrowed(pattern);
    }
    if let Some(count) = options.count {
        if count < 1 {
            return argument_error!(format!("{}: COUNT must be positive", command.kind));
        }
        wire.push_token("COUNT");
        wire.push_int(count);
    }
    if !keyed {
        if let Some(type_name) = options.type_filter.as_deref().filter(|t| !t.is_empty()) {
            wire.push_token("TYPE");
            wire.push_borrowed(type_name);
        }
    }

    Ok(wire)
}

#[cfg(test)]
mod tests {
    use crate::ErrorKind;
    use crate::args::build;
    use crate::args::tests::wire;
    use crate::command::{Command, CommandKind, Options};

    #[test]
    fn test_scan_tokens_in_order() {
        let cmd = Command::new(CommandKind::Scan).arg("0").options(Options {
            pattern: Some(b"user:*".to_vec()),
            count: Some(100),
            type_filter: Some(b"hash".to_vec()),
            ..Default::default()
        });
        assert_eq!(
            wire(&cmd),
            vec!["0", "MATCH", "user:*", "COUNT", "100", "TYPE", "hash"]
        );
    }

    #[test]
    fn test_keyed_scan_puts_key_first() {
        let cmd = Command::new(CommandKind::HScan)
            .key("h")
            .arg(17i64)
            .options(Options {
                count: Some(5),
                ..Default::default()
            });
        assert_eq!(wire(&cmd), vec!["h", "17", "COUNT", "5"]);
    }

    #[test]
    fn test_keyed_scan_ignores_type_and_empty_pattern() {
        let cmd = Command::new(CommandKind::SScan)
            .key("s")
            .arg("0")
            .options(Options {
                pattern: Some(Vec::new()),
                type_filter: Some(b"set".to_vec()),
                ..Default::default()
            });
        assert_eq!(wire(&cmd), vec!["s", "0"]);
    }

    #[test]
    fn test_scan_argument_errors() {
        let cases = [
            Command::new(CommandKind::Scan),
            Command::new(CommandKind::Scan).arg(""),
            Command::new(CommandKind::ZScan).arg("0"),
            Command::new(CommandKind::Scan).arg("0").arg("MATCH"),
            Command::new(CommandKind::Scan).arg("0").options(Options {
                count: Some(0),
                ..Default::default()
            }),
        ];
        for cmd in cases {
            assert_eq!(build(&cmd).unwrap_err().kind(), ErrorKind::Argument);
        }
    }
}
