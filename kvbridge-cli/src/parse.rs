//! Turns a line typed at the prompt into a [`Command`].

use std::iter::Peekable;
use std::vec::IntoIter;

use libkvbridge::{
    Aggregate, Arg, Command, CommandKind, GeoOrigin, GeoSearch, GeoShape, GeoUnit, Options,
    RangeBy, Scalar, Shape, SortOrder,
};

/// What a line asks the shell to do.
#[derive(Debug, PartialEq)]
pub enum Input {
    Help,
    Exit,
    Multi,
    Pipeline,
    Exec,
    Discard,
    Run(Command),
}

/// Parses a single argument from the character stream
/// Handles single or double quoted strings with `\"` and `\\` escapes
///
/// # Arguments
/// * `chars` - Array of characters representing the input
/// * `pointer` - Mutable reference to current position in chars
/// * `arg_name` - Name of argument for error messages
///
/// # Returns
/// * `Ok(String)` - Successfully parsed argument
/// * `Err(String)` - Parse error with descriptive message
pub fn parse_arg(chars: &[char], pointer: &mut usize, arg_name: &str) -> Result<String, String> {
    let l = chars.len();

    while *pointer < l && chars[*pointer].is_whitespace() {
        *pointer += 1;
    }

    if *pointer >= l {
        return Err(format!("Missing {arg_name}"));
    }

    let delimiter = match chars[*pointer] {
        c @ ('"' | '\'') => {
            *pointer += 1;
            Some(c)
        }
        _ => None,
    };

    let mut arg_chars = Vec::new();

    match delimiter {
        Some(delim) => loop {
            match chars.get(*pointer).copied() {
                None => return Err(format!("Unclosed quote for {arg_name}")),
                Some(c) if c == delim => {
                    *pointer += 1;
                    break;
                }
                Some('\\')
                    if matches!(chars.get(*pointer + 1).copied(), Some(n) if n == delim || n == '\\') =>
                {
                    arg_chars.push(chars[*pointer + 1]);
                    *pointer += 2;
                }
                Some(c) => {
                    arg_chars.push(c);
                    *pointer += 1;
                }
            }
        },
        None => {
            while *pointer < l && !chars[*pointer].is_whitespace() {
                arg_chars.push(chars[*pointer]);
                *pointer += 1;
            }
        }
    }

    Ok(String::from_iter(arg_chars))
}

/// Splits a line into words. Quoted words may contain whitespace and may be
/// empty.
pub fn split_words(line: &str) -> Result<Vec<String>, String> {
    let chars: Vec<char> = line.trim().chars().collect();
    let mut pointer = 0;
    let mut words = Vec::new();

    while pointer < chars.len() {
        words.push(parse_arg(&chars, &mut pointer, "argument")?);
        while pointer < chars.len() && chars[pointer].is_whitespace() {
            pointer += 1;
        }
    }

    Ok(words)
}

/// Main parsing function - converts a line of text into an [`Input`]
///
/// Shell keywords are matched first; everything else must name a
/// command kind. A blank line asks for help.
pub fn parse_line(line: &str) -> Result<Input, String> {
    let words = split_words(line)?;

    let Some(first) = words.first() else {
        return Ok(Input::Help);
    };

    match first.to_ascii_uppercase().as_str() {
        "HELP" => return Ok(Input::Help),
        "EXIT" | "QUIT" => return Ok(Input::Exit),
        "MULTI" => return Ok(Input::Multi),
        "PIPELINE" => return Ok(Input::Pipeline),
        "EXEC" => return Ok(Input::Exec),
        "DISCARD" => return Ok(Input::Discard),
        _ => {}
    }

    parse_command(words).map(Input::Run)
}

/// Builds a command from already split words, the first one or two naming
/// its kind.
pub fn parse_command(words: Vec<String>) -> Result<Command, String> {
    let mut iter = words.into_iter().peekable();

    let Some(first) = iter.next() else {
        return Err("Empty command".to_string());
    };
    let name = if CommandKind::is_family(&first) {
        match iter.next() {
            Some(sub) => format!("{first} {sub}"),
            None => return Err(format!("{}: missing subcommand", first.to_uppercase())),
        }
    } else {
        first
    };

    let kind = name.parse::<CommandKind>().map_err(|e| e.to_string())?;
    let Some(shape) = Shape::of(kind) else {
        return Err(format!("{kind} cannot be run from the shell"));
    };

    let mut words = Words { kind, iter };
    let command = match shape {
        Shape::ZeroArg => Command::new(kind),
        Shape::KeyOnly => Command::new(kind).key(words.next("key")?),
        Shape::KeyValue => key_value(&mut words)?,
        Shape::KeyValuePairs => pairs(&mut words)?,
        Shape::MultiKey | Shape::Message => Command::new(kind).args(words.rest()),
        Shape::KeyOrMultiKey | Shape::GeoMembers | Shape::SetStore => {
            Command::new(kind).key(words.next("key")?).args(words.rest())
        }
        Shape::Range => Command::new(kind)
            .key(words.next("key")?)
            .arg(words.next("start")?)
            .arg(words.next("end")?),
        Shape::Expire => Command::new(kind)
            .key(words.next("key")?)
            .arg(words.next("time")?)
            .args(words.rest()),
        Shape::BitOperation => bits(&mut words)?,
        Shape::GeoAdd => geo_add(&mut words)?,
        Shape::GeoDist => Command::new(kind)
            .key(words.next("key")?)
            .arg(words.next("first member")?)
            .arg(words.next("second member")?)
            .args(words.rest()),
        Shape::GeoSearch => geo_search(&mut words, false)?,
        Shape::GeoSearchStore => geo_search(&mut words, true)?,
        Shape::ZAdd => zadd(&mut words)?,
        Shape::ZRange => zrange(&mut words, false)?,
        Shape::ZRangeStore => zrange(&mut words, true)?,
        Shape::ZStore => zstore(&mut words)?,
        Shape::Scan => scan(&mut words)?,
    };

    words.finish()?;
    Ok(command)
}

/// Cursor over the words after the command name.
struct Words {
    kind: CommandKind,
    iter: Peekable<IntoIter<String>>,
}

impl Words {
    fn next(&mut self, name: &str) -> Result<String, String> {
        self.iter
            .next()
            .ok_or_else(|| format!("{}: missing {name}", self.kind))
    }

    fn next_upper(&mut self) -> Option<String> {
        self.iter.next().map(|w| w.to_ascii_uppercase())
    }

    fn peek_upper(&mut self) -> Option<String> {
        self.iter.peek().map(|w| w.to_ascii_uppercase())
    }

    fn skip(&mut self) {
        self.iter.next();
    }

    fn int(&mut self, name: &str) -> Result<i64, String> {
        let word = self.next(name)?;
        word.parse::<i64>()
            .map_err(|_| format!("{}: {name} must be an integer, got `{word}`", self.kind))
    }

    fn float(&mut self, name: &str) -> Result<f64, String> {
        let word = self.next(name)?;
        word.parse::<f64>()
            .map_err(|_| format!("{}: {name} must be a number, got `{word}`", self.kind))
    }

    fn unit(&mut self) -> Result<GeoUnit, String> {
        let word = self.next("unit")?;
        word.parse::<GeoUnit>()
            .map_err(|e| format!("{}: {e}", self.kind))
    }

    /// Consumes the next word when it equals `flag`, ignoring case.
    fn flag(&mut self, flag: &str) -> bool {
        match self.iter.peek() {
            Some(word) if word.eq_ignore_ascii_case(flag) => {
                self.iter.next();
                true
            }
            _ => false,
        }
    }

    fn rest(&mut self) -> Vec<String> {
        self.iter.by_ref().collect()
    }

    fn unknown<T>(&self, word: &str) -> Result<T, String> {
        Err(format!("{}: unknown option `{word}`", self.kind))
    }

    fn finish(mut self) -> Result<(), String> {
        match self.iter.next() {
            None => Ok(()),
            Some(word) => Err(format!("{}: unexpected argument `{word}`", self.kind)),
        }
    }
}

/// SET and GETEX read option words after the value; the other key/value
/// commands pass everything through.
fn key_value(words: &mut Words) -> Result<Command, String> {
    let kind = words.kind;
    let mut command = Command::new(kind).key(words.next("key")?);

    match kind {
        CommandKind::Set => command = command.arg(words.next("value")?),
        CommandKind::GetEx => {}
        _ => return Ok(command.args(words.rest())),
    }

    let mut options = Options::default();
    while let Some(word) = words.next_upper() {
        match word.as_str() {
            "EX" => options.expiry.ex = Some(words.int("EX seconds")?),
            "PX" => options.expiry.px = Some(words.int("PX milliseconds")?),
            "EXAT" => options.expiry.exat = Some(words.int("EXAT timestamp")?),
            "PXAT" => options.expiry.pxat = Some(words.int("PXAT timestamp")?),
            "NX" => options.nx = true,
            "XX" => options.xx = true,
            "GET" => options.get_old_value = true,
            "KEEPTTL" => options.keep_ttl = true,
            "PERSIST" => options.persist = true,
            "IFEQ" => options.ifeq = Some(words.next("IFEQ value")?.into_bytes()),
            _ => return words.unknown(&word),
        }
    }

    Ok(command.options(options))
}

fn pairs(words: &mut Words) -> Result<Command, String> {
    let rest = words.rest();
    if rest.is_empty() || rest.len() % 2 != 0 {
        return Err(format!("{}: expected key/value pairs", words.kind));
    }

    let mut pairs = Vec::with_capacity(rest.len() / 2);
    let mut iter = rest.into_iter();
    while let (Some(k), Some(v)) = (iter.next(), iter.next()) {
        pairs.push((Scalar::from(k), Scalar::from(v)));
    }

    Ok(Command::new(words.kind).arg(Arg::Pairs(pairs)))
}

fn bits(words: &mut Words) -> Result<Command, String> {
    let kind = words.kind;

    if kind == CommandKind::BitOp {
        let op = words.next("operation")?;
        let dest = words.next("destination key")?;
        return Ok(Command::new(kind).key(dest).arg(op).args(words.rest()));
    }

    let mut command = Command::new(kind).key(words.next("key")?);
    match kind {
        CommandKind::GetBit => return Ok(command.arg(words.next("offset")?)),
        CommandKind::SetBit => {
            return Ok(command
                .arg(words.next("offset")?)
                .arg(words.next("bit value")?));
        }
        CommandKind::BitPos => command = command.arg(words.next("bit")?),
        _ => {}
    }

    let mut options = Options::default();
    if words.iter.peek().is_some() {
        options.range = Some((words.int("start")?, words.int("end")?));
        if words.flag("BIT") {
            options.bybit = true;
        } else {
            words.flag("BYTE");
        }
    }

    Ok(command.options(options))
}

fn geo_add(words: &mut Words) -> Result<Command, String> {
    let command = Command::new(words.kind).key(words.next("key")?);

    let mut options = Options::default();
    loop {
        match words.peek_upper().as_deref() {
            Some("NX") => options.nx = true,
            Some("XX") => options.xx = true,
            Some("CH") => options.ch = true,
            _ => break,
        }
        words.skip();
    }

    Ok(command.options(options).args(words.rest()))
}

/// `GEOSEARCH key origin area [flags]` or
/// `GEOSEARCHSTORE dest src origin area [flags]`.
fn geo_search(words: &mut Words, store: bool) -> Result<Command, String> {
    let kind = words.kind;
    let mut command = Command::new(kind);
    if store {
        command = command
            .key(words.next("destination key")?)
            .arg(words.next("source key")?);
    } else {
        command = command.key(words.next("key")?);
    }

    let origin = match words.next_upper().as_deref() {
        Some("FROMMEMBER") => GeoOrigin::Member(words.next("member")?.into_bytes()),
        Some("FROMLONLAT") => {
            let lon = words.float("longitude")?;
            let lat = words.float("latitude")?;
            GeoOrigin::LonLat(lon, lat)
        }
        _ => return Err(format!("{kind}: expected FROMMEMBER or FROMLONLAT")),
    };

    let shape = match words.next_upper().as_deref() {
        Some("BYRADIUS") => {
            let radius = words.float("radius")?;
            GeoShape::Radius(radius, words.unit()?)
        }
        Some("BYBOX") => {
            let width = words.float("width")?;
            let height = words.float("height")?;
            GeoShape::Box {
                width,
                height,
                unit: words.unit()?,
            }
        }
        _ => return Err(format!("{kind}: expected BYRADIUS or BYBOX")),
    };

    let mut geo = GeoSearch::new(origin, shape);
    let mut options = Options::default();
    while let Some(word) = words.next_upper() {
        match word.as_str() {
            "ASC" => geo.sort = Some(SortOrder::Asc),
            "DESC" => geo.sort = Some(SortOrder::Desc),
            "COUNT" => geo.count = Some(words.int("count")?),
            "ANY" => options.approximate = true,
            "WITHCOORD" => geo.with_coord = true,
            "WITHDIST" => geo.with_dist = true,
            "WITHHASH" => geo.with_hash = true,
            "STOREDIST" => geo.store_dist = true,
            _ => return words.unknown(&word),
        }
    }
    options.geo = Some(geo);

    Ok(command.options(options))
}

fn zadd(words: &mut Words) -> Result<Command, String> {
    let command = Command::new(words.kind).key(words.next("key")?);

    let mut options = Options::default();
    loop {
        match words.peek_upper().as_deref() {
            Some("XX") => options.xx = true,
            Some("NX") => options.nx = true,
            Some("LT") => options.lt = true,
            Some("GT") => options.gt = true,
            Some("CH") => options.ch = true,
            Some("INCR") => options.incr = true,
            _ => break,
        }
        words.skip();
    }

    Ok(command.options(options).args(words.rest()))
}

fn zrange(words: &mut Words, store: bool) -> Result<Command, String> {
    let mut command = Command::new(words.kind);
    if store {
        command = command
            .key(words.next("destination key")?)
            .arg(words.next("source key")?);
    } else {
        command = command.key(words.next("key")?);
    }
    command = command.arg(words.next("start")?).arg(words.next("stop")?);

    let mut options = Options::default();
    while let Some(word) = words.next_upper() {
        match word.as_str() {
            "BYSCORE" => options.range_by = RangeBy::Score,
            "BYLEX" => options.range_by = RangeBy::Lex,
            "REV" => options.rev = true,
            "LIMIT" => {
                let offset = words.int("LIMIT offset")?;
                let count = words.int("LIMIT count")?;
                options.limit = Some((offset, count));
            }
            "WITHSCORES" => options.with_scores = true,
            _ => return words.unknown(&word),
        }
    }

    Ok(command.options(options))
}

/// `ZUNIONSTORE dest numkeys key... [WEIGHTS w...] [AGGREGATE SUM|MIN|MAX]`.
fn zstore(words: &mut Words) -> Result<Command, String> {
    let kind = words.kind;
    let dest = words.next("destination key")?;
    let numkeys = words.int("numkeys")?;
    if numkeys <= 0 {
        return Err(format!("{kind}: numkeys must be positive"));
    }

    let mut keys = Vec::with_capacity(numkeys as usize);
    for _ in 0..numkeys {
        keys.push(words.next("source key")?.into_bytes());
    }

    let mut options = Options::default();
    while let Some(word) = words.next_upper() {
        match word.as_str() {
            "WEIGHTS" => {
                let mut weights = Vec::with_capacity(keys.len());
                for _ in 0..keys.len() {
                    weights.push(words.float("weight")?);
                }
                options.weights = Some(weights);
            }
            "AGGREGATE" => {
                options.aggregate = match words.next_upper().as_deref() {
                    Some("SUM") => Some(Aggregate::Sum),
                    Some("MIN") => Some(Aggregate::Min),
                    Some("MAX") => Some(Aggregate::Max),
                    _ => return Err(format!("{kind}: AGGREGATE takes SUM, MIN or MAX")),
                }
            }
            _ => return words.unknown(&word),
        }
    }

    Ok(Command::new(kind)
        .key(dest)
        .arg(Arg::MultiString(keys))
        .options(options))
}

/// `SCAN cursor [MATCH p] [COUNT n] [TYPE t]`; the keyed scans take the key
/// first and no TYPE.
fn scan(words: &mut Words) -> Result<Command, String> {
    let kind = words.kind;
    let mut command = Command::new(kind);
    if kind != CommandKind::Scan {
        command = command.key(words.next("key")?);
    }
    command = command.arg(words.next("cursor")?);

    let mut options = Options::default();
    while let Some(word) = words.next_upper() {
        match word.as_str() {
            "MATCH" => options.pattern = Some(words.next("pattern")?.into_bytes()),
            "COUNT" => options.count = Some(words.int("COUNT")?),
            "TYPE" if kind == CommandKind::Scan => {
                options.type_filter = Some(words.next("type")?.into_bytes())
            }
            _ => return words.unknown(&word),
        }
    }

    Ok(command.options(options))
}

#[cfg(test)]
mod cli_parsing {
    use super::*;
    use libkvbridge::{ConfigSubcommand, ObjectSubcommand, build};

    fn command(line: &str) -> Command {
        match parse_line(line) {
            Ok(Input::Run(command)) => command,
            other => panic!("expected a command for `{line}`, got {other:?}"),
        }
    }

    fn wire(line: &str) -> Vec<String> {
        build(&command(line))
            .unwrap()
            .iter()
            .map(|b| String::from_utf8_lossy(b).into_owned())
            .collect()
    }

    #[test]
    fn test_split_words_handles_quotes() {
        assert_eq!(
            split_words(r#"SET greeting "hello world""#).unwrap(),
            vec!["SET", "greeting", "hello world"]
        );
        assert_eq!(
            split_words(r#"ECHO 'it''s' "say \"hi\"" """#).unwrap(),
            vec!["ECHO", "it", "s", "say \"hi\"", ""]
        );
        assert!(split_words("GET \"open").is_err());
    }

    #[test]
    fn test_shell_keywords() {
        assert_eq!(parse_line("   ").unwrap(), Input::Help);
        assert_eq!(parse_line("help").unwrap(), Input::Help);
        assert_eq!(parse_line("quit").unwrap(), Input::Exit);
        assert_eq!(parse_line("Exit").unwrap(), Input::Exit);
        assert_eq!(parse_line("multi").unwrap(), Input::Multi);
        assert_eq!(parse_line("PIPELINE").unwrap(), Input::Pipeline);
        assert_eq!(parse_line("exec").unwrap(), Input::Exec);
        assert_eq!(parse_line("discard").unwrap(), Input::Discard);
    }

    #[test]
    fn test_parse_get() {
        let cmd = command("get MyKey");
        assert_eq!(cmd.kind, CommandKind::Get);
        assert_eq!(cmd.key.as_deref(), Some(&b"MyKey"[..]));

        assert!(parse_line("GET").unwrap_err().contains("missing key"));
        assert!(parse_line("GET a b").unwrap_err().contains("unexpected argument"));
    }

    #[test]
    fn test_parse_set_options() {
        assert_eq!(
            wire("set k v nx ex 30 get"),
            vec!["k", "v", "EX", "30", "NX", "GET"]
        );
        assert_eq!(wire("SET k v KEEPTTL XX"), vec!["k", "v", "XX", "KEEPTTL"]);
        assert!(parse_line("SET k v EX soon").is_err());
        assert!(parse_line("SET k v LATER").unwrap_err().contains("LATER"));
        assert_eq!(wire("GETEX k PERSIST"), vec!["k", "PERSIST"]);
    }

    #[test]
    fn test_parse_unknown_command() {
        assert!(parse_line("FROB k").is_err());
        assert!(parse_line("SUBSCRIBE news").is_err());
    }

    #[test]
    fn test_parse_families() {
        assert_eq!(
            command("object encoding k").kind,
            CommandKind::Object(ObjectSubcommand::Encoding)
        );
        assert_eq!(wire("CONFIG SET maxmemory 10mb"), vec!["maxmemory", "10mb"]);
        assert_eq!(
            command("config get maxmemory").kind,
            CommandKind::Config(ConfigSubcommand::Get)
        );
        assert!(parse_line("CONFIG").is_err());
    }

    #[test]
    fn test_parse_multi_key_and_pairs() {
        assert_eq!(wire("MGET a b c"), vec!["a", "b", "c"]);
        assert_eq!(wire("DEL a b"), vec!["a", "b"]);
        assert_eq!(wire("MSET a 1 b 2"), vec!["a", "1", "b", "2"]);
        assert!(parse_line("MSET a 1 b").is_err());
        assert_eq!(wire("HSET h f v"), vec!["h", "f", "v"]);
    }

    #[test]
    fn test_parse_bits() {
        assert_eq!(wire("BITCOUNT k 0 10 BIT"), vec!["k", "0", "10", "BIT"]);
        assert_eq!(wire("BITCOUNT k 0 10 byte"), vec!["k", "0", "10"]);
        assert_eq!(wire("BITPOS k 1"), vec!["k", "1"]);
        assert_eq!(wire("SETBIT k 7 1"), vec!["k", "7", "1"]);
        assert_eq!(wire("BITOP and dest a b"), vec!["AND", "dest", "a", "b"]);
    }

    #[test]
    fn test_parse_expire_and_range() {
        assert_eq!(wire("EXPIRE k 60 nx"), vec!["k", "60", "NX"]);
        assert_eq!(wire("GETRANGE k 0 -1"), vec!["k", "0", "-1"]);
        assert!(parse_line("GETRANGE k 0").is_err());
    }

    #[test]
    fn test_parse_geo() {
        assert_eq!(
            wire("GEOADD places nx 13.36 38.11 palermo"),
            vec!["places", "NX", "13.36", "38.11", "palermo"]
        );
        assert_eq!(
            wire("GEOSEARCH places FROMLONLAT 15 37 BYRADIUS 200 km ASC COUNT 2 ANY WITHDIST"),
            vec![
                "places",
                "FROMLONLAT",
                "15",
                "37",
                "BYRADIUS",
                "200",
                "km",
                "WITHDIST",
                "COUNT",
                "2",
                "ANY",
                "ASC"
            ]
        );
        assert_eq!(
            wire("GEOSEARCHSTORE out places FROMMEMBER palermo BYBOX 400 400 km STOREDIST"),
            vec![
                "out",
                "places",
                "FROMMEMBER",
                "palermo",
                "BYBOX",
                "400",
                "400",
                "km",
                "STOREDIST"
            ]
        );
        assert!(parse_line("GEOSEARCH places BYRADIUS 1 km").is_err());
        assert!(parse_line("GEOSEARCH places FROMMEMBER a BYRADIUS 1 parsec").is_err());
    }

    #[test]
    fn test_parse_zset() {
        assert_eq!(
            wire("ZADD z gt ch 1 a 2 b"),
            vec!["z", "GT", "CH", "1", "a", "2", "b"]
        );
        assert_eq!(
            wire("ZRANGE z 0 10 BYSCORE REV LIMIT 0 5 WITHSCORES"),
            vec!["z", "0", "10", "BYSCORE", "REV", "LIMIT", "0", "5", "WITHSCORES"]
        );
        assert_eq!(
            wire("ZUNIONSTORE out 2 a b WEIGHTS 1 2.5 AGGREGATE max"),
            vec!["out", "2", "a", "b", "WEIGHTS", "1", "2.5", "AGGREGATE", "MAX"]
        );
        assert!(parse_line("ZUNIONSTORE out 3 a b").is_err());
        assert_eq!(wire("ZRANGESTORE dst src 0 -1"), vec!["dst", "src", "0", "-1"]);
    }

    #[test]
    fn test_parse_scan() {
        assert_eq!(
            wire("scan 0 match user:* count 20 type hash"),
            vec!["0", "MATCH", "user:*", "COUNT", "20", "TYPE", "hash"]
        );
        assert_eq!(wire("HSCAN h 12 COUNT 5"), vec!["h", "12", "COUNT", "5"]);
        assert!(parse_line("SSCAN s 0 TYPE set").unwrap_err().contains("TYPE"));
        assert!(parse_line("ZSCAN z").unwrap_err().contains("missing cursor"));
    }
}
