// Redis Serialization Protocol v3.0, client side

use crate::command::CommandKind;
use crate::response::ResponseValue;
use crate::{Error, Inner, parser_error};

/// Aggregates nested deeper than this are refused instead of recursed into.
pub const MAX_DEPTH: usize = 128;

/// Encodes a request as an array of bulk strings: the command name tokens
/// followed by the wire arguments.
///
/// # Examples
/// ```rust
/// use libkvbridge::{CommandKind, resp3::encode_request};
///
/// let bytes = encode_request(CommandKind::Get, &[b"k"]);
/// assert_eq!(bytes, b"*2\r\n$3\r\nGET\r\n$1\r\nk\r\n".to_vec());
/// ```
pub fn encode_request(kind: CommandKind, args: &[&[u8]]) -> Vec<u8> {
    let mut parts: Vec<&[u8]> = kind.name_tokens().map(str::as_bytes).collect();
    parts.extend_from_slice(args);
    encode_parts(&parts)
}

/// Encodes arbitrary request parts, for handshake commands that have no
/// [`CommandKind`].
pub fn encode_parts(parts: &[&[u8]]) -> Vec<u8> {
    let size: usize = parts.iter().map(|p| p.len() + 16).sum();
    let mut out = Vec::with_capacity(size + 16);

    out.push(b'*');
    out.extend_from_slice(parts.len().to_string().as_bytes());
    out.extend_from_slice(b"\r\n");

    for part in parts {
        out.push(b'$');
        out.extend_from_slice(part.len().to_string().as_bytes());
        out.extend_from_slice(b"\r\n");
        out.extend_from_slice(part);
        out.extend_from_slice(b"\r\n");
    }

    out
}

/// Identifies reply types based on their first byte.
#[derive(Debug, Eq, PartialEq, Clone, Copy)]
pub enum DataType {
    SimpleString,
    SimpleError,
    Integer,
    BulkString,
    Array,
    Null,
    Boolean,
    Double,
    BigNumber,
    BulkError,
    VerbatimString,
    Maps,
    Sets,
    Push,
    Attribute,
    Unknown,
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataType::SimpleString => write!(f, "SimpleString"),
            DataType::SimpleError => write!(f, "SimpleError"),
            DataType::Integer => write!(f, "Integer"),
            DataType::BulkString => write!(f, "BulkString"),
            DataType::Array => write!(f, "Array"),
            DataType::Null => write!(f, "Null"),
            DataType::Boolean => write!(f, "Boolean"),
            DataType::Double => write!(f, "Double"),
            DataType::BigNumber => write!(f, "BigNumber"),
            DataType::BulkError => write!(f, "BulkError"),
            DataType::VerbatimString => write!(f, "VerbatimString"),
            DataType::Maps => write!(f, "Maps"),
            DataType::Sets => write!(f, "Sets"),
            DataType::Push => write!(f, "Push"),
            DataType::Attribute => write!(f, "Attribute"),
            DataType::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Matches a provided byte to a known Resp datatype.
/// Returns Unknown if the byte value is invalid or unknown.
fn get_data_type(byte: u8) -> DataType {
    match byte {
        b'+' => DataType::SimpleString,
        b'-' => DataType::SimpleError,
        b':' => DataType::Integer,
        b'$' => DataType::BulkString,
        b'*' => DataType::Array,
        b'_' => DataType::Null,
        b'#' => DataType::Boolean,
        b',' => DataType::Double,
        b'(' => DataType::BigNumber,
        b'!' => DataType::BulkError,
        b'=' => DataType::VerbatimString,
        b'%' => DataType::Maps,
        b'~' => DataType::Sets,
        b'>' => DataType::Push,
        b'|' => DataType::Attribute,
        _ => DataType::Unknown,
    }
}

fn incomplete<T>() -> crate::Result<T> {
    Err(Error {
        inner: Inner::Incomplete,
    })
}

/// Reads the header line that follows the type byte.
/// Returns the line content and the bytes consumed including the type byte
/// and the CRLF.
fn read_line(data: &[u8]) -> crate::Result<(&[u8], usize)> {
    let mut i = 1;
    while i < data.len() && data[i] != b'\r' {
        i += 1;
    }

    if i + 1 >= data.len() {
        return incomplete();
    }
    if data[i + 1] != b'\n' {
        return parser_error!("No proper termination", i);
    }

    Ok((&data[1..i], i + 2))
}

fn parse_length(line: &[u8], byte_offset: usize) -> crate::Result<i64> {
    let text = match std::str::from_utf8(line) {
        Ok(t) => t,
        Err(_) => return parser_error!("Length field contains non-utf8 characters", byte_offset),
    };
    match text.parse::<i64>() {
        Ok(len) => Ok(len),
        Err(_) => parser_error!("Failed to parse the `length` field from ascii", byte_offset),
    }
}

/// `+<data>\r\n`. A bare `OK` becomes [`ResponseValue::Ok`].
fn parse_simple_strings(data: &[u8]) -> crate::Result<(ResponseValue, usize)> {
    let (line, consumed) = read_line(data)?;
    let value = if line == b"OK" {
        ResponseValue::Ok
    } else {
        ResponseValue::String(line.to_vec())
    };
    Ok((value, consumed))
}

/// `-<data>\r\n`
fn parse_simple_errors(data: &[u8]) -> crate::Result<(ResponseValue, usize)> {
    let (line, consumed) = read_line(data)?;
    Ok((ResponseValue::Error(line.to_vec()), consumed))
}

/// `:[<+|->]<value>\r\n`
fn parse_integers(data: &[u8], byte_offset: usize) -> crate::Result<(ResponseValue, usize)> {
    let (line, consumed) = read_line(data)?;
    let line = line.strip_prefix(b"+").unwrap_or(line);
    match crate::codec::parse_int(line) {
        Ok(i) => Ok((ResponseValue::Int(i), consumed)),
        Err(_) => parser_error!("Invalid integer", byte_offset),
    }
}

/// `_\r\n`
fn parse_null(data: &[u8], byte_offset: usize) -> crate::Result<(ResponseValue, usize)> {
    let (line, consumed) = read_line(data)?;
    if !line.is_empty() {
        return parser_error!("Null carries no data", byte_offset);
    }
    Ok((ResponseValue::Null, consumed))
}

/// `#<t|f>\r\n`
fn parse_booleans(data: &[u8], byte_offset: usize) -> crate::Result<(ResponseValue, usize)> {
    let (line, consumed) = read_line(data)?;
    match line {
        b"t" => Ok((ResponseValue::Bool(true), consumed)),
        b"f" => Ok((ResponseValue::Bool(false), consumed)),
        _ => parser_error!("Invalid boolean", byte_offset),
    }
}

/// `,[<+|->]<integral>[.<fractional>][<E|e>[sign]<exponent>]\r\n`, plus
/// `inf`, `-inf` and `nan`.
fn parse_doubles(data: &[u8], byte_offset: usize) -> crate::Result<(ResponseValue, usize)> {
    let (line, consumed) = read_line(data)?;
    match crate::codec::parse_float(line) {
        Ok(f) => Ok((ResponseValue::Float(f), consumed)),
        Err(_) => parser_error!("Invalid double", byte_offset),
    }
}

/// `(<big number>\r\n`, kept as text.
fn parse_big_numbers(data: &[u8], byte_offset: usize) -> crate::Result<(ResponseValue, usize)> {
    let (line, consumed) = read_line(data)?;
    let digits = line.strip_prefix(b"-").unwrap_or(line);
    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return parser_error!("Invalid big number", byte_offset);
    }
    Ok((ResponseValue::String(line.to_vec()), consumed))
}

/// Shared by `$`, `!` and `=`: `<type><length>\r\n<data>\r\n`.
/// Returns `None` for the RESP2 null `$-1`.
fn read_blob(data: &[u8], byte_offset: usize) -> crate::Result<(Option<&[u8]>, usize)> {
    let (line, header) = read_line(data)?;
    let length = parse_length(line, byte_offset)?;
    if length < 0 {
        return Ok((None, header));
    }

    let length = length as usize;
    let end = header + length;
    if end + 2 > data.len() {
        return incomplete();
    }
    if &data[end..end + 2] != b"\r\n" {
        return parser_error!(
            "Data `length` field and actual data length mismatch",
            byte_offset + end
        );
    }

    Ok((Some(&data[header..end]), end + 2))
}

fn parse_bulk_strings(data: &[u8], byte_offset: usize) -> crate::Result<(ResponseValue, usize)> {
    let (blob, consumed) = read_blob(data, byte_offset)?;
    let value = match blob {
        Some(b) => ResponseValue::String(b.to_vec()),
        None => ResponseValue::Null,
    };
    Ok((value, consumed))
}

fn parse_bulk_errors(data: &[u8], byte_offset: usize) -> crate::Result<(ResponseValue, usize)> {
    match read_blob(data, byte_offset)? {
        (Some(b), consumed) => Ok((ResponseValue::Error(b.to_vec()), consumed)),
        (None, _) => parser_error!("Bulk error cannot be null", byte_offset),
    }
}

/// `=<length>\r\n<encoding>:<data>\r\n`; the three-byte encoding is dropped.
fn parse_verbatim_strings(
    data: &[u8],
    byte_offset: usize,
) -> crate::Result<(ResponseValue, usize)> {
    match read_blob(data, byte_offset)? {
        (Some(b), consumed) if b.len() >= 4 && b[3] == b':' => {
            Ok((ResponseValue::String(b[4..].to_vec()), consumed))
        }
        _ => parser_error!("Verbatim string needs a `xxx:` encoding prefix", byte_offset),
    }
}

/// Parses `count` consecutive values one level below `depth`.
fn parse_elements(
    data: &[u8],
    mut i: usize,
    count: usize,
    byte_offset: usize,
    depth: usize,
) -> crate::Result<(Vec<ResponseValue>, usize)> {
    let mut elements = Vec::with_capacity(count.min(1024));
    for _ in 0..count {
        let (value, consumed) = parse_value(&data[i..], byte_offset + i, depth + 1)?;
        elements.push(value);
        i += consumed;
    }
    Ok((elements, i))
}

/// `*`, `~` and `>` aggregates: `<type><count>\r\n<element-1>...<element-n>`.
/// `*-1` is the RESP2 null array.
fn parse_aggregate(
    data: &[u8],
    byte_offset: usize,
    depth: usize,
) -> crate::Result<(ResponseValue, usize)> {
    let datatype = get_data_type(data[0]);
    let (line, header) = read_line(data)?;
    let count = parse_length(line, byte_offset)?;

    if count < 0 {
        if datatype == DataType::Array {
            return Ok((ResponseValue::Null, header));
        }
        return parser_error!(format!("Negative `{datatype}` length"), byte_offset);
    }

    let (elements, consumed) = parse_elements(data, header, count as usize, byte_offset, depth)?;
    let value = match datatype {
        DataType::Sets => ResponseValue::Set(elements),
        _ => ResponseValue::Array(elements),
    };
    Ok((value, consumed))
}

/// `%<entries>\r\n<key-1><value-1>...`
fn parse_maps(
    data: &[u8],
    byte_offset: usize,
    depth: usize,
) -> crate::Result<(ResponseValue, usize)> {
    let (line, header) = read_line(data)?;
    let entries = parse_length(line, byte_offset)?;
    if entries < 0 {
        return parser_error!("Negative map length", byte_offset);
    }

    let (flat, consumed) =
        parse_elements(data, header, entries as usize * 2, byte_offset, depth)?;
    let mut pairs = Vec::with_capacity(entries as usize);
    let mut it = flat.into_iter();
    while let (Some(k), Some(v)) = (it.next(), it.next()) {
        pairs.push((k, v));
    }
    Ok((ResponseValue::Map(pairs), consumed))
}

/// `|<entries>\r\n...` metadata precedes the real reply; it is skipped.
fn parse_attributes(
    data: &[u8],
    byte_offset: usize,
    depth: usize,
) -> crate::Result<(ResponseValue, usize)> {
    let (_, skipped) = parse_maps(data, byte_offset, depth)?;
    let (value, consumed) = parse_value(&data[skipped..], byte_offset + skipped, depth)?;
    Ok((value, skipped + consumed))
}

fn parse_value(
    data: &[u8],
    byte_offset: usize,
    depth: usize,
) -> crate::Result<(ResponseValue, usize)> {
    if data.is_empty() {
        return incomplete();
    }
    if depth > MAX_DEPTH {
        return parser_error!(
            format!("Reply nested deeper than {MAX_DEPTH} levels"),
            byte_offset
        );
    }

    match get_data_type(data[0]) {
        DataType::SimpleString => parse_simple_strings(data),
        DataType::SimpleError => parse_simple_errors(data),
        DataType::Integer => parse_integers(data, byte_offset),
        DataType::BulkString => parse_bulk_strings(data, byte_offset),
        DataType::Array | DataType::Sets | DataType::Push => {
            parse_aggregate(data, byte_offset, depth)
        }
        DataType::Null => parse_null(data, byte_offset),
        DataType::Boolean => parse_booleans(data, byte_offset),
        DataType::Double => parse_doubles(data, byte_offset),
        DataType::BigNumber => parse_big_numbers(data, byte_offset),
        DataType::BulkError => parse_bulk_errors(data, byte_offset),
        DataType::VerbatimString => parse_verbatim_strings(data, byte_offset),
        DataType::Maps => parse_maps(data, byte_offset, depth),
        DataType::Attribute => parse_attributes(data, byte_offset, depth),
        DataType::Unknown => parser_error!(
            format!("Unknown data type `{}`", data[0].escape_ascii()),
            byte_offset
        ),
    }
}

/// Parses one reply frame from the front of `data`.
///
/// # Returns
/// * `Ok((value, consumed))` - The reply and the number of bytes it spans
/// * `Err(Error)` - `Incomplete` when more bytes are needed, `ParseError`
///   with a byte offset for malformed input or nesting past [`MAX_DEPTH`]
pub fn parse_reply(data: &[u8]) -> crate::Result<(ResponseValue, usize)> {
    parse_value(data, 0, 0)
}

#[cfg(test)]
mod resp3_tests {
    use super::*;
    use crate::ErrorKind;

    fn parse(bytes: &[u8]) -> ResponseValue {
        let (value, consumed) = parse_reply(bytes).unwrap();
        assert_eq!(consumed, bytes.len());
        value
    }

    #[test]
    fn test_encode_subcommand() {
        let bytes = encode_request(
            CommandKind::Object(crate::ObjectSubcommand::Encoding),
            &[b"key"],
        );
        assert_eq!(
            bytes,
            b"*3\r\n$6\r\nOBJECT\r\n$8\r\nENCODING\r\n$3\r\nkey\r\n".to_vec()
        );
    }

    #[test]
    fn test_encode_binary_argument() {
        let bytes = encode_parts(&[b"SET", b"k", b"a\r\nb"]);
        assert_eq!(
            bytes,
            b"*3\r\n$3\r\nSET\r\n$1\r\nk\r\n$4\r\na\r\nb\r\n".to_vec()
        );
    }

    #[test]
    fn test_simple_types() {
        assert_eq!(parse(b"+OK\r\n"), ResponseValue::Ok);
        assert_eq!(parse(b"+PONG\r\n"), ResponseValue::from("PONG"));
        assert_eq!(parse(b":-42\r\n"), ResponseValue::Int(-42));
        assert_eq!(parse(b"_\r\n"), ResponseValue::Null);
        assert_eq!(parse(b"#t\r\n"), ResponseValue::Bool(true));
        assert_eq!(parse(b"#f\r\n"), ResponseValue::Bool(false));
        assert_eq!(parse(b",1.23\r\n"), ResponseValue::Float(1.23));
        assert_eq!(parse(b",-inf\r\n"), ResponseValue::Float(f64::NEG_INFINITY));
        assert_eq!(
            parse(b"(3492890328409238509324850943850943825024385\r\n"),
            ResponseValue::from("3492890328409238509324850943850943825024385")
        );
    }

    #[test]
    fn test_nan_double() {
        match parse(b",nan\r\n") {
            ResponseValue::Float(f) => assert!(f.is_nan()),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_errors() {
        assert_eq!(
            parse(b"-ERR unknown command\r\n"),
            ResponseValue::Error(b"ERR unknown command".to_vec())
        );
        assert_eq!(
            parse(b"!21\r\nSYNTAX invalid syntax\r\n"),
            ResponseValue::Error(b"SYNTAX invalid syntax".to_vec())
        );
    }

    #[test]
    fn test_bulk_strings() {
        assert_eq!(parse(b"$5\r\nhello\r\n"), ResponseValue::from("hello"));
        assert_eq!(parse(b"$0\r\n\r\n"), ResponseValue::from(""));
        assert_eq!(parse(b"$-1\r\n"), ResponseValue::Null);
        assert_eq!(
            parse(b"$4\r\na\r\nb\r\n"),
            ResponseValue::String(b"a\r\nb".to_vec())
        );
    }

    #[test]
    fn test_verbatim_string() {
        assert_eq!(
            parse(b"=15\r\ntxt:Some string\r\n"),
            ResponseValue::from("Some string")
        );
    }

    #[test]
    fn test_aggregates() {
        assert_eq!(
            parse(b"*2\r\n$1\r\na\r\n:1\r\n"),
            ResponseValue::Array(vec![ResponseValue::from("a"), ResponseValue::Int(1)])
        );
        assert_eq!(parse(b"*0\r\n"), ResponseValue::Array(vec![]));
        assert_eq!(parse(b"*-1\r\n"), ResponseValue::Null);
        assert_eq!(
            parse(b"~2\r\n+a\r\n+b\r\n"),
            ResponseValue::Set(vec![ResponseValue::from("a"), ResponseValue::from("b")])
        );
        assert_eq!(
            parse(b">2\r\n+message\r\n+hi\r\n"),
            ResponseValue::Array(vec![ResponseValue::from("message"), ResponseValue::from("hi")])
        );
    }

    #[test]
    fn test_map_keeps_order_and_key_types() {
        assert_eq!(
            parse(b"%2\r\n+first\r\n:1\r\n:2\r\n+second\r\n"),
            ResponseValue::Map(vec![
                (ResponseValue::from("first"), ResponseValue::Int(1)),
                (ResponseValue::Int(2), ResponseValue::from("second")),
            ])
        );
    }

    #[test]
    fn test_attribute_is_skipped() {
        assert_eq!(
            parse(b"|1\r\n+ttl\r\n:3600\r\n:7\r\n"),
            ResponseValue::Int(7)
        );
    }

    #[test]
    fn test_consumes_one_frame() {
        let (value, consumed) = parse_reply(b"+OK\r\n:1\r\n").unwrap();
        assert_eq!(value, ResponseValue::Ok);
        assert_eq!(consumed, 5);
    }

    #[test]
    fn test_truncated_frames_are_incomplete() {
        let frames: [&[u8]; 7] = [
            b"",
            b"+OK",
            b"+OK\r",
            b"$5\r\nhel",
            b"*2\r\n:1\r\n",
            b"%1\r\n+k\r\n",
            b"$5\r\nhello",
        ];
        for frame in frames {
            let err = parse_reply(frame).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Incomplete, "{}", frame.escape_ascii());
        }
    }

    #[test]
    fn test_malformed_frames() {
        let frames: [&[u8]; 4] = [b"?what\r\n", b":abc\r\n", b"#x\r\n", b"$3\r\nhello\r\n"];
        for frame in frames {
            let err = parse_reply(frame).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Parse, "{}", frame.escape_ascii());
        }
    }

    #[test]
    fn test_nesting_is_capped() {
        let frame = |depth: usize| {
            let mut frame = b"*1\r\n".repeat(depth);
            frame.extend_from_slice(b":1\r\n");
            frame
        };

        let (_, consumed) = parse_reply(&frame(MAX_DEPTH)).unwrap();
        assert_eq!(consumed, MAX_DEPTH * 4 + 4);

        let err = parse_reply(&frame(MAX_DEPTH + 1)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);

        // refused before the missing tail is waited for
        let err = parse_reply(&b"*1\r\n".repeat(100_000)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);

        let err = parse_reply(&b"%1\r\n".repeat(MAX_DEPTH + 2)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
    }
}
