//! Per-command result processors.
//!
//! Each command names the processor that turns its reply into a host value.
//! Processors are plain values so a buffered command can carry its own until
//! the batch reply arrives.

use crate::codec::parse_float;
use crate::response::{
    AssociationMode, HostValue, ResponseValue, decode, decode_scan, decode_stream, decode_with,
};
use crate::response_error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Processor {
    /// `OK` becomes `true`.
    Ok,
    Bool,
    Int,
    Double,
    /// A string reply; a missing value becomes `false`.
    String,
    /// A flat collection; nulls inside become `false`.
    Array,
    Assoc,
    ScanPairs,
    /// `[cursor, items]` of the SCAN family, items folded under the mode.
    Scan(AssociationMode),
    Stream,
    /// TYPE reply as a numeric code.
    Type,
    Raw(AssociationMode),
}

/// Numeric codes for key types as reported by TYPE.
pub mod key_type {
    pub const NOT_FOUND: i64 = 0;
    pub const STRING: i64 = 1;
    pub const SET: i64 = 2;
    pub const LIST: i64 = 3;
    pub const ZSET: i64 = 4;
    pub const HASH: i64 = 5;
    pub const STREAM: i64 = 6;

    pub fn from_name(name: &[u8]) -> i64 {
        match name {
            b"string" => STRING,
            b"set" => SET,
            b"list" => LIST,
            b"zset" => ZSET,
            b"hash" => HASH,
            b"stream" => STREAM,
            _ => NOT_FOUND,
        }
    }
}

impl Processor {
    pub fn process(self, value: ResponseValue) -> crate::Result<HostValue> {
        match self {
            Processor::Ok => match value {
                ResponseValue::Ok => Ok(HostValue::Bool(true)),
                ResponseValue::Null => Ok(HostValue::Bool(false)),
                ResponseValue::String(s) if s.eq_ignore_ascii_case(b"OK") => {
                    Ok(HostValue::Bool(true))
                }
                other => unexpected("OK", &other),
            },

            Processor::Bool => match value {
                ResponseValue::Bool(b) => Ok(HostValue::Bool(b)),
                ResponseValue::Int(i) => Ok(HostValue::Bool(i != 0)),
                ResponseValue::Ok => Ok(HostValue::Bool(true)),
                ResponseValue::Null => Ok(HostValue::Bool(false)),
                other => unexpected("boolean", &other),
            },

            Processor::Int => match value {
                ResponseValue::Int(i) => Ok(HostValue::Int(i)),
                ResponseValue::Null => Ok(HostValue::Null),
                other => unexpected("integer", &other),
            },

            Processor::Double => match value {
                ResponseValue::Float(f) => Ok(HostValue::Float(f)),
                ResponseValue::Int(i) => Ok(HostValue::Float(i as f64)),
                ResponseValue::String(s) => match parse_float(&s) {
                    Ok(f) => Ok(HostValue::Float(f)),
                    Err(_) => response_error!(format!(
                        "`{}` is not a float",
                        String::from_utf8_lossy(&s)
                    )),
                },
                ResponseValue::Null => Ok(HostValue::Bool(false)),
                other => unexpected("float", &other),
            },

            Processor::String => match value {
                ResponseValue::String(s) => Ok(HostValue::String(s)),
                ResponseValue::Null => Ok(HostValue::Bool(false)),
                ResponseValue::Ok => Ok(HostValue::Bool(true)),
                other => unexpected("string", &other),
            },

            Processor::Array => match value {
                ResponseValue::Array(_) | ResponseValue::Set(_) | ResponseValue::Map(_) => {
                    decode_with(value, AssociationMode::Flat, true)
                }
                ResponseValue::Null => Ok(HostValue::Bool(false)),
                other => unexpected("array", &other),
            },

            Processor::Assoc => match value {
                ResponseValue::Map(_) => decode(value, AssociationMode::MapAsAssoc),
                // RESP2 servers answer with a flat field/value array
                ResponseValue::Array(_) => decode(value, AssociationMode::ScanPairAssoc),
                ResponseValue::Null => Ok(HostValue::Bool(false)),
                other => unexpected("map", &other),
            },

            Processor::ScanPairs => decode(value, AssociationMode::ScanPairAssoc),

            Processor::Scan(mode) => decode_scan(value, mode),

            Processor::Stream => decode_stream(value),

            Processor::Type => match value {
                ResponseValue::String(name) => Ok(HostValue::Int(key_type::from_name(&name))),
                ResponseValue::Null => Ok(HostValue::Int(key_type::NOT_FOUND)),
                other => unexpected("type name", &other),
            },

            Processor::Raw(mode) => decode(value, mode),
        }
    }
}

fn unexpected(expected: &str, got: &ResponseValue) -> crate::Result<HostValue> {
    log::debug!("expected {expected} reply, got {}", got.type_name());
    response_error!(format!("expected {expected}, got {}", got.type_name()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn test_type_codes() {
        let cases = [
            ("string", 1),
            ("set", 2),
            ("list", 3),
            ("zset", 4),
            ("hash", 5),
            ("stream", 6),
            ("none", 0),
            ("vectorset", 0),
        ];
        for (name, code) in cases {
            assert_eq!(
                Processor::Type.process(ResponseValue::from(name)).unwrap(),
                HostValue::Int(code)
            );
        }
    }

    #[test]
    fn test_double_accepts_text_and_float() {
        assert_eq!(
            Processor::Double.process(ResponseValue::from("2.5")).unwrap(),
            HostValue::Float(2.5)
        );
        assert_eq!(
            Processor::Double.process(ResponseValue::Float(0.25)).unwrap(),
            HostValue::Float(0.25)
        );
        let err = Processor::Double
            .process(ResponseValue::from("many"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnexpectedResponseType);
    }

    #[test]
    fn test_string_null_is_false() {
        assert_eq!(
            Processor::String.process(ResponseValue::Null).unwrap(),
            HostValue::Bool(false)
        );
    }

    #[test]
    fn test_bool_from_integer_reply() {
        assert_eq!(
            Processor::Bool.process(ResponseValue::Int(0)).unwrap(),
            HostValue::Bool(false)
        );
        assert_eq!(
            Processor::Bool.process(ResponseValue::Int(1)).unwrap(),
            HostValue::Bool(true)
        );
    }

    #[test]
    fn test_array_nulls_become_false() {
        let reply = ResponseValue::Array(vec![ResponseValue::from("a"), ResponseValue::Null]);
        assert_eq!(
            Processor::Array.process(reply).unwrap(),
            HostValue::Sequence(vec![HostValue::from("a"), HostValue::Bool(false)])
        );
    }

    #[test]
    fn test_assoc_accepts_both_protocol_shapes() {
        let map = ResponseValue::Map(vec![(ResponseValue::from("f"), ResponseValue::from("v"))]);
        let flat = ResponseValue::Array(vec![ResponseValue::from("f"), ResponseValue::from("v")]);
        assert_eq!(
            Processor::Assoc.process(map).unwrap(),
            Processor::Assoc.process(flat).unwrap()
        );
    }

    #[test]
    fn test_int_rejects_strings() {
        assert!(Processor::Int.process(ResponseValue::from("1")).is_err());
    }

    #[test]
    fn test_scan_kinds_pick_their_item_folding() {
        use crate::command::CommandKind;

        let reply = || {
            ResponseValue::Array(vec![
                ResponseValue::from("7"),
                ResponseValue::Array(vec![ResponseValue::from("m"), ResponseValue::from("1.5")]),
            ])
        };

        let mut scored = crate::response::Record::new();
        scored.insert("m", HostValue::from("1.5"));
        assert_eq!(
            CommandKind::ZScan.default_processor().process(reply()).unwrap(),
            HostValue::Sequence(vec![HostValue::from("7"), HostValue::Record(scored)])
        );
        assert_eq!(
            CommandKind::SScan.default_processor().process(reply()).unwrap(),
            HostValue::Sequence(vec![
                HostValue::from("7"),
                HostValue::Sequence(vec![HostValue::from("m"), HostValue::from("1.5")]),
            ])
        );
    }
}
