//! Reply values and their conversion into host values.
//!
//! The transport hands back a [`ResponseValue`] tree. Decoding consumes that
//! tree and produces a [`HostValue`], folding arrays and maps into sequences
//! or records depending on the requested [`AssociationMode`].

use std::collections::HashMap;
use std::fmt;

use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

use crate::response_error;

/// A reply as produced by the transport.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseValue {
    Null,
    Int(i64),
    Float(f64),
    Bool(bool),
    String(Vec<u8>),
    Ok,
    Array(Vec<ResponseValue>),
    Map(Vec<(ResponseValue, ResponseValue)>),
    Set(Vec<ResponseValue>),
    /// A server error carried inside an aggregate, e.g. one slot of a
    /// pipeline reply.
    Error(Vec<u8>),
}

impl ResponseValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            ResponseValue::Null => "null",
            ResponseValue::Int(_) => "int",
            ResponseValue::Float(_) => "float",
            ResponseValue::Bool(_) => "bool",
            ResponseValue::String(_) => "string",
            ResponseValue::Ok => "ok",
            ResponseValue::Array(_) => "array",
            ResponseValue::Map(_) => "map",
            ResponseValue::Set(_) => "set",
            ResponseValue::Error(_) => "error",
        }
    }
}

impl From<&str> for ResponseValue {
    fn from(value: &str) -> Self {
        ResponseValue::String(value.as_bytes().to_vec())
    }
}

impl From<i64> for ResponseValue {
    fn from(value: i64) -> Self {
        ResponseValue::Int(value)
    }
}

/// How collection replies fold into host collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssociationMode {
    /// Everything becomes a sequence; maps become alternating key, value.
    Flat,
    /// Map pairs with string keys become record entries.
    MapAsAssoc,
    /// A two element array is an `[id, fields]` stream entry.
    StreamAssoc,
    /// A flat array of alternating field, value folds into one record.
    ScanPairAssoc,
}

/// Key of a record entry: either a name or a positional index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RecordKey {
    Index(i64),
    Name(Vec<u8>),
}

impl RecordKey {
    pub fn name(&self) -> Option<&[u8]> {
        match self {
            RecordKey::Name(n) => Some(n),
            RecordKey::Index(_) => None,
        }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKey::Index(i) => write!(f, "{i}"),
            RecordKey::Name(n) => write!(f, "{}", String::from_utf8_lossy(n)),
        }
    }
}

/// An insertion-ordered associative collection. Re-inserting a name keeps
/// its original position and replaces the value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    entries: Vec<(RecordKey, HostValue)>,
    positions: HashMap<RecordKey, usize>,
    next_index: i64,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<Vec<u8>>, value: HostValue) {
        self.insert_key(RecordKey::Name(name.into()), value);
    }

    /// Appends a value under the next free positional index.
    pub fn push(&mut self, value: HostValue) {
        let key = RecordKey::Index(self.next_index);
        self.insert_key(key, value);
    }

    fn insert_key(&mut self, key: RecordKey, value: HostValue) {
        if let RecordKey::Index(i) = key {
            self.next_index = self.next_index.max(i + 1);
        }

        match self.positions.get(&key) {
            Some(&pos) => self.entries[pos].1 = value,
            None => {
                self.positions.insert(key.clone(), self.entries.len());
                self.entries.push((key, value));
            }
        }
    }

    pub fn get(&self, name: impl AsRef<[u8]>) -> Option<&HostValue> {
        let key = RecordKey::Name(name.as_ref().to_vec());
        self.positions.get(&key).map(|&pos| &self.entries[pos].1)
    }

    pub fn get_index(&self, index: i64) -> Option<&HostValue> {
        self.positions
            .get(&RecordKey::Index(index))
            .map(|&pos| &self.entries[pos].1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RecordKey, &HostValue)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    /// Only named entries, in insertion order.
    pub fn named(&self) -> impl Iterator<Item = (&[u8], &HostValue)> {
        self.entries
            .iter()
            .filter_map(|(k, v)| k.name().map(|n| (n, v)))
    }

    /// True when the keys are exactly `0..len` in order.
    pub fn is_list(&self) -> bool {
        self.entries
            .iter()
            .enumerate()
            .all(|(i, (k, _))| *k == RecordKey::Index(i as i64))
    }

    /// Collapses a purely positional record into a sequence.
    pub fn into_host(self) -> HostValue {
        if self.is_list() && !self.entries.is_empty() {
            HostValue::Sequence(self.entries.into_iter().map(|(_, v)| v).collect())
        } else {
            HostValue::Record(self)
        }
    }
}

impl IntoIterator for Record {
    type Item = (RecordKey, HostValue);
    type IntoIter = std::vec::IntoIter<(RecordKey, HostValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// A value handed back to the host binding.
#[derive(Debug, Clone, PartialEq)]
pub enum HostValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(Vec<u8>),
    Sequence(Vec<HostValue>),
    Record(Record),
}

impl HostValue {
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            HostValue::String(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            HostValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            HostValue::Record(r) => Some(r),
            _ => None,
        }
    }

    pub fn is_collection(&self) -> bool {
        matches!(self, HostValue::Sequence(_) | HostValue::Record(_))
    }

    /// Loose truthiness used when reading flags out of host records.
    pub fn is_truthy(&self) -> bool {
        match self {
            HostValue::Null => false,
            HostValue::Bool(b) => *b,
            HostValue::Int(i) => *i != 0,
            HostValue::Float(f) => *f != 0.0,
            HostValue::String(s) => !s.is_empty() && s.as_slice() != b"0",
            HostValue::Sequence(items) => !items.is_empty(),
            HostValue::Record(r) => !r.is_empty(),
        }
    }
}

impl From<&str> for HostValue {
    fn from(value: &str) -> Self {
        HostValue::String(value.as_bytes().to_vec())
    }
}

impl From<i64> for HostValue {
    fn from(value: i64) -> Self {
        HostValue::Int(value)
    }
}

impl From<bool> for HostValue {
    fn from(value: bool) -> Self {
        HostValue::Bool(value)
    }
}

impl fmt::Display for HostValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostValue::Null => write!(f, "NULL"),
            HostValue::Bool(b) => write!(f, "{b}"),
            HostValue::Int(i) => write!(f, "{i}"),
            HostValue::Float(d) => write!(f, "{d}"),
            HostValue::String(s) => write!(f, "\"{}\"", String::from_utf8_lossy(s)),
            HostValue::Sequence(items) => {
                let elements: Vec<String> = items.iter().map(|v| v.to_string()).collect();
                write!(f, "[{}]", elements.join(", "))
            }
            HostValue::Record(record) => {
                let elements: Vec<String> =
                    record.iter().map(|(k, v)| format!("{k}: {v}")).collect();
                write!(f, "{{{}}}", elements.join(", "))
            }
        }
    }
}

impl Serialize for HostValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            HostValue::Null => serializer.serialize_none(),
            HostValue::Bool(b) => serializer.serialize_bool(*b),
            HostValue::Int(i) => serializer.serialize_i64(*i),
            HostValue::Float(d) => serializer.serialize_f64(*d),
            HostValue::String(s) => serializer.serialize_str(&String::from_utf8_lossy(s)),
            HostValue::Sequence(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            HostValue::Record(record) => {
                let mut map = serializer.serialize_map(Some(record.len()))?;
                for (key, value) in record.iter() {
                    map.serialize_entry(&key.to_string(), value)?;
                }
                map.end()
            }
        }
    }
}

/// Decodes a reply; a null reply stays null.
pub fn decode(value: ResponseValue, mode: AssociationMode) -> crate::Result<HostValue> {
    decode_value(value, mode, false)
}

/// Decodes a reply; with `null_as_false` every null in the tree becomes
/// `false`.
pub fn decode_with(
    value: ResponseValue,
    mode: AssociationMode,
    null_as_false: bool,
) -> crate::Result<HostValue> {
    decode_value(value, mode, null_as_false)
}

fn decode_value(
    value: ResponseValue,
    mode: AssociationMode,
    null_as_false: bool,
) -> crate::Result<HostValue> {
    match value {
        ResponseValue::Null => {
            if null_as_false {
                Ok(HostValue::Bool(false))
            } else {
                Ok(HostValue::Null)
            }
        }
        ResponseValue::Int(i) => Ok(HostValue::Int(i)),
        ResponseValue::Float(f) => Ok(HostValue::Float(f)),
        ResponseValue::Bool(b) => Ok(HostValue::Bool(b)),
        ResponseValue::String(s) => Ok(HostValue::String(s)),
        ResponseValue::Ok => Ok(HostValue::Bool(true)),

        ResponseValue::Array(items) => match mode {
            AssociationMode::ScanPairAssoc => decode_scan_pairs(items, null_as_false),
            AssociationMode::StreamAssoc if items.len() == 2 => {
                decode_stream_pair(items, null_as_false)
            }
            _ => {
                let mut sequence = Vec::with_capacity(items.len());
                for child in items {
                    sequence.push(decode_value(child, mode, null_as_false)?);
                }
                Ok(HostValue::Sequence(sequence))
            }
        },

        ResponseValue::Map(pairs) => {
            if mode == AssociationMode::Flat {
                let mut sequence = Vec::with_capacity(pairs.len() * 2);
                for (key, value) in pairs {
                    sequence.push(decode_value(key, AssociationMode::Flat, null_as_false)?);
                    sequence.push(decode_value(value, AssociationMode::Flat, null_as_false)?);
                }
                return Ok(HostValue::Sequence(sequence));
            }

            let mut record = Record::new();
            for (key, value) in pairs {
                let key = decode_value(key, AssociationMode::Flat, null_as_false)?;
                let value = decode_value(value, AssociationMode::Flat, null_as_false)?;
                match key {
                    HostValue::String(name) => record.insert(name, value),
                    other => {
                        record.push(other);
                        record.push(value);
                    }
                }
            }
            Ok(record.into_host())
        }

        ResponseValue::Set(items) => Ok(HostValue::Sequence(
            items
                .into_iter()
                .filter_map(|child| match child {
                    ResponseValue::String(s) => Some(HostValue::String(s)),
                    _ => None,
                })
                .collect(),
        )),

        ResponseValue::Error(message) => {
            response_error!(format!(
                "server error in reply: {}",
                String::from_utf8_lossy(&message)
            ))
        }
    }
}

fn decode_scan_pairs(items: Vec<ResponseValue>, null_as_false: bool) -> crate::Result<HostValue> {
    let mut record = Record::new();
    let mut iter = items.into_iter();

    // a trailing unmatched field is dropped
    while let (Some(field), Some(value)) = (iter.next(), iter.next()) {
        let field = decode_value(field, AssociationMode::Flat, null_as_false)?;
        let value = decode_value(value, AssociationMode::Flat, null_as_false)?;
        if let HostValue::String(name) = field {
            record.insert(name, value);
        }
    }

    Ok(HostValue::Record(record))
}

/// `[field, value]` under StreamAssoc. A string field becomes one entry; two
/// collections merge their named entries; any other combination yields an
/// empty record.
fn decode_stream_pair(items: Vec<ResponseValue>, null_as_false: bool) -> crate::Result<HostValue> {
    let mut iter = items.into_iter();
    let (Some(field), Some(value)) = (iter.next(), iter.next()) else {
        return Ok(HostValue::Record(Record::new()));
    };

    let field = decode_value(field, AssociationMode::StreamAssoc, null_as_false)?;
    let value = decode_value(value, AssociationMode::StreamAssoc, null_as_false)?;

    let mut record = Record::new();
    match (field, value) {
        (HostValue::String(name), value) => record.insert(name, value),
        (field, value) if field.is_collection() && value.is_collection() => {
            merge_named(&mut record, field);
            merge_named(&mut record, value);
        }
        _ => {}
    }

    Ok(HostValue::Record(record))
}

fn merge_named(into: &mut Record, from: HostValue) {
    if let HostValue::Record(from) = from {
        for (key, value) in from {
            if let RecordKey::Name(name) = key {
                into.insert(name, value);
            }
        }
    }
}

/// One page of a cursor iteration.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanPage {
    /// Cursor for the next call; `0` once the iteration is complete.
    pub cursor: Vec<u8>,
    pub items: HostValue,
}

impl ScanPage {
    pub fn is_last(&self) -> bool {
        self.cursor == b"0"
    }

    /// Reads back the `[cursor, items]` pair produced by [`decode_scan`].
    pub fn from_host(value: HostValue) -> crate::Result<ScanPage> {
        let parts = match value {
            HostValue::Sequence(parts) => parts,
            other => {
                return response_error!(format!("scan page must be a sequence, got {other}"));
            }
        };
        let mut parts = parts.into_iter();
        match (parts.next(), parts.next(), parts.next()) {
            (Some(HostValue::String(cursor)), Some(items), None) => Ok(ScanPage { cursor, items }),
            _ => response_error!("scan page must be [cursor, items]"),
        }
    }
}

/// Decodes a `[cursor, items]` reply of the SCAN family into a two element
/// sequence. The cursor stays text; items fold under `mode`, so field/value
/// lists of HSCAN and ZSCAN become records under ScanPairAssoc.
pub fn decode_scan(value: ResponseValue, mode: AssociationMode) -> crate::Result<HostValue> {
    let parts = match value {
        ResponseValue::Array(parts) => parts,
        other => {
            return response_error!(format!(
                "scan expects [cursor, items], got {}",
                other.type_name()
            ));
        }
    };
    if parts.len() != 2 {
        return response_error!(format!(
            "scan expects [cursor, items], got {} element(s)",
            parts.len()
        ));
    }

    let mut parts = parts.into_iter();
    let (Some(cursor), Some(items)) = (parts.next(), parts.next()) else {
        return response_error!("scan expects [cursor, items]");
    };

    let cursor = match cursor {
        ResponseValue::String(cursor) => cursor,
        ResponseValue::Int(i) => crate::codec::render_int(i),
        other => {
            return response_error!(format!(
                "scan cursor must be a string, got {}",
                other.type_name()
            ));
        }
    };

    let items = match items {
        ResponseValue::Array(_) => decode(items, mode)?,
        ResponseValue::Set(_) => decode(items, AssociationMode::Flat)?,
        ResponseValue::Null => HostValue::Sequence(Vec::new()),
        other => {
            return response_error!(format!(
                "scan items must be an array, got {}",
                other.type_name()
            ));
        }
    };

    Ok(HostValue::Sequence(vec![HostValue::String(cursor), items]))
}

/// Decodes a stream range reply: a map of entry id to the entry's fields.
/// Each entry becomes one record of field to value under its id.
pub fn decode_stream(value: ResponseValue) -> crate::Result<HostValue> {
    let entries = match value {
        ResponseValue::Null => return Ok(HostValue::Record(Record::new())),
        ResponseValue::Map(entries) => entries,
        other => {
            return response_error!(format!(
                "stream range expects a map, got {}",
                other.type_name()
            ));
        }
    };

    let mut output = Record::new();
    for (id, fields) in entries {
        let ResponseValue::String(id) = id else {
            continue;
        };

        match fields {
            ResponseValue::Array(items) => {
                output.insert(id, HostValue::Record(stream_fields(items)?));
            }
            ResponseValue::Map(_) => {
                output.insert(id, decode_value(fields, AssociationMode::StreamAssoc, false)?);
            }
            _ => {}
        }
    }

    Ok(HostValue::Record(output))
}

/// Field data of one stream entry: either a list of `[field, value]` pairs
/// or one flat list of alternating field, value.
fn stream_fields(items: Vec<ResponseValue>) -> crate::Result<Record> {
    let nested = items
        .iter()
        .all(|item| matches!(item, ResponseValue::Array(pair) if pair.len() == 2));

    let pairs: Vec<ResponseValue> = if nested {
        items
            .into_iter()
            .flat_map(|item| match item {
                ResponseValue::Array(pair) => pair,
                _ => Vec::new(),
            })
            .collect()
    } else {
        items
    };

    match decode_scan_pairs(pairs, false)? {
        HostValue::Record(record) => Ok(record),
        _ => Ok(Record::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> ResponseValue {
        ResponseValue::from(v)
    }

    fn record(entries: &[(&str, HostValue)]) -> HostValue {
        let mut r = Record::new();
        for (k, v) in entries {
            r.insert(*k, v.clone());
        }
        HostValue::Record(r)
    }

    #[test]
    fn test_decode_scalars() {
        assert_eq!(decode(ResponseValue::Ok, AssociationMode::Flat).unwrap(), HostValue::Bool(true));
        assert_eq!(decode(ResponseValue::Null, AssociationMode::Flat).unwrap(), HostValue::Null);
        assert_eq!(
            decode_with(ResponseValue::Null, AssociationMode::Flat, true).unwrap(),
            HostValue::Bool(false)
        );
        assert_eq!(decode(s("x"), AssociationMode::Flat).unwrap(), HostValue::from("x"));
        assert_eq!(
            decode(ResponseValue::Float(1.5), AssociationMode::MapAsAssoc).unwrap(),
            HostValue::Float(1.5)
        );
    }

    /// Every ordering of `items`, by Heap's algorithm.
    fn permutations<T: Clone>(items: &mut [T], k: usize, out: &mut Vec<Vec<T>>) {
        if k <= 1 {
            out.push(items.to_vec());
            return;
        }
        permutations(items, k - 1, out);
        for i in 0..k - 1 {
            if k % 2 == 0 {
                items.swap(i, k - 1);
            } else {
                items.swap(0, k - 1);
            }
            permutations(items, k - 1, out);
        }
    }

    #[test]
    fn test_decode_flat_array_keeps_order() {
        let mut scalars = vec![
            (ResponseValue::Int(1), HostValue::Int(1)),
            (ResponseValue::Float(2.5), HostValue::Float(2.5)),
            (ResponseValue::Bool(false), HostValue::Bool(false)),
            (s("four"), HostValue::from("four")),
            (ResponseValue::Ok, HostValue::Bool(true)),
            (ResponseValue::Null, HostValue::Null),
        ];
        let len = scalars.len();
        let mut orders = Vec::new();
        permutations(&mut scalars, len, &mut orders);
        assert_eq!(orders.len(), 720);
        let distinct: std::collections::HashSet<String> =
            orders.iter().map(|o| format!("{o:?}")).collect();
        assert_eq!(distinct.len(), 720);

        for order in orders {
            let (reply, expected): (Vec<_>, Vec<_>) = order.into_iter().unzip();
            let nested = ResponseValue::Array(vec![ResponseValue::Array(reply.clone())]);

            assert_eq!(
                decode(ResponseValue::Array(reply), AssociationMode::Flat).unwrap(),
                HostValue::Sequence(expected.clone())
            );
            assert_eq!(
                decode(nested, AssociationMode::Flat).unwrap(),
                HostValue::Sequence(vec![HostValue::Sequence(expected)])
            );
        }
    }

    #[test]
    fn test_decode_scan_keeps_cursor_and_folds_pairs() {
        let reply = ResponseValue::Array(vec![
            s("48"),
            ResponseValue::Array(vec![s("f1"), s("v1"), s("f2"), s("v2")]),
        ]);
        let page = ScanPage::from_host(
            decode_scan(reply.clone(), AssociationMode::ScanPairAssoc).unwrap(),
        )
        .unwrap();
        assert_eq!(page.cursor, b"48".to_vec());
        assert!(!page.is_last());
        assert_eq!(
            page.items,
            record(&[("f1", "v1".into()), ("f2", "v2".into())])
        );

        let flat = ScanPage::from_host(decode_scan(reply, AssociationMode::Flat).unwrap()).unwrap();
        assert_eq!(
            flat.items,
            HostValue::Sequence(vec!["f1".into(), "v1".into(), "f2".into(), "v2".into()])
        );
    }

    #[test]
    fn test_decode_scan_last_page() {
        let reply = ResponseValue::Array(vec![s("0"), ResponseValue::Array(Vec::new())]);
        let page =
            ScanPage::from_host(decode_scan(reply, AssociationMode::Flat).unwrap()).unwrap();
        assert!(page.is_last());
        assert_eq!(page.items, HostValue::Sequence(Vec::new()));
    }

    #[test]
    fn test_decode_scan_rejects_other_shapes() {
        let bad = [
            s("0"),
            ResponseValue::Array(vec![s("0")]),
            ResponseValue::Array(vec![ResponseValue::Array(Vec::new()), ResponseValue::Array(Vec::new())]),
            ResponseValue::Array(vec![s("0"), ResponseValue::Int(3)]),
        ];
        for reply in bad {
            let err = decode_scan(reply, AssociationMode::Flat).unwrap_err();
            assert_eq!(err.kind(), crate::ErrorKind::UnexpectedResponseType);
        }
    }

    #[test]
    fn test_decode_map_depends_on_mode() {
        let value = ResponseValue::Map(vec![(s("f"), ResponseValue::Int(2))]);
        assert_eq!(
            decode(value.clone(), AssociationMode::MapAsAssoc).unwrap(),
            record(&[("f", HostValue::Int(2))])
        );
        assert_eq!(
            decode(value, AssociationMode::Flat).unwrap(),
            HostValue::Sequence(vec!["f".into(), HostValue::Int(2)])
        );
    }

    #[test]
    fn test_decode_map_with_non_string_keys() {
        let value = ResponseValue::Map(vec![
            (ResponseValue::Int(7), s("seven")),
            (s("name"), s("x")),
        ]);
        let host = decode(value, AssociationMode::MapAsAssoc).unwrap();
        let record = host.as_record().unwrap();
        assert_eq!(record.get_index(0), Some(&HostValue::Int(7)));
        assert_eq!(record.get_index(1), Some(&HostValue::from("seven")));
        assert_eq!(record.get("name"), Some(&HostValue::from("x")));
    }

    #[test]
    fn test_decode_scan_pairs_drops_trailing_field() {
        let value = ResponseValue::Array(vec![
            s("a"),
            ResponseValue::Int(1),
            s("b"),
            ResponseValue::Int(2),
            s("dangling"),
        ]);
        assert_eq!(
            decode(value, AssociationMode::ScanPairAssoc).unwrap(),
            record(&[("a", HostValue::Int(1)), ("b", HostValue::Int(2))])
        );
    }

    #[test]
    fn test_decode_scan_pairs_skips_non_string_fields() {
        let value = ResponseValue::Array(vec![
            ResponseValue::Int(9),
            s("lost"),
            s("kept"),
            ResponseValue::Int(1),
        ]);
        assert_eq!(
            decode(value, AssociationMode::ScanPairAssoc).unwrap(),
            record(&[("kept", HostValue::Int(1))])
        );
    }

    #[test]
    fn test_decode_set_keeps_strings_only() {
        let value = ResponseValue::Set(vec![s("a"), ResponseValue::Int(1), s("b")]);
        assert_eq!(
            decode(value, AssociationMode::Flat).unwrap(),
            HostValue::Sequence(vec!["a".into(), "b".into()])
        );
    }

    #[test]
    fn test_decode_error_slot_is_unexpected() {
        let err = decode(ResponseValue::Error(b"ERR".to_vec()), AssociationMode::Flat).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::UnexpectedResponseType);
    }

    #[test]
    fn test_stream_pair_with_string_field() {
        let value = ResponseValue::Array(vec![s("temp"), s("21")]);
        assert_eq!(
            decode(value, AssociationMode::StreamAssoc).unwrap(),
            record(&[("temp", "21".into())])
        );
    }

    #[test]
    fn test_stream_pair_merges_records() {
        let value = ResponseValue::Array(vec![
            ResponseValue::Map(vec![(s("a"), s("1"))]),
            ResponseValue::Map(vec![(s("b"), s("2"))]),
        ]);
        assert_eq!(
            decode(value, AssociationMode::StreamAssoc).unwrap(),
            record(&[("a", "1".into()), ("b", "2".into())])
        );
    }

    #[test]
    fn test_stream_pair_drops_unmatched_shapes() {
        // An integer field next to a scalar value matches neither rule, so
        // both are dropped and an empty record comes back.
        let value = ResponseValue::Array(vec![ResponseValue::Int(5), s("v")]);
        assert_eq!(
            decode(value, AssociationMode::StreamAssoc).unwrap(),
            HostValue::Record(Record::new())
        );

        let value = ResponseValue::Array(vec![
            ResponseValue::Map(vec![(s("a"), s("1"))]),
            s("scalar"),
        ]);
        assert_eq!(
            decode(value, AssociationMode::StreamAssoc).unwrap(),
            HostValue::Record(Record::new())
        );
    }

    #[test]
    fn test_decode_stream_nested_pairs() {
        let value = ResponseValue::Map(vec![(
            s("1-0"),
            ResponseValue::Array(vec![
                ResponseValue::Array(vec![s("temp"), s("21")]),
                ResponseValue::Array(vec![s("hum"), s("40")]),
            ]),
        )]);
        let expected = record(&[("1-0", record(&[("temp", "21".into()), ("hum", "40".into())]))]);
        assert_eq!(decode_stream(value).unwrap(), expected);
    }

    #[test]
    fn test_decode_stream_flat_pairs_and_maps() {
        let value = ResponseValue::Map(vec![
            (
                s("1-0"),
                ResponseValue::Array(vec![s("temp"), s("21"), s("hum"), s("40")]),
            ),
            (s("2-0"), ResponseValue::Map(vec![(s("temp"), s("22"))])),
            (ResponseValue::Int(3), ResponseValue::Array(vec![])),
        ]);
        let expected = record(&[
            ("1-0", record(&[("temp", "21".into()), ("hum", "40".into())])),
            ("2-0", record(&[("temp", "22".into())])),
        ]);
        assert_eq!(decode_stream(value).unwrap(), expected);
    }

    #[test]
    fn test_decode_stream_null_and_wrong_type() {
        assert_eq!(
            decode_stream(ResponseValue::Null).unwrap(),
            HostValue::Record(Record::new())
        );
        assert!(decode_stream(ResponseValue::Int(1)).is_err());
    }

    #[test]
    fn test_record_reinsert_keeps_position() {
        let mut r = Record::new();
        r.insert("a", HostValue::Int(1));
        r.insert("b", HostValue::Int(2));
        r.insert("a", HostValue::Int(3));
        let keys: Vec<String> = r.iter().map(|(k, _)| k.to_string()).collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(r.get("a"), Some(&HostValue::Int(3)));
    }

    #[test]
    fn test_host_value_serializes_to_json() {
        let mut r = Record::new();
        r.insert("name", "x".into());
        r.insert("tags", HostValue::Sequence(vec![HostValue::Int(1), HostValue::Null]));
        let json = serde_json::to_string(&HostValue::Record(r)).unwrap();
        assert_eq!(json, r#"{"name":"x","tags":[1,null]}"#);
    }
}
