//! Wire argument preparation.
//!
//! [`build`] looks up the shape of a command kind and lets the matching
//! grammar render the flat list of byte strings the command needs. Caller
//! bytes are borrowed, rendered numbers are owned by the [`WireArgs`] value
//! and freed with it.

mod bits;
mod expire;
mod geo;
mod scan;
mod sets;
mod strings;
mod zset;

use std::borrow::Cow;

use crate::codec::{render_float, render_int};
use crate::command::{Arg, Command, CommandKind, Scalar};
use crate::argument_error;

/// Ordered wire arguments of one command.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WireArgs<'a> {
    args: Vec<Cow<'a, [u8]>>,
}

impl<'a> WireArgs<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        WireArgs {
            args: Vec::with_capacity(capacity),
        }
    }

    pub fn push_borrowed(&mut self, bytes: &'a [u8]) {
        self.args.push(Cow::Borrowed(bytes));
    }

    pub fn push_owned(&mut self, bytes: Vec<u8>) {
        self.args.push(Cow::Owned(bytes));
    }

    pub fn push_token(&mut self, token: &'static str) {
        self.args.push(Cow::Borrowed(token.as_bytes()));
    }

    pub(crate) fn push_cow(&mut self, value: Cow<'a, [u8]>) {
        self.args.push(value);
    }

    pub fn push_int(&mut self, value: i64) {
        self.push_owned(render_int(value));
    }

    pub fn push_float(&mut self, value: f64) {
        self.push_owned(render_float(value));
    }

    pub fn push_scalar(&mut self, scalar: &'a Scalar) {
        match scalar {
            Scalar::Bytes(b) => self.push_borrowed(b),
            other => {
                if let Some(rendered) = other.render() {
                    self.push_owned(rendered);
                }
            }
        }
    }

    /// Pushes one positional argument, flattening collections.
    pub fn push_arg(&mut self, arg: &'a Arg) {
        match arg {
            Arg::Str(b) => self.push_borrowed(b),
            Arg::Int(i) => self.push_int(*i),
            Arg::Float(f) => self.push_float(*f),
            Arg::Array(items) => items.iter().for_each(|s| self.push_scalar(s)),
            Arg::MultiString(items) => items.iter().for_each(|b| self.push_borrowed(b)),
            Arg::Pairs(pairs) => {
                for (k, v) in pairs {
                    self.push_scalar(k);
                    self.push_scalar(v);
                }
            }
        }
    }

    pub fn push_args(&mut self, args: &'a [Arg]) {
        args.iter().for_each(|a| self.push_arg(a));
    }

    /// Moves every argument of `other` onto the end of `self`.
    pub fn append(&mut self, other: WireArgs<'a>) {
        self.args.extend(other.args);
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&[u8]> {
        self.args.get(index).map(|a| a.as_ref())
    }

    pub fn iter(&self) -> impl Iterator<Item = &[u8]> {
        self.args.iter().map(|a| a.as_ref())
    }

    pub fn as_slices(&self) -> Vec<&[u8]> {
        self.iter().collect()
    }

    /// Number of buffers this value allocated itself.
    pub fn allocated(&self) -> usize {
        self.args
            .iter()
            .filter(|a| matches!(a, Cow::Owned(_)))
            .count()
    }

    /// Deep copy that no longer borrows from the command.
    pub fn to_owned_args(&self) -> Vec<Vec<u8>> {
        self.args.iter().map(|a| a.to_vec()).collect()
    }
}

/// Argument layouts shared by families of commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    ZeroArg,
    KeyOnly,
    KeyValue,
    KeyValuePairs,
    MultiKey,
    /// Either one key plus extras, or a multi-key array.
    KeyOrMultiKey,
    Message,
    BitOperation,
    Expire,
    Range,
    GeoAdd,
    GeoDist,
    GeoMembers,
    GeoSearch,
    GeoSearchStore,
    ZAdd,
    ZRange,
    ZRangeStore,
    ZStore,
    SetStore,
    /// Cursor iteration with MATCH/COUNT/TYPE.
    Scan,
}

impl Shape {
    /// The shape of a command kind, or `None` when the kind cannot be
    /// carried as a plain request.
    pub fn of(kind: CommandKind) -> Option<Shape> {
        use CommandKind as K;
        use crate::command::{ClientSubcommand as Cl, ConfigSubcommand as Co};

        let shape = match kind {
            K::RandomKey
            | K::Unwatch
            | K::DbSize
            | K::Time
            | K::Role
            | K::LastSave
            | K::Config(Co::ResetStat | Co::Rewrite)
            | K::Client(Cl::Id | Cl::GetName | Cl::Info) => Shape::ZeroArg,

            K::Get
            | K::GetDel
            | K::Strlen
            | K::Incr
            | K::Decr
            | K::Type
            | K::Dump
            | K::Persist
            | K::Ttl
            | K::PTtl
            | K::ExpireTime
            | K::PExpireTime
            | K::Object(_)
            | K::ZCard
            | K::SMembers
            | K::SCard
            | K::HGetAll
            | K::XLen => Shape::KeyOnly,

            K::Set
            | K::GetEx
            | K::SetNx
            | K::GetSet
            | K::Append
            | K::IncrBy
            | K::DecrBy
            | K::IncrByFloat
            | K::SetRange
            | K::Lcs
            | K::Rename
            | K::RenameNx
            | K::Copy
            | K::Move
            | K::PfAdd
            | K::PfMerge
            | K::ZScore
            | K::SAdd
            | K::SRem
            | K::SIsMember
            | K::SMove
            | K::HSet
            | K::HGet
            | K::XAdd => Shape::KeyValue,

            K::MSet | K::MSetNx | K::Config(Co::Set) => Shape::KeyValuePairs,

            K::MGet | K::Watch => Shape::MultiKey,

            K::Del | K::Unlink | K::Exists | K::Touch | K::PfCount => Shape::KeyOrMultiKey,

            K::Ping
            | K::Echo
            | K::FlushDb
            | K::FlushAll
            | K::Info
            | K::Select
            | K::Wait
            | K::Keys
            | K::Config(Co::Get)
            | K::Client(Cl::SetName | Cl::List) => Shape::Message,

            K::BitCount | K::BitPos | K::GetBit | K::SetBit | K::BitOp => Shape::BitOperation,

            K::Expire | K::PExpire | K::ExpireAt | K::PExpireAt => Shape::Expire,

            K::GetRange | K::XRange | K::XRevRange => Shape::Range,

            K::GeoAdd => Shape::GeoAdd,
            K::GeoDist => Shape::GeoDist,
            K::GeoHash | K::GeoPos => Shape::GeoMembers,
            K::GeoSearch => Shape::GeoSearch,
            K::GeoSearchStore => Shape::GeoSearchStore,

            K::ZAdd => Shape::ZAdd,
            K::ZRange => Shape::ZRange,
            K::ZRangeStore => Shape::ZRangeStore,
            K::ZUnionStore | K::ZInterStore | K::ZDiffStore => Shape::ZStore,

            K::SInterStore | K::SUnionStore | K::SDiffStore => Shape::SetStore,

            K::Scan | K::HScan | K::SScan | K::ZScan => Shape::Scan,

            K::Subscribe | K::PSubscribe | K::Monitor | K::Sync => return None,
        };

        Some(shape)
    }
}

/// Renders the wire arguments of a command.
///
/// # Arguments
/// * `command` - The command to render; its byte strings are borrowed
///
/// # Returns
/// * `Ok(WireArgs)` - Arguments in protocol order, without the command name
/// * `Err(Error)` - ArgumentError for missing or malformed input, including
///   kinds that have no shape
pub fn build(command: &Command) -> crate::Result<WireArgs<'_>> {
    let Some(shape) = Shape::of(command.kind) else {
        return argument_error!(format!("UnsupportedCommand: {}", command.kind));
    };

    match shape {
        Shape::ZeroArg => Ok(WireArgs::new()),
        Shape::KeyOnly => strings::key_only(command),
        Shape::KeyValue => strings::key_value(command),
        Shape::KeyValuePairs => strings::key_value_pairs(command),
        Shape::MultiKey => strings::multi_key(command),
        Shape::KeyOrMultiKey => strings::key_or_multi_key(command),
        Shape::Message => strings::message(command),
        Shape::Range => strings::range(command),
        Shape::BitOperation => bits::build(command),
        Shape::Expire => expire::build(command),
        Shape::GeoAdd => geo::add(command),
        Shape::GeoDist => geo::dist(command),
        Shape::GeoMembers => geo::members(command),
        Shape::GeoSearch => geo::search(command),
        Shape::GeoSearchStore => geo::search_store(command),
        Shape::ZAdd => zset::add(command),
        Shape::ZRange => zset::range(command),
        Shape::ZRangeStore => zset::range_store(command),
        Shape::ZStore => zset::store(command),
        Shape::SetStore => sets::store(command),
        Shape::Scan => scan::build(command),
    }
}

/// The primary key; every keyed grammar refuses a missing or empty one.
pub(crate) fn require_key(command: &Command) -> crate::Result<&[u8]> {
    match command.key.as_deref() {
        Some(key) if !key.is_empty() => Ok(key),
        _ => argument_error!(format!("{} needs a non-empty key", command.kind)),
    }
}

/// Positional argument `index` as a single wire value; collections are
/// refused.
pub(crate) fn scalar_arg<'a>(
    command: &'a Command,
    index: usize,
    what: &str,
) -> crate::Result<Cow<'a, [u8]>> {
    match command.args.get(index) {
        Some(Arg::Str(b)) => Ok(Cow::Borrowed(b)),
        Some(Arg::Int(i)) => Ok(Cow::Owned(render_int(*i))),
        Some(Arg::Float(f)) => Ok(Cow::Owned(render_float(*f))),
        Some(_) => argument_error!(format!("{}: {what} must be a scalar", command.kind)),
        None => argument_error!(format!("{}: missing {what}", command.kind)),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Wire arguments as strings, for readable assertions.
    pub(crate) fn wire(command: &Command) -> Vec<String> {
        build(command)
            .unwrap()
            .iter()
            .map(|a| String::from_utf8_lossy(a).into_owned())
            .collect()
    }

    #[test]
    fn test_unsupported_kind() {
        let err = build(&Command::new(CommandKind::Subscribe).arg("ch")).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Argument);
        assert!(err.to_string().contains("UnsupportedCommand"));
    }

    #[test]
    fn test_zero_arg_ignores_input() {
        assert!(wire(&Command::new(CommandKind::DbSize)).is_empty());
    }

    #[test]
    fn test_borrowed_and_owned_tracking() {
        let cmd = Command::new(CommandKind::Set)
            .key("k")
            .arg("v")
            .options(crate::Options {
                expiry: crate::Expiry::seconds(30),
                ..Default::default()
            });
        let args = build(&cmd).unwrap();
        assert_eq!(args.len(), 4);
        // only the rendered "30" is owned
        assert_eq!(args.allocated(), 1);
        assert_eq!(args.to_owned_args()[3], b"30".to_vec());
    }

    #[test]
    fn test_every_shaped_kind_has_a_name() {
        for kind in CommandKind::PLAIN {
            if Shape::of(kind).is_some() {
                assert!(!kind.name().is_empty());
            }
        }
    }
}
