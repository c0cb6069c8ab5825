//! Typed command values.
//!
//! A `Command` is what a caller hands to the dispatcher: the operation, its
//! primary key, positional arguments and a sparse set of option flags. It is
//! consumed by the argument builder which turns it into wire arguments.

use std::fmt;
use std::str::FromStr;

use crate::codec::{render_bool, render_float, render_int};
use crate::processor::Processor;
use crate::response::{AssociationMode, HostValue};
use crate::route::Route;
use crate::{Error, Inner, argument_error};

/// Sub-operations of `OBJECT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectSubcommand {
    Encoding,
    Freq,
    IdleTime,
    RefCount,
}

/// Sub-operations of `CONFIG`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigSubcommand {
    Get,
    Set,
    ResetStat,
    Rewrite,
}

/// Sub-operations of `CLIENT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientSubcommand {
    Id,
    GetName,
    SetName,
    List,
    Info,
}

impl ObjectSubcommand {
    pub const ALL: [ObjectSubcommand; 4] = [
        ObjectSubcommand::Encoding,
        ObjectSubcommand::Freq,
        ObjectSubcommand::IdleTime,
        ObjectSubcommand::RefCount,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectSubcommand::Encoding => "ENCODING",
            ObjectSubcommand::Freq => "FREQ",
            ObjectSubcommand::IdleTime => "IDLETIME",
            ObjectSubcommand::RefCount => "REFCOUNT",
        }
    }
}

impl ConfigSubcommand {
    pub const ALL: [ConfigSubcommand; 4] = [
        ConfigSubcommand::Get,
        ConfigSubcommand::Set,
        ConfigSubcommand::ResetStat,
        ConfigSubcommand::Rewrite,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigSubcommand::Get => "GET",
            ConfigSubcommand::Set => "SET",
            ConfigSubcommand::ResetStat => "RESETSTAT",
            ConfigSubcommand::Rewrite => "REWRITE",
        }
    }
}

impl ClientSubcommand {
    pub const ALL: [ClientSubcommand; 5] = [
        ClientSubcommand::Id,
        ClientSubcommand::GetName,
        ClientSubcommand::SetName,
        ClientSubcommand::List,
        ClientSubcommand::Info,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ClientSubcommand::Id => "ID",
            ClientSubcommand::GetName => "GETNAME",
            ClientSubcommand::SetName => "SETNAME",
            ClientSubcommand::List => "LIST",
            ClientSubcommand::Info => "INFO",
        }
    }
}

macro_rules! subcommand_from_str {
    ($ty:ty, $family:literal) => {
        impl FromStr for $ty {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                for sub in <$ty>::ALL {
                    if sub.as_str().eq_ignore_ascii_case(s) {
                        return Ok(sub);
                    }
                }
                argument_error!(format!("unknown {} subcommand `{s}`", $family))
            }
        }
    };
}

subcommand_from_str!(ObjectSubcommand, "OBJECT");
subcommand_from_str!(ConfigSubcommand, "CONFIG");
subcommand_from_str!(ClientSubcommand, "CLIENT");

/// Every operation the dispatcher knows by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    // Strings
    Get,
    GetDel,
    GetEx,
    Set,
    SetNx,
    GetSet,
    Append,
    Strlen,
    Incr,
    Decr,
    IncrBy,
    DecrBy,
    IncrByFloat,
    MSet,
    MSetNx,
    MGet,
    GetRange,
    SetRange,
    Lcs,

    // Keyspace
    Del,
    Unlink,
    Exists,
    Touch,
    Type,
    Rename,
    RenameNx,
    Copy,
    Move,
    Dump,
    Persist,
    Ttl,
    PTtl,
    ExpireTime,
    PExpireTime,
    RandomKey,
    Keys,
    Watch,
    Unwatch,

    // Cursor iteration
    Scan,
    HScan,
    SScan,
    ZScan,

    // Expiry
    Expire,
    PExpire,
    ExpireAt,
    PExpireAt,

    // Bits
    BitCount,
    BitPos,
    GetBit,
    SetBit,
    BitOp,

    // HyperLogLog
    PfAdd,
    PfCount,
    PfMerge,

    // Server
    Ping,
    Echo,
    DbSize,
    FlushDb,
    FlushAll,
    Time,
    Role,
    Info,
    Select,
    Wait,
    LastSave,
    Object(ObjectSubcommand),
    Config(ConfigSubcommand),
    Client(ClientSubcommand),

    // Geo
    GeoAdd,
    GeoDist,
    GeoHash,
    GeoPos,
    GeoSearch,
    GeoSearchStore,

    // Sorted sets
    ZAdd,
    ZCard,
    ZScore,
    ZRange,
    ZRangeStore,
    ZUnionStore,
    ZInterStore,
    ZDiffStore,

    // Sets
    SAdd,
    SRem,
    SMembers,
    SCard,
    SIsMember,
    SMove,
    SInterStore,
    SUnionStore,
    SDiffStore,

    // Hashes
    HSet,
    HGet,
    HGetAll,

    // Streams
    XAdd,
    XLen,
    XRange,
    XRevRange,

    // Connection-hijacking commands, never carried through the builder
    Subscribe,
    PSubscribe,
    Monitor,
    Sync,
}

impl CommandKind {
    /// Kinds that are not parameterized by a subcommand.
    pub const PLAIN: [CommandKind; 99] = [
        CommandKind::Get,
        CommandKind::GetDel,
        CommandKind::GetEx,
        CommandKind::Set,
        CommandKind::SetNx,
        CommandKind::GetSet,
        CommandKind::Append,
        CommandKind::Strlen,
        CommandKind::Incr,
        CommandKind::Decr,
        CommandKind::IncrBy,
        CommandKind::DecrBy,
        CommandKind::IncrByFloat,
        CommandKind::MSet,
        CommandKind::MSetNx,
        CommandKind::MGet,
        CommandKind::GetRange,
        CommandKind::SetRange,
        CommandKind::Lcs,
        CommandKind::Del,
        CommandKind::Unlink,
        CommandKind::Exists,
        CommandKind::Touch,
        CommandKind::Type,
        CommandKind::Rename,
        CommandKind::RenameNx,
        CommandKind::Copy,
        CommandKind::Move,
        CommandKind::Dump,
        CommandKind::Persist,
        CommandKind::Ttl,
        CommandKind::PTtl,
        CommandKind::ExpireTime,
        CommandKind::PExpireTime,
        CommandKind::RandomKey,
        CommandKind::Keys,
        CommandKind::Watch,
        CommandKind::Unwatch,
        CommandKind::Scan,
        CommandKind::HScan,
        CommandKind::SScan,
        CommandKind::ZScan,
        CommandKind::Expire,
        CommandKind::PExpire,
        CommandKind::ExpireAt,
        CommandKind::PExpireAt,
        CommandKind::BitCount,
        CommandKind::BitPos,
        CommandKind::GetBit,
        CommandKind::SetBit,
        CommandKind::BitOp,
        CommandKind::PfAdd,
        CommandKind::PfCount,
        CommandKind::PfMerge,
        CommandKind::Ping,
        CommandKind::Echo,
        CommandKind::DbSize,
        CommandKind::FlushDb,
        CommandKind::FlushAll,
        CommandKind::Time,
        CommandKind::Role,
        CommandKind::Info,
        CommandKind::Select,
        CommandKind::Wait,
        CommandKind::LastSave,
        CommandKind::GeoAdd,
        CommandKind::GeoDist,
        CommandKind::GeoHash,
        CommandKind::GeoPos,
        CommandKind::GeoSearch,
        CommandKind::GeoSearchStore,
        CommandKind::ZAdd,
        CommandKind::ZCard,
        CommandKind::ZScore,
        CommandKind::ZRange,
        CommandKind::ZRangeStore,
        CommandKind::ZUnionStore,
        CommandKind::ZInterStore,
        CommandKind::ZDiffStore,
        CommandKind::SAdd,
        CommandKind::SRem,
        CommandKind::SMembers,
        CommandKind::SCard,
        CommandKind::SIsMember,
        CommandKind::SMove,
        CommandKind::SInterStore,
        CommandKind::SUnionStore,
        CommandKind::SDiffStore,
        CommandKind::HSet,
        CommandKind::HGet,
        CommandKind::HGetAll,
        CommandKind::XAdd,
        CommandKind::XLen,
        CommandKind::XRange,
        CommandKind::XRevRange,
        CommandKind::Subscribe,
        CommandKind::PSubscribe,
        CommandKind::Monitor,
        CommandKind::Sync,
    ];

    /// The protocol name; subcommand kinds carry both words.
    pub fn name(&self) -> &'static str {
        match self {
            CommandKind::Get => "GET",
            CommandKind::GetDel => "GETDEL",
            CommandKind::GetEx => "GETEX",
            CommandKind::Set => "SET",
            CommandKind::SetNx => "SETNX",
            CommandKind::GetSet => "GETSET",
            CommandKind::Append => "APPEND",
            CommandKind::Strlen => "STRLEN",
            CommandKind::Incr => "INCR",
            CommandKind::Decr => "DECR",
            CommandKind::IncrBy => "INCRBY",
            CommandKind::DecrBy => "DECRBY",
            CommandKind::IncrByFloat => "INCRBYFLOAT",
            CommandKind::MSet => "MSET",
            CommandKind::MSetNx => "MSETNX",
            CommandKind::MGet => "MGET",
            CommandKind::GetRange => "GETRANGE",
            CommandKind::SetRange => "SETRANGE",
            CommandKind::Lcs => "LCS",
            CommandKind::Del => "DEL",
            CommandKind::Unlink => "UNLINK",
            CommandKind::Exists => "EXISTS",
            CommandKind::Touch => "TOUCH",
            CommandKind::Type => "TYPE",
            CommandKind::Rename => "RENAME",
            CommandKind::RenameNx => "RENAMENX",
            CommandKind::Copy => "COPY",
            CommandKind::Move => "MOVE",
            CommandKind::Dump => "DUMP",
            CommandKind::Persist => "PERSIST",
            CommandKind::Ttl => "TTL",
            CommandKind::PTtl => "PTTL",
            CommandKind::ExpireTime => "EXPIRETIME",
            CommandKind::PExpireTime => "PEXPIRETIME",
            CommandKind::RandomKey => "RANDOMKEY",
            CommandKind::Keys => "KEYS",
            CommandKind::Watch => "WATCH",
            CommandKind::Unwatch => "UNWATCH",
            CommandKind::Scan => "SCAN",
            CommandKind::HScan => "HSCAN",
            CommandKind::SScan => "SSCAN",
            CommandKind::ZScan => "ZSCAN",
            CommandKind::Expire => "EXPIRE",
            CommandKind::PExpire => "PEXPIRE",
            CommandKind::ExpireAt => "EXPIREAT",
            CommandKind::PExpireAt => "PEXPIREAT",
            CommandKind::BitCount => "BITCOUNT",
            CommandKind::BitPos => "BITPOS",
            CommandKind::GetBit => "GETBIT",
            CommandKind::SetBit => "SETBIT",
            CommandKind::BitOp => "BITOP",
            CommandKind::PfAdd => "PFADD",
            CommandKind::PfCount => "PFCOUNT",
            CommandKind::PfMerge => "PFMERGE",
            CommandKind::Ping => "PING",
            CommandKind::Echo => "ECHO",
            CommandKind::DbSize => "DBSIZE",
            CommandKind::FlushDb => "FLUSHDB",
            CommandKind::FlushAll => "FLUSHALL",
            CommandKind::Time => "TIME",
            CommandKind::Role => "ROLE",
            CommandKind::Info => "INFO",
            CommandKind::Select => "SELECT",
            CommandKind::Wait => "WAIT",
            CommandKind::LastSave => "LASTSAVE",
            CommandKind::Object(sub) => match sub {
                ObjectSubcommand::Encoding => "OBJECT ENCODING",
                ObjectSubcommand::Freq => "OBJECT FREQ",
                ObjectSubcommand::IdleTime => "OBJECT IDLETIME",
                ObjectSubcommand::RefCount => "OBJECT REFCOUNT",
            },
            CommandKind::Config(sub) => match sub {
                ConfigSubcommand::Get => "CONFIG GET",
                ConfigSubcommand::Set => "CONFIG SET",
                ConfigSubcommand::ResetStat => "CONFIG RESETSTAT",
                ConfigSubcommand::Rewrite => "CONFIG REWRITE",
            },
            CommandKind::Client(sub) => match sub {
                ClientSubcommand::Id => "CLIENT ID",
                ClientSubcommand::GetName => "CLIENT GETNAME",
                ClientSubcommand::SetName => "CLIENT SETNAME",
                ClientSubcommand::List => "CLIENT LIST",
                ClientSubcommand::Info => "CLIENT INFO",
            },
            CommandKind::GeoAdd => "GEOADD",
            CommandKind::GeoDist => "GEODIST",
            CommandKind::GeoHash => "GEOHASH",
            CommandKind::GeoPos => "GEOPOS",
            CommandKind::GeoSearch => "GEOSEARCH",
            CommandKind::GeoSearchStore => "GEOSEARCHSTORE",
            CommandKind::ZAdd => "ZADD",
            CommandKind::ZCard => "ZCARD",
            CommandKind::ZScore => "ZSCORE",
            CommandKind::ZRange => "ZRANGE",
            CommandKind::ZRangeStore => "ZRANGESTORE",
            CommandKind::ZUnionStore => "ZUNIONSTORE",
            CommandKind::ZInterStore => "ZINTERSTORE",
            CommandKind::ZDiffStore => "ZDIFFSTORE",
            CommandKind::SAdd => "SADD",
            CommandKind::SRem => "SREM",
            CommandKind::SMembers => "SMEMBERS",
            CommandKind::SCard => "SCARD",
            CommandKind::SIsMember => "SISMEMBER",
            CommandKind::SMove => "SMOVE",
            CommandKind::SInterStore => "SINTERSTORE",
            CommandKind::SUnionStore => "SUNIONSTORE",
            CommandKind::SDiffStore => "SDIFFSTORE",
            CommandKind::HSet => "HSET",
            CommandKind::HGet => "HGET",
            CommandKind::HGetAll => "HGETALL",
            CommandKind::XAdd => "XADD",
            CommandKind::XLen => "XLEN",
            CommandKind::XRange => "XRANGE",
            CommandKind::XRevRange => "XREVRANGE",
            CommandKind::Subscribe => "SUBSCRIBE",
            CommandKind::PSubscribe => "PSUBSCRIBE",
            CommandKind::Monitor => "MONITOR",
            CommandKind::Sync => "SYNC",
        }
    }

    /// Name tokens as sent on the wire: one word, or family plus subcommand.
    pub fn name_tokens(&self) -> impl Iterator<Item = &'static str> {
        self.name().split(' ')
    }

    /// The processor used when a command does not pick one itself.
    pub fn default_processor(&self) -> Processor {
        match self {
            CommandKind::Get
            | CommandKind::GetDel
            | CommandKind::GetEx
            | CommandKind::GetSet
            | CommandKind::GetRange
            | CommandKind::Lcs
            | CommandKind::Dump
            | CommandKind::RandomKey
            | CommandKind::Ping
            | CommandKind::Echo
            | CommandKind::Info
            | CommandKind::HGet
            | CommandKind::XAdd => Processor::String,

            CommandKind::Set
            | CommandKind::MSet
            | CommandKind::Rename
            | CommandKind::Watch
            | CommandKind::Unwatch
            | CommandKind::PfMerge
            | CommandKind::FlushDb
            | CommandKind::FlushAll
            | CommandKind::Select => Processor::Ok,

            CommandKind::SetNx
            | CommandKind::MSetNx
            | CommandKind::RenameNx
            | CommandKind::Copy
            | CommandKind::Move
            | CommandKind::Persist
            | CommandKind::Expire
            | CommandKind::PExpire
            | CommandKind::ExpireAt
            | CommandKind::PExpireAt
            | CommandKind::PfAdd
            | CommandKind::SIsMember
            | CommandKind::SMove => Processor::Bool,

            CommandKind::IncrByFloat | CommandKind::GeoDist | CommandKind::ZScore => {
                Processor::Double
            }

            CommandKind::MGet
            | CommandKind::Keys
            | CommandKind::Time
            | CommandKind::Role
            | CommandKind::GeoHash
            | CommandKind::GeoPos
            | CommandKind::GeoSearch
            | CommandKind::ZRange
            | CommandKind::SMembers => Processor::Array,

            CommandKind::HGetAll => Processor::Assoc,
            CommandKind::XRange | CommandKind::XRevRange => Processor::Stream,
            CommandKind::Type => Processor::Type,

            CommandKind::Scan | CommandKind::SScan => Processor::Scan(AssociationMode::Flat),
            CommandKind::HScan | CommandKind::ZScan => {
                Processor::Scan(AssociationMode::ScanPairAssoc)
            }

            CommandKind::Object(ObjectSubcommand::Encoding) => Processor::String,
            CommandKind::Object(_) => Processor::Int,
            CommandKind::Config(ConfigSubcommand::Get) => Processor::Assoc,
            CommandKind::Config(_) => Processor::Ok,
            CommandKind::Client(ClientSubcommand::Id) => Processor::Int,
            CommandKind::Client(ClientSubcommand::SetName) => Processor::Ok,
            CommandKind::Client(_) => Processor::String,

            CommandKind::Subscribe
            | CommandKind::PSubscribe
            | CommandKind::Monitor
            | CommandKind::Sync => Processor::Raw(AssociationMode::Flat),

            _ => Processor::Int,
        }
    }

    /// Every kind, subcommands expanded.
    pub fn all() -> impl Iterator<Item = CommandKind> {
        let subcommands = ObjectSubcommand::ALL
            .into_iter()
            .map(CommandKind::Object)
            .chain(ConfigSubcommand::ALL.into_iter().map(CommandKind::Config))
            .chain(ClientSubcommand::ALL.into_iter().map(CommandKind::Client));

        CommandKind::PLAIN.into_iter().chain(subcommands)
    }

    /// Whether the name is a family that needs a second word.
    pub fn is_family(word: &str) -> bool {
        ["OBJECT", "CONFIG", "CLIENT"]
            .iter()
            .any(|f| f.eq_ignore_ascii_case(word))
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for CommandKind {
    type Err = Error;

    /// Accepts names in any case; families take the subcommand after a space,
    /// e.g. `object encoding`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let words: Vec<&str> = s.split_whitespace().collect();
        let wanted = words.join(" ");
        for kind in CommandKind::all() {
            if kind.name().eq_ignore_ascii_case(&wanted) {
                return Ok(kind);
            }
        }
        argument_error!(format!("unknown command `{s}`"))
    }
}

/// A single scalar inside an array argument.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Bytes(Vec<u8>),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl Scalar {
    /// Wire text of a numeric or boolean scalar. Byte strings are passed
    /// through by the builder without a copy, so they return `None`.
    pub fn render(&self) -> Option<Vec<u8>> {
        match self {
            Scalar::Bytes(_) => None,
            Scalar::Int(i) => Some(render_int(*i)),
            Scalar::Float(f) => Some(render_float(*f)),
            Scalar::Bool(b) => Some(render_bool(*b)),
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Scalar::Bytes(b) => Some(b),
            _ => None,
        }
    }
}

/// One positional argument of a command.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Str(Vec<u8>),
    Int(i64),
    Float(f64),
    /// Flattened element-wise on the wire.
    Array(Vec<Scalar>),
    MultiString(Vec<Vec<u8>>),
    /// Associative input such as `{field: value}`; flattened pair-wise.
    Pairs(Vec<(Scalar, Scalar)>),
}

impl Arg {
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Arg::Str(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Arg::Int(i) => Some(*i),
            _ => None,
        }
    }
}

macro_rules! impl_from_bytes {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Scalar {
                fn from(value: $ty) -> Self {
                    Scalar::Bytes(value.into())
                }
            }

            impl From<$ty> for Arg {
                fn from(value: $ty) -> Self {
                    Arg::Str(value.into())
                }
            }
        )*
    };
}

impl_from_bytes!(&str, String, Vec<u8>, &[u8]);

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Int(value)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Float(value)
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Bool(value)
    }
}

impl From<i64> for Arg {
    fn from(value: i64) -> Self {
        Arg::Int(value)
    }
}

impl From<f64> for Arg {
    fn from(value: f64) -> Self {
        Arg::Float(value)
    }
}

impl From<Vec<Scalar>> for Arg {
    fn from(value: Vec<Scalar>) -> Self {
        Arg::Array(value)
    }
}

/// Key expiry. Only the highest-precedence field that is set is emitted:
/// PXAT, then EXAT, then PX, then EX.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Expiry {
    pub ex: Option<i64>,
    pub px: Option<i64>,
    pub exat: Option<i64>,
    pub pxat: Option<i64>,
}

impl Expiry {
    pub fn seconds(value: i64) -> Self {
        Expiry {
            ex: Some(value),
            ..Default::default()
        }
    }

    pub fn millis(value: i64) -> Self {
        Expiry {
            px: Some(value),
            ..Default::default()
        }
    }

    pub fn is_set(&self) -> bool {
        self.effective().is_some()
    }

    /// The token and value that go on the wire.
    pub fn effective(&self) -> Option<(&'static str, i64)> {
        if let Some(v) = self.pxat {
            return Some(("PXAT", v));
        }
        if let Some(v) = self.exat {
            return Some(("EXAT", v));
        }
        if let Some(v) = self.px {
            return Some(("PX", v));
        }
        self.ex.map(|v| ("EX", v))
    }
}

/// Condition token accepted by the EXPIRE family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpireCondition {
    Nx,
    Xx,
    Gt,
    Lt,
}

impl ExpireCondition {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExpireCondition::Nx => "NX",
            ExpireCondition::Xx => "XX",
            ExpireCondition::Gt => "GT",
            ExpireCondition::Lt => "LT",
        }
    }

    pub fn parse(token: &[u8]) -> Option<Self> {
        [
            ExpireCondition::Nx,
            ExpireCondition::Xx,
            ExpireCondition::Gt,
            ExpireCondition::Lt,
        ]
        .into_iter()
        .find(|c| c.as_str().as_bytes().eq_ignore_ascii_case(token))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeoUnit {
    Meters,
    Kilometers,
    Feet,
    Miles,
}

impl GeoUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            GeoUnit::Meters => "m",
            GeoUnit::Kilometers => "km",
            GeoUnit::Feet => "ft",
            GeoUnit::Miles => "mi",
        }
    }
}

impl FromStr for GeoUnit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "m" => Ok(GeoUnit::Meters),
            "km" => Ok(GeoUnit::Kilometers),
            "ft" => Ok(GeoUnit::Feet),
            "mi" => Ok(GeoUnit::Miles),
            _ => argument_error!(format!("unknown distance unit `{s}`")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Where a geo search starts from.
#[derive(Debug, Clone, PartialEq)]
pub enum GeoOrigin {
    Member(Vec<u8>),
    LonLat(f64, f64),
}

/// The area a geo search covers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GeoShape {
    Radius(f64, GeoUnit),
    Box { width: f64, height: f64, unit: GeoUnit },
}

/// Parameters of GEOSEARCH and GEOSEARCHSTORE. `ANY` is taken from
/// `Options::approximate`.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoSearch {
    pub origin: GeoOrigin,
    pub shape: GeoShape,
    pub with_coord: bool,
    pub with_dist: bool,
    pub with_hash: bool,
    pub count: Option<i64>,
    pub sort: Option<SortOrder>,
    pub store_dist: bool,
}

impl GeoSearch {
    pub fn new(origin: GeoOrigin, shape: GeoShape) -> Self {
        GeoSearch {
            origin,
            shape,
            with_coord: false,
            with_dist: false,
            with_hash: false,
            count: None,
            sort: None,
            store_dist: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
    Sum,
    Min,
    Max,
}

impl Aggregate {
    pub fn as_str(&self) -> &'static str {
        match self {
            Aggregate::Sum => "SUM",
            Aggregate::Min => "MIN",
            Aggregate::Max => "MAX",
        }
    }
}

/// How ZRANGE interprets its start/stop arguments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RangeBy {
    #[default]
    Index,
    Score,
    Lex,
}

/// Sparse option record. Fields that do not apply to a command are ignored
/// by its grammar.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Options {
    pub expiry: Expiry,
    pub nx: bool,
    pub xx: bool,
    pub ch: bool,
    pub lt: bool,
    pub gt: bool,
    pub incr: bool,
    pub keep_ttl: bool,
    pub get_old_value: bool,
    pub persist: bool,
    pub ifeq: Option<Vec<u8>>,
    /// Start and end offsets for BITCOUNT/BITPOS.
    pub range: Option<(i64, i64)>,
    pub bybit: bool,
    pub approximate: bool,
    pub geo: Option<GeoSearch>,
    pub weights: Option<Vec<f64>>,
    pub aggregate: Option<Aggregate>,
    pub range_by: RangeBy,
    pub rev: bool,
    pub limit: Option<(i64, i64)>,
    pub with_scores: bool,
    /// SCAN family: MATCH pattern, COUNT hint and TYPE filter.
    pub pattern: Option<Vec<u8>>,
    pub count: Option<i64>,
    pub type_filter: Option<Vec<u8>>,
}

impl Options {
    /// Reads options out of a loosely typed record such as
    /// `{"EX": 30, "NX": true}` or a sequence of bare flags such as
    /// `["NX", "GET"]`. Keys match case-insensitively.
    pub fn from_host(value: &HostValue) -> crate::Result<Options> {
        let mut options = Options::default();

        match value {
            HostValue::Null => {}
            HostValue::Sequence(items) => {
                for item in items {
                    match item {
                        HostValue::String(flag) => options.set_flag(flag)?,
                        other => {
                            return argument_error!(format!("option flag must be a string, got {other}"));
                        }
                    }
                }
            }
            HostValue::Record(record) => {
                for (key, entry) in record.iter() {
                    let key = match key.name() {
                        Some(k) => k.to_ascii_uppercase(),
                        None => match entry {
                            // ["PERSIST"] style entries carry the flag as value
                            HostValue::String(flag) => {
                                options.set_flag(flag)?;
                                continue;
                            }
                            _ => return argument_error!("positional option must be a string"),
                        },
                    };

                    match key.as_slice() {
                        b"EX" => options.expiry.ex = Some(option_int(&key, entry)?),
                        b"PX" => options.expiry.px = Some(option_int(&key, entry)?),
                        b"EXAT" => options.expiry.exat = Some(option_int(&key, entry)?),
                        b"PXAT" => options.expiry.pxat = Some(option_int(&key, entry)?),
                        b"COUNT" => options.count = Some(option_int(&key, entry)?),
                        b"MATCH" => options.pattern = Some(option_bytes(&key, entry)?),
                        b"TYPE" => options.type_filter = Some(option_bytes(&key, entry)?),
                        b"IFEQ" => match entry {
                            HostValue::String(s) => options.ifeq = Some(s.clone()),
                            HostValue::Int(i) => options.ifeq = Some(render_int(*i)),
                            _ => return argument_error!("IFEQ expects a string"),
                        },
                        _ => {
                            // unknown names fail even when switched off
                            let slot = options.flag_slot(&key)?;
                            if entry.is_truthy() {
                                *slot = true;
                            }
                        }
                    }
                }
            }
            other => return argument_error!(format!("options must be a record, got {other}")),
        }

        Ok(options)
    }

    fn set_flag(&mut self, flag: &[u8]) -> crate::Result<()> {
        *self.flag_slot(flag)? = true;
        Ok(())
    }

    fn flag_slot(&mut self, flag: &[u8]) -> crate::Result<&mut bool> {
        let slot = match flag.to_ascii_uppercase().as_slice() {
            b"NX" => &mut self.nx,
            b"XX" => &mut self.xx,
            b"CH" => &mut self.ch,
            b"LT" => &mut self.lt,
            b"GT" => &mut self.gt,
            b"INCR" => &mut self.incr,
            b"GET" => &mut self.get_old_value,
            b"KEEPTTL" => &mut self.keep_ttl,
            b"PERSIST" => &mut self.persist,
            b"WITHSCORES" => &mut self.with_scores,
            b"REV" => &mut self.rev,
            _ => {
                return argument_error!(format!(
                    "unknown option `{}`",
                    String::from_utf8_lossy(flag)
                ));
            }
        };
        Ok(slot)
    }
}

fn option_int(key: &[u8], value: &HostValue) -> crate::Result<i64> {
    match value {
        HostValue::Int(i) => Ok(*i),
        HostValue::String(s) => crate::codec::parse_int(s).map_err(|_| Error {
            inner: Inner::ArgumentError {
                message: format!("{} expects an integer", String::from_utf8_lossy(key)),
            },
        }),
        _ => argument_error!(format!(
            "{} expects an integer",
            String::from_utf8_lossy(key)
        )),
    }
}

fn option_bytes(key: &[u8], value: &HostValue) -> crate::Result<Vec<u8>> {
    match value {
        HostValue::String(s) => Ok(s.clone()),
        _ => argument_error!(format!(
            "{} expects a string",
            String::from_utf8_lossy(key)
        )),
    }
}

/// A fully described call.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub kind: CommandKind,
    pub key: Option<Vec<u8>>,
    pub args: Vec<Arg>,
    pub options: Options,
    pub route: Option<Route>,
}

impl Command {
    pub fn new(kind: CommandKind) -> Self {
        Command {
            kind,
            key: None,
            args: Vec::new(),
            options: Options::default(),
            route: None,
        }
    }

    pub fn key(mut self, key: impl Into<Vec<u8>>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn arg(mut self, arg: impl Into<Arg>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, A>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<Arg>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    pub fn route(mut self, route: Route) -> Self {
        self.route = Some(route);
        self
    }

    /// Attaches a route given as a loose host value; fails before anything is
    /// sent when the value cannot be understood.
    pub fn route_value(self, value: &HostValue) -> crate::Result<Self> {
        let route = Route::parse(value)?;
        Ok(self.route(route))
    }

    /// The processor for this call. Some options change the reply type, e.g.
    /// `SET .. GET` answers with the old value.
    pub fn processor(&self) -> Processor {
        match self.kind {
            CommandKind::Set if self.options.get_old_value => Processor::String,
            CommandKind::ZAdd if self.options.incr => Processor::Double,
            CommandKind::ZRange if self.options.with_scores => {
                Processor::Raw(AssociationMode::Flat)
            }
            kind => kind.default_processor(),
        }
    }
}
