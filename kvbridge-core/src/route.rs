use std::fmt;

use crate::codec::{parse_int, render_int};
use crate::response::{HostValue, Record};
use crate::route_error;

/// Named cluster targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimpleRoute {
    Random,
    AllPrimaries,
    AllNodes,
}

impl SimpleRoute {
    pub fn as_str(&self) -> &'static str {
        match self {
            SimpleRoute::Random => "randomNode",
            SimpleRoute::AllPrimaries => "allPrimaries",
            SimpleRoute::AllNodes => "allNodes",
        }
    }

    fn parse(name: &[u8]) -> Option<Self> {
        [
            SimpleRoute::Random,
            SimpleRoute::AllPrimaries,
            SimpleRoute::AllNodes,
        ]
        .into_iter()
        .find(|r| r.as_str().as_bytes().eq_ignore_ascii_case(name))
    }
}

/// Where a command should be sent in a cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// The node owning the slot of this key.
    ByKey(Vec<u8>),
    ByAddress { host: String, port: u16 },
    Simple(SimpleRoute),
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::ByKey(key) => write!(f, "key:{}", String::from_utf8_lossy(key)),
            Route::ByAddress { host, port } => write!(f, "{host}:{port}"),
            Route::Simple(simple) => write!(f, "{}", simple.as_str()),
        }
    }
}

impl Route {
    /// Reads a route out of a loosely typed value. Accepted forms:
    ///
    /// * `"randomNode"`, `"allPrimaries"`, `"allNodes"` (any case)
    /// * any other non-empty string, routed by key
    /// * `{"type": "primarySlotKey" | "slotKey", "key": k}`
    /// * `{"type": "routeByAddress", "host": h, "port": p}`
    /// * `{"host": h, "port": p}` or the pair `[h, p]`
    pub fn parse(value: &HostValue) -> crate::Result<Route> {
        match value {
            HostValue::String(s) => {
                if let Some(simple) = SimpleRoute::parse(s) {
                    return Ok(Route::Simple(simple));
                }
                if s.is_empty() {
                    return route_error!("route key must not be empty");
                }
                Ok(Route::ByKey(s.clone()))
            }
            HostValue::Record(record) => match record.get("type") {
                Some(HostValue::String(kind)) => match kind.as_slice() {
                    b"primarySlotKey" | b"slotKey" => match record.get("key") {
                        Some(HostValue::String(key)) if !key.is_empty() => {
                            Ok(Route::ByKey(key.clone()))
                        }
                        Some(HostValue::Int(i)) => Ok(Route::ByKey(render_int(*i))),
                        _ => route_error!("slot key route needs a `key`"),
                    },
                    b"routeByAddress" => address_from_record(record),
                    other => route_error!(format!(
                        "unknown route type `{}`",
                        String::from_utf8_lossy(other)
                    )),
                },
                Some(_) => route_error!("route `type` must be a string"),
                None => address_from_record(record),
            },
            HostValue::Sequence(items) if items.len() == 2 => {
                address_from_parts(Some(&items[0]), Some(&items[1]))
            }
            other => route_error!(format!("cannot route by {other}")),
        }
    }
}

fn address_from_record(record: &Record) -> crate::Result<Route> {
    let host = record.get("host").or_else(|| record.get_index(0));
    let port = record.get("port").or_else(|| record.get_index(1));
    address_from_parts(host, port)
}

fn address_from_parts(host: Option<&HostValue>, port: Option<&HostValue>) -> crate::Result<Route> {
    let host = match host {
        Some(HostValue::String(h)) if !h.is_empty() => String::from_utf8_lossy(h).into_owned(),
        _ => return route_error!("address route needs a `host` string"),
    };

    let port = match port {
        Some(HostValue::Int(p)) => *p,
        Some(HostValue::String(p)) => match parse_int(p) {
            Ok(p) => p,
            Err(_) => return route_error!("address route `port` is not a number"),
        },
        _ => return route_error!("address route needs a `port`"),
    };

    match u16::try_from(port) {
        Ok(port) if port > 0 => Ok(Route::ByAddress { host, port }),
        _ => route_error!(format!("port {port} is out of range")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    fn record(entries: &[(&str, HostValue)]) -> HostValue {
        let mut r = Record::new();
        for (k, v) in entries {
            r.insert(*k, v.clone());
        }
        HostValue::Record(r)
    }

    #[test]
    fn test_simple_routes_any_case() {
        assert_eq!(
            Route::parse(&"ALLPRIMARIES".into()).unwrap(),
            Route::Simple(SimpleRoute::AllPrimaries)
        );
        assert_eq!(
            Route::parse(&"randomNode".into()).unwrap(),
            Route::Simple(SimpleRoute::Random)
        );
    }

    #[test]
    fn test_other_strings_route_by_key() {
        assert_eq!(
            Route::parse(&"user:1".into()).unwrap(),
            Route::ByKey(b"user:1".to_vec())
        );
        assert!(Route::parse(&"".into()).is_err());
    }

    #[test]
    fn test_slot_key_record() {
        let value = record(&[("type", "primarySlotKey".into()), ("key", "k".into())]);
        assert_eq!(Route::parse(&value).unwrap(), Route::ByKey(b"k".to_vec()));

        let value = record(&[("type", "slotKey".into()), ("key", HostValue::Int(42))]);
        assert_eq!(Route::parse(&value).unwrap(), Route::ByKey(b"42".to_vec()));
    }

    #[test]
    fn test_address_forms() {
        let expected = Route::ByAddress {
            host: "10.0.0.1".into(),
            port: 6380,
        };

        let typed = record(&[
            ("type", "routeByAddress".into()),
            ("host", "10.0.0.1".into()),
            ("port", HostValue::Int(6380)),
        ]);
        assert_eq!(Route::parse(&typed).unwrap(), expected);

        let bare = record(&[("host", "10.0.0.1".into()), ("port", "6380".into())]);
        assert_eq!(Route::parse(&bare).unwrap(), expected);

        let pair = HostValue::Sequence(vec!["10.0.0.1".into(), HostValue::Int(6380)]);
        assert_eq!(Route::parse(&pair).unwrap(), expected);
    }

    #[test]
    fn test_unparseable_routes() {
        let bad = [
            HostValue::Int(3),
            HostValue::Null,
            record(&[("type", "nearest".into())]),
            record(&[("host", "h".into()), ("port", HostValue::Int(70000))]),
            record(&[("type", "slotKey".into())]),
            HostValue::Sequence(vec!["h".into()]),
        ];
        for value in bad {
            let err = Route::parse(&value).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::RouteParse, "{value}");
        }
    }
}
