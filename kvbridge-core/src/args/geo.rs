//! Geo commands.

use super::{WireArgs, require_key, scalar_arg};
use crate::argument_error;
use crate::command::{Arg, Command, GeoOrigin, GeoSearch, GeoShape, GeoUnit};

/// `GEOADD key [NX|XX] [CH] lon lat member [lon lat member ...]`.
pub(super) fn add(command: &Command) -> crate::Result<WireArgs<'_>> {
    let key = require_key(command)?;
    let options = &command.options;

    if options.nx && options.xx {
        return argument_error!("GEOADD: NX and XX are mutually exclusive");
    }

    let mut wire = WireArgs::with_capacity(command.args.len() + 3);
    wire.push_borrowed(key);
    if options.nx {
        wire.push_token("NX");
    }
    if options.xx {
        wire.push_token("XX");
    }
    if options.ch {
        wire.push_token("CH");
    }

    let before = wire.len();
    wire.push_args(&command.args);
    let values = wire.len() - before;

    if values == 0 || values % 3 != 0 {
        return argument_error!(format!(
            "GEOADD expects longitude/latitude/member triplets, got {values} values"
        ));
    }

    Ok(wire)
}

/// `GEODIST key m1 m2 [unit]`.
pub(super) fn dist(command: &Command) -> crate::Result<WireArgs<'_>> {
    let key = require_key(command)?;

    let mut wire = WireArgs::with_capacity(4);
    wire.push_borrowed(key);
    wire.push_cow(scalar_arg(command, 0, "first member")?);
    wire.push_cow(scalar_arg(command, 1, "second member")?);

    match command.args.get(2) {
        None => {}
        Some(Arg::Str(unit)) => {
            let unit = std::str::from_utf8(unit)
                .ok()
                .and_then(|u| u.parse::<GeoUnit>().ok());
            match unit {
                Some(unit) => wire.push_token(unit.as_str()),
                None => return argument_error!("GEODIST: unit must be one of m, km, ft, mi"),
            }
        }
        Some(_) => return argument_error!("GEODIST: unit must be a string"),
    }

    if command.args.len() > 3 {
        return argument_error!("GEODIST takes two members and an optional unit");
    }

    Ok(wire)
}

/// GEOHASH and GEOPOS: `[key, member...]`.
pub(super) fn members(command: &Command) -> crate::Result<WireArgs<'_>> {
    let key = require_key(command)?;

    let mut wire = WireArgs::with_capacity(command.args.len() + 1);
    wire.push_borrowed(key);
    wire.push_args(&command.args);

    if wire.len() < 2 {
        return argument_error!(format!("{} needs at least one member", command.kind));
    }
    Ok(wire)
}

/// `GEOSEARCH key origin shape [WITHCOORD] [WITHDIST] [WITHHASH]
/// [COUNT n [ANY]] [ASC|DESC]`.
pub(super) fn search(command: &Command) -> crate::Result<WireArgs<'_>> {
    let key = require_key(command)?;
    let geo = geo_options(command)?;

    if geo.store_dist {
        return argument_error!("GEOSEARCH does not take STOREDIST");
    }

    let mut wire = WireArgs::with_capacity(16);
    wire.push_borrowed(key);
    push_area(&mut wire, geo);

    if geo.with_coord {
        wire.push_token("WITHCOORD");
    }
    if geo.with_dist {
        wire.push_token("WITHDIST");
    }
    if geo.with_hash {
        wire.push_token("WITHHASH");
    }

    push_count(&mut wire, geo, command.options.approximate)?;

    if let Some(sort) = geo.sort {
        wire.push_token(sort.as_str());
    }

    Ok(wire)
}

/// `GEOSEARCHSTORE dest src origin shape [COUNT n [ANY]] [ASC|DESC]
/// [STOREDIST]`. The key is the destination, `args[0]` the source.
pub(super) fn search_store(command: &Command) -> crate::Result<WireArgs<'_>> {
    let dest = require_key(command)?;
    let geo = geo_options(command)?;

    if geo.with_coord || geo.with_dist || geo.with_hash {
        return argument_error!("GEOSEARCHSTORE does not return WITH* fields");
    }

    let mut wire = WireArgs::with_capacity(14);
    wire.push_borrowed(dest);
    wire.push_cow(scalar_arg(command, 0, "source key")?);
    push_area(&mut wire, geo);
    push_count(&mut wire, geo, command.options.approximate)?;

    if let Some(sort) = geo.sort {
        wire.push_token(sort.as_str());
    }
    if geo.store_dist {
        wire.push_token("STOREDIST");
    }

    Ok(wire)
}

fn geo_options(command: &Command) -> crate::Result<&GeoSearch> {
    match command.options.geo.as_ref() {
        Some(geo) => Ok(geo),
        None => argument_error!(format!("{} needs a search origin and shape", command.kind)),
    }
}

fn push_area<'a>(wire: &mut WireArgs<'a>, geo: &'a GeoSearch) {
    match &geo.origin {
        GeoOrigin::Member(member) => {
            wire.push_token("FROMMEMBER");
            wire.push_borrowed(member);
        }
        GeoOrigin::LonLat(lon, lat) => {
            wire.push_token("FROMLONLAT");
            wire.push_float(*lon);
            wire.push_float(*lat);
        }
    }

    match geo.shape {
        GeoShape::Radius(radius, unit) => {
            wire.push_token("BYRADIUS");
            wire.push_float(radius);
            wire.push_token(unit.as_str());
        }
        GeoShape::Box {
            width,
            height,
            unit,
        } => {
            wire.push_token("BYBOX");
            wire.push_float(width);
            wire.push_float(height);
            wire.push_token(unit.as_str());
        }
    }
}

fn push_count(wire: &mut WireArgs<'_>, geo: &GeoSearch, any: bool) -> crate::Result<()> {
    match geo.count {
        Some(count) if count <= 0 => argument_error!("COUNT must be positive"),
        Some(count) => {
            wire.push_token("COUNT");
            wire.push_int(count);
            if any {
                wire.push_token("ANY");
            }
            Ok(())
        }
        None if any => argument_error!("ANY needs a COUNT"),
        None => Ok(()),
    }
}
