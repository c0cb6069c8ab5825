//! Scalar text codec.
//!
//! The wire protocol only carries byte strings, so every numeric argument is
//! rendered to text before it is sent, and every numeric reply that arrives
//! as text is parsed back here.

use crate::parser_error;

/// Exponent bounds for the `%g`-like layout. Outside of
/// `[MIN_PLAIN_EXPONENT, MAX_PLAIN_EXPONENT)` floats are written in
/// exponent form.
const MIN_PLAIN_EXPONENT: i32 = -4;
const MAX_PLAIN_EXPONENT: i32 = 17;

/// Renders an integer as base-10 text.
pub fn render_int(value: i64) -> Vec<u8> {
    value.to_string().into_bytes()
}

/// Renders a float with the shortest digits that parse back to the same
/// value.
///
/// Integral values drop the fraction (`30.0` becomes `30`). Very small and
/// very large magnitudes switch to exponent form with a signed, at least
/// two digit exponent (`1e+300`, `1.5e-07`).
pub fn render_float(value: f64) -> Vec<u8> {
    if value.is_nan() {
        return b"nan".to_vec();
    }
    if value.is_infinite() {
        return if value > 0.0 {
            b"inf".to_vec()
        } else {
            b"-inf".to_vec()
        };
    }
    if value == 0.0 {
        return if value.is_sign_negative() {
            b"-0".to_vec()
        } else {
            b"0".to_vec()
        };
    }

    // `{:e}` yields the shortest round-trip mantissa, e.g. "1.5e-7"
    let scientific = format!("{value:e}");
    let (mantissa, exponent) = match scientific.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (scientific.as_str(), 0),
    };

    if (MIN_PLAIN_EXPONENT..MAX_PLAIN_EXPONENT).contains(&exponent) {
        return value.to_string().into_bytes();
    }

    let sign = if exponent < 0 { '-' } else { '+' };
    format!("{mantissa}e{sign}{:02}", exponent.abs()).into_bytes()
}

/// Renders a boolean the way the store expects flags: `1` or `0`.
pub fn render_bool(value: bool) -> Vec<u8> {
    if value { b"1".to_vec() } else { b"0".to_vec() }
}

/// Parses float text such as `3.14`, `-1e-05`, `inf` or `+inf`.
pub fn parse_float(data: &[u8]) -> crate::Result<f64> {
    let text = match std::str::from_utf8(data) {
        Ok(t) => t.trim(),
        Err(e) => return parser_error!("float contains non-utf8 bytes", e.valid_up_to()),
    };

    if text.is_empty() {
        return parser_error!("empty float", 0);
    }

    let text = text.strip_prefix('+').unwrap_or(text);
    match text.parse::<f64>() {
        Ok(f) => Ok(f),
        Err(_) => parser_error!(format!("invalid float `{text}`"), 0),
    }
}

/// Parses base-10 integer text covering the whole `i64` range.
pub fn parse_int(data: &[u8]) -> crate::Result<i64> {
    let text = match std::str::from_utf8(data) {
        Ok(t) => t,
        Err(e) => return parser_error!("integer contains non-utf8 bytes", e.valid_up_to()),
    };

    match text.parse::<i64>() {
        Ok(i) => Ok(i),
        Err(_) => parser_error!(format!("invalid integer `{text}`"), 0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    fn float_text(value: f64) -> String {
        String::from_utf8(render_float(value)).unwrap()
    }

    #[test]
    fn test_render_int_bounds() {
        assert_eq!(render_int(0), b"0");
        assert_eq!(render_int(-42), b"-42");
        assert_eq!(render_int(i64::MAX), b"9223372036854775807");
        assert_eq!(render_int(i64::MIN), b"-9223372036854775808");
    }

    #[test]
    fn test_render_float_layout() {
        assert_eq!(float_text(30.0), "30");
        assert_eq!(float_text(0.1), "0.1");
        assert_eq!(float_text(-2.5), "-2.5");
        assert_eq!(float_text(0.0001), "0.0001");
        assert_eq!(float_text(0.00001), "1e-05");
        assert_eq!(float_text(1e300), "1e+300");
        assert_eq!(float_text(1.5e-7), "1.5e-07");
        assert_eq!(float_text(1e16), "10000000000000000");
        assert_eq!(float_text(1e17), "1e+17");
        assert_eq!(float_text(-0.0), "-0");
    }

    #[test]
    fn test_render_float_non_finite() {
        assert_eq!(float_text(f64::INFINITY), "inf");
        assert_eq!(float_text(f64::NEG_INFINITY), "-inf");
        assert_eq!(float_text(f64::NAN), "nan");
    }

    #[test]
    fn test_parse_float_accepts_protocol_forms() {
        assert_eq!(parse_float(b"3.5").unwrap(), 3.5);
        assert_eq!(parse_float(b"+inf").unwrap(), f64::INFINITY);
        assert_eq!(parse_float(b"-inf").unwrap(), f64::NEG_INFINITY);
        assert_eq!(parse_float(b"1e-05").unwrap(), 0.00001);
    }

    #[test]
    fn test_parse_float_rejects_garbage() {
        assert!(parse_float(b"").is_err());
        assert!(parse_float(b"abc").is_err());
        assert!(parse_float(&[0xff, 0xfe]).is_err());
    }

    #[test]
    fn test_float_round_trip_random() {
        let mut rng = rand::rng();
        for _ in 0..2000 {
            let mantissa: f64 = rng.random_range(-1.0..1.0);
            let exponent: i32 = rng.random_range(-300..300);
            let value = mantissa * 10f64.powi(exponent);
            let back = parse_float(&render_float(value)).unwrap();
            if value == 0.0 {
                assert_eq!(back, 0.0);
            } else {
                assert!(((back - value) / value).abs() < 1e-9, "{value} -> {back}");
            }
        }
    }

    #[test]
    fn test_int_round_trip_random() {
        let mut rng = rand::rng();
        for value in [i64::MIN, i64::MAX, 0, -1, 1] {
            assert_eq!(parse_int(&render_int(value)).unwrap(), value);
        }
        for _ in 0..2000 {
            let value: i64 = rng.random();
            assert_eq!(parse_int(&render_int(value)).unwrap(), value);
        }
    }
}
