pub mod donki;
pub mod kp;
pub mod swpc;

use serde_json::Value;

use crate::error::{AppError, Result};

/// One normalized feed record: canonical field name -> raw value.
pub type Record = serde_json::Map<String, Value>;

/// Normalize a feed body into a list of records. SWPC products publish a
/// columnar table (header row of strings, then data rows); other feeds
/// publish a record list. Both are accepted; anything else is an explicit
/// schema fault rather than a silent zero.
pub fn normalize_records(body: &Value) -> Result<Vec<Record>> {
    let rows = body
        .as_array()
        .ok_or_else(|| AppError::Schema("feed body is not an array".to_string()))?;

    if rows.is_empty() {
        return Ok(Vec::new());
    }

    // Record-list shape: every element already carries named properties.
    if rows.iter().all(|r| r.is_object()) {
        return Ok(rows
            .iter()
            .filter_map(|r| r.as_object().cloned())
            .collect());
    }

    // Columnar-table shape: first row names the fields.
    let header: Vec<String> = rows[0]
        .as_array()
        .ok_or_else(|| AppError::Schema("table header row is not an array".to_string()))?
        .iter()
        .filter_map(|h| h.as_str().map(str::to_string))
        .collect();
    if header.is_empty() {
        return Err(AppError::Schema("table header row has no field names".to_string()));
    }

    let mut records = Vec::with_capacity(rows.len() - 1);
    for row in &rows[1..] {
        let Some(cells) = row.as_array() else {
            return Err(AppError::Schema("table data row is not an array".to_string()));
        };
        let mut record = Record::new();
        for (name, cell) in header.iter().zip(cells) {
            record.insert(name.clone(), cell.clone());
        }
        records.push(record);
    }
    Ok(records)
}

/// The last ("current") record of a feed body.
pub fn last_record(body: &Value) -> Result<Record> {
    normalize_records(body)?
        .pop()
        .ok_or_else(|| AppError::Schema("feed has no data rows".to_string()))
}

/// Numeric field lookup over a closed alias set. Feeds publish numbers both
/// as JSON numbers and as strings; both are accepted. Returns `fallback`
/// when no alias is present or parseable.
pub fn num_field(record: &Record, aliases: &[&str], fallback: f64) -> f64 {
    aliases
        .iter()
        .find_map(|alias| record.get(*alias).and_then(value_as_f64))
        .unwrap_or(fallback)
}

/// String field lookup over a closed alias set.
pub fn str_field<'a>(record: &'a Record, aliases: &[&str]) -> Option<&'a str> {
    aliases
        .iter()
        .find_map(|alias| record.get(*alias).and_then(|v| v.as_str()))
}

fn value_as_f64(v: &Value) -> Option<f64> {
    v.as_f64()
        .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
        .filter(|x| x.is_finite())
}

// ---------------------------------------------------------------------------
// Calendar arithmetic (no chrono; feeds use plain UTC timestamps)
// ---------------------------------------------------------------------------

/// Parse an ISO 8601 UTC timestamp to Unix milliseconds. Accepts both the
/// `T` and the space separator, optional fractional seconds and a trailing
/// `Z` or offset, and bare dates.
pub fn parse_iso_ms(s: &str) -> Option<i64> {
    let s = s.trim();
    let s = s.strip_suffix('Z').unwrap_or(s);
    let s = if let Some(dot) = s.find('.') { &s[..dot] } else { s };
    let s = if s.len() > 19 {
        let b = s.as_bytes()[19];
        if b == b'+' || b == b'-' { &s[..19] } else { s }
    } else {
        s
    };
    // Checked sub-slicing: a multi-byte character anywhere in a malformed
    // timestamp must yield None, never an out-of-boundary panic.
    let field = |range: std::ops::Range<usize>| -> Option<i64> { s.get(range)?.parse().ok() };
    let (year, month, day, hour, minute, second) = if s.len() == 10 {
        (field(0..4)?, field(5..7)?, field(8..10)?, 0, 0, 0)
    } else if s.len() >= 19 {
        (field(0..4)?, field(5..7)?, field(8..10)?,
         field(11..13)?, field(14..16)?, field(17..19)?)
    } else {
        return None;
    };

    let a = (14 - month) / 12;
    let y = year + 4800 - a;
    let m = month + 12 * a - 3;
    let jdn = day + (153 * m + 2) / 5 + 365 * y + y / 4 - y / 100 + y / 400 - 32045;
    let unix_days = jdn - 2_440_588;
    Some((unix_days * 86_400 + hour * 3_600 + minute * 60 + second) * 1_000)
}

/// Unix milliseconds -> `YYYY-MM-DD` (UTC), for DONKI date-range params.
pub fn format_date(ms: i64) -> String {
    let days = ms.div_euclid(86_400_000);
    // Civil-from-days, Gregorian.
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1_460 + doe / 36_524 - doe / 146_096) / 365;
    let y = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m = if mp < 10 { mp + 3 } else { mp - 9 };
    let y = if m <= 2 { y + 1 } else { y };
    format!("{y:04}-{m:02}-{d:02}")
}

/// Unix milliseconds -> ISO 8601 UTC string with second precision. Used to
/// stamp defaulted readings.
pub fn format_iso(ms: i64) -> String {
    let date = format_date(ms);
    let secs_of_day = ms.div_euclid(1_000).rem_euclid(86_400);
    let (h, m, s) = (secs_of_day / 3_600, (secs_of_day / 60) % 60, secs_of_day % 60);
    format!("{date}T{h:02}:{m:02}:{s:02}Z")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn normalizes_columnar_table() {
        let body = json!([
            ["time_tag", "speed", "density"],
            ["2025-08-30 11:59:00.000", "361.4", "4.2"],
            ["2025-08-30 12:00:00.000", "365.0", "4.6"],
        ]);
        let last = last_record(&body).expect("valid table");
        assert_eq!(num_field(&last, &["speed", "Speed", "Vx"], 0.0), 365.0);
        assert_eq!(num_field(&last, &["density", "Density", "Np"], 0.0), 4.6);
    }

    #[test]
    fn normalizes_record_list() {
        let body = json!([
            { "time_tag": "2025-08-30T12:00:00Z", "Bz": -3.1, "Bt": 5.0 },
        ]);
        let last = last_record(&body).expect("valid record list");
        assert_eq!(num_field(&last, &["bz", "Bz"], 0.0), -3.1);
    }

    #[test]
    fn missing_alias_falls_back() {
        let body = json!([
            ["time_tag", "bt"],
            ["2025-08-30 12:00:00.000", "5.5"],
        ]);
        let last = last_record(&body).expect("valid table");
        assert_eq!(num_field(&last, &["bz", "Bz"], 0.0), 0.0);
        assert_eq!(num_field(&last, &["bt", "Bt"], 4.0), 5.5);
    }

    #[test]
    fn non_array_body_is_schema_fault() {
        assert!(last_record(&json!({"error": "maintenance"})).is_err());
        assert!(last_record(&json!([])).is_err());
    }

    #[test]
    fn parses_swpc_and_iso_timestamps() {
        // SWPC tables use a space separator and fractional seconds.
        let a = parse_iso_ms("2025-08-30 12:00:00.000").expect("swpc form");
        let b = parse_iso_ms("2025-08-30T12:00:00Z").expect("iso form");
        assert_eq!(a, b);
        // Spot-check against a known epoch: 2020-01-01T00:00:00Z.
        assert_eq!(parse_iso_ms("2020-01-01T00:00:00Z"), Some(1_577_836_800_000));
        assert_eq!(parse_iso_ms("2020-01-01"), Some(1_577_836_800_000));
        assert_eq!(parse_iso_ms("garbage"), None);
    }

    #[test]
    fn multibyte_garbage_in_timestamp_is_rejected_not_fatal() {
        // Multi-byte characters landing across a field boundary must not
        // take down the poller that called us.
        assert_eq!(parse_iso_ms("202\u{e9}-01-01T00:00:00"), None);
        assert_eq!(parse_iso_ms("2025-08-30T12:00:0é"), None);
        assert_eq!(parse_iso_ms("日付なし"), None);
        // Garbage confined to the dropped fractional part stays parseable.
        assert_eq!(
            parse_iso_ms("2025-08-30 12:00:00.é00"),
            parse_iso_ms("2025-08-30 12:00:00")
        );
    }

    #[test]
    fn formats_dates_round_trip() {
        let ms = parse_iso_ms("2024-02-29T23:59:59Z").unwrap();
        assert_eq!(format_date(ms), "2024-02-29");
        assert_eq!(format_iso(ms), "2024-02-29T23:59:59Z");
        assert_eq!(parse_iso_ms(&format_iso(ms)), Some(ms));
    }
}
