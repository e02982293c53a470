//! Date/time text in PostgreSQL's ISO output style.
//!
//! Literals always carry six fractional digits. Years at or before 0 use the
//! ` BC` suffix (`0001-01-01 BC` is proleptic year 0).

use chrono::{
    DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone,
    Timelike,
};

use crate::error::{CodecError, CodecResult};

pub fn format_date(buf: &mut String, date: NaiveDate) {
    let year = date.year();
    let (shown, bc) = if year <= 0 { (1 - year, true) } else { (year, false) };
    push_padded(buf, shown as i64, 4);
    buf.push('-');
    push_padded(buf, date.month() as i64, 2);
    buf.push('-');
    push_padded(buf, date.day() as i64, 2);
    if bc {
        buf.push_str(" BC");
    }
}

pub fn format_time(buf: &mut String, time: NaiveTime) {
    let mut second = time.second();
    let mut nanos = time.nanosecond();
    // leap second representation
    if nanos >= 1_000_000_000 {
        second += 1;
        nanos -= 1_000_000_000;
    }
    push_padded(buf, time.hour() as i64, 2);
    buf.push(':');
    push_padded(buf, time.minute() as i64, 2);
    buf.push(':');
    push_padded(buf, second as i64, 2);
    buf.push('.');
    push_padded(buf, (nanos / 1_000) as i64, 6);
}

pub fn format_offset(buf: &mut String, offset: FixedOffset) {
    let total = offset.local_minus_utc();
    buf.push(if total < 0 { '-' } else { '+' });
    let total = total.unsigned_abs();
    push_padded(buf, (total / 3600) as i64, 2);
    buf.push(':');
    push_padded(buf, (total / 60 % 60) as i64, 2);
    if total % 60 != 0 {
        buf.push(':');
        push_padded(buf, (total % 60) as i64, 2);
    }
}

pub fn format_time_tz(buf: &mut String, time: NaiveTime, offset: FixedOffset) {
    format_time(buf, time);
    format_offset(buf, offset);
}

pub fn format_timestamp(buf: &mut String, ts: NaiveDateTime) {
    let year = ts.date().year();
    let (shown, bc) = if year <= 0 { (1 - year, true) } else { (year, false) };
    push_padded(buf, shown as i64, 4);
    buf.push('-');
    push_padded(buf, ts.month() as i64, 2);
    buf.push('-');
    push_padded(buf, ts.day() as i64, 2);
    buf.push(' ');
    format_time(buf, ts.time());
    if bc {
        buf.push_str(" BC");
    }
}

pub fn format_timestamp_tz(buf: &mut String, ts: &DateTime<FixedOffset>) {
    let year = ts.year();
    let bc = year <= 0;
    let naive = ts.naive_local();
    let shown = if bc { 1 - year } else { year };
    push_padded(buf, shown as i64, 4);
    buf.push('-');
    push_padded(buf, naive.month() as i64, 2);
    buf.push('-');
    push_padded(buf, naive.day() as i64, 2);
    buf.push(' ');
    format_time(buf, naive.time());
    format_offset(buf, ts.offset().fix());
    if bc {
        buf.push_str(" BC");
    }
}

fn push_padded(buf: &mut String, value: i64, width: usize) {
    let mut tmp = itoa::Buffer::new();
    let digits = tmp.format(value);
    for _ in digits.len()..width {
        buf.push('0');
    }
    buf.push_str(digits);
}

// ==================== Parsing ====================

/// Split a trailing ` BC`/` AD` era marker.
fn split_era(text: &str) -> (&str, bool) {
    let trimmed = text.trim();
    let upper = trimmed.to_ascii_uppercase();
    if upper.ends_with(" BC") {
        (trimmed[..trimmed.len() - 3].trim_end(), true)
    } else if upper.ends_with(" AD") {
        (trimmed[..trimmed.len() - 3].trim_end(), false)
    } else {
        (trimmed, false)
    }
}

fn apply_era(date: NaiveDate, bc: bool) -> CodecResult<NaiveDate> {
    if !bc {
        return Ok(date);
    }
    date.with_year(1 - date.year())
        .ok_or_else(|| CodecError::invalid(format!("date out of range: {} BC", date)))
}

pub fn parse_date(text: &str) -> CodecResult<NaiveDate> {
    let (body, bc) = split_era(text);
    let date = NaiveDate::parse_from_str(body, "%Y-%m-%d")
        .map_err(|e| CodecError::invalid(format!("invalid date '{}': {}", text.trim(), e)))?;
    apply_era(date, bc)
}

pub fn parse_time(text: &str) -> CodecResult<NaiveTime> {
    let body = text.trim();
    NaiveTime::parse_from_str(body, "%H:%M:%S%.f")
        .or_else(|_| NaiveTime::parse_from_str(body, "%H:%M"))
        .map_err(|e| CodecError::invalid(format!("invalid time '{}': {}", body, e)))
}

/// Parse `+HH`, `+HH:MM`, `+HH:MM:SS`, `+HHMM` or `Z`.
pub fn parse_offset(text: &str) -> CodecResult<FixedOffset> {
    let body = text.trim();
    if body.eq_ignore_ascii_case("Z") {
        return Ok(chrono::Utc.fix());
    }
    let invalid = || CodecError::invalid(format!("invalid time zone offset '{}'", body));
    let (sign, digits) = match body.as_bytes().first() {
        Some(b'+') => (1, &body[1..]),
        Some(b'-') => (-1, &body[1..]),
        _ => return Err(invalid()),
    };
    let parts: Vec<&str> = if digits.contains(':') {
        digits.split(':').collect()
    } else if digits.len() == 4 {
        vec![&digits[..2], &digits[2..]]
    } else {
        vec![digits]
    };
    if parts.is_empty() || parts.len() > 3 {
        return Err(invalid());
    }
    let mut seconds = 0i32;
    for (i, part) in parts.iter().enumerate() {
        if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let n: i32 = part.parse().map_err(|_| invalid())?;
        // hours up to 15, minutes and seconds below 60
        if n > [15, 59, 59][i] {
            return Err(invalid());
        }
        seconds += n * [3600, 60, 1][i];
    }
    FixedOffset::east_opt(sign * seconds).ok_or_else(invalid)
}

/// Index where a trailing zone offset starts, searching after `from`.
fn offset_start(text: &str, from: usize) -> Option<usize> {
    text[from..]
        .rfind(|c: char| matches!(c, '+' | '-' | 'Z' | 'z'))
        .map(|i| from + i)
}

pub fn parse_time_tz(text: &str) -> CodecResult<(NaiveTime, FixedOffset)> {
    let body = text.trim();
    let at = offset_start(body, 0)
        .ok_or_else(|| CodecError::invalid(format!("missing time zone in '{}'", body)))?;
    Ok((parse_time(&body[..at])?, parse_offset(&body[at..])?))
}

pub fn parse_timestamp(text: &str) -> CodecResult<NaiveDateTime> {
    let (body, bc) = split_era(text);
    let ts = NaiveDateTime::parse_from_str(body, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(body, "%Y-%m-%dT%H:%M:%S%.f"))
        .or_else(|_| {
            NaiveDate::parse_from_str(body, "%Y-%m-%d").map(|d| d.and_time(NaiveTime::MIN))
        })
        .map_err(|e| CodecError::invalid(format!("invalid timestamp '{}': {}", text.trim(), e)))?;
    Ok(apply_era(ts.date(), bc)?.and_time(ts.time()))
}

pub fn parse_timestamp_tz(text: &str) -> CodecResult<DateTime<FixedOffset>> {
    let (body, bc) = split_era(text);
    // the zone can only follow the time part
    let time_from = body.find(|c: char| c == ' ' || c == 'T').map(|i| i + 1).unwrap_or(body.len());
    let at = offset_start(body, time_from)
        .ok_or_else(|| CodecError::invalid(format!("missing time zone in '{}'", body)))?;
    let offset = parse_offset(&body[at..])?;
    let local = parse_timestamp(&body[..at])?;
    let local = apply_era(local.date(), bc)?.and_time(local.time());
    offset
        .from_local_datetime(&local)
        .single()
        .ok_or_else(|| CodecError::invalid(format!("invalid timestamp '{}'", body)))
}
