//! Binary payloads of the extension types.
//!
//! All multi-byte integers are big-endian.
//!
//! ```text
//! date      (1)  i32 year | u8 month | u8 day
//! datetime  (2)  date | u8 hour | u8 minute | u8 second | u32 nanos | u8 zoned [| i32 offset_secs]
//! decimal   (3)  u8 sign | i32 exponent | coefficient bytes (big-endian, empty for zero)
//! time      (4)  u8 hour | u8 minute | u8 second | u32 nanos
//! ```

use chrono::{
    DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Timelike,
};

use crate::decimal::ExactDecimal;
use crate::error::CodecError;

pub const EXT_DATE: i8 = 1;
pub const EXT_DATETIME: i8 = 2;
pub const EXT_DECIMAL: i8 = 3;
pub const EXT_TIME: i8 = 4;

const DATE_LEN: usize = 6;
const TIME_LEN: usize = 7;
const NAIVE_DATETIME_LEN: usize = DATE_LEN + TIME_LEN + 1;
const ZONED_DATETIME_LEN: usize = NAIVE_DATETIME_LEN + 4;
const DECIMAL_HEADER_LEN: usize = 5;

fn invalid(tag: i8, reason: impl Into<String>) -> CodecError {
    CodecError::InvalidExtensionPayload {
        tag,
        reason: reason.into(),
    }
}

fn be_i32(bytes: &[u8]) -> i32 {
    i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

fn be_u32(bytes: &[u8]) -> u32 {
    u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

// ─── date ────────────────────────────────────────────────────────────────────

fn write_date(out: &mut Vec<u8>, date: &NaiveDate) {
    out.extend_from_slice(&date.year().to_be_bytes());
    out.push(date.month() as u8);
    out.push(date.day() as u8);
}

fn read_date(tag: i8, bytes: &[u8]) -> Result<NaiveDate, CodecError> {
    let year = be_i32(&bytes[0..4]);
    let (month, day) = (u32::from(bytes[4]), u32::from(bytes[5]));
    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| invalid(tag, format!("no such date {year}-{month}-{day}")))
}

pub fn pack_date(date: &NaiveDate) -> Vec<u8> {
    let mut out = Vec::with_capacity(DATE_LEN);
    write_date(&mut out, date);
    out
}

pub fn unpack_date(data: &[u8]) -> Result<NaiveDate, CodecError> {
    if data.len() != DATE_LEN {
        return Err(invalid(EXT_DATE, format!("expected {DATE_LEN} bytes, got {}", data.len())));
    }
    read_date(EXT_DATE, data)
}

// ─── time ────────────────────────────────────────────────────────────────────

fn write_time(out: &mut Vec<u8>, time: &NaiveTime) {
    out.push(time.hour() as u8);
    out.push(time.minute() as u8);
    out.push(time.second() as u8);
    out.extend_from_slice(&time.nanosecond().to_be_bytes());
}

fn read_time(tag: i8, bytes: &[u8]) -> Result<NaiveTime, CodecError> {
    let (h, m, s) = (u32::from(bytes[0]), u32::from(bytes[1]), u32::from(bytes[2]));
    let nanos = be_u32(&bytes[3..7]);
    NaiveTime::from_hms_nano_opt(h, m, s, nanos)
        .ok_or_else(|| invalid(tag, format!("no such time {h}:{m}:{s}.{nanos:09}")))
}

pub fn pack_time(time: &NaiveTime) -> Vec<u8> {
    let mut out = Vec::with_capacity(TIME_LEN);
    write_time(&mut out, time);
    out
}

pub fn unpack_time(data: &[u8]) -> Result<NaiveTime, CodecError> {
    if data.len() != TIME_LEN {
        return Err(invalid(EXT_TIME, format!("expected {TIME_LEN} bytes, got {}", data.len())));
    }
    read_time(EXT_TIME, data)
}

// ─── datetime ────────────────────────────────────────────────────────────────

/// A datetime payload decodes to one of these, depending on the zoned flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackedDateTime {
    Naive(NaiveDateTime),
    Zoned(DateTime<FixedOffset>),
}

pub fn pack_datetime(dt: &NaiveDateTime) -> Vec<u8> {
    let mut out = Vec::with_capacity(NAIVE_DATETIME_LEN);
    write_date(&mut out, &dt.date());
    write_time(&mut out, &dt.time());
    out.push(0);
    out
}

/// Stores the local wall time and the offset exactly as given.
pub fn pack_zoned_datetime(dt: &DateTime<FixedOffset>) -> Vec<u8> {
    let local = dt.naive_local();
    let mut out = Vec::with_capacity(ZONED_DATETIME_LEN);
    write_date(&mut out, &local.date());
    write_time(&mut out, &local.time());
    out.push(1);
    out.extend_from_slice(&dt.offset().local_minus_utc().to_be_bytes());
    out
}

pub fn unpack_datetime(data: &[u8]) -> Result<PackedDateTime, CodecError> {
    if data.len() != NAIVE_DATETIME_LEN && data.len() != ZONED_DATETIME_LEN {
        return Err(invalid(
            EXT_DATETIME,
            format!(
                "expected {NAIVE_DATETIME_LEN} or {ZONED_DATETIME_LEN} bytes, got {}",
                data.len()
            ),
        ));
    }
    let date = read_date(EXT_DATETIME, &data[..DATE_LEN])?;
    let time = read_time(EXT_DATETIME, &data[DATE_LEN..DATE_LEN + TIME_LEN])?;
    let naive = date.and_time(time);

    match (data[DATE_LEN + TIME_LEN], data.len()) {
        (0, NAIVE_DATETIME_LEN) => Ok(PackedDateTime::Naive(naive)),
        (1, ZONED_DATETIME_LEN) => {
            let secs = be_i32(&data[NAIVE_DATETIME_LEN..]);
            let offset = FixedOffset::east_opt(secs)
                .ok_or_else(|| invalid(EXT_DATETIME, format!("offset {secs}s out of range")))?;
            naive
                .and_local_timezone(offset)
                .single()
                .map(PackedDateTime::Zoned)
                .ok_or_else(|| invalid(EXT_DATETIME, "unrepresentable local time"))
        }
        (flag, len) => Err(invalid(
            EXT_DATETIME,
            format!("zoned flag {flag} does not match payload length {len}"),
        )),
    }
}

// ─── decimal ─────────────────────────────────────────────────────────────────

pub fn pack_decimal(dec: &ExactDecimal) -> Vec<u8> {
    let magnitude = dec.coefficient_be_bytes();
    let mut out = Vec::with_capacity(DECIMAL_HEADER_LEN + magnitude.len());
    out.push(u8::from(dec.is_sign_negative()));
    out.extend_from_slice(&dec.exponent().to_be_bytes());
    out.extend_from_slice(&magnitude);
    out
}

pub fn unpack_decimal(data: &[u8]) -> Result<ExactDecimal, CodecError> {
    if data.len() < DECIMAL_HEADER_LEN {
        return Err(invalid(
            EXT_DECIMAL,
            format!("expected at least {DECIMAL_HEADER_LEN} bytes, got {}", data.len()),
        ));
    }
    let negative = match data[0] {
        0 => false,
        1 => true,
        other => return Err(invalid(EXT_DECIMAL, format!("bad sign byte {other}"))),
    };
    let exponent = be_i32(&data[1..5]);
    Ok(ExactDecimal::from_coefficient_be_bytes(
        negative,
        &data[DECIMAL_HEADER_LEN..],
        exponent,
    ))
}
