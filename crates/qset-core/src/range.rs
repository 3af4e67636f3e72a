//! Range splitting — turns one `[start, end)` query into feasible sub-ranges.
//!
//! A dataset advertises the widest span a single bulk request may cover.
//! That width is either a fixed duration or the calendar-month sentinel.
//! Month-wide requests are aligned to month boundaries because the backing
//! store partitions by calendar month.
//!
//! For any `start < end` the produced sub-ranges are contiguous, strictly
//! non-empty, ascending, start at `start` and finish at `end`.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};

use crate::error::QsetError;

/// Token the service uses to mean "one calendar month".
pub const MONTH_SENTINEL: &str = "31d";

/// Maximum width of a single bulk request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaxRequestRange {
    /// Chunks end at the first instant of the next calendar month.
    CalendarMonth,
    /// Chunks are fixed strides of this (positive) duration.
    Fixed(Duration),
}

impl fmt::Display for MaxRequestRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CalendarMonth => write!(f, "calendar month"),
            Self::Fixed(d) => write!(f, "{}s", d.num_seconds()),
        }
    }
}

impl FromStr for MaxRequestRange {
    type Err = QsetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim();
        if token == MONTH_SENTINEL || token.eq_ignore_ascii_case("month") || token == "1mo" {
            return Ok(Self::CalendarMonth);
        }
        let secs = if let Some(iso) = token.strip_prefix('P') {
            parse_iso_duration(iso)
        } else {
            parse_unit_duration(token)
        }
        .ok_or_else(|| QsetError::InvalidQuery(format!("unrecognised request range {s:?}")))?;

        if secs <= 0 {
            return Err(QsetError::InvalidQuery(format!(
                "request range {s:?} must be positive"
            )));
        }
        Ok(Self::Fixed(Duration::seconds(secs)))
    }
}

// Upper bound keeps `Duration::seconds` away from its panic range.
const MAX_SECONDS: i64 = 1_000 * 366 * 86_400;

fn unit_seconds(unit: char) -> Option<i64> {
    match unit {
        'w' | 'W' => Some(7 * 86_400),
        'd' | 'D' => Some(86_400),
        'h' | 'H' => Some(3_600),
        'm' | 'M' => Some(60),
        's' | 'S' => Some(1),
        _ => None,
    }
}

/// Sum `<N><unit>` pairs, e.g. `7d`, `12h`, `1d12h`.
fn parse_unit_duration(s: &str) -> Option<i64> {
    let mut total: i64 = 0;
    let mut number = String::new();
    let mut saw_pair = false;
    for c in s.chars() {
        if c.is_ascii_digit() {
            number.push(c);
        } else {
            let n: i64 = number.parse().ok()?;
            total = total.checked_add(n.checked_mul(unit_seconds(c)?)?)?;
            number.clear();
            saw_pair = true;
        }
    }
    (saw_pair && number.is_empty() && total <= MAX_SECONDS).then_some(total)
}

/// ISO-8601 duration body after the leading `P`: `[nW][nD][T[nH][nM][nS]]`.
fn parse_iso_duration(body: &str) -> Option<i64> {
    let (date_part, time_part) = match body.split_once('T') {
        Some((d, t)) if !t.is_empty() => (d, Some(t)),
        Some(_) => return None,
        None => (body, None),
    };
    let mut total = 0i64;
    let mut any = false;
    for (part, units) in [(date_part, "WD"), (time_part.unwrap_or(""), "HMS")] {
        let mut number = String::new();
        for c in part.chars() {
            if c.is_ascii_digit() {
                number.push(c);
            } else if units.contains(c) {
                let n: i64 = number.parse().ok()?;
                total = total.checked_add(n.checked_mul(unit_seconds(c)?)?)?;
                number.clear();
                any = true;
            } else {
                return None;
            }
        }
        if !number.is_empty() {
            return None;
        }
    }
    (any && total <= MAX_SECONDS).then_some(total)
}

/// One bounded interval `[start, end)` within a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SubRange {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl fmt::Display for SubRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

fn start_of_next_month(dt: NaiveDateTime) -> Option<NaiveDateTime> {
    let (year, month) = match dt.month() {
        12 => (dt.year().checked_add(1)?, 1),
        m => (dt.year(), m + 1),
    };
    NaiveDate::from_ymd_opt(year, month, 1)?.and_hms_opt(0, 0, 0)
}

fn is_month_start(dt: NaiveDateTime) -> bool {
    dt.day() == 1 && dt.time() == chrono::NaiveTime::MIN
}

fn month_index(dt: NaiveDateTime) -> i64 {
    i64::from(dt.year()) * 12 + i64::from(dt.month0())
}

fn total_nanos(d: Duration) -> i128 {
    i128::from(d.num_seconds()) * 1_000_000_000 + i128::from(d.subsec_nanos())
}

/// Lazy, ordered sequence of sub-ranges. See [`split`].
#[derive(Debug, Clone)]
pub struct SubRanges {
    cursor: NaiveDateTime,
    end: NaiveDateTime,
    width: MaxRequestRange,
    remaining: usize,
}

impl Iterator for SubRanges {
    type Item = SubRange;

    fn next(&mut self) -> Option<SubRange> {
        if self.cursor >= self.end {
            return None;
        }
        let next = match self.width {
            MaxRequestRange::CalendarMonth => start_of_next_month(self.cursor),
            MaxRequestRange::Fixed(w) => self.cursor.checked_add_signed(w),
        }
        .map_or(self.end, |n| n.min(self.end));

        let range = SubRange {
            start: self.cursor,
            end: next,
        };
        self.cursor = next;
        self.remaining = self.remaining.saturating_sub(1);
        Some(range)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for SubRanges {}

/// Split `[start, end)` into request-sized sub-ranges.
///
/// Empty when `start >= end`.
pub fn split(start: NaiveDateTime, end: NaiveDateTime, width: &MaxRequestRange) -> SubRanges {
    SubRanges {
        cursor: start,
        end,
        width: *width,
        remaining: count(start, end, width),
    }
}

/// Number of sub-ranges [`split`] yields, computed without iterating.
pub fn count(start: NaiveDateTime, end: NaiveDateTime, width: &MaxRequestRange) -> usize {
    if start >= end {
        return 0;
    }
    match width {
        MaxRequestRange::CalendarMonth => {
            let whole = month_index(end) - month_index(start);
            let partial = i64::from(!is_month_start(end));
            (whole + partial) as usize
        }
        MaxRequestRange::Fixed(w) => {
            let span = total_nanos(end - start);
            let step = total_nanos(*w);
            if step <= 0 {
                return 0;
            }
            ((span + step - 1) / step) as usize
        }
    }
}
