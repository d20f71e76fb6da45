//! Calendar systems and the canonical time axis.
//!
//! Precipitation archives encode time in several ways: CF-style offsets
//! (`days since 1850-01-01`) in calendars such as `360_day` or `noleap`,
//! ISO-8601 strings, or already-decoded fractional years. This module maps
//! all of them onto a single canonical axis of fractional years and answers
//! month-length questions in whichever calendar a source declares.
//!
//! # Examples
//!
//! ```rust
//! use hydrobench_core::calendar::{to_canonical_time, Calendar, TimeAxis};
//!
//! let axis = TimeAxis::cf(vec![0.0, 30.0, 60.0], "days since 2000-01-01", "360_day").unwrap();
//! let years = to_canonical_time(&axis).unwrap();
//! assert_eq!(years, vec![2000.0, 2000.0 + 30.0 / 360.0, 2000.0 + 60.0 / 360.0]);
//!
//! assert_eq!(Calendar::Day360.days_in_month(2001, 2).unwrap(), 30);
//! assert_eq!(Calendar::Standard.days_in_month(2000, 2).unwrap(), 29);
//! ```

use crate::errors::{BenchError, BenchResult};
use crate::field::GriddedField;
use crate::units::{Period, Units};
use chrono::{Datelike, NaiveDate};
use ndarray::Axis;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Julian Day Number of 1582-10-15, the first Gregorian day of the `standard` calendar.
const GREGORIAN_REFORM_JDN: i64 = 2_299_161;

/// Offset between chrono's days-from-CE count and the Julian Day Number.
const CE_TO_JDN: i64 = 1_721_425;

/// Largest supported absolute year. Keeps day-number arithmetic within `i64`.
pub const MAX_YEAR: i64 = 1_000_000;

/// Largest supported absolute day number in any calendar.
const MAX_DAY_NUMBER: i64 = (MAX_YEAR + 4801) * 366;

const CUMULATIVE_DAYS: [i64; 12] = [0, 31, 59, 90, 120, 151, 181, 212, 243, 273, 304, 334];
const CUMULATIVE_DAYS_LEAP: [i64; 12] = [0, 31, 60, 91, 121, 152, 182, 213, 244, 274, 305, 335];

/// Calendar system declared by a dataset (CF conventions).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Calendar {
    /// Mixed Julian/Gregorian calendar with the 1582 reform.
    #[default]
    #[serde(rename = "standard")]
    Standard,
    #[serde(rename = "proleptic_gregorian")]
    ProlepticGregorian,
    #[serde(rename = "julian")]
    Julian,
    /// Every year has 365 days.
    #[serde(rename = "noleap")]
    NoLeap,
    /// Every year has 366 days.
    #[serde(rename = "all_leap")]
    AllLeap,
    /// Twelve months of thirty days.
    #[serde(rename = "360_day")]
    Day360,
}

impl FromStr for Calendar {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "standard" | "gregorian" => Ok(Calendar::Standard),
            "proleptic_gregorian" => Ok(Calendar::ProlepticGregorian),
            "julian" => Ok(Calendar::Julian),
            "noleap" | "no_leap" | "365_day" => Ok(Calendar::NoLeap),
            "all_leap" | "366_day" => Ok(Calendar::AllLeap),
            "360_day" => Ok(Calendar::Day360),
            other => Err(BenchError::Calendar {
                value: other.to_string(),
                reason: "unrecognised calendar".to_string(),
            }),
        }
    }
}

impl fmt::Display for Calendar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Calendar::Standard => "standard",
            Calendar::ProlepticGregorian => "proleptic_gregorian",
            Calendar::Julian => "julian",
            Calendar::NoLeap => "noleap",
            Calendar::AllLeap => "all_leap",
            Calendar::Day360 => "360_day",
        };
        write!(f, "{name}")
    }
}

fn gregorian_leap(year: i64) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

fn julian_jdn(year: i64, month: i64, day: i64) -> i64 {
    let a = (14 - month) / 12;
    let y = year + 4800 - a;
    let m = month + 12 * a - 3;
    day + (153 * m + 2) / 5 + 365 * y + y / 4 - 32083
}

fn julian_from_jdn(jdn: i64) -> (i64, u32, u32) {
    let c = jdn + 32082;
    let d = (4 * c + 3) / 1461;
    let e = c - 1461 * d / 4;
    let m = (5 * e + 2) / 153;
    let day = e - (153 * m + 2) / 5 + 1;
    let month = m + 3 - 12 * (m / 10);
    let year = d - 4800 + m / 10;
    (year, month as u32, day as u32)
}

fn gregorian_jdn(year: i64, month: u32, day: u32) -> Option<i64> {
    let year = i32::try_from(year).ok()?;
    NaiveDate::from_ymd_opt(year, month, day).map(|d| d.num_days_from_ce() as i64 + CE_TO_JDN)
}

fn gregorian_from_jdn(jdn: i64) -> Option<(i64, u32, u32)> {
    let days = i32::try_from(jdn - CE_TO_JDN).ok()?;
    NaiveDate::from_num_days_from_ce_opt(days).map(|d| (d.year() as i64, d.month(), d.day()))
}

fn month_from_ordinal(ordinal: i64, table: &[i64; 12]) -> (u32, u32) {
    let index = table.iter().rposition(|start| *start <= ordinal).unwrap_or(0);
    (index as u32 + 1, (ordinal - table[index]) as u32 + 1)
}

fn year_out_of_range(value: f64) -> BenchError {
    BenchError::Calendar {
        value: value.to_string(),
        reason: format!("year outside the supported range of ±{MAX_YEAR}"),
    }
}

fn invalid_date(year: i64, month: u32, day: u32, calendar: Calendar) -> BenchError {
    BenchError::Calendar {
        value: format!("{year:04}-{month:02}-{day:02}"),
        reason: format!("not a valid date in the {calendar} calendar"),
    }
}

impl Calendar {
    fn is_leap_year(self, year: i64) -> bool {
        match self {
            Calendar::NoLeap | Calendar::Day360 => false,
            Calendar::AllLeap => true,
            Calendar::Julian => year.rem_euclid(4) == 0,
            Calendar::ProlepticGregorian => gregorian_leap(year),
            Calendar::Standard => {
                if year < 1582 {
                    year.rem_euclid(4) == 0
                } else {
                    gregorian_leap(year)
                }
            }
        }
    }

    /// Month length ignoring the days removed by the 1582 reform.
    fn nominal_month_length(self, year: i64, month: u32) -> u32 {
        match (self, month) {
            (Calendar::Day360, _) => 30,
            (_, 2) if self.is_leap_year(year) => 29,
            (_, 2) => 28,
            (_, 4 | 6 | 9 | 11) => 30,
            _ => 31,
        }
    }

    /// Continuous day count for a date.
    ///
    /// Julian-family calendars count Julian Day Numbers; the fixed-length
    /// calendars use their own origin. Only differences between day numbers
    /// of the same calendar are meaningful.
    pub fn day_number(self, year: i64, month: u32, day: u32) -> BenchResult<i64> {
        if !(-MAX_YEAR..=MAX_YEAR).contains(&year) {
            return Err(year_out_of_range(year as f64));
        }
        if !(1..=12).contains(&month) || day == 0 || day > self.nominal_month_length(year, month) {
            return Err(invalid_date(year, month, day, self));
        }
        let m = month as usize - 1;
        let d = day as i64 - 1;
        match self {
            Calendar::Day360 => Ok(year * 360 + m as i64 * 30 + d),
            Calendar::NoLeap => Ok(year * 365 + CUMULATIVE_DAYS[m] + d),
            Calendar::AllLeap => Ok(year * 366 + CUMULATIVE_DAYS_LEAP[m] + d),
            Calendar::Julian => Ok(julian_jdn(year, month as i64, day as i64)),
            Calendar::ProlepticGregorian => {
                gregorian_jdn(year, month, day).ok_or_else(|| invalid_date(year, month, day, self))
            }
            Calendar::Standard => {
                if (year, month, day) < (1582, 10, 15) {
                    let jdn = julian_jdn(year, month as i64, day as i64);
                    if jdn >= GREGORIAN_REFORM_JDN {
                        // 1582-10-05 ..= 1582-10-14 were skipped
                        return Err(invalid_date(year, month, day, self));
                    }
                    Ok(jdn)
                } else {
                    gregorian_jdn(year, month, day)
                        .ok_or_else(|| invalid_date(year, month, day, self))
                }
            }
        }
    }

    /// Inverse of [`day_number`](Self::day_number).
    pub fn date_from_day_number(self, number: i64) -> BenchResult<(i64, u32, u32)> {
        let out_of_range = || BenchError::Calendar {
            value: number.to_string(),
            reason: format!("day number outside the supported {self} range"),
        };
        if !(-MAX_DAY_NUMBER..=MAX_DAY_NUMBER).contains(&number) {
            return Err(out_of_range());
        }
        match self {
            Calendar::Day360 => {
                let year = number.div_euclid(360);
                let ordinal = number.rem_euclid(360);
                Ok((year, (ordinal / 30) as u32 + 1, (ordinal % 30) as u32 + 1))
            }
            Calendar::NoLeap => {
                let (month, day) = month_from_ordinal(number.rem_euclid(365), &CUMULATIVE_DAYS);
                Ok((number.div_euclid(365), month, day))
            }
            Calendar::AllLeap => {
                let (month, day) =
                    month_from_ordinal(number.rem_euclid(366), &CUMULATIVE_DAYS_LEAP);
                Ok((number.div_euclid(366), month, day))
            }
            Calendar::Julian => Ok(julian_from_jdn(number)),
            Calendar::ProlepticGregorian => gregorian_from_jdn(number).ok_or_else(out_of_range),
            Calendar::Standard => {
                if number >= GREGORIAN_REFORM_JDN {
                    gregorian_from_jdn(number).ok_or_else(out_of_range)
                } else {
                    Ok(julian_from_jdn(number))
                }
            }
        }
    }

    /// Number of days in a month of this calendar.
    ///
    /// Accounts for the ten days dropped from October 1582 in the `standard` calendar.
    pub fn days_in_month(self, year: i64, month: u32) -> BenchResult<u32> {
        let start = self.day_number(year, month, 1)?;
        let next = if month == 12 {
            self.day_number(year + 1, 1, 1)?
        } else {
            self.day_number(year, month + 1, 1)?
        };
        Ok((next - start) as u32)
    }

    /// Number of days in a year of this calendar.
    pub fn days_in_year(self, year: i64) -> BenchResult<u32> {
        let start = self.day_number(year, 1, 1)?;
        Ok((self.day_number(year + 1, 1, 1)? - start) as u32)
    }

    /// Fractional year for a day number plus a fraction of that day.
    fn fractional_year(self, number: i64, day_fraction: f64) -> BenchResult<f64> {
        let (year, _, _) = self.date_from_day_number(number)?;
        let start = self.day_number(year, 1, 1)?;
        let length = self.days_in_year(year)? as f64;
        Ok(year as f64 + ((number - start) as f64 + day_fraction) / length)
    }

    /// Calendar `(year, month)` of a canonical fractional-year value.
    pub fn year_month(self, time: f64) -> BenchResult<(i64, u32)> {
        if !time.is_finite() {
            return Err(BenchError::Calendar {
                value: time.to_string(),
                reason: "time value is not finite".to_string(),
            });
        }
        if time.abs() > MAX_YEAR as f64 {
            return Err(year_out_of_range(time));
        }
        let year = time.floor() as i64;
        let start = self.day_number(year, 1, 1)?;
        let length = self.days_in_year(year)? as i64;
        // Nudge up so values produced by `fractional_year` land on their own day
        let offset = (((time - year as f64) * length as f64) + 1e-6).floor() as i64;
        let (y, m, _) = self.date_from_day_number(start + offset.clamp(0, length - 1))?;
        Ok((y, m))
    }
}

/// Unit of a CF `<unit> since <epoch>` time encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeUnit {
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl TimeUnit {
    /// Length of one unit in days.
    pub fn days(self) -> f64 {
        match self {
            TimeUnit::Seconds => 1.0 / 86_400.0,
            TimeUnit::Minutes => 1.0 / 1_440.0,
            TimeUnit::Hours => 1.0 / 24.0,
            TimeUnit::Days => 1.0,
        }
    }
}

impl FromStr for TimeUnit {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "seconds" | "second" | "secs" | "sec" | "s" => Ok(TimeUnit::Seconds),
            "minutes" | "minute" | "mins" | "min" => Ok(TimeUnit::Minutes),
            "hours" | "hour" | "hrs" | "hr" | "h" => Ok(TimeUnit::Hours),
            "days" | "day" | "d" => Ok(TimeUnit::Days),
            other => Err(BenchError::Calendar {
                value: other.to_string(),
                reason: "unsupported time unit (months and years have no fixed length)"
                    .to_string(),
            }),
        }
    }
}

/// A calendar date with a time of day, independent of any calendar's validity rules.
///
/// Parsed by hand because chrono rejects dates such as `2000-02-30` that are
/// valid in a 360-day calendar. Validation happens when the date is mapped
/// into a [`Calendar`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalendarDateTime {
    pub year: i64,
    pub month: u32,
    pub day: u32,
    pub seconds_of_day: f64,
}

impl FromStr for CalendarDateTime {
    type Err = BenchError;

    /// Accepts `YYYY-MM`, `YYYY-MM-DD` and `YYYY-MM-DD[T ]HH:MM[:SS[.fff]]` with an optional `Z`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = |reason: &str| BenchError::Calendar {
            value: s.to_string(),
            reason: reason.to_string(),
        };
        let trimmed = s.trim().trim_end_matches('Z');
        let (date, time) = match trimmed.find(['T', ' ']) {
            Some(i) => (&trimmed[..i], Some(trimmed[i + 1..].trim())),
            None => (trimmed, None),
        };

        let parts: Vec<&str> = date.split('-').collect();
        if parts.len() < 2 || parts.len() > 3 {
            return Err(malformed("expected YYYY-MM or YYYY-MM-DD"));
        }
        let year = parts[0]
            .parse::<i64>()
            .map_err(|_| malformed("invalid year"))?;
        let month = parts[1]
            .parse::<u32>()
            .map_err(|_| malformed("invalid month"))?;
        let day = match parts.get(2) {
            Some(d) => d.parse::<u32>().map_err(|_| malformed("invalid day"))?,
            None => 1,
        };

        let mut seconds_of_day = 0.0;
        if let Some(time) = time.filter(|t| !t.is_empty()) {
            let fields: Vec<&str> = time.split(':').collect();
            if fields.len() > 3 {
                return Err(malformed("invalid time of day"));
            }
            let scales = [3600.0, 60.0, 1.0];
            for (field, scale) in fields.iter().zip(scales) {
                let value = field
                    .parse::<f64>()
                    .map_err(|_| malformed("invalid time of day"))?;
                seconds_of_day += value * scale;
            }
            if !(0.0..86_400.0).contains(&seconds_of_day) {
                return Err(malformed("time of day out of range"));
            }
        }

        Ok(Self {
            year,
            month,
            day,
            seconds_of_day,
        })
    }
}

/// How the raw values of a [`TimeAxis`] are encoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TimeEncoding {
    /// Canonical fractional years.
    FractionalYear,
    /// CF offsets: `<unit> since <epoch>`.
    Offsets {
        unit: TimeUnit,
        epoch: CalendarDateTime,
    },
    /// ISO-8601 date strings.
    Iso,
}

impl TimeEncoding {
    /// Parses a CF units attribute such as `hours since 1900-01-01 00:00:0.0`.
    pub fn parse_cf(units: &str) -> BenchResult<Self> {
        let (unit, epoch) = units
            .split_once(" since ")
            .ok_or_else(|| BenchError::Calendar {
                value: units.to_string(),
                reason: "expected '<unit> since <epoch>'".to_string(),
            })?;
        Ok(TimeEncoding::Offsets {
            unit: unit.parse()?,
            epoch: epoch.parse()?,
        })
    }
}

/// Raw time coordinate values as delivered by a source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RawTimes {
    Numeric(Vec<f64>),
    Text(Vec<String>),
}

impl RawTimes {
    pub fn len(&self) -> usize {
        match self {
            RawTimes::Numeric(v) => v.len(),
            RawTimes::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn select(&self, indices: &[usize]) -> Self {
        match self {
            RawTimes::Numeric(v) => RawTimes::Numeric(indices.iter().map(|i| v[*i]).collect()),
            RawTimes::Text(v) => RawTimes::Text(indices.iter().map(|i| v[*i].clone()).collect()),
        }
    }
}

/// Time coordinate of a gridded field: raw values, their encoding and calendar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeAxis {
    raw: RawTimes,
    encoding: TimeEncoding,
    calendar: Calendar,
}

impl TimeAxis {
    /// An axis already on the canonical fractional-year scale.
    pub fn fractional_years(values: Vec<f64>, calendar: Calendar) -> Self {
        Self {
            raw: RawTimes::Numeric(values),
            encoding: TimeEncoding::FractionalYear,
            calendar,
        }
    }

    /// An axis of CF offsets, e.g. `units = "days since 1949-12-01"`, `calendar = "360_day"`.
    pub fn cf(values: Vec<f64>, units: &str, calendar: &str) -> BenchResult<Self> {
        Ok(Self {
            raw: RawTimes::Numeric(values),
            encoding: TimeEncoding::parse_cf(units)?,
            calendar: calendar.parse()?,
        })
    }

    /// An axis of ISO-8601 date strings.
    pub fn iso<S: Into<String>>(values: Vec<S>, calendar: Calendar) -> Self {
        Self {
            raw: RawTimes::Text(values.into_iter().map(Into::into).collect()),
            encoding: TimeEncoding::Iso,
            calendar,
        }
    }

    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    pub fn raw(&self) -> &RawTimes {
        &self.raw
    }

    pub fn encoding(&self) -> &TimeEncoding {
        &self.encoding
    }

    pub fn calendar(&self) -> Calendar {
        self.calendar
    }

    /// Returns true if the raw values are already canonical fractional years.
    pub fn is_canonical(&self) -> bool {
        self.encoding == TimeEncoding::FractionalYear
    }

    /// Canonical values, if the axis is already canonical.
    pub fn canonical_values(&self) -> Option<&[f64]> {
        match (&self.encoding, &self.raw) {
            (TimeEncoding::FractionalYear, RawTimes::Numeric(v)) => Some(v),
            _ => None,
        }
    }

    /// A new axis keeping only the given time indices.
    pub fn select(&self, indices: &[usize]) -> Self {
        Self {
            raw: self.raw.select(indices),
            encoding: self.encoding.clone(),
            calendar: self.calendar,
        }
    }
}

fn non_finite(value: f64) -> BenchError {
    BenchError::Calendar {
        value: value.to_string(),
        reason: "time value is not finite".to_string(),
    }
}

/// Converts a time axis to canonical fractional years in its own calendar.
///
/// A value `y + f` means "fraction `f` of the way through year `y`", where the
/// year length comes from the declared calendar. Any value that cannot be
/// mapped to a valid date fails with [`BenchError::Calendar`].
pub fn to_canonical_time(axis: &TimeAxis) -> BenchResult<Vec<f64>> {
    let calendar = axis.calendar;
    match (&axis.encoding, &axis.raw) {
        (TimeEncoding::FractionalYear, RawTimes::Numeric(values)) => values
            .iter()
            .map(|&v| {
                if !v.is_finite() {
                    Err(non_finite(v))
                } else if v.abs() > MAX_YEAR as f64 {
                    Err(year_out_of_range(v))
                } else {
                    Ok(v)
                }
            })
            .collect(),
        (TimeEncoding::Offsets { unit, epoch }, RawTimes::Numeric(values)) => {
            let epoch_day = calendar.day_number(epoch.year, epoch.month, epoch.day)?;
            let epoch_fraction = epoch.seconds_of_day / 86_400.0;
            values
                .iter()
                .map(|v| {
                    if !v.is_finite() {
                        return Err(non_finite(*v));
                    }
                    let total = v * unit.days() + epoch_fraction;
                    let whole = total.floor();
                    if whole.abs() > MAX_DAY_NUMBER as f64 {
                        return Err(BenchError::Calendar {
                            value: v.to_string(),
                            reason: format!(
                                "offset lies beyond the supported range of ±{MAX_YEAR} years"
                            ),
                        });
                    }
                    calendar.fractional_year(epoch_day + whole as i64, total - whole)
                })
                .collect()
        }
        (TimeEncoding::Iso, RawTimes::Text(values)) => values
            .iter()
            .map(|v| {
                let date: CalendarDateTime = v.parse()?;
                let number = calendar.day_number(date.year, date.month, date.day)?;
                calendar.fractional_year(number, date.seconds_of_day / 86_400.0)
            })
            .collect(),
        (encoding, _) => Err(BenchError::Calendar {
            value: format!("{encoding:?}"),
            reason: "raw time values do not match their declared encoding".to_string(),
        }),
    }
}

/// Days in the calendar month of every time step.
pub fn month_lengths(axis: &TimeAxis) -> BenchResult<Vec<u32>> {
    let calendar = axis.calendar;
    to_canonical_time(axis)?
        .into_iter()
        .map(|t| {
            let (year, month) = calendar.year_month(t)?;
            calendar.days_in_month(year, month)
        })
        .collect()
}

/// Days in the calendar year of every time step.
pub fn year_lengths(axis: &TimeAxis) -> BenchResult<Vec<u32>> {
    let calendar = axis.calendar;
    to_canonical_time(axis)?
        .into_iter()
        .map(|t| {
            let (year, _) = calendar.year_month(t)?;
            calendar.days_in_year(year)
        })
        .collect()
}

/// Returns the field with its time axis rewritten to canonical fractional years.
///
/// The calendar is kept so month lengths stay recoverable after normalization.
pub fn normalize_time(field: &GriddedField) -> BenchResult<GriddedField> {
    if field.time().is_canonical() {
        to_canonical_time(field.time())?;
        return Ok(field.clone());
    }
    let canonical = to_canonical_time(field.time())?;
    field.with_time(TimeAxis::fractional_years(
        canonical,
        field.time().calendar(),
    ))
}

/// Multiplies each monthly-mean time step by the number of days in its month.
///
/// Turns a mean daily rate (mm/day) into a monthly total (mm/month) using the
/// source's own calendar. Fails with [`BenchError::UnsupportedUnit`] unless
/// the field is a depth per day.
pub fn expand_monthly_to_cumulative(field: &GriddedField) -> BenchResult<GriddedField> {
    let units = field.units();
    if units.period() != Period::Day {
        return Err(BenchError::UnsupportedUnit {
            unit: units.original().to_string(),
            reason: "monthly totals need a mean daily rate".to_string(),
        });
    }
    let lengths = month_lengths(field.time())?;
    let mut values = field.values().clone();
    for (mut step, days) in values.axis_iter_mut(Axis(0)).zip(lengths) {
        step *= days as f64;
    }
    field.with_values_and_units(values, Units::depth_per(units.depth_mm(), Period::Month))
}
