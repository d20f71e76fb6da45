//! Precipitation units and conversions.
//!
//! Precipitation arrives as rates (`kg m-2 s-1`, `mm/day`), as depths per
//! calendar period (`mm/month`), or as bare depths whose period is implied by
//! the product (ERA5 monthly means store `m` of water per day). The pipeline
//! works in millimetres per day throughout; every source is converted on
//! ingestion, before any spatial or temporal averaging.
//!
//! # Quick Start
//!
//! ```
//! use hydrobench_core::units::{Period, Units};
//!
//! let flux = Units::parse("kg m-2 s-1").unwrap();
//! assert_eq!(flux.period(), Period::Second);
//! assert_eq!(flux.depth_mm(), 1.0);
//!
//! // A depth of water per second is 86400 of the same depth per day
//! assert_eq!(flux.fixed_factor_to_mm_per_day(), Some(86_400.0));
//!
//! let cru = Units::parse("mm/month").unwrap();
//! assert_eq!(cru.fixed_factor_to_mm_per_day(), None); // depends on the month
//! ```
//!
//! # Supported Symbols
//!
//! | Kind | Symbols |
//! |------|---------|
//! | Length | `m`, `cm`, `mm` |
//! | Mass (water, 1000 kg/m³) | `kg`, `g` |
//! | Time | `s`, `min`, `h`/`hr`/`hour`, `d`/`day`, `month`/`mon`, `yr`/`year` |

pub mod conversion;
pub mod parser;

pub use conversion::{flux_to_depth, inverse_log_transform, to_mm_per_day};

use crate::errors::{BenchError, BenchResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Accumulation period of a precipitation unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Period {
    Second,
    Minute,
    Hour,
    Day,
    /// A calendar month; length depends on the date and calendar
    Month,
    /// A calendar year; length depends on the date and calendar
    Year,
    /// A fixed number of seconds, e.g. a model time step
    Seconds(f64),
}

impl Period {
    /// Length in seconds, or `None` for calendar-dependent periods.
    pub fn fixed_seconds(self) -> Option<f64> {
        match self {
            Period::Second => Some(1.0),
            Period::Minute => Some(60.0),
            Period::Hour => Some(3_600.0),
            Period::Day => Some(86_400.0),
            Period::Seconds(s) => Some(s),
            Period::Month | Period::Year => None,
        }
    }

    fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "s" | "sec" | "second" | "seconds" => Some(Period::Second),
            "min" | "minute" | "minutes" => Some(Period::Minute),
            "h" | "hr" | "hour" | "hours" => Some(Period::Hour),
            "d" | "day" | "days" => Some(Period::Day),
            "month" | "mon" | "months" => Some(Period::Month),
            "yr" | "year" | "years" | "a" => Some(Period::Year),
            _ => None,
        }
    }

    fn symbol(self) -> String {
        match self {
            Period::Second => "s".to_string(),
            Period::Minute => "min".to_string(),
            Period::Hour => "h".to_string(),
            Period::Day => "day".to_string(),
            Period::Month => "month".to_string(),
            Period::Year => "yr".to_string(),
            Period::Seconds(s) => format!("({s} s)"),
        }
    }
}

/// A precipitation unit: a depth of water accumulated over a period.
///
/// # Equality
///
/// Two units are equal if they describe the same depth over the same period,
/// so `mm/day == kg m-2 day-1`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Units {
    /// The original input string (preserved for display).
    original: String,
    /// Millimetres of water per unit of the numerator
    depth_mm: f64,
    period: Period,
}

impl PartialEq for Units {
    fn eq(&self, other: &Self) -> bool {
        self.depth_mm == other.depth_mm && self.period == other.period
    }
}

impl fmt::Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.original)
    }
}

enum Symbol {
    Length(f64),
    Mass(f64),
    Time(Period),
}

fn classify(symbol: &str) -> Option<Symbol> {
    match symbol {
        "m" => Some(Symbol::Length(1.0)),
        "cm" => Some(Symbol::Length(0.01)),
        "mm" => Some(Symbol::Length(0.001)),
        "kg" => Some(Symbol::Mass(1.0)),
        "g" => Some(Symbol::Mass(0.001)),
        other => Period::from_symbol(other).map(Symbol::Time),
    }
}

impl Units {
    /// The canonical working unit.
    pub fn mm_per_day() -> Self {
        Self {
            original: "mm/day".to_string(),
            depth_mm: 1.0,
            period: Period::Day,
        }
    }

    /// A depth of `depth_mm` millimetres accumulated over `period`.
    pub fn depth_per(depth_mm: f64, period: Period) -> Self {
        let original = if depth_mm == 1.0 {
            format!("mm/{}", period.symbol())
        } else {
            format!("{depth_mm} mm/{}", period.symbol())
        };
        Self {
            original,
            depth_mm,
            period,
        }
    }

    /// Parses a precipitation unit string.
    ///
    /// The numerator must be a length (`m`, `mm`) or a water mass per area
    /// (`kg m-2`, 1 kg m-2 = 1 mm). A unit with no time component is read as
    /// a depth per day.
    pub fn parse(input: &str) -> BenchResult<Self> {
        let unsupported = |reason: String| BenchError::UnsupportedUnit {
            unit: input.to_string(),
            reason,
        };
        let components = parser::parse_components(input).map_err(|e| unsupported(e.to_string()))?;

        let mut scale = 1.0;
        let mut length_exponent = 0;
        let mut mass_exponent = 0;
        let mut period = None;
        for (symbol, exponent) in &components {
            match classify(symbol) {
                Some(Symbol::Length(factor)) => {
                    length_exponent += exponent;
                    scale *= factor.powi(*exponent);
                }
                Some(Symbol::Mass(factor)) => {
                    mass_exponent += exponent;
                    scale *= factor.powi(*exponent);
                }
                Some(Symbol::Time(p)) => {
                    if *exponent != -1 || period.is_some() {
                        return Err(unsupported(
                            "expected a single time unit in the denominator".to_string(),
                        ));
                    }
                    period = Some(p);
                }
                None => return Err(unsupported(format!("unknown symbol '{symbol}'"))),
            }
        }

        let depth_mm = match (mass_exponent, length_exponent) {
            // metres of water
            (0, 1) => scale * 1000.0,
            // kg of water per m^2 is one millimetre
            (1, -2) => scale,
            _ => {
                return Err(unsupported(
                    "not a depth of water or a water mass per area".to_string(),
                ))
            }
        };

        Ok(Self {
            original: input.to_string(),
            depth_mm,
            period: period.unwrap_or(Period::Day),
        })
    }

    /// Returns the original input string.
    pub fn original(&self) -> &str {
        &self.original
    }

    /// Millimetres of water per unit value.
    pub fn depth_mm(&self) -> f64 {
        self.depth_mm
    }

    pub fn period(&self) -> Period {
        self.period
    }

    /// Returns true if this unit is millimetres per day.
    pub fn is_mm_per_day(&self) -> bool {
        *self == Self::mm_per_day()
    }

    /// Multiplier to mm/day, or `None` when the period is a calendar month or year.
    pub fn fixed_factor_to_mm_per_day(&self) -> Option<f64> {
        self.period
            .fixed_seconds()
            .map(|seconds| self.depth_mm * 86_400.0 / seconds)
    }
}
