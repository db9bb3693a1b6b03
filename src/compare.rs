//src/compare.rs
//! Direction of a reading relative to the one recorded before it.

use crate::models::HistoryEntry;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Equal,
    /// No previous value, or one of the two is not a number.
    None,
}

impl Direction {
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Up => "▲",
            Self::Down => "▼",
            Self::Equal => "=",
            Self::None => "",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Parses the whole trimmed value; trailing units make it non-numeric.
pub fn parse_reading(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| !v.is_nan())
}

pub fn compare(current: Option<&str>, previous: Option<&str>) -> Direction {
    let (Some(current), Some(previous)) = (current, previous) else {
        return Direction::None;
    };
    let (Some(current), Some(previous)) = (parse_reading(current), parse_reading(previous)) else {
        return Direction::None;
    };
    if current > previous {
        Direction::Up
    } else if current < previous {
        Direction::Down
    } else {
        Direction::Equal
    }
}

/// Compares every parameter of `entry` against its `previousParameters`.
pub fn compare_readings(entry: &HistoryEntry) -> BTreeMap<String, Direction> {
    entry
        .parameters
        .iter()
        .map(|(name, value)| {
            let previous = entry.previous_parameters.get(name).map(String::as_str);
            (name.clone(), compare(Some(value), previous))
        })
        .collect()
}
