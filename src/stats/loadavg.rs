use std::io::BufRead;

use super::parser::read_first_line;
use super::{SingleLineStat, StatParseError};

/// The 1-minute load average from `/proc/loadavg`.
///
/// The file reads `"0.52 0.58 0.59 1/467 12345"`; only the first field is kept.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LoadAvg {
    pub one: f64,
}

impl SingleLineStat for LoadAvg {
    fn from_reader<R: BufRead>(buf: &mut R) -> std::io::Result<Self> {
        let line = read_first_line(buf)?;
        let first = line
            .split_whitespace()
            .next()
            .ok_or(StatParseError::MissingField { field: "load1" })?;
        let one = first
            .parse::<f64>()
            .map_err(|source| StatParseError::InvalidDecimal {
                value: first.to_string(),
                line: 1,
                source,
            })?;

        Ok(LoadAvg { one })
    }
}
