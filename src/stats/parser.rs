//! Generic traits for parsing pseudo-file statistics into structured types.
//!
//! - [`KeyValueStat`]: multi-line files with one `key value [unit]` entry per line,
//!   such as `cpu.stat` or `/proc/meminfo`.
//! - [`SingleLineStat`]: single-line files such as `cpu.max` or `memory.current`.
//!
//! # Example: Implementing `KeyValueStat`
//!
//! ```rust
//! use std::collections::HashMap;
//! use std::sync::OnceLock;
//! use sysres::stats::KeyValueStat;
//!
//! #[derive(Default)]
//! struct MyStat {
//!     foo: u64,
//! }
//!
//! impl MyStat {
//!     fn set_foo(&mut self, foo: u64) {
//!         self.foo = foo;
//!     }
//! }
//!
//! static HANDLERS: OnceLock<HashMap<&'static str, fn(&mut MyStat, u64)>> = OnceLock::new();
//!
//! impl KeyValueStat for MyStat {
//!     fn field_handlers() -> &'static HashMap<&'static str, fn(&mut Self, u64)> {
//!         HANDLERS.get_or_init(|| {
//!             let mut map = HashMap::new();
//!             map.insert("foo", MyStat::set_foo as fn(&mut MyStat, u64));
//!             map
//!         })
//!     }
//! }
//!
//! let stat = MyStat::from_reader(&mut "foo 42\nbar 7\n".as_bytes()).unwrap();
//! assert_eq!(stat.foo, 42);
//! ```

use std::collections::{HashMap, HashSet};
use std::io::BufRead;

use super::StatParseError;

/// A trait for parsing key-value style files.
///
/// Each line is split on whitespace; the first token is the key and the second
/// the value. Further tokens (e.g. the `kB` unit in `/proc/meminfo`) are ignored.
pub trait KeyValueStat: Default
where
    Self: 'static,
{
    /// If `false`, encountering the same known key twice is an error.
    const ALLOW_DUPLICATE_KEYS: bool = false;

    /// Returns a map of known keys to the handlers applying their values.
    fn field_handlers() -> &'static HashMap<&'static str, fn(&mut Self, u64)>;

    /// Parses a key-value formatted buffer.
    ///
    /// Unknown keys are ignored (see [`KeyValueStat::on_unknown_key`]). Once every
    /// known key has been seen, the rest of the input is not read.
    ///
    /// # Errors
    ///
    /// Returns an `io::Error` if reading fails, or a wrapped [`StatParseError`] if a
    /// known key has a non-numeric value or appears twice.
    fn from_reader<R: BufRead>(buf: &mut R) -> std::io::Result<Self> {
        let mut stat = Self::default();
        let handlers = Self::field_handlers();
        let mut seen_keys = HashSet::with_capacity(handlers.len());

        let mut line = String::new();
        let mut lineno = 0;
        while buf.read_line(&mut line)? != 0 {
            lineno += 1;
            let mut parts = line.split_whitespace();
            if let (Some(key), Some(val)) = (parts.next(), parts.next()) {
                Self::parse_and_set(key, val, &mut stat, lineno, handlers, &mut seen_keys)?;
            }
            if !Self::ALLOW_DUPLICATE_KEYS && seen_keys.len() == handlers.len() {
                break;
            }

            line.clear();
        }

        Ok(stat)
    }

    /// Parses a single key-value pair and applies it through the matching handler.
    ///
    /// # Errors
    ///
    /// Returns [`StatParseError::InvalidKeyValue`] if the value is not a `u64`, or
    /// [`StatParseError::DuplicateField`] if the key repeats and duplicates are disallowed.
    fn parse_and_set(
        key: &str,
        val: &str,
        stat: &mut Self,
        lineno: usize,
        handlers: &'static HashMap<&'static str, fn(&mut Self, u64)>,
        seen_keys: &mut HashSet<&'static str>,
    ) -> std::io::Result<()> {
        let Some((&k, handler)) = handlers.get_key_value(key) else {
            return Self::on_unknown_key(key, val, lineno);
        };

        let parsed = val
            .parse::<u64>()
            .map_err(|source| StatParseError::InvalidKeyValue {
                key: key.to_string(),
                value: val.to_string(),
                line: lineno,
                source,
            })?;
        if !Self::ALLOW_DUPLICATE_KEYS && !seen_keys.insert(k) {
            return Err(StatParseError::DuplicateField {
                field: key.to_string(),
                line: lineno,
            }
            .into());
        }
        handler(stat, parsed);
        Ok(())
    }

    /// Called for keys missing from [`KeyValueStat::field_handlers`]. Ignores them by default.
    #[inline]
    fn on_unknown_key(_key: &str, _val: &str, _lineno: usize) -> std::io::Result<()> {
        Ok(())
    }
}

/// A trait for parsing single-line statistics such as `cpu.max` or `memory.current`.
pub trait SingleLineStat: Sized {
    /// Parses the first line of the provided buffered reader.
    ///
    /// # Errors
    ///
    /// Returns an `io::Error` if reading fails or the line is malformed.
    fn from_reader<R: BufRead>(buf: &mut R) -> std::io::Result<Self>;
}

/// Reads the first line of `buf` and returns it trimmed.
pub(crate) fn read_first_line<R: BufRead>(buf: &mut R) -> std::io::Result<String> {
    let mut line = String::new();
    buf.read_line(&mut line)?;
    Ok(line.trim().to_owned())
}

/// Parses `value` as an integer, reporting it as line 1 of a single-line file.
pub(crate) fn parse_single<T>(value: &str) -> Result<T, StatParseError>
where
    T: std::str::FromStr<Err = std::num::ParseIntError>,
{
    value
        .parse::<T>()
        .map_err(|source| StatParseError::InvalidValue {
            value: value.to_string(),
            line: 1,
            source,
        })
}
