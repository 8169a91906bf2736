//! Flat-argument configuration.
//!
//! Components that can be configured from a command line implement
//! [`Configurable`]. Options are single-letter flags (`-N 3`); a lone `--`
//! separates a component's own options from those of a nested component,
//! e.g. `-W gmm -I 1 -- -N 3 -S 42`.

use crate::error::{Error, Result};
use std::fmt;

/// Separator between a component's options and its nested component's.
pub const NESTED_SEPARATOR: &str = "--";

/// Help entry for one option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionDescription {
    /// Flag letter, without the dash.
    pub flag: char,
    /// Usage synopsis, e.g. `-N <num>`.
    pub synopsis: &'static str,
    /// What the option does.
    pub description: &'static str,
}

impl fmt::Display for OptionDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\n\t{}", self.synopsis, self.description)
    }
}

/// A component that can be configured from a flat argument list.
pub trait Configurable {
    /// Consume the options this component understands from `options`.
    ///
    /// Anything left in `options` afterwards is an error for the caller to
    /// report via [`check_for_remaining_options`].
    fn set_options(&mut self, options: &mut Vec<String>) -> Result<()> {
        let _ = options;
        Ok(())
    }

    /// Current settings, suitable for passing back to `set_options`.
    fn options(&self) -> Vec<String> {
        Vec::new()
    }

    /// Help text for every option.
    fn describe_options(&self) -> Vec<OptionDescription> {
        Vec::new()
    }
}

fn position_of(flag: char, options: &[String]) -> Option<usize> {
    let wanted = format!("-{flag}");
    options
        .iter()
        .take_while(|o| o.as_str() != NESTED_SEPARATOR)
        .position(|o| *o == wanted)
}

/// Remove `-<flag> <value>` from `options` and return the value.
///
/// Only looks before the nested separator. A flag with no following value is
/// an error.
pub fn get_option(flag: char, options: &mut Vec<String>) -> Result<Option<String>> {
    let Some(i) = position_of(flag, options) else {
        return Ok(None);
    };
    if i + 1 >= options.len() || options[i + 1] == NESTED_SEPARATOR {
        return Err(Error::Config(format!("no value given for -{flag} option")));
    }
    let value = options.remove(i + 1);
    options.remove(i);
    Ok(Some(value))
}

/// Parse `-<flag> <value>` as a number.
pub fn get_parsed_option<T>(flag: char, options: &mut Vec<String>) -> Result<Option<T>>
where
    T: std::str::FromStr,
{
    match get_option(flag, options)? {
        Some(v) => v
            .parse()
            .map(Some)
            .map_err(|_| Error::Config(format!("invalid value '{v}' for -{flag} option"))),
        None => Ok(None),
    }
}

/// Remove a bare `-<flag>` from `options`, returning whether it was present.
pub fn get_flag(flag: char, options: &mut Vec<String>) -> bool {
    match position_of(flag, options) {
        Some(i) => {
            options.remove(i);
            true
        }
        None => false,
    }
}

/// Split off everything after the first `--` (the separator is dropped).
pub fn partition_options(options: &mut Vec<String>) -> Vec<String> {
    match options.iter().position(|o| o == NESTED_SEPARATOR) {
        Some(i) => {
            let nested = options.split_off(i + 1);
            options.truncate(i);
            nested
        }
        None => Vec::new(),
    }
}

/// Fail if any non-empty option was left unconsumed.
pub fn check_for_remaining_options(options: &[String]) -> Result<()> {
    let rest: Vec<&str> = options
        .iter()
        .map(String::as_str)
        .filter(|o| !o.is_empty())
        .collect();
    if rest.is_empty() {
        Ok(())
    } else {
        Err(Error::Config(format!("illegal options: {}", rest.join(" "))))
    }
}

/// Convenience for tests and callers holding string literals.
pub fn to_options<I, S>(args: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    args.into_iter().map(Into::into).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_option_stops_at_separator() {
        let mut opts = to_options(["-W", "gmm", "--", "-I", "5"]);
        assert_eq!(get_option('I', &mut opts).unwrap(), None);
        assert_eq!(get_option('W', &mut opts).unwrap(), Some("gmm".to_string()));
        assert_eq!(opts, to_options(["--", "-I", "5"]));
    }

    #[test]
    fn test_missing_value_is_error() {
        let mut opts = to_options(["-I"]);
        assert!(get_option('I', &mut opts).is_err());
        let mut opts = to_options(["-I", "--"]);
        assert!(get_option('I', &mut opts).is_err());
    }

    #[test]
    fn test_partition() {
        let mut opts = to_options(["-I", "1", "--", "-N", "3", "--", "-x"]);
        let nested = partition_options(&mut opts);
        assert_eq!(opts, to_options(["-I", "1"]));
        assert_eq!(nested, to_options(["-N", "3", "--", "-x"]));
    }

    #[test]
    fn test_parsed_and_flags() {
        let mut opts = to_options(["-b", "-N", "4"]);
        assert!(get_flag('b', &mut opts));
        assert!(!get_flag('b', &mut opts));
        assert_eq!(get_parsed_option::<usize>('N', &mut opts).unwrap(), Some(4));

        let mut bad = to_options(["-N", "four"]);
        assert!(get_parsed_option::<usize>('N', &mut bad).is_err());
    }

    #[test]
    fn test_remaining_options() {
        assert!(check_for_remaining_options(&to_options(["", ""])).is_ok());
        assert!(check_for_remaining_options(&to_options(["-Q"])).is_err());
    }
}
