use std::collections::HashMap;
use std::fmt;
use std::ops::Deref;
use std::str::FromStr;
use std::time::Duration;

use envconfig::Envconfig;
use thiserror::Error;

/// A setting that could not be loaded, either because the raw value is malformed
/// for its type or because it falls outside its valid range.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid value for {field}: {reason}")]
pub struct ConfigError {
    pub field: String,
    pub reason: String,
}

impl ConfigError {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl From<envconfig::Error> for ConfigError {
    fn from(error: envconfig::Error) -> Self {
        match error {
            envconfig::Error::EnvVarMissing { name } => {
                ConfigError::new(name, "required variable is not set")
            }
            envconfig::Error::ParseError { name } => {
                ConfigError::new(name, "value could not be parsed")
            }
        }
    }
}

/// A typed group of settings bound to environment variables.
///
/// Bindings are loaded once, before any service is constructed, and handed to
/// the service that owns them. A binding that fails validation never reaches a
/// service, so a service can rely on every field being in range.
pub trait Binding: Envconfig + Sized {
    /// Check every field against its valid range.
    fn validate(&self) -> Result<(), ConfigError>;

    /// Load from the process environment, applying defaults, then validate.
    fn load() -> Result<Self, ConfigError> {
        let binding = Self::init_from_env()?;
        binding.validate()?;
        Ok(binding)
    }

    /// Load from an explicit set of variables, applying defaults, then validate.
    fn load_from(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let binding = Self::init_from_hashmap(vars)?;
        binding.validate()?;
        Ok(binding)
    }
}

/// Fails with a [`ConfigError`] naming `field` unless `min <= value <= max`.
pub fn ensure_range<T>(field: &str, value: T, min: T, max: T) -> Result<(), ConfigError>
where
    T: PartialOrd + fmt::Display,
{
    if value < min || value > max {
        return Err(ConfigError::new(
            field,
            format!("must be between {min} and {max}, got {value}"),
        ));
    }
    Ok(())
}

/// Fails with a [`ConfigError`] naming `field` if `value` is shorter than `min`.
pub fn ensure_min_duration(
    field: &str,
    value: EnvDuration,
    min: Duration,
) -> Result<(), ConfigError> {
    if value.0 < min {
        return Err(ConfigError::new(
            field,
            format!("must be at least {}, got {value}", EnvDuration(min)),
        ));
    }
    Ok(())
}

/// A duration read from the environment in the `"30s"`, `"1m30s"`, `"250ms"` notation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct EnvDuration(pub Duration);

#[derive(Error, Debug, PartialEq, Eq)]
#[error("invalid duration {0:?}")]
pub struct ParseEnvDurationError(String);

impl FromStr for EnvDuration {
    type Err = ParseEnvDurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseEnvDurationError(s.to_owned());
        let input = s.trim();
        if input == "0" {
            return Ok(EnvDuration(Duration::ZERO));
        }
        if input.is_empty() {
            return Err(invalid());
        }

        let mut rest = input;
        let mut total_nanos: u128 = 0;
        while !rest.is_empty() {
            let number_len = rest
                .find(|c: char| !(c.is_ascii_digit() || c == '.'))
                .unwrap_or(rest.len());
            if number_len == 0 {
                return Err(invalid());
            }
            let (number, tail) = rest.split_at(number_len);

            let unit_len = tail
                .find(|c: char| c.is_ascii_digit() || c == '.')
                .unwrap_or(tail.len());
            let (unit, tail) = tail.split_at(unit_len);

            let scale = unit_nanos(unit).ok_or_else(invalid)?;
            let nanos = scaled_nanos(number, scale).ok_or_else(invalid)?;
            total_nanos = total_nanos.checked_add(nanos).ok_or_else(invalid)?;
            rest = tail;
        }

        let nanos = u64::try_from(total_nanos).map_err(|_| invalid())?;
        Ok(EnvDuration(Duration::from_nanos(nanos)))
    }
}

fn unit_nanos(unit: &str) -> Option<u128> {
    let nanos = match unit {
        "ns" => 1,
        "us" | "\u{b5}s" | "\u{3bc}s" => 1_000,
        "ms" => 1_000_000,
        "s" => 1_000_000_000,
        "m" => 60 * 1_000_000_000,
        "h" => 60 * 60 * 1_000_000_000,
        _ => return None,
    };
    Some(nanos)
}

fn scaled_nanos(number: &str, scale: u128) -> Option<u128> {
    let (whole, fraction) = number.split_once('.').unwrap_or((number, ""));
    if whole.is_empty() && fraction.is_empty() {
        return None;
    }

    let whole: u128 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
    let mut nanos = whole.checked_mul(scale)?;

    // Precision past 18 digits is below a nanosecond for every unit.
    let fraction = &fraction[..fraction.len().min(18)];
    if !fraction.is_empty() {
        let digits: u128 = fraction.parse().ok()?;
        let denominator = 10u128.checked_pow(fraction.len() as u32)?;
        nanos = nanos.checked_add(digits.checked_mul(scale)? / denominator)?;
    }
    Some(nanos)
}

impl fmt::Display for EnvDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let duration = self.0;
        if duration.is_zero() {
            return write!(f, "0s");
        }

        if duration < Duration::from_secs(1) {
            let nanos = duration.subsec_nanos();
            return if nanos % 1_000_000 == 0 {
                write!(f, "{}ms", nanos / 1_000_000)
            } else if nanos % 1_000 == 0 {
                write!(f, "{}\u{b5}s", nanos / 1_000)
            } else {
                write!(f, "{nanos}ns")
            };
        }

        let secs = duration.as_secs();
        let (hours, minutes, seconds) = (secs / 3600, (secs % 3600) / 60, secs % 60);
        if hours > 0 {
            write!(f, "{hours}h")?;
        }
        if hours > 0 || minutes > 0 {
            write!(f, "{minutes}m")?;
        }
        match duration.subsec_nanos() {
            0 => write!(f, "{seconds}s"),
            nanos => {
                let fraction = format!("{nanos:09}");
                write!(f, "{seconds}.{}s", fraction.trim_end_matches('0'))
            }
        }
    }
}

impl From<EnvDuration> for Duration {
    fn from(duration: EnvDuration) -> Self {
        duration.0
    }
}

/// A boolean read from the environment, accepting the usual spellings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlexBool(pub bool);

impl FromStr for FlexBool {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "true" | "t" | "1" | "yes" | "on" => Ok(FlexBool(true)),
            "false" | "f" | "0" | "no" | "off" => Ok(FlexBool(false)),
            _ => Err(format!("Invalid boolean value: {s}")),
        }
    }
}

impl From<FlexBool> for bool {
    fn from(flex: FlexBool) -> Self {
        flex.0
    }
}

impl Deref for FlexBool {
    type Target = bool;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
