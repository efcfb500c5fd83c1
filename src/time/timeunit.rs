use crate::time::error::Error;
use core::str::FromStr;
use lazy_static::*;
use regex::Regex;
use std::time::Duration;

lazy_static! {
    static ref DURATION_REGEX: Regex = Regex::new(
        r"^\s*(?P<value>\d+)\s*(?P<unit>[a-z]+)\s*$"
    )
    .expect("Regex compilation error");
}

#[derive(Debug, PartialEq)]
pub struct DurationUnit {
    value: u64,
    unit: TimeUnit,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimeUnit {
    Millisecond,
    Second,
    Minute,
    Hour,
}

impl TimeUnit {
    fn millis(&self) -> u64 {
        match self {
            TimeUnit::Millisecond => 1,
            TimeUnit::Second => 1_000,
            TimeUnit::Minute => 60 * 1_000,
            TimeUnit::Hour => 60 * 60 * 1_000,
        }
    }
}

/// Parses `"250ms"`, `"5s"`, `"1m"` or a bare number of milliseconds.
pub fn parse_duration(value: &str) -> Result<Duration, Error> {
    if let Ok(millis) = value.trim().parse::<u64>() {
        return Ok(Duration::from_millis(millis));
    }
    let unit: DurationUnit = value.parse()?;
    unit.to_duration()
        .ok_or_else(|| Error::Overflow(value.to_owned()))
}

impl DurationUnit {
    pub fn to_duration(&self) -> Option<Duration> {
        self.value
            .checked_mul(self.unit.millis())
            .map(Duration::from_millis)
    }
}

impl FromStr for DurationUnit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = DURATION_REGEX
            .captures(s)
            .ok_or_else(|| Error::Syntax(s.to_owned()))?;
        let value = caps["value"]
            .parse()
            .map_err(|_| Error::Overflow(s.to_owned()))?;
        let unit = caps["unit"].parse::<TimeUnit>()?;
        Ok(Self { value, unit })
    }
}

impl FromStr for TimeUnit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ms" | "millisecond" | "millis" | "milliseconds" => Ok(TimeUnit::Millisecond),
            "s" | "second" | "secs" | "seconds" => Ok(TimeUnit::Second),
            "m" | "minute" | "mins" | "minutes" => Ok(TimeUnit::Minute),
            "h" | "hour" | "hours" => Ok(TimeUnit::Hour),
            _ => Err(Error::UnitNotSupported(s.to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_building_time_unit_from_string() {
        assert_eq!("ms".parse::<TimeUnit>(), Ok(TimeUnit::Millisecond));
        assert_eq!("secs".parse::<TimeUnit>(), Ok(TimeUnit::Second));
        assert_eq!("m".parse::<TimeUnit>(), Ok(TimeUnit::Minute));
        assert_eq!("hours".parse::<TimeUnit>(), Ok(TimeUnit::Hour));
        assert_eq!(
            "fortnight".parse::<TimeUnit>(),
            Err(Error::UnitNotSupported("fortnight".to_owned()))
        );
    }

    #[test]
    fn test_parsing_durations() {
        assert_eq!(parse_duration("200ms"), Ok(Duration::from_millis(200)));
        assert_eq!(parse_duration("5 s"), Ok(Duration::from_secs(5)));
        assert_eq!(parse_duration("2m"), Ok(Duration::from_secs(120)));
        assert_eq!(parse_duration("1500"), Ok(Duration::from_millis(1500)));
        assert!(matches!(parse_duration("soon"), Err(Error::Syntax(_))));
    }
}
