use std::str::FromStr;

use tracing::{debug, info, warn};

/// Controls how a configuration value is parsed from an environment string, if one is present.
pub trait ParsableConfigValue: std::fmt::Debug + Sized {
    fn parse_user_value(value: &str) -> Option<Self>;

    /// Parse the value, returning the default if it can't be parsed or isn't set.
    /// Issues a warning if a value was given but couldn't be parsed.
    fn parse(variable_name: &str, value: Option<String>, default: Self) -> Self {
        match value {
            Some(v) => match Self::parse_user_value(&v) {
                Some(v) => {
                    info!("Config: {variable_name} = {v:?} (user set)");
                    v
                },
                None => {
                    warn!(
                        "Configuration value {v} for {variable_name} cannot be parsed into correct type; reverting to default."
                    );
                    info!("Config: {variable_name} = {default:?} (default due to parse error)");
                    default
                },
            },
            None => {
                debug!("Config: {variable_name} = {default:?} (default)");
                default
            },
        }
    }
}

/// Most values work with the FromStr implementation, but some types (Option<T>, bool, Duration)
/// get custom parsing below.
pub trait FromStrParseable: FromStr + std::fmt::Debug {}

impl<T: FromStrParseable> ParsableConfigValue for T {
    fn parse_user_value(value: &str) -> Option<Self> {
        value.trim().parse::<T>().ok()
    }
}

impl FromStrParseable for usize {}
impl FromStrParseable for u16 {}
impl FromStrParseable for u32 {}
impl FromStrParseable for u64 {}
impl FromStrParseable for i32 {}
impl FromStrParseable for i64 {}
impl FromStrParseable for f64 {}
impl FromStrParseable for String {}

/// Special handling for bool:
/// - true: "1","true","yes","y","on"  -> true
/// - false: "0","false","no","n","off" -> false
fn parse_bool_value(value: &str) -> Option<bool> {
    let t = value.trim().to_ascii_lowercase();

    match t.as_str() {
        "0" | "false" | "no" | "n" | "off" => Some(false),
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        _ => None,
    }
}

impl ParsableConfigValue for bool {
    fn parse_user_value(value: &str) -> Option<Self> {
        parse_bool_value(value)
    }
}

/// The default of an Option<T> value is None unless the user sets it.
impl<T: ParsableConfigValue> ParsableConfigValue for Option<T> {
    fn parse_user_value(value: &str) -> Option<Self> {
        T::parse_user_value(value).map(Some)
    }
}

/// Durations accept suffixed strings such as "250ms", "2s", "1h"; see the duration_str crate.
impl ParsableConfigValue for std::time::Duration {
    fn parse_user_value(value: &str) -> Option<Self> {
        duration_str::parse(value).ok()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tracing_test::traced_test;

    use super::*;

    #[test]
    fn test_bool_parsing() {
        for v in ["1", "true", "YES", " y ", "on"] {
            assert_eq!(bool::parse_user_value(v), Some(true), "{v}");
        }
        for v in ["0", "false", "No", "n", "OFF"] {
            assert_eq!(bool::parse_user_value(v), Some(false), "{v}");
        }
        assert_eq!(bool::parse_user_value("maybe"), None);
    }

    #[test]
    fn test_option_defaults_to_none() {
        let v: Option<usize> = Option::<usize>::parse("max", None, None);
        assert_eq!(v, None);

        let v: Option<usize> = Option::<usize>::parse("max", Some("12".to_owned()), None);
        assert_eq!(v, Some(12));
    }

    #[test]
    fn test_unparseable_reverts_to_default() {
        let v = usize::parse("workers", Some("lots".to_owned()), 4);
        assert_eq!(v, 4);
    }

    #[test]
    fn test_duration_parsing() {
        assert_eq!(Duration::parse_user_value("250ms"), Some(Duration::from_millis(250)));
        assert_eq!(Duration::parse_user_value("2s"), Some(Duration::from_secs(2)));
        assert_eq!(Duration::parse_user_value("soon"), None);
    }

    #[test]
    #[traced_test]
    fn test_parse_logs_where_each_value_came_from() {
        usize::parse("workers", Some("6".to_owned()), 4);
        usize::parse("retries", Some("lots".to_owned()), 3);
        usize::parse("chunk", None, 8);

        assert!(logs_contain("Config: workers = 6 (user set)"));
        assert!(logs_contain("Configuration value lots for retries cannot be parsed"));
        assert!(logs_contain("Config: retries = 3 (default due to parse error)"));
        logs_assert(|lines: &[&str]| {
            match lines.iter().find(|l| l.contains("Config: chunk = 8 (default)")) {
                Some(line) if line.contains("DEBUG") => Ok(()),
                Some(line) => Err(format!("untouched default not logged at debug: {line}")),
                None => Err("untouched default not logged".to_owned()),
            }
        });
    }
}
