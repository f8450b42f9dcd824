//! Duration parsing utilities.
//!
//! Clock periods and simulation steps are whole seconds. They may be written
//! as plain integers (`300`) or as duration strings (`"5m"`, `"300s"`, `"1h"`).

use crate::config_tree::{Setting, SettingError};

/// Unit suffixes, longest first so that "min" is tried before "m"
const UNITS: &[(&str, u64)] = &[
    ("seconds", 1),
    ("second", 1),
    ("minutes", 60),
    ("minute", 60),
    ("hours", 3600),
    ("hour", 3600),
    ("days", 86_400),
    ("day", 86_400),
    ("secs", 1),
    ("mins", 60),
    ("hrs", 3600),
    ("sec", 1),
    ("min", 60),
    ("hr", 3600),
    ("s", 1),
    ("m", 60),
    ("h", 3600),
    ("d", 86_400),
];

/// Parse duration string (e.g. "5m", "300s", "1h", "300") to seconds
///
/// Supports these formats:
/// - Raw seconds: "300"
/// - Seconds: "300s", "300sec", "300secs", "300second", "300seconds"
/// - Minutes: "5m", "5min", "5mins", "5minute", "5minutes"
/// - Hours: "1h", "1hr", "1hrs", "1hour", "1hours"
/// - Days: "1d", "1day", "1days"
///
/// # Arguments
/// * `duration` - The duration string to parse
///
/// # Returns
/// * `Ok(u64)` - The duration in seconds if parsing succeeds
/// * `Err(String)` - An error message if parsing fails or the value overflows
///
/// # Examples
/// ```
/// use rtxconfig::utils::duration::parse_duration_to_seconds;
///
/// assert_eq!(parse_duration_to_seconds("300"), Ok(300));
/// assert_eq!(parse_duration_to_seconds("5m"), Ok(300));
/// assert_eq!(parse_duration_to_seconds("1h"), Ok(3600));
/// assert!(parse_duration_to_seconds("soon").is_err());
/// ```
pub fn parse_duration_to_seconds(duration: &str) -> Result<u64, String> {
    let duration = duration.trim();

    if let Ok(seconds) = duration.parse::<u64>() {
        return Ok(seconds);
    }

    for (suffix, scale) in UNITS {
        if let Some(number) = duration.strip_suffix(suffix) {
            if let Ok(value) = number.trim().parse::<u64>() {
                return value
                    .checked_mul(*scale)
                    .ok_or_else(|| format!("Duration out of range: {}", duration));
            }
        }
    }

    Err(format!("Invalid duration format: {}", duration))
}

/// Read a whole-second duration field that may be an integer or a duration string.
///
/// # Arguments
/// * `setting` - The group holding the field
/// * `key` - Name of the field within `setting`
///
/// # Returns
/// * `Ok(u64)` - The duration in seconds
/// * `Err(SettingError)` - The field is missing, or is neither an integer nor a valid duration
pub fn seconds_from_setting(setting: &Setting<'_>, key: &str) -> Result<u64, SettingError> {
    let child = setting.child(key)?;
    if let Ok(seconds) = child.value::<u64>() {
        return Ok(seconds);
    }
    let text = child.value::<String>()?;
    parse_duration_to_seconds(&text).map_err(|_| SettingError::WrongType {
        path: child.path().to_string(),
        expected: "a period in seconds or a duration such as \"5m\"",
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config_tree::ConfigTree;

    #[test]
    fn test_parse_duration_seconds() {
        assert_eq!(parse_duration_to_seconds("0"), Ok(0));
        assert_eq!(parse_duration_to_seconds("300s"), Ok(300));
        assert_eq!(parse_duration_to_seconds("300 sec"), Ok(300));
        assert_eq!(parse_duration_to_seconds("5min"), Ok(300));
        assert_eq!(parse_duration_to_seconds("5m"), Ok(300));
        assert_eq!(parse_duration_to_seconds("2hrs"), Ok(7200));
        assert_eq!(parse_duration_to_seconds("1day"), Ok(86_400));

        assert!(parse_duration_to_seconds("").is_err());
        assert!(parse_duration_to_seconds("5x").is_err());
        assert!(parse_duration_to_seconds("-5m").is_err());
    }

    #[test]
    fn test_seconds_from_setting() {
        let doc = "a: 300\nb: \"15m\"\nc: later\n";
        let tree = ConfigTree::parse(doc, "config.yaml").unwrap();
        let root = tree.root();

        assert_eq!(seconds_from_setting(&root, "a"), Ok(300));
        assert_eq!(seconds_from_setting(&root, "b"), Ok(900));
        assert!(matches!(
            seconds_from_setting(&root, "c"),
            Err(SettingError::WrongType { .. })
        ));
        assert!(matches!(
            seconds_from_setting(&root, "d"),
            Err(SettingError::Missing { .. })
        ));
    }
}
