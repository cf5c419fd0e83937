//! Input parsing and validation for metric definitions and logged values.

use crate::error::{Error, Result};
use crate::format::parse_hhmm;
use crate::types::{MetricConfig, MetricType, NewMetric};

/// `metric_id` must be non-empty `[A-Za-z0-9_]+`.
pub fn validate_metric_id(metric_id: &str) -> Result<()> {
    if metric_id.is_empty() {
        return Err(Error::InvalidMetric("metric_id must not be empty".to_string()));
    }
    if !metric_id.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_') {
        return Err(Error::InvalidMetric(format!(
            "metric_id may only contain letters, digits and underscores: {}",
            metric_id
        )));
    }
    Ok(())
}

/// Check a metric definition before it is inserted.
pub fn validate_new_metric(metric: &NewMetric) -> Result<()> {
    validate_metric_id(&metric.metric_id)?;

    if metric.metric_name.trim().is_empty() {
        return Err(Error::InvalidMetric("metric_name must not be empty".to_string()));
    }

    if let (Some(min), Some(max)) = (metric.min_value, metric.max_value) {
        if min > max {
            return Err(Error::InvalidMetric(format!(
                "min_value {} is greater than max_value {}",
                min, max
            )));
        }
    }

    Ok(())
}

fn invalid(metric: &MetricConfig, message: impl Into<String>) -> Error {
    Error::InvalidValue {
        metric_id: metric.metric_id.clone(),
        message: message.into(),
    }
}

/// Parse raw user input for `metric` into a storable value.
///
/// Blank input means "clear this day's value" and yields `Ok(None)`.
pub fn parse_input(metric: &MetricConfig, raw: &str) -> Result<Option<f64>> {
    let s = raw.trim();
    if s.is_empty() {
        return Ok(None);
    }

    let value = match metric.metric_type {
        MetricType::Checkbox => match s.to_ascii_lowercase().as_str() {
            "1" | "true" | "on" | "yes" | "y" | "x" => 1.0,
            "0" | "false" | "off" | "no" | "n" => 0.0,
            _ => return Err(invalid(metric, format!("expected yes/no, got {:?}", s))),
        },
        MetricType::Hhmm => {
            parse_hhmm(s).ok_or_else(|| invalid(metric, "use HH:MM (00:00 to 23:59)"))?
        }
        MetricType::Number | MetricType::Time => s
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .ok_or_else(|| invalid(metric, format!("not a valid number: {:?}", s)))?,
    };

    Ok(Some(value))
}

/// Check a parsed value against the metric's bounds and blacklist.
///
/// Checkboxes accept exactly 0 or 1 and ignore bounds.
pub fn validate_value(metric: &MetricConfig, value: f64) -> Result<()> {
    if metric.metric_type == MetricType::Checkbox {
        if value == 0.0 || value == 1.0 {
            return Ok(());
        }
        return Err(invalid(metric, format!("checkbox value must be 0 or 1, got {}", value)));
    }
    if !value.is_finite() {
        return Err(invalid(metric, "value must be finite"));
    }
    if let Some(min) = metric.min_value {
        if value < min {
            return Err(invalid(metric, format!("min {}", min)));
        }
    }
    if let Some(max) = metric.max_value {
        if value > max {
            return Err(invalid(metric, format!("max {}", max)));
        }
    }
    if metric.disallowed_set().contains(&value) {
        return Err(invalid(metric, format!("value {} is not allowed", value)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metric(metric_type: MetricType) -> MetricConfig {
        NewMetric::new("m", "M", metric_type).into()
    }

    #[test]
    fn test_metric_id_charset() {
        assert!(validate_metric_id("sleep_hours2").is_ok());
        assert!(validate_metric_id("").is_err());
        assert!(validate_metric_id("sleep-hours").is_err());
        assert!(validate_metric_id("sleep hours").is_err());
        assert!(validate_metric_id("café").is_err());
    }

    #[test]
    fn test_new_metric_checks() {
        let mut m = NewMetric::new("ok", "  ", MetricType::Number);
        assert!(matches!(validate_new_metric(&m), Err(Error::InvalidMetric(_))));

        m.metric_name = "Ok".to_string();
        m.min_value = Some(10.0);
        m.max_value = Some(1.0);
        assert!(validate_new_metric(&m).is_err());

        m.max_value = Some(20.0);
        assert!(validate_new_metric(&m).is_ok());
    }

    #[test]
    fn test_parse_checkbox() {
        let m = metric(MetricType::Checkbox);
        assert_eq!(parse_input(&m, "yes").unwrap(), Some(1.0));
        assert_eq!(parse_input(&m, "X").unwrap(), Some(1.0));
        assert_eq!(parse_input(&m, "off").unwrap(), Some(0.0));
        assert_eq!(parse_input(&m, "").unwrap(), None);
        assert!(parse_input(&m, "maybe").is_err());
    }

    #[test]
    fn test_parse_hhmm_and_number() {
        assert_eq!(parse_input(&metric(MetricType::Hhmm), "07:30").unwrap(), Some(450.0));
        assert!(parse_input(&metric(MetricType::Hhmm), "7.5").is_err());
        assert_eq!(parse_input(&metric(MetricType::Number), " 3.5 ").unwrap(), Some(3.5));
        assert_eq!(parse_input(&metric(MetricType::Time), "45").unwrap(), Some(45.0));
        assert!(parse_input(&metric(MetricType::Number), "inf").is_err());
        assert!(parse_input(&metric(MetricType::Number), "abc").is_err());
    }

    #[test]
    fn test_validate_bounds_and_blacklist() {
        let mut m = metric(MetricType::Number);
        m.min_value = Some(0.0);
        m.max_value = Some(10.0);
        m.disallowed_values = Some("5, 7".to_string());

        assert!(validate_value(&m, 3.0).is_ok());
        assert!(validate_value(&m, 0.0).is_ok());
        assert!(validate_value(&m, -1.0).is_err());
        assert!(validate_value(&m, 11.0).is_err());
        let err = validate_value(&m, 5.0).unwrap_err();
        assert!(matches!(err, Error::InvalidValue { metric_id, .. } if metric_id == "m"));
    }

    #[test]
    fn test_checkbox_only_zero_or_one() {
        let mut m = metric(MetricType::Checkbox);
        m.max_value = Some(0.0);
        assert!(validate_value(&m, 1.0).is_ok());
        assert!(validate_value(&m, 0.0).is_ok());
        assert!(matches!(validate_value(&m, 7.0), Err(Error::InvalidValue { .. })));
        assert!(matches!(validate_value(&m, 0.5), Err(Error::InvalidValue { .. })));
        assert!(matches!(validate_value(&m, f64::NAN), Err(Error::InvalidValue { .. })));
        assert!(matches!(validate_value(&m, f64::INFINITY), Err(Error::InvalidValue { .. })));
    }
}
