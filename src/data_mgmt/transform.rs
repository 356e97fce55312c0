use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::Value;
use thiserror::Error;

use super::models::{ContractInfo, FieldValue, IntervalReading, Point, ReportKind, DAY_FORMAT};

pub const DAILY_CONSUMPTION_MEASUREMENT: &str = "enedis_consumption_per_day";
pub const LOAD_CURVE_MEASUREMENT: &str = "enedis_consumption_per_30min";

/// Shift applied to every load-curve timestamp. Whether the hub stamps
/// intervals with their start or end time is unresolved; kept as a single
/// constant so it can be revisited.
const LOAD_CURVE_OFFSET_MINUTES: i64 = 1;

const LOAD_CURVE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Error, Debug)]
pub enum TransformError {
    #[error("key '{0}' missing from result")]
    MissingKey(&'static str),
    #[error("malformed interval readings: {0}")]
    BadReadings(#[from] serde_json::Error),
    #[error("cannot parse timestamp '{0}': {1}")]
    BadTimestamp(String, chrono::ParseError),
    #[error("cannot parse value '{0}' as an integer")]
    BadValue(String),
}

/// Whether a transform is defined for this report kind, i.e. whether a fetch
/// of it can yield points worth enriching and writing.
pub fn has_transform(kind: ReportKind) -> bool {
    matches!(
        kind,
        ReportKind::DailyConsumption | ReportKind::ConsumptionLoadCurve
    )
}

/// Maps an API response into time-series points. Kinds without a transform
/// yield no points rather than an error.
pub fn points_from_response(
    kind: ReportKind,
    response: &Value,
    contract: Option<&ContractInfo>,
) -> Result<Vec<Point>, TransformError> {
    match kind {
        ReportKind::DailyConsumption => {
            daily_consumption_points(interval_readings(response)?, contract)
        }
        ReportKind::ConsumptionLoadCurve => {
            load_curve_points(interval_readings(response)?, contract)
        }
        _ => {
            log::warn!("no transform defined for '{kind}'; producing no points");
            Ok(Vec::new())
        }
    }
}

fn interval_readings(response: &Value) -> Result<Vec<IntervalReading>, TransformError> {
    let meter_reading = response
        .get("meter_reading")
        .ok_or(TransformError::MissingKey("meter_reading"))?;
    let readings = meter_reading
        .get("interval_reading")
        .ok_or(TransformError::MissingKey("interval_reading"))?;
    Ok(serde_json::from_value(readings.clone())?)
}

fn daily_consumption_points(
    readings: Vec<IntervalReading>,
    contract: Option<&ContractInfo>,
) -> Result<Vec<Point>, TransformError> {
    readings
        .into_iter()
        .map(|reading| {
            let day = NaiveDate::parse_from_str(&reading.date, DAY_FORMAT)
                .map_err(|e| TransformError::BadTimestamp(reading.date.clone(), e))?;
            let value = parse_raw_value(&reading.value)?;

            let mut point = Point::new(DAILY_CONSUMPTION_MEASUREMENT, day.and_time(NaiveTime::MIN));
            point.set_field("value", FieldValue::Integer(value));
            set_subscribed_power(&mut point, contract);
            log::debug!("{} - {}", point.timestamp_iso(), reading.value);
            Ok(point)
        })
        .collect()
}

fn load_curve_points(
    readings: Vec<IntervalReading>,
    contract: Option<&ContractInfo>,
) -> Result<Vec<Point>, TransformError> {
    readings
        .into_iter()
        .map(|reading| {
            let time = NaiveDateTime::parse_from_str(&reading.date, LOAD_CURVE_TIMESTAMP_FORMAT)
                .map_err(|e| TransformError::BadTimestamp(reading.date.clone(), e))?
                + Duration::minutes(LOAD_CURVE_OFFSET_MINUTES);
            let raw = parse_raw_value(&reading.value)?;

            let mut point = Point::new(LOAD_CURVE_MEASUREMENT, time);
            point.set_field("value", FieldValue::Float(scale_milli_value(raw)));
            if let Some(interval_length) = reading.interval_length {
                point.set_field("interval_length", FieldValue::String(interval_length));
            }
            if let Some(measure_type) = reading.measure_type {
                point.set_field("measure_type", FieldValue::String(measure_type));
            }
            set_subscribed_power(&mut point, contract);
            log::debug!("{} - {}", point.timestamp_iso(), reading.value);
            Ok(point)
        })
        .collect()
}

fn set_subscribed_power(point: &mut Point, contract: Option<&ContractInfo>) {
    // Field is omitted entirely when the contract lookup found nothing.
    if let Some(power) = contract.and_then(|c| c.subscribed_power) {
        point.set_field("subscribed_power", FieldValue::Integer(i64::from(power)));
    }
}

fn parse_raw_value(raw: &str) -> Result<i64, TransformError> {
    raw.parse()
        .map_err(|_| TransformError::BadValue(raw.to_string()))
}

/// Converts a raw milli-unit value to units with one decimal place, rounding
/// halves away from zero: 1234 -> 1.2, 1250 -> 1.3, -1250 -> -1.3.
///
/// Done in integer tenths so the 0.05 boundary never hits binary-float
/// rounding.
fn scale_milli_value(raw: i64) -> f64 {
    let tenths = if raw >= 0 {
        (raw + 50) / 100
    } else {
        (raw - 50) / 100
    };
    tenths as f64 / 10.0
}
