use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::Deserialize;
use thiserror::Error;

pub const DAY_FORMAT: &str = "%Y-%m-%d";

/// Report kinds accepted by the data hub API.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReportKind {
    ConsumptionLoadCurve,
    ConsumptionMaxPower,
    DailyConsumption,
    ProductionLoadCurve,
    DailyProduction,
    Identity,
    ContactData,
    Contracts,
    Addresses,
}

impl ReportKind {
    pub const ALL: [ReportKind; 9] = [
        ReportKind::ConsumptionLoadCurve,
        ReportKind::ConsumptionMaxPower,
        ReportKind::DailyConsumption,
        ReportKind::ProductionLoadCurve,
        ReportKind::DailyProduction,
        ReportKind::Identity,
        ReportKind::ContactData,
        ReportKind::Contracts,
        ReportKind::Addresses,
    ];

    /// Wire string used in the API request body.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportKind::ConsumptionLoadCurve => "consumption_load_curve",
            ReportKind::ConsumptionMaxPower => "consumption_max_power",
            ReportKind::DailyConsumption => "daily_consumption",
            ReportKind::ProductionLoadCurve => "production_load_curve",
            ReportKind::DailyProduction => "daily_production",
            ReportKind::Identity => "identity",
            ReportKind::ContactData => "contact_data",
            ReportKind::Contracts => "contracts",
            ReportKind::Addresses => "addresses",
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
#[error("unsupported report type: '{0}'")]
pub struct UnknownReportKind(String);

impl FromStr for ReportKind {
    type Err = UnknownReportKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ReportKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownReportKind(s.to_string()))
    }
}

/// One entry of `meter_reading.interval_reading` in the API response.
#[derive(Clone, Debug, Deserialize)]
pub struct IntervalReading {
    pub date: String,
    pub value: String,
    pub interval_length: Option<String>,
    pub measure_type: Option<String>,
}

/// Contract metadata for a usage point, used to enrich reading points.
///
/// `subscribed_power` stays `None` when the contracts response has no entry
/// for the usage point; callers must omit the field rather than default it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContractInfo {
    pub usage_point_id: String,
    pub subscribed_power: Option<u32>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Integer(i64),
    Float(f64),
    String(String),
}

impl FieldValue {
    /// Formats the value for InfluxDB line protocol: integers are suffixed
    /// with `i`, strings are double-quoted with inner quotes escaped.
    pub fn to_line_protocol(&self) -> String {
        match self {
            FieldValue::Integer(v) => format!("{v}i"),
            FieldValue::Float(v) => format!("{v}"),
            FieldValue::String(v) => {
                format!("\"{}\"", v.replace('\\', "\\\\").replace('"', "\\\""))
            }
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_line_protocol())
    }
}

/// A single time-series point destined for InfluxDB.
///
/// Tags are always empty in this program, but the map is kept so the line
/// protocol writer stays complete.
#[derive(Clone, Debug)]
pub struct Point {
    pub measurement: &'static str,
    pub tags: BTreeMap<String, String>,
    pub time: NaiveDateTime,
    pub fields: BTreeMap<String, FieldValue>,
}

impl Point {
    pub fn new(measurement: &'static str, time: NaiveDateTime) -> Self {
        Point {
            measurement,
            tags: BTreeMap::new(),
            time,
            fields: BTreeMap::new(),
        }
    }

    pub fn set_field(&mut self, key: &str, value: FieldValue) {
        self.fields.insert(key.to_string(), value);
    }

    pub fn timestamp_iso(&self) -> String {
        self.time.format("%Y-%m-%dT%H:%M:%S").to_string()
    }

    /// Seconds since the Unix epoch; timestamps from the data hub carry no
    /// zone and are written as-is, i.e. treated as UTC.
    pub fn timestamp_secs(&self) -> i64 {
        self.time.and_utc().timestamp()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::NaiveDate;

    #[test]
    fn report_kinds_round_trip_through_wire_strings() {
        for kind in ReportKind::ALL {
            assert_eq!(kind.as_str().parse::<ReportKind>().unwrap(), kind);
        }
    }

    #[test]
    fn unknown_report_kind_is_rejected() {
        assert!("daily_comsumption".parse::<ReportKind>().is_err());
        assert!("".parse::<ReportKind>().is_err());
    }

    #[test]
    fn field_values_format_for_line_protocol() {
        assert_eq!(FieldValue::Integer(100).to_line_protocol(), "100i");
        assert_eq!(FieldValue::Float(1.2).to_line_protocol(), "1.2");
        assert_eq!(
            FieldValue::String("P30M \"max\"".into()).to_line_protocol(),
            "\"P30M \\\"max\\\"\""
        );
    }

    #[test]
    fn point_timestamps_are_second_precision_utc() {
        let time = NaiveDate::from_ymd_opt(2020, 9, 8)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let point = Point::new("enedis_consumption_per_day", time);
        assert_eq!(point.timestamp_iso(), "2020-09-08T00:00:00");
        assert_eq!(point.timestamp_secs(), 1599523200);
    }
}
