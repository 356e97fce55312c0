use anyhow::{bail, Result};
use chrono::NaiveDate;

use crate::constants::defaults;
use crate::data_mgmt::models::{ReportKind, DAY_FORMAT};

pub const USAGE: &str = "\
Usage: enedis2influx --type <TYPE> --usage-point-id <ID> --auth-token <TOKEN>
                     --start-date <YYYY-MM-DD> --end-date <YYYY-MM-DD>
                     [--influxdb-host <HOST>] [--influxdb-port <PORT>]
                     [--influxdb-username <USER>] [--influxdb-password <PASS>]
                     [--influxdb-database <DB>] [-v...]";

#[derive(Debug)]
pub struct ImportArgs {
    pub kind: ReportKind,
    pub usage_point_id: String,
    pub auth_token: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub influxdb_host: String,
    pub influxdb_port: u16,
    pub influxdb_username: String,
    pub influxdb_password: String,
    pub influxdb_database: String,
    pub verbose_count: u8,
}

pub fn parse() -> Result<ImportArgs> {
    let mut args = pico_args::Arguments::from_env();

    let mut verbose_count = 0u8;
    while args.contains(["-v", "--verbose"]) {
        verbose_count = verbose_count.saturating_add(1);
    }

    let parsed = ImportArgs {
        kind: args.value_from_str("--type")?,
        usage_point_id: args.value_from_str("--usage-point-id")?,
        auth_token: args.value_from_str("--auth-token")?,
        start_date: args.value_from_fn("--start-date", parse_date)?,
        end_date: args.value_from_fn("--end-date", parse_date)?,
        influxdb_host: args
            .opt_value_from_str("--influxdb-host")?
            .unwrap_or_else(|| defaults::INFLUXDB_HOST.to_string()),
        influxdb_port: args
            .opt_value_from_str("--influxdb-port")?
            .unwrap_or(defaults::INFLUXDB_PORT),
        influxdb_username: args
            .opt_value_from_str("--influxdb-username")?
            .unwrap_or_else(|| defaults::INFLUXDB_USERNAME.to_string()),
        influxdb_password: args
            .opt_value_from_str("--influxdb-password")?
            .unwrap_or_else(|| defaults::INFLUXDB_PASSWORD.to_string()),
        influxdb_database: args
            .opt_value_from_str("--influxdb-database")?
            .unwrap_or_else(|| defaults::INFLUXDB_DATABASE.to_string()),
        verbose_count,
    };

    let leftover = args.finish();
    if !leftover.is_empty() {
        bail!("unrecognized arguments: {leftover:?}");
    }
    Ok(parsed)
}

fn parse_date(raw: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(raw, DAY_FORMAT)
}
