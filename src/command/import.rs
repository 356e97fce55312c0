use std::env;

use thiserror::Error;

use crate::argsets::ImportArgs;
use crate::constants::{defaults, envvars};
use crate::data_mgmt::transform::{self, TransformError};
use crate::interfaces::datahub::{DatahubClient, DatahubError};
use crate::interfaces::influx::{InfluxClient, InfluxError};

#[derive(Error, Debug)]
pub enum ImportError {
    #[error(transparent)]
    Fetch(#[from] DatahubError),
    #[error(transparent)]
    Transform(#[from] TransformError),
    #[error(transparent)]
    Write(#[from] InfluxError),
}

impl ImportError {
    /// Fetch and validation failures exit with 2; a write fault is left as a
    /// plain failure.
    pub fn exit_code(&self) -> u8 {
        match self {
            ImportError::Fetch(_) | ImportError::Transform(_) => 2,
            ImportError::Write(_) => 1,
        }
    }
}

/// One full pull: fetch contract metadata (when the kind produces points),
/// fetch the requested report, map it to points, and push them to InfluxDB.
pub fn import(args: &ImportArgs) -> Result<(), ImportError> {
    let base_url = env::var(envvars::DATAHUB_BASE_URL)
        .unwrap_or_else(|_| defaults::DATAHUB_BASE_URL.to_string());
    let mut datahub = DatahubClient::new(&base_url, &args.auth_token)?;

    let contract = if transform::has_transform(args.kind) {
        Some(datahub.fetch_contract_info(&args.usage_point_id)?)
    } else {
        None
    };

    let response = datahub.fetch(
        args.kind,
        &args.usage_point_id,
        Some(args.start_date),
        Some(args.end_date),
    )?;
    let points = transform::points_from_response(args.kind, &response, contract.as_ref())?;

    if points.is_empty() {
        log::warn!("nothing to write for '{}'", args.kind);
        return Ok(());
    }

    let influx = InfluxClient::new(
        &args.influxdb_host,
        args.influxdb_port,
        &args.influxdb_username,
        &args.influxdb_password,
        &args.influxdb_database,
    )?;
    log::info!("Pushing {} points to InfluxDB", points.len());
    influx.write_points(&points)?;
    Ok(())
}
