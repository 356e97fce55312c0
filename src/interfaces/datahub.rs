use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use url::Url;

use crate::constants::defaults;
use crate::data_mgmt::models::{ContractInfo, ReportKind, DAY_FORMAT};
use crate::helpers::RateLimiter;

const API_PATH: &str = "api";

#[derive(Error, Debug)]
pub enum DatahubError {
    #[error("invalid data hub URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("TLS setup error: {0}")]
    Tls(#[from] native_tls::Error),
    #[error("data hub returned HTTP {0}")]
    Status(u16),
    #[error("request error: {0}")]
    Transport(String),
    #[error("cannot decode response body: {0}")]
    BadBody(#[from] std::io::Error),
}

#[derive(Debug, Serialize)]
struct ReportRequest<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    usage_point_id: &'a str,
    // Absent dates are left out of the body rather than sent as null.
    #[serde(skip_serializing_if = "Option::is_none")]
    start: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    end: Option<String>,
}

/// Client for the Enedis data hub relay. Owns the rate limiter, so every
/// fetch through one client shares the same 5-per-second budget.
pub struct DatahubClient {
    agent: ureq::Agent,
    endpoint: Url,
    auth_token: String,
    limiter: RateLimiter,
}

impl DatahubClient {
    pub fn new(base_url: &str, auth_token: &str) -> Result<Self, DatahubError> {
        // No request timeout here; only the InfluxDB client has one.
        let agent = ureq::AgentBuilder::new()
            .tls_connector(Arc::new(native_tls::TlsConnector::new()?))
            .build();
        Ok(DatahubClient {
            agent,
            endpoint: Url::parse(base_url)?.join(API_PATH)?,
            auth_token: auth_token.to_string(),
            limiter: RateLimiter::new(
                defaults::API_MAX_CALLS_PER_WINDOW,
                defaults::API_RATE_WINDOW,
            ),
        })
    }

    /// Issues one POST for the given report kind, blocking first if the rate
    /// budget for the current window is spent. Non-2xx statuses are errors;
    /// there are no retries.
    pub fn fetch(
        &mut self,
        kind: ReportKind,
        usage_point_id: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Value, DatahubError> {
        self.limiter.acquire();

        let payload = ReportRequest {
            kind: kind.as_str(),
            usage_point_id,
            start: start.map(|d| d.format(DAY_FORMAT).to_string()),
            end: end.map(|d| d.format(DAY_FORMAT).to_string()),
        };
        log::debug!("POST {} for '{kind}'", self.endpoint);

        match self
            .agent
            .post(self.endpoint.as_str())
            .set("Authorization", &self.auth_token)
            .send_json(&payload)
        {
            Ok(response) => Ok(response.into_json()?),
            Err(ureq::Error::Status(code, response)) => {
                let body = response.into_string().unwrap_or_default();
                log::error!("data hub returned HTTP {code}: {body}");
                Err(DatahubError::Status(code))
            }
            Err(ureq::Error::Transport(e)) => Err(DatahubError::Transport(e.to_string())),
        }
    }

    /// Fetches the contracts report and pulls out the subscribed power for
    /// the given usage point.
    pub fn fetch_contract_info(
        &mut self,
        usage_point_id: &str,
    ) -> Result<ContractInfo, DatahubError> {
        let response = self.fetch(ReportKind::Contracts, usage_point_id, None, None)?;
        Ok(contract_info_from_response(&response, usage_point_id))
    }
}

/// Scans `customer.usage_points[]` for the requested usage point and parses
/// its `"<digits> kVA"` subscribed power. No match leaves the power unset.
fn contract_info_from_response(response: &Value, usage_point_id: &str) -> ContractInfo {
    let subscribed_power = response
        .pointer("/customer/usage_points")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .find(|entry| {
            entry
                .pointer("/usage_point/usage_point_id")
                .and_then(Value::as_str)
                == Some(usage_point_id)
        })
        .and_then(|entry| entry.pointer("/contracts/subscribed_power"))
        .and_then(Value::as_str)
        .and_then(parse_subscribed_power);

    if subscribed_power.is_none() {
        log::warn!("no subscribed power found for usage point {usage_point_id}");
    }
    ContractInfo {
        usage_point_id: usage_point_id.to_string(),
        subscribed_power,
    }
}

fn parse_subscribed_power(raw: &str) -> Option<u32> {
    raw.strip_suffix("kVA")?.trim().parse().ok()
}
