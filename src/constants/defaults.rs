use std::time::Duration;

pub const DATAHUB_BASE_URL: &str = "https://enedis.valent1.fr";

// Rate limiting is mandatory on the data hub side.
pub const API_MAX_CALLS_PER_WINDOW: u32 = 5;
pub const API_RATE_WINDOW: Duration = Duration::from_secs(1);

pub const INFLUXDB_HOST: &str = "influxdb-api.loc";
pub const INFLUXDB_PORT: u16 = 8086;
pub const INFLUXDB_USERNAME: &str = "username";
pub const INFLUXDB_PASSWORD: &str = "password";
pub const INFLUXDB_DATABASE: &str = "enedis";
