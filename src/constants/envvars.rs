pub const DATAHUB_BASE_URL: &str = "DATAHUB_BASE_URL";
