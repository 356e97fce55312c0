pub mod datahub;
pub mod influx;
