pub mod http;
pub mod influxdb;
