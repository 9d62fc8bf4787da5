#![forbid(unsafe_code)]

pub mod config;
pub mod datamodel;
pub mod http;
pub mod influxdb;
pub mod push;
pub mod relay;
pub mod reporting;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
