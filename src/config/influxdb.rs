use confique::Config;

/// Coordinates of the InfluxDB 2.x write endpoint.
#[derive(Debug, Clone, Config)]
pub struct InfluxDbConfig {
    #[config(env = "DIYP_INFLUXDB_HOST", default = "http://192.168.123.110:8086")]
    pub host: String,

    #[config(env = "DIYP_INFLUXDB_ORG", default = "peter")]
    pub org: String,

    #[config(env = "DIYP_INFLUXDB_BUCKET", default = "diyPresso")]
    pub bucket: String,

    #[config(
        env = "DIYP_INFLUXDB_TOKEN",
        default = "Di8XWkE1Qz_kx0clc5TLXDfQhLVF2USrFBOq5Sh_cPLHqNH0JaJaP_Q6isIpqclOlWDcE04sMuxsQDsLIvLKDQ=="
    )]
    pub token: String,

    /// One of `ns`, `us`, `ms`, `s`.
    #[config(env = "DIYP_INFLUXDB_PRECISION", default = "ns")]
    pub precision: String,
}
