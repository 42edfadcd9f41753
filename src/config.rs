use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_HYPERBEAM_API_URL: &str = "https://api.hyperbeam.com/v0";
pub const DEFAULT_PROVISIONING_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_CONNECTION_BUFFER: usize = 64;
pub const DEFAULT_JAEGER_ENDPOINT: &str = "http://jaeger:14268/api/traces";

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("{name} has an invalid value: {value:?}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Clone)]
pub struct Config {
    pub bind_addr: IpAddr,
    pub port: u16,
    pub hyperbeam_api_key: String,
    pub hyperbeam_api_url: String,
    pub provisioning_timeout: Duration,
    /// Outgoing frames buffered per connection before deliveries to it fail.
    pub connection_buffer: usize,
    pub enable_telemetry: bool,
    pub jaeger_endpoint: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let hyperbeam_api_key = lookup("HYPERBEAM_API_KEY")
            .filter(|key| !key.trim().is_empty())
            .ok_or(ConfigError::Missing("HYPERBEAM_API_KEY"))?;

        let timeout_secs: u64 = parse_or(&lookup, "PROVISIONING_TIMEOUT_SECS", 0)?;
        let provisioning_timeout = if timeout_secs == 0 {
            DEFAULT_PROVISIONING_TIMEOUT
        } else {
            Duration::from_secs(timeout_secs)
        };

        let connection_buffer = parse_or(&lookup, "CONNECTION_BUFFER", DEFAULT_CONNECTION_BUFFER)?;
        if connection_buffer == 0 {
            return Err(ConfigError::Invalid {
                name: "CONNECTION_BUFFER",
                value: "0".to_string(),
            });
        }

        Ok(Config {
            bind_addr: parse_or(&lookup, "BIND_ADDR", IpAddr::V4(Ipv4Addr::UNSPECIFIED))?,
            port: parse_or(&lookup, "PORT", DEFAULT_PORT)?,
            hyperbeam_api_key,
            hyperbeam_api_url: lookup("HYPERBEAM_API_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_HYPERBEAM_API_URL.to_string()),
            provisioning_timeout,
            connection_buffer,
            enable_telemetry: parse_or(&lookup, "ENABLE_TELEMETRY", false)?,
            jaeger_endpoint: lookup("JAEGER_ENDPOINT")
                .unwrap_or_else(|| DEFAULT_JAEGER_ENDPOINT.to_string()),
        })
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("bind_addr", &self.bind_addr)
            .field("port", &self.port)
            .field("hyperbeam_api_key", &"<redacted>")
            .field("hyperbeam_api_url", &self.hyperbeam_api_url)
            .field("provisioning_timeout", &self.provisioning_timeout)
            .field("connection_buffer", &self.connection_buffer)
            .field("enable_telemetry", &self.enable_telemetry)
            .field("jaeger_endpoint", &self.jaeger_endpoint)
            .finish()
    }
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(name) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        None => Ok(default),
    }
}
