use std::env;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::path::{Path, PathBuf};

/// Complete application configuration, loaded from environment variables or
/// default values.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub batch: BatchConfig,
}

impl AppConfig {
    /// Creates a configuration from the currently available environment variables.
    pub fn from_env() -> Self {
        Self {
            api: ApiConfig::from_env(),
            batch: BatchConfig::from_env(),
        }
    }
}

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    bind_ip: IpAddr,
    display_host: String,
    port: u16,
}

impl ApiConfig {
    const DEFAULT_HOST: &'static str = "0.0.0.0";
    const DEFAULT_PORT: u16 = 8080;

    fn from_env() -> Self {
        let host_value =
            env_string("PACK_IT_NOW_API_HOST").unwrap_or_else(|| Self::DEFAULT_HOST.to_string());
        let (bind_ip, effective_host) = match host_value.parse::<IpAddr>() {
            Ok(ip) => (ip, host_value),
            Err(err) => {
                eprintln!(
                    "⚠️ Could not parse PACK_IT_NOW_API_HOST ('{}'): {}. Using {}.",
                    host_value,
                    err,
                    Self::DEFAULT_HOST
                );
                (
                    Self::DEFAULT_HOST
                        .parse::<IpAddr>()
                        .expect("Default host must be valid"),
                    Self::DEFAULT_HOST.to_string(),
                )
            }
        };

        let port = match env_string("PACK_IT_NOW_API_PORT") {
            Some(raw) => match parse_port(&raw) {
                Some(value) => value,
                None => {
                    eprintln!(
                        "⚠️ Could not use PACK_IT_NOW_API_PORT ('{}'). Using {}.",
                        raw,
                        Self::DEFAULT_PORT
                    );
                    Self::DEFAULT_PORT
                }
            },
            None => Self::DEFAULT_PORT,
        };

        Self {
            bind_ip,
            display_host: effective_host,
            port,
        }
    }

    /// Socket address to bind the server to.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_ip, self.port)
    }

    /// Visible hostname for logging and hints.
    pub fn display_host(&self) -> &str {
        &self.display_host
    }

    /// Configured port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Indicates whether binding to all interfaces.
    pub fn binds_to_all_interfaces(&self) -> bool {
        match self.bind_ip {
            IpAddr::V4(addr) => addr == Ipv4Addr::UNSPECIFIED,
            IpAddr::V6(addr) => addr == Ipv6Addr::UNSPECIFIED,
        }
    }

    /// Checks whether the hostname matches the default value.
    pub fn uses_default_host(&self) -> bool {
        self.display_host == Self::DEFAULT_HOST
    }
}

/// Configuration for the offline batch mode.
///
/// Batch mode activates when the three input files are configured; the
/// service then packs the batch, writes the result file and exits instead of
/// serving HTTP.
#[derive(Clone, Debug)]
pub struct BatchConfig {
    orderline_file: Option<PathBuf>,
    product_file: Option<PathBuf>,
    box_file: Option<PathBuf>,
    output_file: PathBuf,
}

impl BatchConfig {
    const ORDERLINE_VAR: &'static str = "PACK_IT_NOW_ORDERLINE_FILE";
    const PRODUCT_VAR: &'static str = "PACK_IT_NOW_PRODUCT_FILE";
    const BOX_VAR: &'static str = "PACK_IT_NOW_BOX_FILE";
    const OUTPUT_VAR: &'static str = "PACK_IT_NOW_OUTPUT_FILE";
    const DEFAULT_OUTPUT: &'static str = "./packing_results.csv";

    fn from_env() -> Self {
        Self {
            orderline_file: env_string(Self::ORDERLINE_VAR).map(PathBuf::from),
            product_file: env_string(Self::PRODUCT_VAR).map(PathBuf::from),
            box_file: env_string(Self::BOX_VAR).map(PathBuf::from),
            output_file: env_string(Self::OUTPUT_VAR)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(Self::DEFAULT_OUTPUT)),
        }
    }

    /// Batch mode is active once all three input files are configured.
    pub fn is_configured(&self) -> bool {
        self.orderline_file.is_some() && self.product_file.is_some() && self.box_file.is_some()
    }

    pub fn orderline_file(&self) -> Option<&Path> {
        self.orderline_file.as_deref()
    }

    pub fn product_file(&self) -> Option<&Path> {
        self.product_file.as_deref()
    }

    pub fn box_file(&self) -> Option<&Path> {
        self.box_file.as_deref()
    }

    pub fn output_file(&self) -> &Path {
        &self.output_file
    }
}

fn env_string(name: &str) -> Option<String> {
    match env::var(name) {
        Ok(value) => {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_owned())
            }
        }
        Err(env::VarError::NotPresent) => None,
        Err(err) => {
            eprintln!(
                "⚠️ Access to {} failed: {}. Using default value.",
                name, err
            );
            None
        }
    }
}

/// Parses a port value; `0` is rejected because it binds an arbitrary port.
fn parse_port(raw: &str) -> Option<u16> {
    match raw.trim().parse::<u16>() {
        Ok(0) => None,
        Ok(value) => Some(value),
        Err(_) => None,
    }
}
