use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::warn;

pub const DEFAULT_DATA_DIR: &str = "./data";
// 1 GB, large capture files are expected
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub addr: SocketAddr,
    pub data_dir: PathBuf,
    pub body_limit: usize,
}

impl ServiceConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from a variable lookup. Unparseable values are
    /// logged and replaced by defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let addr = lookup("EVENT_MONITOR_ADDR")
            .and_then(|raw| match raw.parse() {
                Ok(addr) => Some(addr),
                Err(e) => {
                    warn!("Ignoring EVENT_MONITOR_ADDR '{}': {}", raw, e);
                    None
                }
            })
            .unwrap_or(defaults.addr);

        let data_dir = lookup("EVENT_MONITOR_DATA_DIR")
            .filter(|raw| !raw.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);

        let body_limit = lookup("EVENT_MONITOR_BODY_LIMIT")
            .and_then(|raw| match raw.parse() {
                Ok(limit) => Some(limit),
                Err(e) => {
                    warn!("Ignoring EVENT_MONITOR_BODY_LIMIT '{}': {}", raw, e);
                    None
                }
            })
            .unwrap_or(defaults.body_limit);

        Self {
            addr,
            data_dir,
            body_limit,
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }
}
