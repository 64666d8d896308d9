//! Runtime configuration, read from CLI flags and `ROUTEBIND_*` env vars.

use clap::Parser;

/// Default cap on a buffered request (headers + body): 8 MiB.
pub const DEFAULT_MAX_REQUEST_SIZE: usize = 8 * 1024 * 1024;

#[derive(Debug, Clone, Parser)]
#[command(name = "routebind", version, about = "Serve the routebind tutorial API")]
pub struct ServerConfig {
    /// Address to listen on.
    #[arg(long, env = "ROUTEBIND_ADDR", default_value = "127.0.0.1:8000")]
    pub addr: String,

    /// Largest request, in bytes, buffered before answering 413.
    #[arg(long, env = "ROUTEBIND_MAX_REQUEST_SIZE", default_value_t = DEFAULT_MAX_REQUEST_SIZE)]
    pub max_request_size: usize,

    /// Log filter used when `RUST_LOG` is unset, e.g. `info` or `routebind=debug`.
    #[arg(long, env = "ROUTEBIND_LOG", default_value = "info")]
    pub log: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:8000".to_owned(),
            max_request_size: DEFAULT_MAX_REQUEST_SIZE,
            log: "info".to_owned(),
        }
    }
}

impl ServerConfig {
    /// Same settings, listening on `addr`.
    #[must_use]
    pub fn with_addr(mut self, addr: impl Into<String>) -> Self {
        self.addr = addr.into();
        self
    }
}
