// Server configuration: defaults, environment overrides and validation
//
// Environment variables:
// FANIN_ADDR: IP address to bind (default: 0.0.0.0)
// FANIN_PORT: TCP port (default: 8001)
// FANIN_BACKLOG: listen backlog (default: 32)
// FANIN_CAPACITY: connections admitted per run (default: 4)
// FANIN_MESSAGES_PER_CLIENT: frames expected from each connection (default: 5)
// FANIN_FRAME_SIZE: bytes per frame (default: 1024)
// FANIN_POLL_MS: polling interval of every loop (default: 10)
// FANIN_TIMEOUT_SECS: give up collecting after this long (default: wait forever)

use fanin_core::{
    IngestError, IngestResult, DEFAULT_BACKLOG, DEFAULT_CAPACITY, DEFAULT_MESSAGES_PER_CLIENT,
    DEFAULT_PORT, FRAME_SIZE,
};
use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub backlog: i32,
    pub capacity: usize,
    pub messages_per_client: usize,
    pub frame_size: usize,
    pub poll_interval: Duration,
    /// `None` blocks until the expected total arrives.
    pub collect_timeout: Option<Duration>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_PORT),
            backlog: DEFAULT_BACKLOG,
            capacity: DEFAULT_CAPACITY,
            messages_per_client: DEFAULT_MESSAGES_PER_CLIENT,
            frame_size: FRAME_SIZE,
            poll_interval: DEFAULT_POLL_INTERVAL,
            collect_timeout: None,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset or unparsable keys keep defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        fn parsed<T: FromStr>(value: Option<String>) -> Option<T> {
            value.and_then(|s| s.trim().parse().ok())
        }

        let defaults = ServerConfig::default();

        let ip = parsed(lookup("FANIN_ADDR")).unwrap_or(defaults.bind_addr.ip());
        let port = parsed(lookup("FANIN_PORT")).unwrap_or(defaults.bind_addr.port());

        ServerConfig {
            bind_addr: SocketAddr::new(ip, port),
            backlog: parsed(lookup("FANIN_BACKLOG")).unwrap_or(defaults.backlog),
            capacity: parsed(lookup("FANIN_CAPACITY")).unwrap_or(defaults.capacity),
            messages_per_client: parsed(lookup("FANIN_MESSAGES_PER_CLIENT"))
                .unwrap_or(defaults.messages_per_client),
            frame_size: parsed(lookup("FANIN_FRAME_SIZE")).unwrap_or(defaults.frame_size),
            poll_interval: parsed(lookup("FANIN_POLL_MS"))
                .map(Duration::from_millis)
                .unwrap_or(defaults.poll_interval),
            collect_timeout: parsed(lookup("FANIN_TIMEOUT_SECS")).map(Duration::from_secs),
        }
    }

    /// Messages that must arrive before the controller stops the server.
    pub fn expected_total(&self) -> usize {
        self.capacity * self.messages_per_client
    }

    pub fn validate(&self) -> IngestResult<()> {
        if self.capacity == 0 {
            return Err(IngestError::Config("capacity must be at least 1".into()));
        }
        if self.messages_per_client == 0 {
            return Err(IngestError::Config("messages per client must be at least 1".into()));
        }
        if self.capacity.checked_mul(self.messages_per_client).is_none() {
            return Err(IngestError::Config("expected total overflows".into()));
        }
        if self.frame_size == 0 {
            return Err(IngestError::Config("frame size must be non-zero".into()));
        }
        if self.backlog <= 0 {
            return Err(IngestError::Config("listen backlog must be positive".into()));
        }
        if self.poll_interval.is_zero() {
            return Err(IngestError::Config("poll interval must be non-zero".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_reference_constants() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr.port(), 8001);
        assert_eq!(config.backlog, 32);
        assert_eq!(config.frame_size, 1024);
        assert_eq!(config.expected_total(), 20);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn lookup_overrides_defaults() {
        let config = ServerConfig::from_lookup(lookup_from(&[
            ("FANIN_ADDR", "127.0.0.1"),
            ("FANIN_PORT", "9000"),
            ("FANIN_CAPACITY", "8"),
            ("FANIN_MESSAGES_PER_CLIENT", "3"),
            ("FANIN_POLL_MS", "25"),
            ("FANIN_TIMEOUT_SECS", "7"),
        ]));

        assert_eq!(config.bind_addr, "127.0.0.1:9000".parse().unwrap());
        assert_eq!(config.expected_total(), 24);
        assert_eq!(config.poll_interval, Duration::from_millis(25));
        assert_eq!(config.collect_timeout, Some(Duration::from_secs(7)));
    }

    #[test]
    fn unparsable_values_fall_back() {
        let config = ServerConfig::from_lookup(lookup_from(&[
            ("FANIN_PORT", "not-a-port"),
            ("FANIN_FRAME_SIZE", "-1"),
        ]));
        assert_eq!(config, ServerConfig::default());
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let config = ServerConfig {
            capacity: 0,
            ..ServerConfig::default()
        };
        assert!(matches!(config.validate(), Err(IngestError::Config(_))));
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        let config = ServerConfig {
            poll_interval: Duration::ZERO,
            ..ServerConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
