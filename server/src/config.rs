use clap::ValueEnum;
use std::time::Duration;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// What a session does after receiving a frame with an unrecognised tag.
///
/// The payload length of an unknown tag cannot be known, so every byte after
/// it is likely misframed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum UnknownTagPolicy {
    /// Log the error and drop the connection.
    #[default]
    Disconnect,
    /// Log the error and keep reading from the next byte.
    Continue,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// How long the accept loop sleeps between polls of the run flag.
    pub poll_interval: Duration,
    pub unknown_tag_policy: UnknownTagPolicy,
}

impl ServerConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    pub fn address(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            unknown_tag_policy: UnknownTagPolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8080);
        assert_eq!(config.poll_interval, Duration::from_millis(50));
        assert_eq!(config.unknown_tag_policy, UnknownTagPolicy::Disconnect);
    }

    #[test]
    fn test_address_formatting() {
        assert_eq!(ServerConfig::new("0.0.0.0", 9000).address(), "0.0.0.0:9000");
        assert_eq!(ServerConfig::new("::1", 9000).address(), "[::1]:9000");
        assert_eq!(
            ServerConfig::new("localhost", 1).address(),
            "localhost:1"
        );
    }

    #[test]
    fn test_policy_parses_from_cli_value() {
        assert_eq!(
            UnknownTagPolicy::from_str("continue", true),
            Ok(UnknownTagPolicy::Continue)
        );
        assert_eq!(
            UnknownTagPolicy::from_str("disconnect", true),
            Ok(UnknownTagPolicy::Disconnect)
        );
        assert!(UnknownTagPolicy::from_str("ignore", true).is_err());
    }
}
