use std::net::{IpAddr, Ipv4Addr};

use crate::game::constants::{sim, squad};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the transport binds to
    pub bind_address: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Maximum concurrent client connections
    pub max_clients: usize,
    /// Tick period in milliseconds
    pub tick_duration_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)),
            port: 4433,
            max_clients: squad::COUNT * squad::MEMBER_COUNT,
            tick_duration_ms: sim::TICK_DURATION_MS,
        }
    }
}

impl ServerConfig {
    /// Load config from environment or use defaults
    pub fn load_or_default() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("BIND_ADDRESS") {
            if let Ok(parsed) = addr.parse() {
                config.bind_address = parsed;
            } else {
                tracing::warn!("Invalid BIND_ADDRESS '{}', using default", addr);
            }
        }

        if let Ok(port) = std::env::var("PORT") {
            if let Ok(parsed) = port.parse::<u16>() {
                if parsed > 0 {
                    config.port = parsed;
                } else {
                    tracing::warn!("PORT must be > 0, using default");
                }
            } else {
                tracing::warn!("Invalid PORT '{}', using default", port);
            }
        }

        if let Ok(max_clients) = std::env::var("MAX_CLIENTS") {
            if let Ok(parsed) = max_clients.parse::<usize>() {
                if parsed > 0 && parsed <= squad::COUNT * squad::MEMBER_COUNT {
                    config.max_clients = parsed;
                } else {
                    tracing::warn!(
                        "MAX_CLIENTS must be 1-{}, using default",
                        squad::COUNT * squad::MEMBER_COUNT
                    );
                }
            } else {
                tracing::warn!("Invalid MAX_CLIENTS '{}', using default", max_clients);
            }
        }

        if let Ok(tick) = std::env::var("TICK_RATE_MS") {
            if let Ok(parsed) = tick.parse::<u64>() {
                if (10..=1000).contains(&parsed) {
                    config.tick_duration_ms = parsed;
                } else {
                    tracing::warn!("TICK_RATE_MS must be 10-1000, using default");
                }
            } else {
                tracing::warn!("Invalid TICK_RATE_MS '{}', using default", tick);
            }
        }

        config
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), String> {
        if self.port == 0 {
            return Err("Port cannot be 0".to_string());
        }
        if self.max_clients == 0 {
            return Err("max_clients must be at least 1".to_string());
        }
        if self.max_clients > squad::COUNT * squad::MEMBER_COUNT {
            return Err(format!(
                "max_clients cannot exceed {} squad slots",
                squad::COUNT * squad::MEMBER_COUNT
            ));
        }
        Ok(())
    }
}
