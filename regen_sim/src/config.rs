use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

/// Session server settings, overridable from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegenServerConfig {
    pub bind: SocketAddr,
    pub asset_root: PathBuf,
    /// Base seed for per-session RNGs; entropy when unset.
    pub session_seed: Option<u64>,
}

impl Default for RegenServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 42000),
            asset_root: PathBuf::from("assets"),
            session_seed: None,
        }
    }
}

impl RegenServerConfig {
    /// Reads `REGEN_SERVER_BIND`, `REGEN_ASSET_ROOT` and `REGEN_SESSION_SEED`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Applies overrides from `lookup`; malformed values keep the default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(raw) = lookup("REGEN_SERVER_BIND") {
            match raw.trim().parse::<SocketAddr>() {
                Ok(bind) => config.bind = bind,
                Err(err) => tracing::warn!(
                    target: "regen_sim::config",
                    value = %raw,
                    error = %err,
                    "server_bind.invalid"
                ),
            }
        }

        if let Some(raw) = lookup("REGEN_ASSET_ROOT") {
            if !raw.trim().is_empty() {
                config.asset_root = PathBuf::from(raw.trim());
            }
        }

        if let Some(raw) = lookup("REGEN_SESSION_SEED") {
            match raw.trim().parse::<u64>() {
                Ok(seed) => config.session_seed = Some(seed),
                Err(err) => tracing::warn!(
                    target: "regen_sim::config",
                    value = %raw,
                    error = %err,
                    "session_seed.invalid"
                ),
            }
        }

        config
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
    fn defaults_apply_without_overrides() {
        let config = RegenServerConfig::from_lookup(|_| None);
        assert_eq!(config, RegenServerConfig::default());
        assert_eq!(config.bind.port(), 42000);
    }

    #[test]
    fn overrides_replace_defaults() {
        let config = RegenServerConfig::from_lookup(lookup_from(&[
            ("REGEN_SERVER_BIND", "0.0.0.0:5555"),
            ("REGEN_ASSET_ROOT", "/srv/regen"),
            ("REGEN_SESSION_SEED", "17"),
        ]));
        assert_eq!(config.bind, "0.0.0.0:5555".parse().expect("valid addr"));
        assert_eq!(config.asset_root, PathBuf::from("/srv/regen"));
        assert_eq!(config.session_seed, Some(17));
    }

    #[test]
    fn malformed_values_keep_defaults() {
        let config = RegenServerConfig::from_lookup(lookup_from(&[
            ("REGEN_SERVER_BIND", "not-an-address"),
            ("REGEN_SESSION_SEED", "-3"),
        ]));
        assert_eq!(config.bind, RegenServerConfig::default().bind);
        assert_eq!(config.session_seed, None);
    }
}
