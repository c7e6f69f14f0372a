use crate::maintenance::{ScheduledEventType, AZURE_SCHEDULED_EVENTS_URL};
use crate::AppConfig;
use anyhow::Context;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

#[derive(Deserialize, Debug)]
pub struct Config {
    pub swarm: Swarm,
    #[serde(default)]
    pub maintenance: Maintenance,
    #[serde(default)]
    pub membership: Membership,
    #[serde(default)]
    pub drain: Drain,
    #[serde(default = "default_services_file")]
    pub services_file: PathBuf,
}

#[derive(Deserialize, Debug)]
pub struct Swarm {
    pub address: String,
}

#[derive(Deserialize, Debug)]
#[serde(default)]
pub struct Maintenance {
    pub address: String,
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,
    #[serde(with = "humantime_serde")]
    pub ack_delay: Duration,
    pub drain_event_types: Vec<ScheduledEventType>,
}

impl Default for Maintenance {
    fn default() -> Self {
        Self {
            address: AZURE_SCHEDULED_EVENTS_URL.to_owned(),
            poll_interval: Duration::from_secs(2 * 60),
            ack_delay: Duration::from_secs(45),
            drain_event_types: vec![ScheduledEventType::Terminate],
        }
    }
}

#[derive(Deserialize, Debug)]
#[serde(default)]
pub struct Membership {
    /// Gap between a node creation event and the node reaching readiness.
    #[serde(with = "humantime_serde")]
    pub settle_delay: Duration,
}

impl Default for Membership {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_secs(10),
        }
    }
}

#[derive(Deserialize, Debug)]
#[serde(default)]
pub struct Drain {
    /// Take more time if your nodes need more for a graceful shutdown, but
    /// keep it under the maintenance ack delay plus the feed's NotBefore lead.
    #[serde(with = "humantime_serde")]
    pub grace_period: Duration,
}

impl Default for Drain {
    fn default() -> Self {
        Self {
            grace_period: Duration::from_secs(60),
        }
    }
}

fn default_services_file() -> PathBuf {
    PathBuf::from("services.yml")
}

pub fn load_config() -> anyhow::Result<AppConfig> {
    let config_path = get_config_path()?;
    let file = File::open(&config_path)
        .with_context(|| format!("Failed to open config file {}", &config_path))?;

    Ok(Arc::new(serde_yaml::from_reader(BufReader::new(file))?))
}

fn get_config_path() -> anyhow::Result<String> {
    use std::env;
    use tracing::info;

    env::var("APP_CONFIG").or_else(|e| {
        info!(
            error = format!("{:?}", e).as_str(),
            "Missing or invalid APP_CONFIG env var, fallback to config.yml"
        );
        Ok("config.yml".to_string())
    })
}

pub type ServiceMultipliers = BTreeMap<String, u64>;

#[derive(Deserialize, Debug)]
struct ServicesFile {
    services: ServiceMultipliers,
}

/// Read fresh on every rescale invocation so edits are picked up without a
/// restart.
pub fn load_service_multipliers(path: impl AsRef<Path>) -> anyhow::Result<ServiceMultipliers> {
    let path = path.as_ref();
    let file = File::open(path)
        .with_context(|| format!("Failed to open services file {}", path.display()))?;

    let parsed: ServicesFile = serde_yaml::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse services file {}", path.display()))?;

    Ok(parsed.services)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_service_multipliers() -> Result<(), serde_yaml::Error> {
        let parsed: ServicesFile = serde_yaml::from_str("services:\n  web: 2\n  cache: 1\n")?;

        assert_eq!(parsed.services.get("web"), Some(&2));
        assert_eq!(parsed.services.get("cache"), Some(&1));

        Ok(())
    }

    #[test]
    fn rejects_negative_multipliers() {
        let parsed: Result<ServicesFile, _> = serde_yaml::from_str("services:\n  web: -2\n");

        assert!(parsed.is_err());
    }

    #[test]
    fn rejects_non_numeric_multipliers() {
        let parsed: Result<ServicesFile, _> = serde_yaml::from_str("services:\n  web: lots\n");

        assert!(parsed.is_err());
    }

    #[test]
    fn config_defaults() -> Result<(), serde_yaml::Error> {
        let config: Config = serde_yaml::from_str("swarm:\n  address: http://localhost:2375\n")?;

        assert_eq!(config.maintenance.poll_interval, Duration::from_secs(120));
        assert_eq!(config.maintenance.ack_delay, Duration::from_secs(45));
        assert_eq!(
            config.maintenance.drain_event_types,
            vec![ScheduledEventType::Terminate]
        );
        assert_eq!(config.membership.settle_delay, Duration::from_secs(10));
        assert_eq!(config.drain.grace_period, Duration::from_secs(60));
        assert_eq!(config.services_file, PathBuf::from("services.yml"));

        Ok(())
    }
}
