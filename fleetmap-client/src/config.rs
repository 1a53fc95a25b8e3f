use anyhow::Context;
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub server_url: String,
    pub fleet_topic: String,
    pub reconnect_delay_ms: u64,
    pub heartbeat_interval_secs: u64,
    pub render_window_ms: u64,
    pub snapshot_buffer: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: "ws://localhost:8087/ws".to_string(),
            fleet_topic: "/topic/vehicles/all".to_string(),
            reconnect_delay_ms: 5000,
            heartbeat_interval_secs: 40,
            render_window_ms: 1000,
            snapshot_buffer: 64,
        }
    }
}

impl Config {
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if !path.exists() {
            create_default_config(path)?;
        }
        let config_file = std::fs::File::open(path)
            .with_context(|| format!("could not open config file {:?}", path))?;
        let reader = std::io::BufReader::new(config_file);
        serde_json::from_reader(reader)
            .with_context(|| format!("could not parse config file {:?}", path))
    }

    pub fn reconnect_delay(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn heartbeat_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.heartbeat_interval_secs)
    }

    pub fn render_window(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.render_window_ms)
    }
}

pub fn create_default_config(path: &std::path::Path) -> anyhow::Result<()> {
    use std::io::prelude::*;
    let mut config_file = std::fs::File::create(path)
        .with_context(|| format!("could not create config file {:?}", path))?;
    let config_str = serde_json::to_vec_pretty(&Config::default())?;
    config_file.write_all(&config_str)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_original_client_timings() {
        let config = Config::default();
        assert_eq!(config.reconnect_delay(), std::time::Duration::from_millis(5000));
        assert_eq!(config.heartbeat_interval(), std::time::Duration::from_secs(40));
        assert_eq!(config.render_window(), std::time::Duration::from_millis(1000));
    }

    #[test]
    fn partial_config_files_fall_back_to_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"server_url": "ws://fleet.example/ws"}"#).unwrap();
        assert_eq!(config.server_url, "ws://fleet.example/ws");
        assert_eq!(config.fleet_topic, "/topic/vehicles/all");
        assert_eq!(config.render_window_ms, 1000);
    }
}
