//! Collector configuration: broker address, machine identity, OpenWeather
//! access and the list of announced sensors. Loaded from a YAML file with
//! a built-in default matching the reference station.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;
use tracing::warn;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectorConfig {
    pub machine_id: String,
    pub mqtt: MqttConf,
    pub openweather: OpenWeatherConf,
    pub publish_interval_secs: u64,
    pub sensors: Vec<SensorConf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MqttConf {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenWeatherConf {
    pub api_key: String,
    pub city: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorConf {
    pub sensor_id: String,
    pub data_type: DataType,
    pub data_interval: u64,
}

/// Sensor classes the collector knows how to sample from OpenWeather.
/// Serialized form is the wire `data_type` the processor dispatches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    Temperature,
    Humidity,
    WindSpeed,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            machine_id: "machine_001".into(),
            mqtt: MqttConf { host: "localhost".into(), port: 1883 },
            openweather: OpenWeatherConf { api_key: String::new(), city: "New York".into() },
            publish_interval_secs: 60,
            sensors: vec![
                SensorConf { sensor_id: "temp_01".into(), data_type: DataType::Temperature, data_interval: 60 },
                SensorConf { sensor_id: "hum_01".into(), data_type: DataType::Humidity, data_interval: 60 },
                SensorConf { sensor_id: "wind_01".into(), data_type: DataType::WindSpeed, data_interval: 60 },
            ],
        }
    }
}

pub async fn load_config() -> CollectorConfig {
    let path = std::env::var("VIGIA_COLLECTOR_CONFIG").unwrap_or_else(|_| "collector.yaml".into());
    let mut cfg = if Path::new(&path).exists() {
        let txt = fs::read_to_string(&path).await.unwrap_or_default();
        if txt.trim().is_empty() {
            CollectorConfig::default()
        } else {
            serde_yaml::from_str(&txt).unwrap_or_else(|e| {
                warn!("invalid config ({path}): {e}");
                CollectorConfig::default()
            })
        }
    } else {
        warn!("no {path}, using default config");
        CollectorConfig::default()
    };

    // OPENWEATHER_API_KEY (from .env or environment) wins over the YAML
    if let Ok(key) = std::env::var("OPENWEATHER_API_KEY") {
        cfg.openweather.api_key = key;
    }
    cfg
}
