//! Vigia Collector - Weather telemetry producer
//!
//! Periodic publisher with no internal state: each cycle it announces its
//! sensors on `/sensor_monitors`, samples the OpenWeather API and
//! republishes one reading per sensor on `/sensors/<machine>/<sensor>`.
//! A failed sample skips that sensor for the cycle; the loop never exits.

mod config;
mod weather;

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use config::{CollectorConfig, DataType, SensorConf};
use rumqttc::{AsyncClient, MqttOptions, QoS};
use serde::Serialize;
use std::time::Duration;
use tokio::time::interval;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use weather::WeatherClient;

const ANNOUNCE_TOPIC: &str = "/sensor_monitors";

/// Announcement published once per cycle (matches the processor contract).
#[derive(Debug, Serialize)]
struct AnnouncementMessage<'a> {
    machine_id: &'a str,
    sensors: Vec<AnnouncedSensor<'a>>,
}

#[derive(Debug, Serialize)]
struct AnnouncedSensor<'a> {
    sensor_id: &'a str,
    data_type: DataType,
    data_interval: u64,
}

/// Reading envelope: ISO-8601 UTC timestamp with trailing "Z" plus the
/// sampled value.
#[derive(Debug, Serialize)]
struct ReadingMessage {
    timestamp: String,
    value: f64,
}

fn announcement_payload(machine_id: &str, sensors: &[SensorConf]) -> Result<String> {
    let message = AnnouncementMessage {
        machine_id,
        sensors: sensors
            .iter()
            .map(|s| AnnouncedSensor {
                sensor_id: &s.sensor_id,
                data_type: s.data_type,
                data_interval: s.data_interval,
            })
            .collect(),
    };
    serde_json::to_string(&message).context("failed to serialize announcement")
}

fn reading_topic(machine_id: &str, sensor_id: &str) -> String {
    format!("/sensors/{machine_id}/{sensor_id}")
}

fn reading_payload(value: f64, at: DateTime<Utc>) -> Result<String> {
    let message = ReadingMessage {
        timestamp: at.to_rfc3339_opts(SecondsFormat::Micros, true),
        value,
    };
    serde_json::to_string(&message).context("failed to serialize reading")
}

struct Collector {
    config: CollectorConfig,
    weather: WeatherClient,
    mqtt: AsyncClient,
}

impl Collector {
    fn new(config: CollectorConfig) -> Self {
        let client_id = format!("vigia-collector-{}", config.machine_id);
        let mut options = MqttOptions::new(client_id, &config.mqtt.host, config.mqtt.port);
        options.set_keep_alive(Duration::from_secs(30));
        let (mqtt, mut eventloop) = AsyncClient::new(options, 10);

        // Keep the connection alive in the background; the collector only
        // publishes, incoming packets are drained and dropped.
        tokio::spawn(async move {
            loop {
                if let Err(e) = eventloop.poll().await {
                    error!("MQTT connection error: {e}");
                    tokio::time::sleep(Duration::from_secs(5)).await;
                }
            }
        });

        let weather = WeatherClient::new(
            config.openweather.api_key.clone(),
            config.openweather.city.clone(),
        );
        Self { config, weather, mqtt }
    }

    async fn run(&self) -> Result<()> {
        info!(
            "starting collector {} ({} sensors, every {}s)",
            self.config.machine_id,
            self.config.sensors.len(),
            self.config.publish_interval_secs
        );

        let mut timer = interval(Duration::from_secs(self.config.publish_interval_secs));
        loop {
            timer.tick().await;
            if let Err(e) = self.publish_announcement().await {
                error!("failed to publish announcement: {e:#}");
            }
            self.publish_readings().await;
        }
    }

    async fn publish_announcement(&self) -> Result<()> {
        let payload = announcement_payload(&self.config.machine_id, &self.config.sensors)?;
        self.mqtt
            .publish(ANNOUNCE_TOPIC, QoS::AtLeastOnce, false, payload)
            .await
            .context("failed to publish on /sensor_monitors")?;
        info!("announced {} sensor(s) for {}", self.config.sensors.len(), self.config.machine_id);
        Ok(())
    }

    async fn publish_readings(&self) {
        for sensor in &self.config.sensors {
            let observation = match self.weather.fetch().await {
                Ok(observation) => observation,
                Err(e) => {
                    warn!("skipping {} this cycle: {e:#}", sensor.sensor_id);
                    continue;
                }
            };
            let value = observation.value_for(sensor.data_type);

            let topic = reading_topic(&self.config.machine_id, &sensor.sensor_id);
            let payload = match reading_payload(value, Utc::now()) {
                Ok(payload) => payload,
                Err(e) => {
                    warn!("skipping {}: {e:#}", sensor.sensor_id);
                    continue;
                }
            };

            match self.mqtt.publish(&topic, QoS::AtLeastOnce, false, payload).await {
                Ok(()) => info!("published {topic}: {value}"),
                Err(e) => warn!("failed to publish on {topic}: {e}"),
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cfg = config::load_config().await;
    if cfg.openweather.api_key.is_empty() {
        warn!("no OpenWeather API key configured, samples will fail until one is set");
    }

    let collector = Collector::new(cfg);
    collector.run().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use vigia_devkit::MockMqttClient;

    fn sensors() -> Vec<SensorConf> {
        CollectorConfig::default().sensors
    }

    #[test]
    fn announcement_matches_wire_contract() {
        let payload = announcement_payload("machine_001", &sensors()).unwrap();
        let parsed: Value = serde_json::from_str(&payload).unwrap();

        assert_eq!(parsed["machine_id"], "machine_001");
        let sensors = parsed["sensors"].as_array().unwrap();
        assert_eq!(sensors.len(), 3);
        assert_eq!(sensors[0]["sensor_id"], "temp_01");
        assert_eq!(sensors[0]["data_type"], "temperature");
        assert_eq!(sensors[0]["data_interval"], 60);
        assert_eq!(sensors[2]["data_type"], "wind_speed");
    }

    #[test]
    fn reading_envelope_is_z_suffixed() {
        let at = Utc::now();
        let payload = reading_payload(12.5, at).unwrap();
        let parsed: Value = serde_json::from_str(&payload).unwrap();

        assert_eq!(parsed["value"], 12.5);
        let timestamp = parsed["timestamp"].as_str().unwrap();
        assert!(timestamp.ends_with('Z'), "expected Z suffix, got {timestamp}");
        // must parse back as RFC 3339 on the processor side
        chrono::DateTime::parse_from_rfc3339(timestamp).unwrap();
    }

    #[test]
    fn reading_topics_follow_the_scheme() {
        assert_eq!(reading_topic("machine_001", "temp_01"), "/sensors/machine_001/temp_01");
    }

    #[tokio::test]
    async fn publish_cycle_against_mock_broker() {
        let mock = MockMqttClient::new();
        let machine_id = "machine_001";

        let announcement = announcement_payload(machine_id, &sensors()).unwrap();
        mock.publish(ANNOUNCE_TOPIC, QoS::AtLeastOnce, false, announcement).await.unwrap();
        let reading = reading_payload(21.5, Utc::now()).unwrap();
        mock.publish(reading_topic(machine_id, "temp_01"), QoS::AtLeastOnce, false, reading)
            .await
            .unwrap();

        let announced: Value = mock.last_json_on(ANNOUNCE_TOPIC).unwrap().unwrap();
        assert_eq!(announced["machine_id"], machine_id);
        let published: Value =
            mock.last_json_on("/sensors/machine_001/temp_01").unwrap().unwrap();
        assert_eq!(published["value"], 21.5);
    }
}
