/**
 * MESSAGE INGESTOR - Boucle MQTT + traitement par message
 *
 * RÔLE : Classifie chaque publish par topic, valide l'enveloppe JSON,
 * persiste la lecture, met à jour le suivi last-seen puis évalue les
 * règles d'alarme. Traitement strictement séquentiel : pas de batch,
 * pas de dédoublonnage, pas d'ordre garanti entre capteurs.
 *
 * ERREURS : tout échec de parse fait tomber le message (logué, aucun
 * écrit partiel) ; une erreur broker endort la boucle deux secondes puis
 * re-poll. Rien ne sort de la boucle.
 */
use crate::alarms::{AlarmRules, SensorClass};
use crate::config::ProcessorConfig;
use crate::db::{MetricsStore, PgStore};
use crate::models::{ReadingPayload, SensorAnnouncement, SensorKey, SensorReading};
use crate::state::{LastSeenMap, SensorCatalog, SensorTrack, Shared};
use chrono::Utc;
use rumqttc::{AsyncClient, Event, Incoming, MqttOptions, QoS};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};

pub const ANNOUNCE_TOPIC: &str = "/sensor_monitors";
pub const READING_SUBSCRIPTION: &str = "/sensors/+/+";

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("topic does not match <prefix>/sensors/<machine_id>/<sensor_id>: {0}")]
    InvalidTopic(String),
    #[error("invalid JSON envelope: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("invalid timestamp {value:?}: {source}")]
    InvalidTimestamp {
        value: String,
        source: chrono::ParseError,
    },
}

/// Message entrant après classification par topic.
#[derive(Debug)]
pub enum Inbound {
    Announcement(SensorAnnouncement),
    Reading(SensorReading),
}

/// Classifie un publish et valide son enveloppe. Pure : aucun état touché.
pub fn classify(topic: &str, payload: &[u8]) -> Result<Inbound, ParseError> {
    if topic == ANNOUNCE_TOPIC {
        let announcement: SensorAnnouncement = serde_json::from_slice(payload)?;
        return Ok(Inbound::Announcement(announcement));
    }

    // au moins quatre segments, le deuxième littéralement "sensors"
    let parts: Vec<&str> = topic.split('/').collect();
    if parts.len() < 4 || parts[1] != "sensors" {
        return Err(ParseError::InvalidTopic(topic.to_string()));
    }
    let machine_id = parts[2].to_string();
    let sensor_id = parts[3].to_string();

    let payload: ReadingPayload = serde_json::from_slice(payload)?;
    let timestamp = chrono::DateTime::parse_from_rfc3339(&payload.timestamp)
        .map_err(|e| ParseError::InvalidTimestamp { value: payload.timestamp.clone(), source: e })?
        .with_timezone(&Utc);

    Ok(Inbound::Reading(SensorReading {
        machine_id,
        sensor_id,
        timestamp,
        value: payload.value,
    }))
}

/// Traitement par message : un Ingestor par boucle broker.
pub struct Ingestor<S: MetricsStore> {
    store: S,
    rules: AlarmRules,
    last_seen: Shared<LastSeenMap>,
    catalog: Shared<SensorCatalog>,
}

impl<S: MetricsStore> Ingestor<S> {
    pub fn new(
        store: S,
        rules: AlarmRules,
        last_seen: Shared<LastSeenMap>,
        catalog: Shared<SensorCatalog>,
    ) -> Self {
        Self { store, rules, last_seen, catalog }
    }

    pub async fn handle_publish(&self, topic: &str, payload: &[u8]) {
        match classify(topic, payload) {
            Ok(Inbound::Announcement(announcement)) => self.record_announcement(announcement),
            Ok(Inbound::Reading(reading)) => self.ingest_reading(reading).await,
            Err(e) => warn!("dropping message on {topic}: {e}"),
        }
    }

    /// Annonce : loguée et versée au catalogue, jamais persistée.
    fn record_announcement(&self, announcement: SensorAnnouncement) {
        info!(
            "sensor announcement from {}: {} sensor(s)",
            announcement.machine_id,
            announcement.sensors.len()
        );
        let mut catalog = self.catalog.lock();
        for sensor in announcement.sensors {
            debug!(
                "  {} type={} interval={}s",
                sensor.sensor_id, sensor.data_type, sensor.data_interval
            );
            catalog.insert(
                (announcement.machine_id.clone(), sensor.sensor_id),
                sensor.data_type,
            );
        }
    }

    async fn ingest_reading(&self, reading: SensorReading) {
        self.store.write_reading(&reading).await;

        // last_seen = instant de traitement, pas l'horodatage de la lecture
        let now = Utc::now();
        let key: SensorKey = (reading.machine_id.clone(), reading.sensor_id.clone());
        let prior = {
            let mut map = self.last_seen.lock();
            let prior = map.get(&key).map(|track| track.last_reading);
            map.insert(
                key.clone(),
                SensorTrack { last_seen: now, last_reading: (reading.timestamp, reading.value) },
            );
            prior
        };

        let class = self.resolve_class(&key);
        for event in self.rules.evaluate(class, &reading, prior, now) {
            info!(
                "alarm {} for {}/{}: {}",
                event.alarm_type, event.machine_id, event.sensor_id, event.details
            );
            self.store.write_alarm(&event).await;
        }
    }

    /// Catalogue d'annonces d'abord, préfixe du sensor_id en repli.
    fn resolve_class(&self, key: &SensorKey) -> Option<SensorClass> {
        let announced = self
            .catalog
            .lock()
            .get(key)
            .and_then(|data_type| SensorClass::from_data_type(data_type));
        announced.or_else(|| SensorClass::from_sensor_id(&key.1))
    }
}

/// Démarre la boucle broker. Les messages sont traités un par un dans la
/// task ; le client rendu sert au disconnect à l'arrêt du process.
pub fn spawn_mqtt_listener(cfg: &ProcessorConfig, ingestor: Ingestor<PgStore>) -> AsyncClient {
    let mut opts = MqttOptions::new("vigia-processor", &cfg.mqtt.host, cfg.mqtt.port);
    opts.set_keep_alive(Duration::from_secs(15));
    let (client, mut eventloop) = AsyncClient::new(opts, 10);

    let loop_client = client.clone();
    tokio::spawn(async move {
        if let Err(e) = loop_client.subscribe(ANNOUNCE_TOPIC, QoS::AtLeastOnce).await {
            error!("subscribe {ANNOUNCE_TOPIC} failed: {e:?}");
            return;
        }
        if let Err(e) = loop_client.subscribe(READING_SUBSCRIPTION, QoS::AtLeastOnce).await {
            error!("subscribe {READING_SUBSCRIPTION} failed: {e:?}");
            return;
        }

        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Incoming::Publish(publish))) => {
                    debug!("message on {} ({} bytes)", publish.topic, publish.payload.len());
                    ingestor.handle_publish(&publish.topic, &publish.payload).await;
                }
                Ok(_) => {}
                Err(e) => {
                    error!("MQTT error: {e:?}");
                    tokio::time::sleep(Duration::from_secs(2)).await;
                }
            }
        }
    });

    client
}
