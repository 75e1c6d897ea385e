use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::fmt;

/// Message initial publié sur /sensor_monitors à chaque cycle du collector.
/// Informatif seulement : jamais persisté, jamais consulté par le sweep.
#[derive(Debug, Deserialize)]
pub struct SensorAnnouncement {
    pub machine_id: String,
    pub sensors: Vec<SensorInfo>,
}

#[derive(Debug, Deserialize)]
pub struct SensorInfo {
    pub sensor_id: String,
    pub data_type: String,
    pub data_interval: u64,
}

/// Payload brut des topics /sensors/<machine_id>/<sensor_id>.
#[derive(Debug, Deserialize)]
pub struct ReadingPayload {
    pub timestamp: String,
    pub value: f64,
}

/// Lecture validée, immuable une fois construite.
#[derive(Debug, Clone)]
pub struct SensorReading {
    pub machine_id: String,
    pub sensor_id: String,
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmType {
    Heat,
    Cold,
    TempVariation,
    Dry,
    Humidity,
    Wind,
    Inactive,
}

impl AlarmType {
    /// Valeur stockée dans la colonne alarms.alarm_type.
    pub fn as_str(&self) -> &'static str {
        match self {
            AlarmType::Heat => "heat_alert",
            AlarmType::Cold => "cold_alert",
            AlarmType::TempVariation => "temp_variation",
            AlarmType::Dry => "dry_alert",
            AlarmType::Humidity => "humidity_alert",
            AlarmType::Wind => "wind_alert",
            AlarmType::Inactive => "inactive",
        }
    }
}

impl fmt::Display for AlarmType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Événement d'alarme : aucun identifiant propre, les doublons sont attendus.
/// `time` est l'instant d'évaluation (pas l'horodatage de la lecture).
#[derive(Debug, Clone)]
pub struct AlarmEvent {
    pub machine_id: String,
    pub sensor_id: String,
    pub alarm_type: AlarmType,
    pub details: String,
    pub time: DateTime<Utc>,
}

pub type SensorKey = (String, String);
