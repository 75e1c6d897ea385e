use crate::models::SensorKey;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

pub type Shared<T> = Arc<Mutex<T>>;

pub fn new_state<T>(value: T) -> Shared<T> {
    Arc::new(Mutex::new(value))
}

/// Suivi par capteur : dernier instant de TRAITEMENT (pour le sweep
/// d'inactivité) et dernière lecture valide (pour temp_variation).
#[derive(Debug, Clone, Copy)]
pub struct SensorTrack {
    pub last_seen: DateTime<Utc>,
    pub last_reading: (DateTime<Utc>, f64),
}

/// Les entrées ne sont jamais retirées : la map grandit avec chaque
/// capteur distinct vu pendant la vie du process.
pub type LastSeenMap = HashMap<SensorKey, SensorTrack>;

/// data_type annoncé par capteur, rempli depuis /sensor_monitors.
pub type SensorCatalog = HashMap<SensorKey, String>;
