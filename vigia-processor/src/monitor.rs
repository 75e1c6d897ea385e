/**
 * INACTIVITY MONITOR - Sweep périodique des capteurs silencieux
 *
 * RÔLE : Toutes les sweep_interval_secs, parcourt le suivi last-seen et
 * émet une alarme `inactive` pour chaque capteur muet depuis plus de
 * inactivity_threshold_secs. Ré-émet à chaque sweep tant que la condition
 * tient ; aucun état "déjà alarmé".
 *
 * Les deux constantes sont globales au process, jamais dérivées du
 * data_interval annoncé par capteur.
 */
use crate::config::ProcessorConfig;
use crate::db::{MetricsStore, PgStore};
use crate::models::{AlarmEvent, AlarmType};
use crate::state::{LastSeenMap, Shared};
use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};

/// Un passage de sweep. Pur : l'instant courant est injecté.
/// N'alarme que sur des paires déjà vues au moins une fois (le suivi
/// n'est alimenté que par des lectures valides).
pub fn sweep_inactive(
    last_seen: &Shared<LastSeenMap>,
    threshold: Duration,
    now: DateTime<Utc>,
) -> Vec<AlarmEvent> {
    let map = last_seen.lock();
    map.iter()
        .filter(|(_, track)| now - track.last_seen > threshold)
        .map(|((machine_id, sensor_id), _)| AlarmEvent {
            machine_id: machine_id.clone(),
            sensor_id: sensor_id.clone(),
            alarm_type: AlarmType::Inactive,
            details: format!(
                "Sensor {sensor_id} inactive for more than {} seconds",
                threshold.num_seconds()
            ),
            time: now,
        })
        .collect()
}

/// Démarre le timer de sweep dans sa propre task.
pub fn spawn_inactivity_monitor(
    cfg: &ProcessorConfig,
    store: PgStore,
    last_seen: Shared<LastSeenMap>,
) {
    let sweep_interval = std::time::Duration::from_secs(cfg.sweep_interval_secs);
    let threshold = Duration::seconds(cfg.inactivity_threshold_secs);
    info!(
        "inactivity monitor: sweep every {}s, threshold {}s",
        cfg.sweep_interval_secs, cfg.inactivity_threshold_secs
    );

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(sweep_interval);
        loop {
            interval.tick().await;
            for event in sweep_inactive(&last_seen, threshold, Utc::now()) {
                warn!(
                    "alarm {} for {}/{}: {}",
                    event.alarm_type, event.machine_id, event.sensor_id, event.details
                );
                store.write_alarm(&event).await;
            }
        }
    });
}
