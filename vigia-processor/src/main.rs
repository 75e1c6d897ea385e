/**
 * VIGIA PROCESSOR - Point d'entrée du moteur d'ingestion
 *
 * RÔLE : Bootstrap complet : config, pool PostgreSQL, boucle MQTT,
 * sweep d'inactivité. Deux contextes d'exécution pour la vie du process :
 * la boucle broker (séquentielle par message) et le timer de sweep,
 * qui partagent le suivi last-seen derrière un mutex.
 *
 * ARRÊT : Ctrl-C → disconnect MQTT puis sortie. Aucun flush du travail
 * en vol.
 */

mod alarms;
mod config;
mod db;
mod models;
mod monitor;
mod mqtt;
mod state;

use crate::alarms::AlarmRules;
use crate::db::PgStore;
use crate::mqtt::Ingestor;
use crate::state::{new_state, LastSeenMap, SensorCatalog};

use anyhow::{Context, Result};
use std::collections::HashMap;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Ok si .env n'existe pas

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cfg = config::load_config().await;
    info!(
        "starting vigia-processor (broker {}:{}, sweep {}s, inactivity {}s)",
        cfg.mqtt.host, cfg.mqtt.port, cfg.sweep_interval_secs, cfg.inactivity_threshold_secs
    );

    // pool paresseux : un PostgreSQL absent ne bloque pas le démarrage
    let store = PgStore::connect_lazy(&cfg.database_url).context("invalid database URL")?;
    if let Err(e) = store.ensure_schema().await {
        warn!("schema bootstrap failed (continuing, writes will be dropped): {e}");
    }

    let last_seen = new_state::<LastSeenMap>(HashMap::new());
    let catalog = new_state::<SensorCatalog>(HashMap::new());

    let ingestor = Ingestor::new(
        store.clone(),
        AlarmRules::with_defaults(),
        last_seen.clone(),
        catalog.clone(),
    );
    let client = mqtt::spawn_mqtt_listener(&cfg, ingestor);
    monitor::spawn_inactivity_monitor(&cfg, store, last_seen);

    tokio::signal::ctrl_c().await.context("failed to listen for ctrl-c")?;
    info!("shutting down vigia-processor");
    client.disconnect().await.ok();
    Ok(())
}
