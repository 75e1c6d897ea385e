/**
 * PERSISTENCE GATEWAY - Seul point de contact avec PostgreSQL
 *
 * RÔLE : Append-only sur deux relations (sensor_metrics + alarms).
 * Un insert par appel, pas de transaction multi-insert, pas de retry.
 *
 * ERREURS : loguées et avalées sur place. L'ingestion continue même si
 * le store est injoignable — la perte silencieuse est le contrat.
 */
use crate::models::{AlarmEvent, SensorReading};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{debug, error};

/// Contrat d'écriture du moteur. Les erreurs ne remontent jamais :
/// chaque implémentation logue et avale.
#[allow(async_fn_in_trait)]
pub trait MetricsStore {
    async fn write_reading(&self, reading: &SensorReading);
    async fn write_alarm(&self, event: &AlarmEvent);
}

/// Implémentation PostgreSQL sur pool partagé (remplace l'ouverture de
/// connexion à chaque écriture du design d'origine).
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Construit le pool sans se connecter : un PostgreSQL absent au
    /// démarrage ne tue pas le process.
    pub fn connect_lazy(database_url: &str) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect_lazy(database_url)?;
        Ok(Self { pool })
    }

    /// Crée les deux relations append-only si absentes.
    pub async fn ensure_schema(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS sensor_metrics (
                time        TIMESTAMPTZ NOT NULL,
                machine_id  TEXT NOT NULL,
                sensor_id   TEXT NOT NULL,
                value       DOUBLE PRECISION NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS alarms (
                time        TIMESTAMPTZ NOT NULL,
                machine_id  TEXT NOT NULL,
                sensor_id   TEXT NOT NULL,
                alarm_type  TEXT NOT NULL,
                details     TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

impl MetricsStore for PgStore {
    async fn write_reading(&self, reading: &SensorReading) {
        let res = sqlx::query(
            "INSERT INTO sensor_metrics (time, machine_id, sensor_id, value) VALUES ($1, $2, $3, $4)",
        )
        .bind(reading.timestamp)
        .bind(&reading.machine_id)
        .bind(&reading.sensor_id)
        .bind(reading.value)
        .execute(&self.pool)
        .await;

        match res {
            Ok(_) => debug!(
                "persisted reading {}/{} = {}",
                reading.machine_id, reading.sensor_id, reading.value
            ),
            Err(e) => error!(
                "failed to persist reading {}/{}: {e}",
                reading.machine_id, reading.sensor_id
            ),
        }
    }

    async fn write_alarm(&self, event: &AlarmEvent) {
        let res = sqlx::query(
            "INSERT INTO alarms (time, machine_id, sensor_id, alarm_type, details) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(event.time)
        .bind(&event.machine_id)
        .bind(&event.sensor_id)
        .bind(event.alarm_type.as_str())
        .bind(&event.details)
        .execute(&self.pool)
        .await;

        match res {
            Ok(_) => debug!(
                "persisted alarm {} for {}/{}",
                event.alarm_type, event.machine_id, event.sensor_id
            ),
            Err(e) => error!(
                "failed to persist alarm {} for {}/{}: {e}",
                event.alarm_type, event.machine_id, event.sensor_id
            ),
        }
    }
}
