/**
 * ALARM EVALUATOR - Règles d'alarme par classe de capteur
 *
 * RÔLE : Logique de décision pure : une lecture (plus, pour la
 * température, la lecture précédente) → zéro ou plusieurs alarmes.
 *
 * ARCHITECTURE : Registry classe → règle. Le dispatch se fait sur le
 * data_type annoncé, pas sur l'identifiant littéral du capteur : un
 * nouveau capteur d'une classe connue ne demande aucun changement de code.
 *
 * Pas d'hystérésis : une valeur qui reste au-dessus du seuil re-déclenche
 * la même alarme à chaque lecture. C'est le contrat, pas un bug.
 */
use crate::models::{AlarmEvent, AlarmType, SensorReading};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

/// Classe fonctionnelle d'un capteur, indépendante de son identifiant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorClass {
    Temperature,
    Humidity,
    Wind,
}

impl SensorClass {
    /// Résolution depuis le data_type annoncé sur /sensor_monitors.
    pub fn from_data_type(data_type: &str) -> Option<Self> {
        match data_type {
            "temperature" => Some(SensorClass::Temperature),
            "humidity" => Some(SensorClass::Humidity),
            "wind_speed" | "wind" => Some(SensorClass::Wind),
            _ => None,
        }
    }

    /// Repli sur le préfixe du sensor_id pour les lectures arrivées avant
    /// toute annonce (les capteurs de référence : temp_01, hum_01, wind_01).
    pub fn from_sensor_id(sensor_id: &str) -> Option<Self> {
        if sensor_id.starts_with("temp") {
            Some(SensorClass::Temperature)
        } else if sensor_id.starts_with("hum") {
            Some(SensorClass::Humidity)
        } else if sensor_id.starts_with("wind") {
            Some(SensorClass::Wind)
        } else {
            None
        }
    }
}

/// Lecture précédente du même capteur : (horodatage, valeur).
pub type PriorReading = Option<(DateTime<Utc>, f64)>;

type RuleFn = fn(&SensorReading, PriorReading, DateTime<Utc>) -> Vec<AlarmEvent>;

/// Registry classe → règle d'évaluation.
pub struct AlarmRules {
    rules: HashMap<SensorClass, RuleFn>,
}

impl AlarmRules {
    pub fn new() -> Self {
        Self { rules: HashMap::new() }
    }

    /// Jeu de règles de référence : température, humidité, vent.
    pub fn with_defaults() -> Self {
        let mut rules = Self::new();
        rules.register(SensorClass::Temperature, temperature_rule);
        rules.register(SensorClass::Humidity, humidity_rule);
        rules.register(SensorClass::Wind, wind_rule);
        rules
    }

    pub fn register(&mut self, class: SensorClass, rule: RuleFn) {
        self.rules.insert(class, rule);
    }

    /// Évalue une lecture. Classe inconnue ou sans règle : aucune alarme.
    pub fn evaluate(
        &self,
        class: Option<SensorClass>,
        reading: &SensorReading,
        prior: PriorReading,
        now: DateTime<Utc>,
    ) -> Vec<AlarmEvent> {
        match class.and_then(|c| self.rules.get(&c)) {
            Some(rule) => rule(reading, prior, now),
            None => Vec::new(),
        }
    }
}

impl Default for AlarmRules {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn alarm(reading: &SensorReading, alarm_type: AlarmType, details: String, now: DateTime<Utc>) -> AlarmEvent {
    AlarmEvent {
        machine_id: reading.machine_id.clone(),
        sensor_id: reading.sensor_id.clone(),
        alarm_type,
        details,
        time: now,
    }
}

/// Seuils exclusifs (35.0 et 5.0 pile ne déclenchent pas) + variation
/// brusque sur la fenêtre glissante d'une heure. Les trois contrôles sont
/// indépendants : une lecture peut produire jusqu'à deux alarmes.
fn temperature_rule(reading: &SensorReading, prior: PriorReading, now: DateTime<Utc>) -> Vec<AlarmEvent> {
    let mut events = Vec::new();

    if reading.value > 35.0 {
        events.push(alarm(
            reading,
            AlarmType::Heat,
            format!("Temperature {:.1} above 35 threshold", reading.value),
            now,
        ));
    }
    if reading.value < 5.0 {
        events.push(alarm(
            reading,
            AlarmType::Cold,
            format!("Temperature {:.1} below 5 threshold", reading.value),
            now,
        ));
    }

    if let Some((prior_ts, prior_value)) = prior {
        let within_window = reading.timestamp - prior_ts <= Duration::hours(1);
        if within_window && (reading.value - prior_value).abs() > 10.0 {
            events.push(alarm(
                reading,
                AlarmType::TempVariation,
                format!(
                    "Temperature changed from {prior_value:.1} to {:.1} within one hour",
                    reading.value
                ),
                now,
            ));
        }
    }

    events
}

fn humidity_rule(reading: &SensorReading, _prior: PriorReading, now: DateTime<Utc>) -> Vec<AlarmEvent> {
    let mut events = Vec::new();

    if reading.value < 20.0 {
        events.push(alarm(
            reading,
            AlarmType::Dry,
            format!("Humidity {:.1} below 20 threshold", reading.value),
            now,
        ));
    }
    if reading.value > 90.0 {
        events.push(alarm(
            reading,
            AlarmType::Humidity,
            format!("Humidity {:.1} above 90 threshold", reading.value),
            now,
        ));
    }

    events
}

fn wind_rule(reading: &SensorReading, _prior: PriorReading, now: DateTime<Utc>) -> Vec<AlarmEvent> {
    if reading.value > 10.0 {
        vec![alarm(
            reading,
            AlarmType::Wind,
            format!("Wind speed {:.1} above 10 threshold", reading.value),
            now,
        )]
    } else {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn reading(value: f64) -> SensorReading {
        SensorReading {
            machine_id: "machine_001".into(),
            sensor_id: "temp_01".into(),
            timestamp: Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
            value,
        }
    }

    fn types(events: &[AlarmEvent]) -> Vec<AlarmType> {
        events.iter().map(|e| e.alarm_type).collect()
    }

    #[test]
    fn temperature_thresholds() {
        let rules = AlarmRules::with_defaults();
        let now = Utc::now();
        let class = Some(SensorClass::Temperature);

        assert_eq!(types(&rules.evaluate(class, &reading(40.0), None, now)), vec![AlarmType::Heat]);
        assert_eq!(types(&rules.evaluate(class, &reading(2.0), None, now)), vec![AlarmType::Cold]);
        // bornes exclusives
        assert!(rules.evaluate(class, &reading(35.0), None, now).is_empty());
        assert!(rules.evaluate(class, &reading(5.0), None, now).is_empty());
        assert!(rules.evaluate(class, &reading(20.0), None, now).is_empty());
    }

    #[test]
    fn temperature_variation_within_hour() {
        let rules = AlarmRules::with_defaults();
        let now = Utc::now();
        let r = reading(36.0);
        let prior_ts = r.timestamp - Duration::minutes(30);

        let events = rules.evaluate(Some(SensorClass::Temperature), &r, Some((prior_ts, 20.0)), now);
        assert_eq!(types(&events), vec![AlarmType::Heat, AlarmType::TempVariation]);
    }

    #[test]
    fn temperature_variation_ignores_old_prior() {
        let rules = AlarmRules::with_defaults();
        let now = Utc::now();
        let r = reading(25.0);
        let prior_ts = r.timestamp - Duration::minutes(61);

        let events = rules.evaluate(Some(SensorClass::Temperature), &r, Some((prior_ts, 5.0)), now);
        assert!(events.is_empty());
    }

    #[test]
    fn temperature_variation_window_is_inclusive() {
        let rules = AlarmRules::with_defaults();
        let now = Utc::now();
        let r = reading(25.0);
        let prior_ts = r.timestamp - Duration::hours(1);

        let events = rules.evaluate(Some(SensorClass::Temperature), &r, Some((prior_ts, 5.0)), now);
        assert_eq!(types(&events), vec![AlarmType::TempVariation]);
    }

    #[test]
    fn temperature_small_variation_is_quiet() {
        let rules = AlarmRules::with_defaults();
        let now = Utc::now();
        let r = reading(25.0);
        let prior_ts = r.timestamp - Duration::minutes(10);

        // écart de 10.0 pile : borne exclusive
        let events = rules.evaluate(Some(SensorClass::Temperature), &r, Some((prior_ts, 15.0)), now);
        assert!(events.is_empty());
    }

    #[test]
    fn humidity_thresholds() {
        let rules = AlarmRules::with_defaults();
        let now = Utc::now();
        let class = Some(SensorClass::Humidity);

        assert_eq!(types(&rules.evaluate(class, &reading(95.0), None, now)), vec![AlarmType::Humidity]);
        assert_eq!(types(&rules.evaluate(class, &reading(10.0), None, now)), vec![AlarmType::Dry]);
        assert!(rules.evaluate(class, &reading(50.0), None, now).is_empty());
        assert!(rules.evaluate(class, &reading(20.0), None, now).is_empty());
        assert!(rules.evaluate(class, &reading(90.0), None, now).is_empty());
    }

    #[test]
    fn wind_threshold() {
        let rules = AlarmRules::with_defaults();
        let now = Utc::now();
        let class = Some(SensorClass::Wind);

        assert_eq!(types(&rules.evaluate(class, &reading(15.0), None, now)), vec![AlarmType::Wind]);
        assert!(rules.evaluate(class, &reading(10.0), None, now).is_empty());
    }

    #[test]
    fn unknown_class_is_quiet() {
        let rules = AlarmRules::with_defaults();
        assert!(rules.evaluate(None, &reading(1000.0), None, Utc::now()).is_empty());
    }

    #[test]
    fn class_resolution() {
        assert_eq!(SensorClass::from_data_type("temperature"), Some(SensorClass::Temperature));
        assert_eq!(SensorClass::from_data_type("wind_speed"), Some(SensorClass::Wind));
        assert_eq!(SensorClass::from_data_type("pressure"), None);
        assert_eq!(SensorClass::from_sensor_id("temp_02"), Some(SensorClass::Temperature));
        assert_eq!(SensorClass::from_sensor_id("hum_07"), Some(SensorClass::Humidity));
        assert_eq!(SensorClass::from_sensor_id("pressure_01"), None);
    }
}
