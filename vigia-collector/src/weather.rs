//! Thin OpenWeather client: one current-conditions request per sample,
//! metric units, value picked out of the response by sensor data type.

use crate::config::DataType;
use anyhow::{Context, Result};
use serde::Deserialize;

const API_URL: &str = "http://api.openweathermap.org/data/2.5/weather";

#[derive(Debug, Deserialize)]
pub struct WeatherObservation {
    pub main: MainObservation,
    pub wind: WindObservation,
}

#[derive(Debug, Deserialize)]
pub struct MainObservation {
    pub temp: f64,
    pub humidity: f64,
}

#[derive(Debug, Deserialize)]
pub struct WindObservation {
    pub speed: f64,
}

impl WeatherObservation {
    pub fn value_for(&self, data_type: DataType) -> f64 {
        match data_type {
            DataType::Temperature => self.main.temp,
            DataType::Humidity => self.main.humidity,
            DataType::WindSpeed => self.wind.speed,
        }
    }
}

pub struct WeatherClient {
    http: reqwest::Client,
    api_key: String,
    city: String,
}

impl WeatherClient {
    pub fn new(api_key: String, city: String) -> Self {
        Self { http: reqwest::Client::new(), api_key, city }
    }

    /// Fetch the current conditions once. Every sensor of a cycle reads
    /// from its own fetch, like the reference station does.
    pub async fn fetch(&self) -> Result<WeatherObservation> {
        let response = self
            .http
            .get(API_URL)
            .query(&[("q", self.city.as_str()), ("appid", self.api_key.as_str()), ("units", "metric")])
            .send()
            .await
            .context("OpenWeather request failed")?
            .error_for_status()
            .context("OpenWeather returned an error status")?;

        response
            .json::<WeatherObservation>()
            .await
            .context("failed to decode OpenWeather response")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_value_per_data_type() {
        let body = r#"{
            "main": {"temp": 21.4, "humidity": 63.0, "pressure": 1014},
            "wind": {"speed": 4.6, "deg": 270}
        }"#;
        let obs: WeatherObservation = serde_json::from_str(body).unwrap();

        assert_eq!(obs.value_for(DataType::Temperature), 21.4);
        assert_eq!(obs.value_for(DataType::Humidity), 63.0);
        assert_eq!(obs.value_for(DataType::WindSpeed), 4.6);
    }
}
