/*!
Mock MQTT Client pour développement sans broker

Permet de tester collector et processor sans démarrer un broker MQTT réel.
Enregistre toutes les publications et permet de simuler la réception.
*/

use rumqttc::QoS;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use anyhow::Result;

#[derive(Debug, Clone)]
pub struct MockMessage {
    pub topic: String,
    pub payload: Vec<u8>,
    pub qos: QoS,
    pub retain: bool,
}

/// Mock MQTT Client qui imite la surface de rumqttc::AsyncClient
#[derive(Clone, Default)]
pub struct MockMqttClient {
    published_messages: Arc<Mutex<Vec<MockMessage>>>,
    subscriptions: Arc<Mutex<Vec<String>>>,
    message_sender: Arc<Mutex<Option<mpsc::UnboundedSender<MockMessage>>>>,
}

impl MockMqttClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration d'un channel pour recevoir les messages simulés
    pub fn setup_receiver(&self) -> mpsc::UnboundedReceiver<MockMessage> {
        let (sender, receiver) = mpsc::unbounded_channel();
        *self.message_sender.lock().unwrap() = Some(sender);
        receiver
    }

    /// Simule la publication d'un message (compatible avec AsyncClient)
    pub async fn publish<S, V>(&self, topic: S, qos: QoS, retain: bool, payload: V) -> Result<()>
    where
        S: Into<String>,
        V: Into<Vec<u8>>,
    {
        let message = MockMessage {
            topic: topic.into(),
            payload: payload.into(),
            qos,
            retain,
        };

        tracing::debug!("[MOCK] published to {}: {} bytes", message.topic, message.payload.len());
        self.published_messages.lock().unwrap().push(message);
        Ok(())
    }

    /// Simule l'abonnement à un topic (compatible avec AsyncClient)
    pub async fn subscribe<S: Into<String>>(&self, topic: S, _qos: QoS) -> Result<()> {
        let topic = topic.into();
        tracing::debug!("[MOCK] subscribed to {topic}");
        self.subscriptions.lock().unwrap().push(topic);
        Ok(())
    }

    /// Simule la réception d'un message (pour tests)
    pub async fn simulate_incoming<S, V>(&self, topic: S, payload: V) -> Result<()>
    where
        S: Into<String>,
        V: Into<Vec<u8>>,
    {
        let message = MockMessage {
            topic: topic.into(),
            payload: payload.into(),
            qos: QoS::AtLeastOnce,
            retain: false,
        };

        if let Some(sender) = self.message_sender.lock().unwrap().as_ref() {
            sender
                .send(message)
                .map_err(|e| anyhow::anyhow!("send error: {e}"))?;
        }
        Ok(())
    }

    /// Récupère tous les messages publiés (pour assertions de tests)
    pub fn published(&self) -> Vec<MockMessage> {
        self.published_messages.lock().unwrap().clone()
    }

    /// Récupère les abonnements (pour assertions de tests)
    pub fn subscriptions(&self) -> Vec<String> {
        self.subscriptions.lock().unwrap().clone()
    }

    /// Messages publiés sur un topic donné
    pub fn published_on(&self, topic: &str) -> Vec<MockMessage> {
        self.published_messages
            .lock()
            .unwrap()
            .iter()
            .filter(|msg| msg.topic == topic)
            .cloned()
            .collect()
    }

    /// Parse le dernier message d'un topic en JSON
    pub fn last_json_on<T>(&self, topic: &str) -> Result<Option<T>>
    where
        T: for<'de> serde::Deserialize<'de>,
    {
        match self.published_on(topic).last() {
            Some(msg) => Ok(Some(serde_json::from_slice(&msg.payload)?)),
            None => Ok(None),
        }
    }

    /// Reset tous les messages enregistrés
    pub fn clear(&self) {
        self.published_messages.lock().unwrap().clear();
        self.subscriptions.lock().unwrap().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_publishes_per_topic() {
        let client = MockMqttClient::new();
        client
            .publish("/sensors/m/temp_01", QoS::AtLeastOnce, false, br#"{"value":1.0}"#.to_vec())
            .await
            .unwrap();
        client
            .publish("/sensor_monitors", QoS::AtLeastOnce, false, b"{}".to_vec())
            .await
            .unwrap();

        assert_eq!(client.published().len(), 2);
        assert_eq!(client.published_on("/sensors/m/temp_01").len(), 1);
        client.clear();
        assert!(client.published().is_empty());
    }

    #[tokio::test]
    async fn forwards_simulated_messages() {
        let client = MockMqttClient::new();
        let mut rx = client.setup_receiver();
        client.simulate_incoming("/sensors/m/s", b"payload".to_vec()).await.unwrap();

        let msg = rx.recv().await.unwrap();
        assert_eq!(msg.topic, "/sensors/m/s");
        assert_eq!(msg.payload, b"payload");
    }
}
