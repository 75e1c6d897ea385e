/*!
# Vigia DevKit - Stubs et Utilitaires pour Développement

Bibliothèque facilitant le développement des composants Vigia avec:
- Stub MQTT pour tests sans broker
- Assertions sur les messages publiés (topics, payloads JSON)
*/

pub mod mqtt_stub;

pub use mqtt_stub::MockMqttClient;
