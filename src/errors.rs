//! Errors for the AIS target registry
use thiserror::Error;

use crate::route::SuggestionStatus;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("MQTT connection failed")]
    MqttConnectionError(#[from] rumqttc::ConnectionError),

    #[error("MQTT client error")]
    MqttClientError(#[from] rumqttc::ClientError),

    #[error("Serialization error")]
    SerdeError(#[from] serde_json::Error),

    #[error("Configuration error")]
    ConfigError(#[from] config::ConfigError),

    #[error("IO error")]
    IoError(#[from] std::io::Error),

    #[error("Invalid topic")]
    InvalidTopic(String),

    #[error("Invalid MMSI")]
    InvalidMmsi(String),

    #[error("Unknown message type")]
    UnknownMessageType(String),

    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    #[error("No route suggestion from {sender} with link id {link_id}")]
    UnknownSuggestion { sender: u32, link_id: u16 },

    #[error("Route suggestion cannot go from {from:?} to {to:?}")]
    SuggestionTransition {
        from: SuggestionStatus,
        to: SuggestionStatus,
    },
}
