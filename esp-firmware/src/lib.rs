// Library-Root: Wiederverwendbare Logik und Module
// Keine Standard-Bibliothek (Embedded System)
#![no_std]

// Module
pub mod config;
pub mod hal;
pub mod net;
pub mod tasks;
pub mod web;

// Re-exports von esp-core
pub use esp_core::Telemetry;

// Embassy Channel-Typen
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embassy_sync::pubsub::{PubSubChannel, Publisher, Subscriber};

// ============================================================================
// Type-Aliase für Channel-Typen
// ============================================================================
//
// Statt:  Publisher<'static, NoopRawMutex, Telemetry, 4, 10, 4>
// Nutze:  TelemetryPublisher

/// PubSubChannel für Telemetrie-Broadcasts
/// - 4: Nachrichten-Kapazität im Queue
/// - 10: Maximale Anzahl Subscribers (1 MQTT + bis zu 9 WebSockets)
/// - 4: Publisher (Trainer, LIDAR, Klima, Federated)
pub type TelemetryChannel = PubSubChannel<NoopRawMutex, Telemetry, 4, 10, 4>;

/// Publisher für Telemetrie (ein Publisher pro produzierendem Task)
pub type TelemetryPublisher = Publisher<'static, NoopRawMutex, Telemetry, 4, 10, 4>;

/// Subscriber für Telemetrie (MQTT Task und WebSocket-Verbindungen)
pub type TelemetrySubscriber = Subscriber<'static, NoopRawMutex, Telemetry, 4, 10, 4>;
