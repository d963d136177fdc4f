// Projekt-Konfiguration: Konstanten, Hardware-Zuordnungen und Endpunkte
#![allow(dead_code)]

use esp_core::{DroneDelivery, SyncPolicy};

// ============================================================================
// Reinforcement Learning
// ============================================================================

/// Simulations-Umgebung, gegen die trainiert wird
///
/// Beim Wechsel (z.B. auf `Hover` mit 2 Aktionen / 3 Features) müssen
/// ACTIONS und FEATURES mitgezogen werden.
pub type ActiveTask = DroneDelivery;

/// Anzahl Aktionen der aktiven Task
pub const ACTIONS: usize = 5;

/// Anzahl Features der aktiven Task (inkl. Bias)
pub const FEATURES: usize = 8;

/// Wann Gewichte nach Firebase geschrieben werden
/// PerChange: ein PUT pro geändertem Gewicht (wie gehabt, viel Traffic)
/// PerEpisode: ein PUT der kompletten Tabelle am Episodenende
pub const SYNC_POLICY: SyncPolicy = SyncPolicy::PerChange;

/// Pause zwischen zwei Episoden in Millisekunden
pub const EPISODE_PAUSE_MS: u64 = 100;

/// Wartezeit nach einer übersprungenen Episode (Simulator nicht erreichbar)
pub const SIM_RETRY_DELAY_SECS: u64 = 5;

/// Simulations-Server Basis-URL, z.B. "http://192.168.1.20:5000"
/// Wird zur Build-Zeit aus der Environment Variable SIM_SERVER_URL geladen
pub const SIM_SERVER_URL: &str = env!(
    "SIM_SERVER_URL",
    "Simulator URL nicht gesetzt! Erstelle .env file (siehe .env.example)"
);

// ============================================================================
// Firebase Konfiguration
// ============================================================================

/// Firebase Realtime Database URL inkl. Projekt-Knoten
/// z.B. "https://<projekt>-default-rtdb.firebaseio.com/ESP32"
pub const FIREBASE_HOST: &str = env!(
    "FIREBASE_HOST",
    "Firebase Host nicht gesetzt! Erstelle .env file (siehe .env.example)"
);

/// Firebase Database Secret (leer = ohne ?auth=)
pub const FIREBASE_SECRET: &str = env!(
    "FIREBASE_SECRET",
    "Firebase Secret nicht gesetzt! Erstelle .env file (siehe .env.example)"
);

/// Knoten für den aktuellen LIDAR-Mittelwert (PUT)
pub const LIDAR_LATEST_NODE: &str = "LIDAR/latest";

/// Knoten für die LIDAR-Historie (POST, Firebase vergibt die Keys)
pub const LIDAR_HISTORY_NODE: &str = "LIDAR/history";

// ============================================================================
// HTTP Client Konfiguration
// ============================================================================

/// Empfangs-Buffer für HTTP-Antworten (Header + Body)
/// Last.fm Chart mit 10 Tracks braucht ca. 6 KB
pub const HTTP_RX_BUFFER_SIZE: usize = 8192;

/// TLS Record-Buffer (je Richtung), 16 KB Record + Overhead
pub const TLS_BUFFER_SIZE: usize = 16640;

/// TCP Socket-Buffer des HTTP Clients (je Richtung)
pub const HTTP_TCP_BUFFER_SIZE: usize = 1024;

/// Timeout für einen kompletten HTTP Request in Sekunden
pub const HTTP_TIMEOUT_SECS: u64 = 15;

/// JSON-Buffer für die komplette Gewichts-Tabelle
pub const WEIGHT_TABLE_JSON_SIZE: usize = 1024;

// ============================================================================
// Sensor Konfiguration
// ============================================================================

/// I2C-Adresse des VL53L0X
pub const VL53L0X_ADDRESS: u8 = 0x29;

/// I2C Taktfrequenz in kHz
pub const I2C_FREQUENCY_KHZ: u32 = 400;

/// Signal-Rate-Limit für den Long-Range-Modus (MCPS)
pub const LIDAR_SIGNAL_RATE_LIMIT_MCPS: f32 = 0.1;

/// VCSEL Pulsperioden für den Long-Range-Modus (PCLKs)
pub const LIDAR_PRE_RANGE_VCSEL_PCLKS: u8 = 18;
pub const LIDAR_FINAL_RANGE_VCSEL_PCLKS: u8 = 14;

/// Timing-Budget pro Messung in µs (länger = genauer bei großer Distanz)
pub const LIDAR_TIMING_BUDGET_US: u32 = 200_000;

/// Maximale Wartezeit auf eine Messung in Millisekunden
pub const LIDAR_MEASUREMENT_TIMEOUT_MS: u64 = 500;

/// Poll-Intervall des LIDAR-Tasks in Millisekunden
pub const LIDAR_POLL_INTERVAL_MS: u64 = 50;

/// Wartezeit bevor die Initialisierung erneut versucht wird
pub const LIDAR_RETRY_DELAY_SECS: u64 = 10;

/// Mess-Intervall des DHT11 in Sekunden (Sensor schafft max. 1 Hz)
pub const CLIMATE_INTERVAL_SECS: u64 = 2;

// ============================================================================
// Federated Learning / Last.fm
// ============================================================================

/// Aggregations-Server (POST Modell, GET gemitteltes Modell)
pub const FEDERATED_SERVER_URL: &str = env!(
    "FEDERATED_SERVER_URL",
    "Federated Server URL nicht gesetzt! Erstelle .env file (siehe .env.example)"
);

/// Lernrate des lokalen Gradientenschritts
pub const FEDERATED_LEARNING_RATE: f32 = 0.01;

/// Runden-Intervall in Sekunden
pub const FEDERATED_INTERVAL_SECS: u64 = 10;

/// Last.fm API Key
pub const LASTFM_API_KEY: &str = env!(
    "LASTFM_API_KEY",
    "Last.fm API Key nicht gesetzt! Erstelle .env file (siehe .env.example)"
);

/// Last.fm API Basis-URL
pub const LASTFM_API_URL: &str = "https://ws.audioscrobbler.com/2.0/";

/// Abruf-Versuche bis zur Aufgabe
pub const LASTFM_MAX_ATTEMPTS: u32 = 3;

/// Wartezeit zwischen zwei Abruf-Versuchen
pub const LASTFM_RETRY_DELAY_SECS: u64 = 10;

// ============================================================================
// WiFi Konfiguration
// ============================================================================

/// WiFi SSID (Netzwerk-Name)
/// Wird zur Build-Zeit aus der Environment Variable WIFI_SSID geladen
/// Setze diese in .env file (siehe .env.example)
pub const WIFI_SSID: &str = env!(
    "WIFI_SSID",
    "WiFi SSID nicht gesetzt! Erstelle .env file (siehe .env.example)"
);

/// WiFi Passwort
/// Wird zur Build-Zeit aus der Environment Variable WIFI_PASSWORD geladen
pub const WIFI_PASSWORD: &str = env!(
    "WIFI_PASSWORD",
    "WiFi Password nicht gesetzt! Erstelle .env file (siehe .env.example)"
);

/// Wartezeit nach einem Verbindungsfehler in Sekunden
pub const WIFI_RETRY_DELAY_SECS: u64 = 5;

/// Heap-Größe für WiFi (Bytes)
/// WiFi benötigt dynamischen Speicher für Pakete
pub const WIFI_HEAP_SIZE: usize = 65536; // 64 KB

/// Zusätzliche Heap-Größe (Bytes)
pub const EXTRA_HEAP_SIZE: usize = 36864; // 36 KB

// ============================================================================
// MQTT Konfiguration
// ============================================================================

/// MQTT Broker Hostname oder IP-Adresse
pub const MQTT_BROKER: &str = env!(
    "MQTT_BROKER",
    "MQTT Broker nicht gesetzt! Erstelle .env file (siehe .env.example)"
);

/// MQTT Broker Port
/// Standard: 1883 (unverschlüsselt), 8883 (TLS)
pub const MQTT_PORT: u16 = 1883;

/// MQTT Client ID (wird auch als Federated-Learning Client-ID genutzt)
pub const MQTT_CLIENT_ID: &str = env!(
    "MQTT_CLIENT_ID",
    "MQTT Client ID nicht gesetzt! Erstelle .env file (siehe .env.example)"
);

/// Topic-Präfix, die Telemetrie landet auf `<prefix>/<kind>`
/// z.B. "esp32/keepitup" → "esp32/keepitup/training"
pub const MQTT_TOPIC_PREFIX: &str = env!(
    "MQTT_TOPIC_PREFIX",
    "MQTT Topic Prefix nicht gesetzt! Erstelle .env file (siehe .env.example)"
);

/// MQTT Reconnect Delay in Sekunden
pub const MQTT_RECONNECT_DELAY_SECS: u64 = 5;

/// MQTT Buffer-Größe in Bytes
pub const MQTT_BUFFER_SIZE: usize = 1024;

/// DNS Query Timeout in Sekunden
pub const DNS_TIMEOUT_SECS: u64 = 10;

// ============================================================================
// HTTP Server Konfiguration
// ============================================================================

/// HTTP Buffer-Größe in Bytes
/// Für HTTP Request/Response Headers und Body
pub const HTTP_BUFFER_SIZE: usize = 1024;

/// TCP RX Buffer-Größe in Bytes
pub const TCP_RX_BUFFER_SIZE: usize = 1024;

/// TCP TX Buffer-Größe in Bytes
pub const TCP_TX_BUFFER_SIZE: usize = 1024;

/// WebSocket Message Buffer-Größe in Bytes
/// Eingehende Nachrichten werden nur auf Close/Ping geprüft
pub const WEBSOCKET_BUFFER_SIZE: usize = 256;

/// JSON Serialisierungs-Buffer für Telemetrie (MQTT + WebSocket)
pub const TELEMETRY_JSON_SIZE: usize = 256;
