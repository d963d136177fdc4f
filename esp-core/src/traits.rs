//! Hardware- und Netzwerk-Abstraction Traits
//!
//! Diese Traits definieren Schnittstellen für Sensoren, Zufallszahlen
//! und entfernte Dienste ohne konkrete Implementierung.
//!
//! # Implementierungen
//! - **Production:** esp-firmware (`hal/` und `net/`)
//! - **Testing:** Mocks in esp-tests und den Unit-Tests

use crate::climate::ClimateReading;

/// Fehler-Typ für Netzwerk-Operationen (Simulator, Firebase, ...)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkError {
    /// Verbindung oder DNS fehlgeschlagen
    Unreachable,
    /// Server hat mit einem anderen Status als 2xx geantwortet
    Status(u16),
    /// Antwort ließ sich nicht dekodieren
    Malformed,
    /// Request oder Antwort passt nicht in den Buffer
    Overflow,
}

/// Fehler-Typ für Sensor-Operationen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    Timeout,
    Bus,
    Checksum,
    NotDetected,
    /// Konfiguration außerhalb des erlaubten Bereichs (z.B. VCSEL-Periode)
    InvalidConfig,
}

/// Quelle für Zufallszahlen (Hardware-RNG auf dem ESP32)
pub trait RandomSource {
    fn next_u32(&mut self) -> u32;
}

/// Entfernte Simulations-Umgebung (Flask-Server mit `/reset` und `/step`)
///
/// `O` ist der Beobachtungs-Typ der jeweiligen Task.
pub trait SimulationClient<O> {
    /// Startet eine neue Episode und liefert den Anfangszustand
    async fn reset(&mut self) -> Result<O, LinkError>;

    /// Führt eine Aktion aus und liefert den Folgezustand inkl. Reward
    async fn step(&mut self, action: usize) -> Result<O, LinkError>;
}

/// Persistenter Speicher für die Gewichts-Tabelle (Firebase Realtime DB)
pub trait WeightStore<const A: usize, const F: usize> {
    /// Lädt die komplette Tabelle
    ///
    /// `Ok(None)` bedeutet: Datenbank ist leer.
    async fn load(&mut self) -> Result<Option<[[f32; F]; A]>, LinkError>;

    /// Schreibt ein einzelnes Gewicht
    async fn put_weight(&mut self, action: usize, feature: usize, value: f32)
    -> Result<(), LinkError>;

    /// Schreibt die komplette Tabelle
    async fn put_all(&mut self, weights: &[[f32; F]; A]) -> Result<(), LinkError>;
}

/// Laser-Distanzsensor (VL53L0X)
pub trait RangeSensor {
    /// Liest eine Distanz in Millimetern
    ///
    /// Wartet auf die nächste Messung. Werte >= 8190 bedeuten "außer
    /// Reichweite", siehe [`crate::ranging::classify`].
    async fn read_mm(&mut self) -> Result<u16, SensorError>;
}

/// Temperatur- und Feuchtigkeitssensor (DHT11)
pub trait ClimateSensor {
    fn read(&mut self) -> Result<ClimateReading, SensorError>;
}

// ============================================================================
// defmt::Format Implementations (optional feature)
// ============================================================================

#[cfg(feature = "defmt")]
impl defmt::Format for LinkError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            LinkError::Unreachable => defmt::write!(fmt, "unreachable"),
            LinkError::Status(code) => defmt::write!(fmt, "HTTP status {}", code),
            LinkError::Malformed => defmt::write!(fmt, "malformed response"),
            LinkError::Overflow => defmt::write!(fmt, "buffer overflow"),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for SensorError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            SensorError::Timeout => defmt::write!(fmt, "timeout"),
            SensorError::Bus => defmt::write!(fmt, "bus error"),
            SensorError::Checksum => defmt::write!(fmt, "checksum mismatch"),
            SensorError::NotDetected => defmt::write!(fmt, "sensor not detected"),
            SensorError::InvalidConfig => defmt::write!(fmt, "invalid sensor configuration"),
        }
    }
}
