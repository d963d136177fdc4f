//! DHT11 Dekodierung
//!
//! Der Sensor liefert 40 Bit: Feuchte (int, dec), Temperatur (int, dec)
//! und eine Prüfsumme. Das Bit-Timing wird in der Firmware gemessen,
//! hier passiert nur die Auswertung.

#[cfg(feature = "serde")]
use serde::Serialize;

use crate::traits::SensorError;

/// Anzahl Datenbits pro Frame
pub const FRAME_BITS: usize = 40;

/// High-Pulse länger als diese Schwelle (µs) sind eine 1
pub const ONE_THRESHOLD_US: u32 = 40;

/// Temperatur- und Feuchtigkeitsmessung
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct ClimateReading {
    pub temperature_c: f32,
    pub temperature_f: f32,
    /// Relative Luftfeuchte in Prozent
    pub humidity: f32,
}

impl ClimateReading {
    pub fn new(temperature_c: f32, humidity: f32) -> Self {
        Self {
            temperature_c,
            temperature_f: celsius_to_fahrenheit(temperature_c),
            humidity,
        }
    }
}

pub fn celsius_to_fahrenheit(celsius: f32) -> f32 {
    celsius * 1.8 + 32.0
}

/// Wandelt die gemessenen High-Pulslängen in 5 Bytes um (MSB zuerst)
pub fn bits_from_pulses(high_us: &[u32; FRAME_BITS]) -> [u8; 5] {
    let mut frame = [0u8; 5];
    for (i, &pulse) in high_us.iter().enumerate() {
        if pulse > ONE_THRESHOLD_US {
            frame[i / 8] |= 0x80 >> (i % 8);
        }
    }
    frame
}

/// Prüft die Checksumme und berechnet die Messwerte
pub fn decode_frame(frame: [u8; 5]) -> Result<ClimateReading, SensorError> {
    let checksum = frame[..4]
        .iter()
        .fold(0u8, |sum, byte| sum.wrapping_add(*byte));
    if checksum != frame[4] {
        return Err(SensorError::Checksum);
    }

    let humidity = frame[0] as f32 + frame[1] as f32 / 10.0;
    let magnitude = frame[2] as f32 + (frame[3] & 0x7F) as f32 / 10.0;
    // Bit 7 im Dezimal-Byte markiert negative Temperaturen
    let temperature = if frame[3] & 0x80 != 0 {
        -magnitude
    } else {
        magnitude
    };

    Ok(ClimateReading::new(temperature, humidity))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_valid_frame() {
        // 45% Feuchte, 23.0 °C
        let reading = decode_frame([45, 0, 23, 0, 68]).unwrap();
        assert_eq!(reading.humidity, 45.0);
        assert_eq!(reading.temperature_c, 23.0);
    }

    #[test]
    fn test_decode_checksum_mismatch() {
        assert_eq!(decode_frame([45, 0, 23, 0, 69]), Err(SensorError::Checksum));
    }

    #[test]
    fn test_fahrenheit() {
        assert_eq!(celsius_to_fahrenheit(100.0), 212.0);
        assert_eq!(celsius_to_fahrenheit(-40.0), -40.0);
    }

    #[test]
    fn test_bits_from_pulses_msb_first() {
        let mut pulses = [26u32; FRAME_BITS];
        pulses[0] = 70; // Bit 7 von Byte 0
        pulses[39] = 70; // Bit 0 von Byte 4
        assert_eq!(bits_from_pulses(&pulses), [0x80, 0, 0, 0, 0x01]);
    }
}
