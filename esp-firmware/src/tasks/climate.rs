// Klima Task - DHT11 Temperatur und Luftfeuchte
use defmt::{info, warn};
use embassy_time::{Duration, Timer};
use esp_core::{ClimateSensor, Telemetry};
use esp_hal::delay::Delay;
use esp_hal::gpio::Flex;

use crate::TelemetryPublisher;
use crate::config::CLIMATE_INTERVAL_SECS;
use crate::hal::Dht11;

/// Klima Task
///
/// Liest den DHT11 alle 2 Sekunden und published gültige Messungen.
/// Der Pin muss bereits als Open-Drain mit Pull-Up konfiguriert sein.
#[embassy_executor::task]
pub async fn climate_task(pin: Flex<'static>, publisher: TelemetryPublisher) {
    let mut sensor = Dht11::new(pin, Delay::new());
    info!("CLIMATE: Task started");

    loop {
        // Sensor braucht nach dem Einschalten bzw. zwischen Messungen Ruhe
        Timer::after(Duration::from_secs(CLIMATE_INTERVAL_SECS)).await;

        match sensor.read() {
            Ok(reading) => {
                info!(
                    "CLIMATE: {} °C / {} °F, humidity {} %",
                    reading.temperature_c, reading.temperature_f, reading.humidity
                );
                publisher.publish_immediate(Telemetry::Climate(reading));
            }
            Err(e) => warn!("CLIMATE: Failed to read from DHT sensor: {}", e),
        }
    }
}
