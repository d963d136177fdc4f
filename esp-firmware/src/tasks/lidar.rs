// LIDAR Task - VL53L0X Distanzmessung mit Firebase-Log
use defmt::{error, info, warn};
use embassy_net::Stack;
use embassy_time::{Duration, Instant, Ticker, Timer};
use esp_core::{RangeAverager, RangeReading, RangeSensor, Telemetry};
use esp_hal::Blocking;
use esp_hal::i2c::master::I2c;

use super::wifi::is_network_ready;
use crate::TelemetryPublisher;
use crate::config::*;
use crate::hal::{LongRange, Vl53l0x};
use crate::net::{SharedRestClient, log_range};

const LONG_RANGE: LongRange = LongRange {
    signal_rate_limit_mcps: LIDAR_SIGNAL_RATE_LIMIT_MCPS,
    pre_range_pclks: LIDAR_PRE_RANGE_VCSEL_PCLKS,
    final_range_pclks: LIDAR_FINAL_RANGE_VCSEL_PCLKS,
    timing_budget_us: LIDAR_TIMING_BUDGET_US,
};

/// LIDAR Task
///
/// Pollt den Sensor alle 50 ms (eine Messung dauert ein Timing-Budget) und bildet einen Mittelwert pro Sekunde.
/// Jeder Mittelwert wird gepublished und nach Firebase geschrieben
/// (`latest` überschreiben, `history` anhängen).
#[embassy_executor::task]
pub async fn lidar_task(
    i2c: I2c<'static, Blocking>,
    stack: &'static Stack<'static>,
    rest: &'static SharedRestClient,
    publisher: TelemetryPublisher,
) {
    let timeout = Duration::from_millis(LIDAR_MEASUREMENT_TIMEOUT_MS);
    let mut sensor = Vl53l0x::new(i2c, VL53L0X_ADDRESS, timeout);

    while let Err(e) = sensor.init(LONG_RANGE).await {
        error!("LIDAR: Failed to initialize VL53L0X: {}", e);
        Timer::after(Duration::from_secs(LIDAR_RETRY_DELAY_SECS)).await;
    }
    info!(
        "LIDAR: VL53L0X ready (long range mode, {} us budget)",
        sensor.timing_budget_us()
    );

    let mut averager = RangeAverager::new(Instant::now().as_millis());
    let mut ticker = Ticker::every(Duration::from_millis(LIDAR_POLL_INTERVAL_MS));

    loop {
        ticker.next().await;

        let reading = RangeReading::from_measurement(sensor.read_mm().await);
        if reading == RangeReading::Timeout {
            warn!("LIDAR: Measurement timeout");
        }

        let Some(sample) = averager.record(reading, Instant::now().as_millis()) else {
            continue;
        };
        info!(
            "LIDAR: Average {} mm ({} readings)",
            sample.avg_mm, sample.readings
        );
        publisher.publish_immediate(Telemetry::Range(sample));

        if !is_network_ready(stack) {
            warn!("LIDAR: WiFi not connected - skipping Firebase log");
            continue;
        }
        match log_range(
            rest,
            FIREBASE_HOST,
            FIREBASE_SECRET,
            LIDAR_LATEST_NODE,
            LIDAR_HISTORY_NODE,
            &sample,
        )
        .await
        {
            Ok(()) => info!("LIDAR: Firebase update ok"),
            Err(e) => warn!("LIDAR: Firebase update failed: {}", e),
        }
    }
}
