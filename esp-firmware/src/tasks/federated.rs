// Federated Learning Task - lokaler Trainingsschritt und Modell-Austausch
use defmt::{info, warn};
use embassy_net::Stack;
use embassy_time::{Duration, Timer};
use esp_core::federated::{SAMPLE_INPUTS, SAMPLE_LABELS};
use esp_core::wire::{encode_model_update, parse_model};
use esp_core::{LinearModel, LinkError, ModelUpdate, Telemetry};

use super::wifi::wait_for_network;
use crate::TelemetryPublisher;
use crate::config::*;
use crate::net::SharedRestClient;

/// Federated Learning Task
///
/// Pro Runde: ein Gradientenschritt auf den lokalen Daten, Modell an den
/// Aggregations-Server schicken (POST), gemitteltes Modell holen (GET).
/// Schlägt der Austausch fehl, wird lokal weiter trainiert.
#[embassy_executor::task]
pub async fn federated_task(
    stack: &'static Stack<'static>,
    rest: &'static SharedRestClient,
    publisher: TelemetryPublisher,
) {
    info!("FL: Task started, waiting for network...");
    wait_for_network(stack).await;

    let mut model = LinearModel::default();
    loop {
        model.local_train(&SAMPLE_INPUTS, &SAMPLE_LABELS, FEDERATED_LEARNING_RATE);
        info!(
            "FL: Local model y = {}x + {} (mse {})",
            model.weight,
            model.bias,
            model.mse(&SAMPLE_INPUTS, &SAMPLE_LABELS)
        );

        if let Err(e) = send_model(rest, &model).await {
            warn!("FL: Failed to send model: {}", e);
        }

        match rest.lock().await.get(FEDERATED_SERVER_URL, parse_model).await {
            Ok(global) => {
                model = global;
                info!("FL: Received new model y = {}x + {}", model.weight, model.bias);
                publisher.publish_immediate(Telemetry::Model(model));
            }
            Err(e) => warn!("FL: Failed to receive model: {}", e),
        }

        Timer::after(Duration::from_secs(FEDERATED_INTERVAL_SECS)).await;
    }
}

async fn send_model(rest: &SharedRestClient, model: &LinearModel) -> Result<(), LinkError> {
    let mut buffer = [0u8; 128];
    let len = encode_model_update(&ModelUpdate::new(MQTT_CLIENT_ID, model), &mut buffer)?;
    rest.lock()
        .await
        .post(FEDERATED_SERVER_URL, &buffer[..len], |_| Ok(()))
        .await
}
