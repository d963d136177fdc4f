// Firebase Realtime Database - Gewichts-Speicher und LIDAR-Log

use core::marker::PhantomData;

use esp_core::firebase::{format_weight, node_url, table_url, weight_url};
use esp_core::wire::{encode_range_log, encode_weight_table, parse_weight_table};
use esp_core::{LinkError, RangeSample, Task, WeightStore};

use super::SharedRestClient;
use crate::config::WEIGHT_TABLE_JSON_SIZE;

/// Gewichts-Tabelle einer Task unter `<host>/<T::WEIGHTS_KEY>`
pub struct FirebaseStore<T, const A: usize, const F: usize> {
    rest: &'static SharedRestClient,
    host: &'static str,
    secret: &'static str,
    _task: PhantomData<T>,
}

impl<T: Task<A, F>, const A: usize, const F: usize> FirebaseStore<T, A, F> {
    pub fn new(rest: &'static SharedRestClient, host: &'static str, secret: &'static str) -> Self {
        Self {
            rest,
            host,
            secret,
            _task: PhantomData,
        }
    }
}

impl<T: Task<A, F>, const A: usize, const F: usize> WeightStore<A, F> for FirebaseStore<T, A, F> {
    async fn load(&mut self) -> Result<Option<[[f32; F]; A]>, LinkError> {
        let url = table_url(self.host, T::WEIGHTS_KEY, self.secret)?;
        self.rest
            .lock()
            .await
            .get(&url, parse_weight_table::<A, F>)
            .await
    }

    async fn put_weight(&mut self, action: usize, feature: usize, value: f32) -> Result<(), LinkError> {
        let url = weight_url(self.host, T::WEIGHTS_KEY, action, feature, self.secret)?;
        let payload = format_weight(value)?;
        self.rest.lock().await.put(&url, payload.as_bytes()).await
    }

    async fn put_all(&mut self, weights: &[[f32; F]; A]) -> Result<(), LinkError> {
        let url = table_url(self.host, T::WEIGHTS_KEY, self.secret)?;
        let mut buffer = [0u8; WEIGHT_TABLE_JSON_SIZE];
        let len = encode_weight_table(weights, &mut buffer)?;
        self.rest.lock().await.put(&url, &buffer[..len]).await
    }
}

/// Schreibt einen LIDAR-Mittelwert nach `latest` (PUT) und `history` (POST)
pub async fn log_range(
    rest: &SharedRestClient,
    host: &str,
    secret: &str,
    latest_node: &str,
    history_node: &str,
    sample: &RangeSample,
) -> Result<(), LinkError> {
    let mut buffer = [0u8; 96];
    let len = encode_range_log(sample, &mut buffer)?;
    let payload = &buffer[..len];

    let mut client = rest.lock().await;
    client.put(&node_url(host, latest_node, secret)?, payload).await?;
    client
        .post(&node_url(host, history_node, secret)?, payload, |_| Ok(()))
        .await
}
