// Simulations-Server Client (Flask, `/reset` und `/step?action=<n>`)

use core::fmt::Write;
use core::marker::PhantomData;

use esp_core::firebase::Url;
use esp_core::wire::parse_observation;
use esp_core::{LinkError, SimulationClient};
use serde::de::DeserializeOwned;

use super::SharedRestClient;

pub struct HttpSimulator<O> {
    rest: &'static SharedRestClient,
    base_url: &'static str,
    _observation: PhantomData<O>,
}

impl<O> HttpSimulator<O> {
    pub fn new(rest: &'static SharedRestClient, base_url: &'static str) -> Self {
        Self {
            rest,
            base_url: base_url.trim_end_matches('/'),
            _observation: PhantomData,
        }
    }

    fn url(&self, path: core::fmt::Arguments<'_>) -> Result<Url, LinkError> {
        let mut url = Url::new();
        write!(url, "{}/{}", self.base_url, path).map_err(|_| LinkError::Overflow)?;
        Ok(url)
    }
}

impl<O: DeserializeOwned> SimulationClient<O> for HttpSimulator<O> {
    async fn reset(&mut self) -> Result<O, LinkError> {
        let url = self.url(format_args!("reset"))?;
        self.rest.lock().await.get(&url, parse_observation::<O>).await
    }

    async fn step(&mut self, action: usize) -> Result<O, LinkError> {
        let url = self.url(format_args!("step?action={}", action))?;
        self.rest.lock().await.get(&url, parse_observation::<O>).await
    }
}
