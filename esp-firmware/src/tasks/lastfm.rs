// Last.fm Task - Top-Tracks der globalen Charts abrufen
use core::fmt::Write;

use defmt::{info, warn};
use embassy_net::Stack;
use embassy_time::{Duration, Timer};
use esp_core::LinkError;
use esp_core::firebase::Url;
use esp_core::wire::{MAX_TRACKS, parse_top_tracks};

use super::wifi::wait_for_network;
use crate::config::{
    LASTFM_API_KEY, LASTFM_API_URL, LASTFM_MAX_ATTEMPTS, LASTFM_RETRY_DELAY_SECS,
};
use crate::net::SharedRestClient;

/// Last.fm Task
///
/// Holt einmalig nach dem Verbindungsaufbau die Top-Tracks und loggt sie.
#[embassy_executor::task]
pub async fn lastfm_task(stack: &'static Stack<'static>, rest: &'static SharedRestClient) {
    wait_for_network(stack).await;

    let url = match chart_url() {
        Ok(url) => url,
        Err(e) => {
            warn!("LASTFM: Failed to build request URL: {}", e);
            return;
        }
    };

    for attempt in 1..=LASTFM_MAX_ATTEMPTS {
        info!("LASTFM: Fetching top tracks (attempt {})...", attempt);
        let result = rest
            .lock()
            .await
            .get(&url, |body| {
                let tracks = parse_top_tracks(body)?;
                for (rank, track) in tracks.iter().enumerate() {
                    info!(
                        "LASTFM: {}. {} - {} ({})",
                        rank + 1,
                        track.name,
                        track.artist.name,
                        track.url
                    );
                }
                Ok(tracks.len())
            })
            .await;

        match result {
            Ok(count) => {
                info!("LASTFM: {} tracks received", count);
                return;
            }
            Err(e) => warn!("LASTFM: Request failed: {}", e),
        }
        Timer::after(Duration::from_secs(LASTFM_RETRY_DELAY_SECS)).await;
    }
}

fn chart_url() -> Result<Url, LinkError> {
    let mut url = Url::new();
    write!(
        url,
        "{}?method=chart.gettoptracks&api_key={}&format=json&limit={}",
        LASTFM_API_URL, LASTFM_API_KEY, MAX_TRACKS
    )
    .map_err(|_| LinkError::Overflow)?;
    Ok(url)
}
