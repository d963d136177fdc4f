// WiFi Task - Station-Verbindung, Netzwerk-Stack und DHCP
use defmt::{Debug2Format, error, info, warn};
use embassy_net::{Runner, Stack};
use embassy_time::{Duration, Timer};
use esp_radio::wifi::{ClientConfig, ModeConfig, WifiController, WifiDevice, WifiEvent};

use crate::config::{WIFI_PASSWORD, WIFI_RETRY_DELAY_SECS, WIFI_SSID};

/// WiFi Connection Task
///
/// Startet den Controller im Station-Modus, verbindet mit dem Access Point
/// und verbindet nach einem Disconnect automatisch neu.
#[embassy_executor::task]
pub async fn connection_task(mut controller: WifiController<'static>) {
    info!("WiFi: Starting connection task");
    let retry_delay = Duration::from_secs(WIFI_RETRY_DELAY_SECS);

    loop {
        if matches!(controller.is_started(), Ok(false)) {
            let client_config = ModeConfig::Client(
                ClientConfig::default()
                    .with_ssid(WIFI_SSID.into())
                    .with_password(WIFI_PASSWORD.into()),
            );

            if let Err(e) = controller.set_config(&client_config) {
                error!("WiFi: Failed to set configuration: {}", Debug2Format(&e));
                Timer::after(retry_delay).await;
                continue;
            }
            if let Err(e) = controller.start_async().await {
                error!("WiFi: Failed to start: {}", Debug2Format(&e));
                Timer::after(retry_delay).await;
                continue;
            }
            info!("WiFi: Started in station mode");
        }

        info!("WiFi: Connecting to '{}'...", WIFI_SSID);
        if let Err(e) = controller.connect_async().await {
            error!("WiFi: Connection failed: {}", Debug2Format(&e));
            Timer::after(retry_delay).await;
            continue;
        }
        info!("WiFi: Connected");

        controller.wait_for_event(WifiEvent::StaDisconnected).await;
        warn!("WiFi: Disconnected from AP, reconnecting...");
        Timer::after(retry_delay).await;
    }
}

/// Network Task - treibt den embassy-net Stack
#[embassy_executor::task]
pub async fn net_task(mut runner: Runner<'static, WifiDevice<'static>>) -> ! {
    runner.run().await
}

/// DHCP Monitor Task
///
/// Loggt die Netzwerk-Konfiguration sobald eine IP-Adresse vorliegt.
#[embassy_executor::task]
pub async fn dhcp_task(stack: &'static Stack<'static>) {
    wait_for_network(stack).await;

    if let Some(config) = stack.config_v4() {
        info!("WiFi: Got IP address!");
        info!("  IP:      {}", Debug2Format(&config.address.address()));
        info!("  Gateway: {}", Debug2Format(&config.gateway));
        info!("  DNS:     {}", Debug2Format(&config.dns_servers));
    }
}

/// Link aktiv und IPv4-Konfiguration per DHCP erhalten
pub fn is_network_ready(stack: &Stack<'_>) -> bool {
    stack.is_link_up() && stack.config_v4().is_some()
}

/// Wartet bis Netzwerk-Verbindung verfügbar ist
pub async fn wait_for_network(stack: &Stack<'_>) {
    while !is_network_ready(stack) {
        Timer::after(Duration::from_millis(500)).await;
    }
}
