// HTTP Server Task - Serviert Dashboard und Telemetrie-WebSocket
use core::future::pending;
use defmt::{info, warn};
use embassy_futures::select::{Either, select};
use embassy_net::Stack;
use embassy_time::Duration;
use esp_core::wire::encode_telemetry;
use picoserve::{io::embedded_io_async, response::IntoResponse, response::ws, routing::get};

use crate::config::*;
use crate::web::INDEX_HTML;
use crate::{TelemetryChannel, TelemetrySubscriber};

/// Response-Enum für WebSocket-Endpoint
/// Ermöglicht Rückgabe von entweder WebSocket-Upgrade oder HTTP-Fehler
enum WebSocketResponse {
    Upgrade(
        ws::UpgradedWebSocket<ws::UnspecifiedProtocol, ws::CallbackNotUsingState<WebSocketHandler>>,
    ),
    ServiceUnavailable,
}

impl IntoResponse for WebSocketResponse {
    async fn write_to<
        R: embedded_io_async::Read,
        W: picoserve::response::ResponseWriter<Error = R::Error>,
    >(
        self,
        connection: picoserve::response::Connection<'_, R>,
        response_writer: W,
    ) -> Result<picoserve::ResponseSent, W::Error> {
        match self {
            WebSocketResponse::Upgrade(ws) => ws.write_to(connection, response_writer).await,
            WebSocketResponse::ServiceUnavailable => {
                picoserve::response::Response::new(
                    picoserve::response::StatusCode::new(503),
                    "Service Unavailable: Too many telemetry connections",
                )
                .with_header("Retry-After", "5")
                .write_to(connection, response_writer)
                .await
            }
        }
    }
}

/// HTTP Server Task
///
/// - Serviert das Dashboard (index.html) auf GET /
/// - Streamt Telemetrie als JSON über den WebSocket auf /ws
///
/// **Task Pool:** 4 Instanzen für gleichzeitige Connections
/// (HTML laden und offene WebSockets blockieren sich sonst gegenseitig).
#[embassy_executor::task(pool_size = 4)]
pub async fn http_server_task(
    task_id: usize,
    stack: &'static Stack<'static>,
    telemetry: &'static TelemetryChannel,
) {
    info!("HTTP: Server task {} starting on port 80...", task_id);

    let app = picoserve::Router::new().route("/", get(serve_html)).route(
        "/ws",
        get(
            |upgrade: picoserve::response::WebSocketUpgrade| async move {
                // Subscriber-Slots sind begrenzt: bei Erschöpfung HTTP 503 statt Panic
                match telemetry.subscriber() {
                    Ok(subscriber) => {
                        info!("HTTP: Upgrading to telemetry WebSocket");
                        WebSocketResponse::Upgrade(
                            upgrade.on_upgrade(WebSocketHandler { subscriber }),
                        )
                    }
                    Err(_) => {
                        warn!("HTTP: No subscriber slots available, sending HTTP 503");
                        WebSocketResponse::ServiceUnavailable
                    }
                }
            },
        ),
    );

    let config = picoserve::Config::new(picoserve::Timeouts {
        start_read_request: Some(Duration::from_secs(5)),
        read_request: Some(Duration::from_secs(1)),
        write: Some(Duration::from_secs(1)),
        persistent_start_read_request: Some(Duration::from_secs(5)),
    })
    .keep_connection_alive();

    let mut http_buffer = [0u8; HTTP_BUFFER_SIZE];
    let mut rx_buffer = [0u8; TCP_RX_BUFFER_SIZE];
    let mut tx_buffer = [0u8; TCP_TX_BUFFER_SIZE];

    let server = picoserve::Server::new(&app, &config, &mut http_buffer);
    let _ = server
        .listen_and_serve(task_id, *stack, 80, &mut rx_buffer, &mut tx_buffer)
        .await;

    info!("HTTP: Server task {} ended", task_id);
}

/// Serviert das Dashboard
async fn serve_html() -> impl IntoResponse {
    picoserve::response::Response::new(picoserve::response::StatusCode::OK, INDEX_HTML)
        .with_header("Content-Type", "text/html; charset=utf-8")
}

/// WebSocket-Handler: ein Telemetrie-Subscriber pro Verbindung
struct WebSocketHandler {
    subscriber: TelemetrySubscriber,
}

impl ws::WebSocketCallback for WebSocketHandler {
    async fn run<R: embedded_io_async::Read, W: embedded_io_async::Write<Error = R::Error>>(
        mut self,
        mut rx: ws::SocketRx<R>,
        mut tx: ws::SocketTx<W>,
    ) -> Result<(), W::Error> {
        info!("HTTP: WebSocket connection established");

        let mut buffer = [0u8; WEBSOCKET_BUFFER_SIZE];
        let mut json = [0u8; TELEMETRY_JSON_SIZE];

        let close_reason = loop {
            match select(
                rx.next_message(&mut buffer, pending()),
                self.subscriber.next_message_pure(),
            )
            .await
            {
                Either::First(ws_result) => match ws_result?.ignore_never_b() {
                    Ok(ws::Message::Ping(data)) => tx.send_pong(data).await?,
                    Ok(ws::Message::Close(_)) => {
                        info!("HTTP: WebSocket close received");
                        break None;
                    }
                    // Dashboard ist read-only
                    Ok(_) => {}
                    Err(error) => {
                        warn!("HTTP: WebSocket error");
                        break Some((error.code(), "WebSocket Error"));
                    }
                },
                Either::Second(telemetry) => match encode_telemetry(&telemetry, &mut json) {
                    Ok(len) => {
                        if let Ok(text) = core::str::from_utf8(&json[..len]) {
                            tx.send_text(text).await?;
                        }
                    }
                    Err(e) => warn!("HTTP: Failed to encode {} telemetry: {}", telemetry.kind(), e),
                },
            }
        };

        info!("HTTP: WebSocket connection closed");
        tx.close(close_reason).await
    }
}
