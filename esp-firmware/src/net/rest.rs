// REST Client - HTTP(S) über embassy-net mit reqwless
//
// Ein gemeinsamer Client für Simulator, Firebase, Last.fm und den
// Federated Server. Die TLS-Buffer sind groß, daher gibt es sie nur
// einmal; die Tasks teilen sich den Client über einen Mutex.

use embassy_net::Stack;
use embassy_net::dns::DnsSocket;
use embassy_net::tcp::client::{TcpClient, TcpClientState};
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embassy_sync::mutex::Mutex;
use embassy_time::{Duration, with_timeout};
use esp_core::LinkError;
use reqwless::client::{HttpClient, TlsConfig, TlsVerify};
use reqwless::headers::ContentType;
use reqwless::request::{Method, RequestBuilder};

use crate::config::{HTTP_RX_BUFFER_SIZE, HTTP_TCP_BUFFER_SIZE, HTTP_TIMEOUT_SECS, TLS_BUFFER_SIZE};
use crate::hal::HardwareRng;

/// TCP-Zustand für genau eine gleichzeitige Verbindung
pub type RestTcpState = TcpClientState<1, HTTP_TCP_BUFFER_SIZE, HTTP_TCP_BUFFER_SIZE>;

/// Von allen Tasks geteilter Client
pub type SharedRestClient = Mutex<NoopRawMutex, RestClient>;

/// Buffer für Antwort und TLS-Records (~41 KB, gehört in eine StaticCell)
pub struct HttpBuffers {
    rx: [u8; HTTP_RX_BUFFER_SIZE],
    tls_read: [u8; TLS_BUFFER_SIZE],
    tls_write: [u8; TLS_BUFFER_SIZE],
}

impl HttpBuffers {
    pub const fn new() -> Self {
        Self {
            rx: [0; HTTP_RX_BUFFER_SIZE],
            tls_read: [0; TLS_BUFFER_SIZE],
            tls_write: [0; TLS_BUFFER_SIZE],
        }
    }
}

pub struct RestClient {
    stack: Stack<'static>,
    tcp_state: &'static RestTcpState,
    buffers: &'static mut HttpBuffers,
    rng: HardwareRng,
}

impl RestClient {
    pub fn new(
        stack: Stack<'static>,
        tcp_state: &'static RestTcpState,
        buffers: &'static mut HttpBuffers,
        rng: HardwareRng,
    ) -> Self {
        Self {
            stack,
            tcp_state,
            buffers,
            rng,
        }
    }

    /// GET, der Body wird an `parse` übergeben
    pub async fn get<T>(
        &mut self,
        url: &str,
        parse: impl FnOnce(&[u8]) -> Result<T, LinkError>,
    ) -> Result<T, LinkError> {
        self.exchange(Method::GET, url, &[], parse).await
    }

    /// PUT mit JSON-Body, die Antwort wird verworfen
    pub async fn put(&mut self, url: &str, body: &[u8]) -> Result<(), LinkError> {
        self.exchange(Method::PUT, url, body, |_| Ok(())).await
    }

    /// POST mit JSON-Body, der Antwort-Body wird an `parse` übergeben
    pub async fn post<T>(
        &mut self,
        url: &str,
        body: &[u8],
        parse: impl FnOnce(&[u8]) -> Result<T, LinkError>,
    ) -> Result<T, LinkError> {
        self.exchange(Method::POST, url, body, parse).await
    }

    async fn exchange<T>(
        &mut self,
        method: Method,
        url: &str,
        body: &[u8],
        parse: impl FnOnce(&[u8]) -> Result<T, LinkError>,
    ) -> Result<T, LinkError> {
        let timeout = Duration::from_secs(HTTP_TIMEOUT_SECS);
        with_timeout(timeout, self.send(method, url, body, parse))
            .await
            .map_err(|_| LinkError::Unreachable)?
    }

    async fn send<T>(
        &mut self,
        method: Method,
        url: &str,
        body: &[u8],
        parse: impl FnOnce(&[u8]) -> Result<T, LinkError>,
    ) -> Result<T, LinkError> {
        let seed = self.rng.seed();
        let tcp_client = TcpClient::new(self.stack, self.tcp_state);
        let dns_client = DnsSocket::new(self.stack);

        let HttpBuffers {
            rx,
            tls_read,
            tls_write,
        } = &mut *self.buffers;
        // Zertifikate werden nicht geprüft (kein Trust-Store auf dem Gerät)
        let tls_config = TlsConfig::new(seed, tls_read, tls_write, TlsVerify::None);
        let mut http_client = HttpClient::new_with_tls(&tcp_client, &dns_client, tls_config);

        let mut request = http_client
            .request(method, url)
            .await
            .map_err(link_error)?
            .content_type(ContentType::ApplicationJson)
            .body(body);

        let response = request.send(rx).await.map_err(link_error)?;
        if !response.status.is_successful() {
            return Err(LinkError::Status(response.status.0));
        }

        let payload = response.body().read_to_end().await.map_err(link_error)?;
        parse(payload)
    }
}

fn link_error(error: reqwless::Error) -> LinkError {
    match error {
        reqwless::Error::BufferTooSmall => LinkError::Overflow,
        _ => LinkError::Unreachable,
    }
}
