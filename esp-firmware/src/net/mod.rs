// Netzwerk-Adapter: implementieren die esp-core Traits über HTTP(S)

pub mod firebase;
pub mod rest;
pub mod simulator;

pub use firebase::{FirebaseStore, log_range};
pub use rest::{HttpBuffers, RestClient, RestTcpState, SharedRestClient};
pub use simulator::HttpSimulator;
