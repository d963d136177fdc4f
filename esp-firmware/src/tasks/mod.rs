// Task-Modul: Enthält alle Embassy Tasks
//
// Jeder Task läuft asynchron und unabhängig.
// Produzenten (Trainer, LIDAR, Klima, Federated) publishen Telemetrie,
// MQTT und WebSockets konsumieren sie. HTTP-Requests laufen über den
// gemeinsamen RestClient.

pub mod climate;
pub mod federated;
pub mod http;
pub mod lastfm;
pub mod lidar;
pub mod mqtt;
pub mod trainer;
pub mod wifi;

// Re-export Tasks für einfachen Import
pub use climate::climate_task;
pub use federated::federated_task;
pub use http::http_server_task;
pub use lastfm::lastfm_task;
pub use lidar::lidar_task;
pub use mqtt::mqtt_task;
pub use trainer::trainer_task;
pub use wifi::{connection_task, dhcp_task, net_task};
