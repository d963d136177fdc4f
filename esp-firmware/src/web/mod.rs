// Web-Modul: Dashboard für den Telemetrie-WebSocket

// HTML-Datei zur Compile-Zeit einbinden
pub const INDEX_HTML: &str = include_str!("index.html");
