//! Firebase Realtime Database - REST-Pfade
//!
//! Baut die URLs für die REST-API (`<base>/<pfad>.json?auth=<secret>`).
//! Der HTTP-Transport selbst lebt in der Firmware.

use core::fmt::Write;

use heapless::String;

use crate::traits::LinkError;

/// Maximale URL-Länge
pub const URL_CAPACITY: usize = 256;

pub type Url = String<URL_CAPACITY>;

/// Gewichts-Wert als JSON-Zahl (4 Nachkommastellen)
pub type WeightText = String<24>;

/// Baut `<base>/<path>.json[?auth=<secret>]` mit genau einem `/` dazwischen
fn database_url(
    base: &str,
    path: core::fmt::Arguments<'_>,
    secret: &str,
) -> Result<Url, LinkError> {
    let mut url = Url::new();
    let base = base.trim_end_matches('/');
    write!(url, "{}/{}.json", base, path).map_err(|_| LinkError::Overflow)?;
    if !secret.is_empty() {
        write!(url, "?auth={}", secret).map_err(|_| LinkError::Overflow)?;
    }
    Ok(url)
}

/// URL der kompletten Gewichts-Tabelle, z.B. `.../drone_weights.json`
pub fn table_url(base: &str, key: &str, secret: &str) -> Result<Url, LinkError> {
    database_url(base, format_args!("{}", key.trim_matches('/')), secret)
}

/// URL eines einzelnen Gewichts, z.B. `.../drone_weights/3/7.json`
pub fn weight_url(
    base: &str,
    key: &str,
    action: usize,
    feature: usize,
    secret: &str,
) -> Result<Url, LinkError> {
    database_url(
        base,
        format_args!("{}/{}/{}", key.trim_matches('/'), action, feature),
        secret,
    )
}

/// URL eines beliebigen Knotens (LIDAR `latest` / `history`)
pub fn node_url(base: &str, node: &str, secret: &str) -> Result<Url, LinkError> {
    database_url(base, format_args!("{}", node.trim_matches('/')), secret)
}

/// Formatiert ein Gewicht mit 4 Nachkommastellen
///
/// NaN und ±inf sind kein gültiges JSON und werden wie beim Tabellen-Upload
/// als `null` geschrieben (Firebase löscht den Knoten, gelesen wird 0.0).
pub fn format_weight(value: f32) -> Result<WeightText, LinkError> {
    let mut text = WeightText::new();
    if value.is_finite() {
        write!(text, "{:.4}", value)
    } else {
        text.write_str("null")
    }
    .map_err(|_| LinkError::Overflow)?;
    Ok(text)
}
