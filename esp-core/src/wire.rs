//! JSON Codec (serde + serde-json-core)
//!
//! Parsen der Simulator-, Firebase- und Last.fm-Antworten sowie
//! Serialisierung der Telemetrie. Alles ohne Heap, direkt in Buffer.

use core::fmt;
use core::marker::PhantomData;

use heapless::Vec;
use serde::de::{self, DeserializeOwned, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

use crate::federated::{LinearModel, ModelUpdate};
use crate::ranging::RangeSample;
use crate::traits::LinkError;
use crate::types::Telemetry;

/// Maximale Anzahl Tracks aus der Last.fm Chart-Antwort
pub const MAX_TRACKS: usize = 10;

/// Parst eine Simulator-Antwort (`/reset` oder `/step`)
pub fn parse_observation<O: DeserializeOwned>(bytes: &[u8]) -> Result<O, LinkError> {
    serde_json_core::from_slice::<O>(bytes)
        .map(|(observation, _)| observation)
        .map_err(|_| LinkError::Malformed)
}

// ============================================================================
// Gewichts-Tabelle
// ============================================================================
//
// Firebase liefert Knoten mit Integer-Keys als Array (Lücken = null) oder,
// bei wenigen belegten Keys, als Objekt {"0": ..., "3": ...}. Die Form wird
// pro Knoten entschieden, Tabelle und Zeilen können sich also unterscheiden.
// Fehlende Einträge zählen als 0.0.

/// Array fester Länge, dekodiert aus einem JSON-Array oder einem Objekt
/// mit Index-Keys
#[derive(Clone, Copy)]
struct IndexArray<E, const N: usize>([E; N]);

impl<E: Copy + Default, const N: usize> Default for IndexArray<E, N> {
    fn default() -> Self {
        Self([E::default(); N])
    }
}

struct IndexArrayVisitor<E, const N: usize>(PhantomData<E>);

impl<'de, E, const N: usize> Visitor<'de> for IndexArrayVisitor<E, N>
where
    E: Copy + Default + Deserialize<'de>,
{
    type Value = IndexArray<E, N>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(
            formatter,
            "an array or an object with index keys, at most {} entries",
            N
        )
    }

    fn visit_seq<S: SeqAccess<'de>>(self, mut seq: S) -> Result<Self::Value, S::Error> {
        let mut values = [E::default(); N];
        let mut index = 0;
        while let Some(value) = seq.next_element::<Option<E>>()? {
            let slot = values
                .get_mut(index)
                .ok_or_else(|| de::Error::invalid_length(index + 1, &self))?;
            *slot = value.unwrap_or_default();
            index += 1;
        }
        Ok(IndexArray(values))
    }

    fn visit_map<M: MapAccess<'de>>(self, mut map: M) -> Result<Self::Value, M::Error> {
        let mut values = [E::default(); N];
        while let Some(key) = map.next_key::<&'de str>()? {
            let index: usize = key
                .parse()
                .map_err(|_| de::Error::invalid_value(de::Unexpected::Str(key), &self))?;
            let value = map.next_value::<Option<E>>()?;
            let slot = values
                .get_mut(index)
                .ok_or_else(|| de::Error::invalid_value(de::Unexpected::Str(key), &self))?;
            *slot = value.unwrap_or_default();
        }
        Ok(IndexArray(values))
    }
}

impl<'de, E, const N: usize> Deserialize<'de> for IndexArray<E, N>
where
    E: Copy + Default + Deserialize<'de>,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // serde-json-core kennt kein deserialize_any; ignored_any verzweigt
        // bei '[' nach visit_seq und bei '{' nach visit_map
        deserializer.deserialize_ignored_any(IndexArrayVisitor::<E, N>(PhantomData))
    }
}

/// Parst die Gewichts-Tabelle aus Firebase
///
/// `Ok(None)` wenn die Datenbank leer ist (`null`).
pub fn parse_weight_table<const A: usize, const F: usize>(
    bytes: &[u8],
) -> Result<Option<[[f32; F]; A]>, LinkError> {
    serde_json_core::from_slice::<Option<IndexArray<IndexArray<f32, F>, A>>>(bytes)
        .map(|(table, _)| table.map(|table| table.0.map(|row| row.0)))
        .map_err(|_| LinkError::Malformed)
}

/// Serialisiert die Gewichts-Tabelle als verschachteltes JSON-Array
pub fn encode_weight_table<const A: usize, const F: usize>(
    table: &[[f32; F]; A],
    buffer: &mut [u8],
) -> Result<usize, LinkError> {
    let rows: [&[f32]; A] = core::array::from_fn(|action| &table[action][..]);
    encode(&rows[..], buffer)
}

// ============================================================================
// Telemetrie, LIDAR-Log, Federated Learning
// ============================================================================

/// JSON-Payload für den LIDAR-Log in Firebase
#[derive(Serialize)]
struct RangeLog {
    distance_mm: u16,
    distance_cm: f32,
    timestamp: u64,
}

/// Umschlag für Telemetrie: `{"type": "...", "data": {...}}`
#[derive(Serialize)]
struct Envelope<'a, T: Serialize> {
    #[serde(rename = "type")]
    kind: &'static str,
    data: &'a T,
}

fn encode<T: Serialize + ?Sized>(value: &T, buffer: &mut [u8]) -> Result<usize, LinkError> {
    serde_json_core::to_slice(value, buffer).map_err(|_| LinkError::Overflow)
}

pub fn encode_range_log(sample: &RangeSample, buffer: &mut [u8]) -> Result<usize, LinkError> {
    let log = RangeLog {
        distance_mm: sample.avg_mm,
        distance_cm: sample.avg_cm(),
        timestamp: sample.timestamp_ms,
    };
    encode(&log, buffer)
}

pub fn encode_telemetry(telemetry: &Telemetry, buffer: &mut [u8]) -> Result<usize, LinkError> {
    let kind = telemetry.kind();
    match telemetry {
        Telemetry::Training(stats) => encode(&Envelope { kind, data: stats }, buffer),
        Telemetry::Range(sample) => encode(&Envelope { kind, data: sample }, buffer),
        Telemetry::Climate(reading) => encode(&Envelope { kind, data: reading }, buffer),
        Telemetry::Model(model) => encode(&Envelope { kind, data: model }, buffer),
    }
}

pub fn encode_model_update(update: &ModelUpdate<'_>, buffer: &mut [u8]) -> Result<usize, LinkError> {
    encode(update, buffer)
}

/// Parst das aggregierte Modell (`{"weight": .., "bias": ..}`)
pub fn parse_model(bytes: &[u8]) -> Result<LinearModel, LinkError> {
    parse_observation(bytes)
}

// ============================================================================
// Last.fm Charts
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct TopTrack<'a> {
    pub name: &'a str,
    pub url: &'a str,
    #[serde(borrow)]
    pub artist: Artist<'a>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Artist<'a> {
    pub name: &'a str,
}

#[derive(Deserialize)]
struct ChartResponse<'a> {
    #[serde(borrow)]
    tracks: TrackList<'a>,
}

#[derive(Deserialize)]
struct TrackList<'a> {
    #[serde(borrow)]
    track: Vec<TopTrack<'a>, MAX_TRACKS>,
}

/// Parst die Antwort von `chart.gettoptracks`
///
/// Die Anfrage muss mit `limit` <= [`MAX_TRACKS`] gestellt werden.
pub fn parse_top_tracks(bytes: &[u8]) -> Result<Vec<TopTrack<'_>, MAX_TRACKS>, LinkError> {
    serde_json_core::from_slice::<ChartResponse<'_>>(bytes)
        .map(|(response, _)| response.tracks.track)
        .map_err(|_| LinkError::Malformed)
}
