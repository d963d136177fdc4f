//! Integration Tests für den JSON Codec
//!
//! Die Eingaben entsprechen den Antworten der Simulations-Server,
//! der Firebase REST-API und der Last.fm API.

use esp_core::envs::{DroneObservation, HoverObservation, LanderObservation};
use esp_core::wire::{
    encode_model_update, encode_range_log, encode_telemetry, encode_weight_table,
    parse_model, parse_observation, parse_top_tracks, parse_weight_table,
};
use esp_core::{
    ClimateReading, DroneDelivery, EpisodeStatus, LinearModel, LinkError, ModelUpdate,
    RangeSample, Task, Telemetry, TrainingStats,
};

fn as_str(buffer: &[u8], len: usize) -> &str {
    core::str::from_utf8(&buffer[..len]).unwrap()
}

// ============================================================================
// Tests: Simulator-Antworten
// ============================================================================

#[test]
fn test_parse_hover_reset_without_reward() {
    let obs: HoverObservation = parse_observation(br#"{"position":50,"velocity":-0.5}"#).unwrap();
    assert_eq!(obs.position, 50.0);
    assert_eq!(obs.velocity, -0.5);
    assert_eq!(obs.reward, 0.0);
    assert!(!obs.done);
}

#[test]
fn test_parse_drone_step() {
    let body = br#"{"battery":512.5,"done":true,"has_package":true,"reward":-100,
        "target_x":40,"target_y":0,"vx":0.25,"vy":-1.5,"x":80,"y":12}"#;
    let obs: DroneObservation = parse_observation(body).unwrap();
    assert!(obs.has_package);
    assert!(obs.done);
    assert_eq!(obs.reward, -100.0);
    assert_eq!(DroneDelivery::features(&obs)[0], 0.1);
}

#[test]
fn test_parse_lander_reset() {
    let body = br#"{"angle":0.0,"fuel":500,"pad_x":200,"vx":0,"vy":0,"x":200,"y":300}"#;
    let obs: LanderObservation = parse_observation(body).unwrap();
    assert_eq!(obs.pad_x, 200.0);
    assert_eq!(obs.fuel, 500.0);
}

#[test]
fn test_parse_error_page_is_malformed() {
    let result = parse_observation::<HoverObservation>(b"<html>500</html>");
    assert_eq!(result, Err(LinkError::Malformed));
}

// ============================================================================
// Tests: Gewichts-Tabelle
// ============================================================================

#[test]
fn test_weight_table_roundtrip() {
    let table = [[0.5, -1.25, 0.0], [2.0, 0.125, -0.5]];
    let mut buffer = [0u8; 128];
    let len = encode_weight_table(&table, &mut buffer).unwrap();
    assert_eq!(parse_weight_table::<2, 3>(&buffer[..len]), Ok(Some(table)));
}

#[test]
fn test_weight_table_non_finite_written_as_null() {
    let table = [[f32::NAN, 1.0], [f32::INFINITY, -0.5]];
    let mut buffer = [0u8; 64];
    let len = encode_weight_table(&table, &mut buffer).unwrap();
    assert_eq!(&buffer[..len], b"[[null,1.0],[null,-0.5]]");
    assert_eq!(
        parse_weight_table::<2, 2>(&buffer[..len]),
        Ok(Some([[0.0, 1.0], [0.0, -0.5]]))
    );
}

#[test]
fn test_weight_table_sparse_object() {
    let body = br#"{"0":{"2":1.5},"4":{"0":-0.5,"7":0.25}}"#;
    let table = parse_weight_table::<5, 8>(body).unwrap().unwrap();
    assert_eq!(table[0][2], 1.5);
    assert_eq!(table[4][0], -0.5);
    assert_eq!(table[4][7], 0.25);
    assert_eq!(table[1], [0.0; 8]);
}

#[test]
fn test_weight_table_object_with_array_rows() {
    let table = parse_weight_table::<5, 2>(br#"{"4":[0.1,0.2]}"#)
        .unwrap()
        .unwrap();
    assert_eq!(table[4], [0.1, 0.2]);
    assert_eq!(table[0], [0.0; 2]);
}

#[test]
fn test_weight_table_array_with_object_row() {
    let body = br#"[[1,2,3,4,5,6,7,8],{"7":0.5}]"#;
    let table = parse_weight_table::<2, 8>(body).unwrap().unwrap();
    assert_eq!(table[0], [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
    assert_eq!(table[1], [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.5]);
}

#[test]
fn test_weight_table_scalar_row_is_malformed() {
    assert_eq!(
        parse_weight_table::<2, 2>(b"[[1,2],3]"),
        Err(LinkError::Malformed)
    );
}

#[test]
fn test_weight_table_feature_out_of_range() {
    assert_eq!(
        parse_weight_table::<2, 2>(br#"{"0":{"5":1.0}}"#),
        Err(LinkError::Malformed)
    );
}

#[test]
fn test_weight_table_buffer_too_small() {
    let mut buffer = [0u8; 8];
    assert_eq!(
        encode_weight_table(&[[1.0; 8]; 5], &mut buffer),
        Err(LinkError::Overflow)
    );
}

// ============================================================================
// Tests: Telemetrie
// ============================================================================

#[test]
fn test_training_telemetry_envelope() {
    let telemetry = Telemetry::Training(TrainingStats {
        task: "hover",
        episode: 3,
        steps: 14,
        total_reward: -87.0,
        epsilon: 0.5,
        status: EpisodeStatus::TimedOut,
        failed_syncs: 2,
    });
    let mut buffer = [0u8; 256];
    let len = encode_telemetry(&telemetry, &mut buffer).unwrap();
    let json = as_str(&buffer, len);

    assert!(json.starts_with(r#"{"type":"training","data":{"task":"hover","episode":3,"steps":14,"#));
    assert!(json.contains(r#""status":"timed_out""#));
    assert!(json.contains(r#""failed_syncs":2"#));
}

#[test]
fn test_climate_telemetry_envelope() {
    let telemetry = Telemetry::Climate(ClimateReading::new(20.0, 50.0));
    let mut buffer = [0u8; 128];
    let len = encode_telemetry(&telemetry, &mut buffer).unwrap();
    let json = as_str(&buffer, len);
    assert!(json.starts_with(r#"{"type":"climate","data":{"temperature_c":"#));
    assert!(json.contains(r#""humidity":"#));
}

#[test]
fn test_telemetry_overflow() {
    let telemetry = Telemetry::Model(LinearModel::default());
    let mut buffer = [0u8; 10];
    assert_eq!(
        encode_telemetry(&telemetry, &mut buffer),
        Err(LinkError::Overflow)
    );
}

#[test]
fn test_range_log_fields() {
    let sample = RangeSample {
        avg_mm: 1234,
        readings: 20,
        timestamp_ms: 5000,
    };
    let mut buffer = [0u8; 96];
    let len = encode_range_log(&sample, &mut buffer).unwrap();
    let json = as_str(&buffer, len);
    assert!(json.starts_with(r#"{"distance_mm":1234,"distance_cm":"#));
    assert!(json.ends_with(r#""timestamp":5000}"#));
}

// ============================================================================
// Tests: Federated Learning
// ============================================================================

#[test]
fn test_model_update_payload() {
    let model = LinearModel {
        weight: 2.0,
        bias: 0.5,
    };
    let mut buffer = [0u8; 96];
    let len = encode_model_update(&ModelUpdate::new("esp32-a", &model), &mut buffer).unwrap();
    assert!(as_str(&buffer, len).starts_with(r#"{"client_id":"esp32-a","weight":"#));
}

#[test]
fn test_parse_aggregated_model_ignores_extra_fields() {
    let model = parse_model(br#"{"bias":0.25,"clients":3,"weight":1.5}"#).unwrap();
    assert_eq!(model, LinearModel { weight: 1.5, bias: 0.25 });
}

// ============================================================================
// Tests: Last.fm
// ============================================================================

const CHART_RESPONSE: &[u8] = br##"{"tracks":{"track":[
  {"name":"Espresso","duration":"0","playcount":"1000","listeners":"500",
   "mbid":"","url":"https://www.last.fm/music/Sabrina+Carpenter/_/Espresso",
   "streamable":{"#text":"0","fulltrack":"0"},
   "artist":{"name":"Sabrina Carpenter","mbid":"","url":"https://www.last.fm/music/Sabrina+Carpenter"},
   "image":[{"#text":"","size":"small"},{"#text":"","size":"large"}]},
  {"name":"Birds of a Feather","duration":"0","playcount":"900","listeners":"450",
   "mbid":"","url":"https://www.last.fm/music/Billie+Eilish/_/Birds+of+a+Feather",
   "streamable":{"#text":"0","fulltrack":"0"},
   "artist":{"name":"Billie Eilish","mbid":"","url":"https://www.last.fm/music/Billie+Eilish"},
   "image":[]}
 ],"@attr":{"page":"1","perPage":"2","totalPages":"50","total":"100"}}}"##;

#[test]
fn test_parse_top_tracks() {
    let tracks = parse_top_tracks(CHART_RESPONSE).unwrap();
    assert_eq!(tracks.len(), 2);
    assert_eq!(tracks[0].name, "Espresso");
    assert_eq!(tracks[0].artist.name, "Sabrina Carpenter");
    assert_eq!(tracks[1].name, "Birds of a Feather");
    assert_eq!(
        tracks[1].url,
        "https://www.last.fm/music/Billie+Eilish/_/Birds+of+a+Feather"
    );
}

#[test]
fn test_parse_top_tracks_error_response() {
    let body = br#"{"error":10,"message":"Invalid API key"}"#;
    assert_eq!(parse_top_tracks(body), Err(LinkError::Malformed));
}
