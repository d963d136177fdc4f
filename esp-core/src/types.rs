//! Core Types für die Telemetrie
//!
//! Datenstrukturen ohne Hardware-Dependencies, die zwischen den Tasks
//! ausgetauscht werden (PubSub → MQTT + WebSocket).

#[cfg(feature = "serde")]
use serde::Serialize;

use crate::climate::ClimateReading;
use crate::episode::{EpisodeOutcome, EpisodeStatus};
use crate::federated::LinearModel;
use crate::ranging::RangeSample;

/// Zusammenfassung einer Trainings-Episode
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct TrainingStats {
    pub task: &'static str,
    pub episode: u32,
    pub steps: u32,
    pub total_reward: f32,
    pub epsilon: f32,
    pub status: EpisodeStatus,
    pub failed_syncs: u32,
}

impl TrainingStats {
    pub fn from_outcome(task: &'static str, outcome: &EpisodeOutcome) -> Self {
        Self {
            task,
            episode: outcome.episode,
            steps: outcome.steps,
            total_reward: outcome.total_reward,
            epsilon: outcome.epsilon,
            status: outcome.status,
            failed_syncs: outcome.failed_syncs,
        }
    }
}

/// Telemetrie-Nachricht für Channel-Kommunikation
///
/// Wird von Trainer-, LIDAR-, Klima- und Federated-Task gepublished.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Telemetry {
    Training(TrainingStats),
    Range(RangeSample),
    Climate(ClimateReading),
    Model(LinearModel),
}

impl Telemetry {
    /// Kurzer Name, wird als MQTT Topic-Suffix und JSON `type` genutzt
    pub fn kind(&self) -> &'static str {
        match self {
            Telemetry::Training(_) => "training",
            Telemetry::Range(_) => "range",
            Telemetry::Climate(_) => "climate",
            Telemetry::Model(_) => "model",
        }
    }
}

// ============================================================================
// defmt::Format Implementations (optional feature)
// ============================================================================

#[cfg(feature = "defmt")]
impl defmt::Format for Telemetry {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Telemetry::Training(stats) => defmt::write!(
                fmt,
                "Training {{ task: {}, episode: {}, steps: {}, reward: {}, epsilon: {} }}",
                stats.task,
                stats.episode,
                stats.steps,
                stats.total_reward,
                stats.epsilon
            ),
            Telemetry::Range(sample) => defmt::write!(
                fmt,
                "Range {{ avg_mm: {}, readings: {} }}",
                sample.avg_mm,
                sample.readings
            ),
            Telemetry::Climate(reading) => defmt::write!(
                fmt,
                "Climate {{ temp: {} C, humidity: {} % }}",
                reading.temperature_c,
                reading.humidity
            ),
            Telemetry::Model(model) => defmt::write!(
                fmt,
                "Model {{ y = {}x + {} }}",
                model.weight,
                model.bias
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_telemetry_kind() {
        let reading = ClimateReading::new(21.0, 40.0);
        assert_eq!(Telemetry::Climate(reading).kind(), "climate");
        let model = LinearModel::default();
        assert_eq!(Telemetry::Model(model).kind(), "model");
    }
}
