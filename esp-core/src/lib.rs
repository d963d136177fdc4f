//! ESP Core - Platform-agnostic Logic and Traits
//!
//! Diese Crate enthält KEINE Hardware-Dependencies.
//! Sie definiert Traits für Sensoren und Netzwerk sowie die komplette
//! Reinforcement-Learning-Logik (testbar auf dem Host).

#![no_std]
// Traits werden nur auf dem Single-Core Embassy Executor genutzt,
// Send-Bounds auf den Futures sind nicht nötig.
#![allow(async_fn_in_trait)]

pub mod climate;
pub mod envs;
pub mod episode;
pub mod federated;
pub mod firebase;
pub mod qlearn;
pub mod ranging;
pub mod traits;
pub mod types;
#[cfg(feature = "serde")]
pub mod wire;

// Re-exports für einfachen Zugriff
pub use climate::ClimateReading;
pub use envs::{DroneDelivery, Hover, LunarLander, Task};
pub use episode::{EpisodeOutcome, EpisodeStatus, Restore, SyncPolicy, Trainer};
pub use federated::{LinearModel, ModelUpdate};
pub use qlearn::{Exploration, Hyperparameters, LinearQ, WeightChange, WeightChanges};
pub use ranging::{RangeAverager, RangeReading, RangeSample};
pub use traits::{
    ClimateSensor, LinkError, RandomSource, RangeSensor, SensorError, SimulationClient,
    WeightStore,
};
pub use types::{Telemetry, TrainingStats};
