//! Simulations-Tasks und Feature-Extraktion
//!
//! Jede Task entspricht einem Simulations-Server (Flask) mit eigenem
//! Zustandsformat. Die Features werden normalisiert und enden immer
//! mit einem Bias-Term (1.0).

#[cfg(feature = "serde")]
use serde::Deserialize;

use crate::qlearn::Hyperparameters;

/// Beschreibung einer Simulations-Umgebung
///
/// `A` = Anzahl Aktionen, `F` = Anzahl Features.
pub trait Task<const A: usize, const F: usize> {
    /// Zustand wie ihn `/reset` und `/step` liefern
    type Observation;

    /// Name für Logs und Telemetrie
    const NAME: &'static str;

    /// Knoten der Gewichts-Tabelle in der Datenbank
    const WEIGHTS_KEY: &'static str;

    fn hyperparameters() -> Hyperparameters;

    fn features(observation: &Self::Observation) -> [f32; F];

    fn reward(observation: &Self::Observation) -> f32;

    fn is_done(observation: &Self::Observation) -> bool;
}

// ============================================================================
// Hover: Schwerkraft-Simulation (Aktion 0 = nichts, 1 = Schub)
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize))]
pub struct HoverObservation {
    pub position: f32,
    pub velocity: f32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub reward: f32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub done: bool,
}

/// Höhe halten zwischen Boden (0) und Decke (100)
pub struct Hover;

impl Task<2, 3> for Hover {
    type Observation = HoverObservation;

    const NAME: &'static str = "hover";
    const WEIGHTS_KEY: &'static str = "hover_weights";

    fn hyperparameters() -> Hyperparameters {
        Hyperparameters {
            alpha: 0.01,
            gamma: 0.95,
            epsilon_start: 1.0,
            epsilon_decay: 0.995,
            epsilon_min: 0.05,
            max_steps: 500,
            episodes: 2000,
        }
    }

    fn features(obs: &HoverObservation) -> [f32; 3] {
        [obs.position / 100.0, obs.velocity / 10.0, 1.0]
    }

    fn reward(obs: &HoverObservation) -> f32 {
        obs.reward
    }

    fn is_done(obs: &HoverObservation) -> bool {
        obs.done
    }
}

// ============================================================================
// Lunar Lander (0 = nichts, 1 = Haupttriebwerk, 2 = links, 3 = rechts)
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize))]
pub struct LanderObservation {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub angle: f32,
    pub fuel: f32,
    pub pad_x: f32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub reward: f32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub done: bool,
}

pub struct LunarLander;

impl Task<4, 7> for LunarLander {
    type Observation = LanderObservation;

    const NAME: &'static str = "lander";
    const WEIGHTS_KEY: &'static str = "lander_weights";

    fn hyperparameters() -> Hyperparameters {
        Hyperparameters {
            alpha: 0.005,
            gamma: 0.99,
            epsilon_start: 1.0,
            epsilon_decay: 0.9995,
            epsilon_min: 0.05,
            max_steps: 1000,
            episodes: 20000,
        }
    }

    fn features(obs: &LanderObservation) -> [f32; 7] {
        [
            (obs.x - obs.pad_x) / 400.0, // Horizontaler Abstand zum Pad
            obs.y / 300.0,
            obs.vx / 5.0,
            obs.vy / 5.0,
            obs.angle / core::f32::consts::PI,
            obs.fuel / 500.0,
            1.0, // Bias
        ]
    }

    fn reward(obs: &LanderObservation) -> f32 {
        obs.reward
    }

    fn is_done(obs: &LanderObservation) -> bool {
        obs.done
    }
}

// ============================================================================
// Drone Delivery (0 = nichts, 1 = hoch, 2 = runter, 3 = links, 4 = rechts)
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize))]
pub struct DroneObservation {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub battery: f32,
    pub has_package: bool,
    pub target_x: f32,
    pub target_y: f32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub reward: f32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub done: bool,
}

/// Paket abholen und abliefern, ohne Gebäude zu rammen
pub struct DroneDelivery;

impl Task<5, 8> for DroneDelivery {
    type Observation = DroneObservation;

    const NAME: &'static str = "drone";
    const WEIGHTS_KEY: &'static str = "drone_weights";

    fn hyperparameters() -> Hyperparameters {
        Hyperparameters {
            alpha: 0.005,
            gamma: 0.98,
            epsilon_start: 1.0,
            epsilon_decay: 0.9998,
            epsilon_min: 0.05,
            max_steps: 800,
            episodes: 50000,
        }
    }

    fn features(obs: &DroneObservation) -> [f32; 8] {
        [
            (obs.x - obs.target_x) / 400.0, // Abstand X zum Ziel
            (obs.y - obs.target_y) / 300.0, // Abstand Y zum Ziel
            obs.vx / 5.0,
            obs.vy / 5.0,
            obs.y / 300.0, // Flughöhe
            if obs.has_package { 1.0 } else { 0.0 },
            obs.battery / 600.0,
            1.0, // Bias
        ]
    }

    fn reward(obs: &DroneObservation) -> f32 {
        obs.reward
    }

    fn is_done(obs: &DroneObservation) -> bool {
        obs.done
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drone_features_normalized() {
        let obs = DroneObservation {
            x: 240.0,
            y: 150.0,
            vx: 2.5,
            vy: -5.0,
            battery: 300.0,
            has_package: true,
            target_x: 40.0,
            target_y: 0.0,
            reward: 0.0,
            done: false,
        };
        let f = DroneDelivery::features(&obs);
        assert_eq!(f, [0.5, 0.5, 0.5, -1.0, 0.5, 1.0, 0.5, 1.0]);
    }

    #[test]
    fn test_hover_features_end_with_bias() {
        let obs = HoverObservation {
            position: 50.0,
            velocity: -1.0,
            ..Default::default()
        };
        assert_eq!(Hover::features(&obs), [0.5, -0.1, 1.0]);
    }

    #[test]
    fn test_lander_features_pad_offset() {
        let obs = LanderObservation {
            x: 300.0,
            pad_x: 100.0,
            fuel: 500.0,
            ..Default::default()
        };
        let f = LunarLander::features(&obs);
        assert_eq!(f[0], 0.5);
        assert_eq!(f[5], 1.0);
        assert_eq!(f[6], 1.0);
    }

    #[test]
    fn test_drone_default_hyperparameters() {
        let params = DroneDelivery::hyperparameters();
        assert_eq!(params.alpha, 0.005);
        assert_eq!(params.gamma, 0.98);
        assert_eq!(params.max_steps, 800);
        assert_eq!(params.episodes, 50000);
    }
}
