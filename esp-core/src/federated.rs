//! Federated Learning Client (lineare Regression)
//!
//! Jeder Client macht einen lokalen Gradientenschritt, schickt sein
//! Modell an den Aggregations-Server und übernimmt das gemittelte Modell.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Lokaler Beispiel-Datensatz (x)
pub const SAMPLE_INPUTS: [f32; 5] = [1.0, 2.0, 3.0, 4.0, 5.0];

/// Lokaler Beispiel-Datensatz (y ≈ 2x)
pub const SAMPLE_LABELS: [f32; 5] = [2.2, 4.1, 6.3, 8.05, 10.2];

/// Modell y = weight · x + bias
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LinearModel {
    pub weight: f32,
    pub bias: f32,
}

impl LinearModel {
    pub fn predict(&self, x: f32) -> f32 {
        self.weight * x + self.bias
    }

    /// Ein Batch-Gradientenschritt auf dem mittleren quadratischen Fehler
    ///
    /// Überzählige Werte in der längeren Liste werden ignoriert.
    pub fn local_train(&mut self, inputs: &[f32], labels: &[f32], learning_rate: f32) {
        let n = inputs.len().min(labels.len());
        if n == 0 {
            return;
        }

        let (mut dw, mut db) = (0.0f32, 0.0f32);
        for (&x, &y) in inputs.iter().zip(labels.iter()) {
            let error = self.predict(x) - y;
            dw += 2.0 * error * x; // dL/dw
            db += 2.0 * error; // dL/db
        }
        self.weight -= learning_rate * dw / n as f32;
        self.bias -= learning_rate * db / n as f32;
    }

    /// Mittlerer quadratischer Fehler auf den gegebenen Daten
    pub fn mse(&self, inputs: &[f32], labels: &[f32]) -> f32 {
        let n = inputs.len().min(labels.len());
        if n == 0 {
            return 0.0;
        }
        let total: f32 = inputs
            .iter()
            .zip(labels.iter())
            .map(|(&x, &y)| {
                let error = self.predict(x) - y;
                error * error
            })
            .sum();
        total / n as f32
    }
}

/// Nachricht an den Aggregations-Server
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct ModelUpdate<'a> {
    pub client_id: &'a str,
    pub weight: f32,
    pub bias: f32,
}

impl<'a> ModelUpdate<'a> {
    pub fn new(client_id: &'a str, model: &LinearModel) -> Self {
        Self {
            client_id,
            weight: model.weight,
            bias: model.bias,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_step_from_zero() {
        let mut model = LinearModel::default();
        model.local_train(&[1.0], &[2.0], 0.5);
        // dw = 2 * (0 - 2) * 1 = -4, db = -4
        assert_eq!(model.weight, 2.0);
        assert_eq!(model.bias, 2.0);
    }

    #[test]
    fn test_empty_data_is_noop() {
        let mut model = LinearModel {
            weight: 1.0,
            bias: 1.0,
        };
        model.local_train(&[], &[], 0.1);
        assert_eq!(model.weight, 1.0);
    }

    #[test]
    fn test_training_reduces_error() {
        let mut model = LinearModel::default();
        let before = model.mse(&SAMPLE_INPUTS, &SAMPLE_LABELS);
        for _ in 0..50 {
            model.local_train(&SAMPLE_INPUTS, &SAMPLE_LABELS, 0.01);
        }
        assert!(model.mse(&SAMPLE_INPUTS, &SAMPLE_LABELS) < before);
    }
}
