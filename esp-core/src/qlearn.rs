//! Lineare Q-Wert-Approximation
//!
//! Q(s, a) = w[a] · φ(s) mit einer Gewichts-Zeile pro Aktion.
//! Aktionswahl epsilon-greedy, Lernen per TD-Fehler.

use heapless::Vec;

use crate::traits::RandomSource;

/// Änderungen unterhalb dieser Schwelle werden nicht synchronisiert
pub const WEIGHT_SYNC_EPSILON: f32 = 1e-6;

/// Startwert für die Maximum-Suche über alle Aktionen
const Q_FLOOR: f32 = -1e9;

/// Lern-Parameter einer Task
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hyperparameters {
    /// Lernrate α
    pub alpha: f32,
    /// Discount-Faktor γ
    pub gamma: f32,
    pub epsilon_start: f32,
    /// Multiplikativer Zerfall pro Episode
    pub epsilon_decay: f32,
    pub epsilon_min: f32,
    /// Episode endet sobald mehr Schritte als `max_steps` gemacht wurden
    pub max_steps: u32,
    pub episodes: u32,
}

impl Hyperparameters {
    pub fn exploration(&self) -> Exploration {
        Exploration::new(self.epsilon_start, self.epsilon_decay, self.epsilon_min)
    }
}

/// Epsilon-Schedule für die Exploration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Exploration {
    epsilon: f32,
    decay: f32,
    floor: f32,
}

impl Exploration {
    pub fn new(epsilon: f32, decay: f32, floor: f32) -> Self {
        Self {
            epsilon: if epsilon < floor { floor } else { epsilon },
            decay,
            floor,
        }
    }

    pub fn epsilon(&self) -> f32 {
        self.epsilon
    }

    /// ε ← max(ε · decay, floor)
    pub fn decay(&mut self) {
        self.epsilon *= self.decay;
        if self.epsilon < self.floor {
            self.epsilon = self.floor;
        }
    }
}

/// Ein geändertes Gewicht (für die Synchronisation mit der Datenbank)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightChange {
    pub action: usize,
    pub feature: usize,
    pub value: f32,
}

/// Höchstens eine Änderung pro Feature
pub type WeightChanges<const F: usize> = Vec<WeightChange, F>;

/// Gewichts-Tabelle mit `A` Aktionen und `F` Features
#[derive(Debug, Clone, PartialEq)]
pub struct LinearQ<const A: usize, const F: usize> {
    weights: [[f32; F]; A],
}

impl<const A: usize, const F: usize> Default for LinearQ<A, F> {
    fn default() -> Self {
        Self::zeroed()
    }
}

impl<const A: usize, const F: usize> LinearQ<A, F> {
    pub const fn zeroed() -> Self {
        Self {
            weights: [[0.0; F]; A],
        }
    }

    pub const fn from_weights(weights: [[f32; F]; A]) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &[[f32; F]; A] {
        &self.weights
    }

    /// Ersetzt die lokale Tabelle (z.B. nach dem Laden aus Firebase)
    pub fn replace(&mut self, weights: [[f32; F]; A]) {
        self.weights = weights;
    }

    pub fn reset(&mut self) {
        self.weights = [[0.0; F]; A];
    }

    /// Q(s, a) = Σ w[a][i] · φ_i
    pub fn q_value(&self, features: &[f32; F], action: usize) -> f32 {
        self.weights[action]
            .iter()
            .zip(features.iter())
            .map(|(w, f)| w * f)
            .sum()
    }

    /// max_a Q(s, a)
    pub fn max_q(&self, features: &[f32; F]) -> f32 {
        (0..A)
            .map(|a| self.q_value(features, a))
            .fold(Q_FLOOR, |best, q| if q > best { q } else { best })
    }

    /// argmax_a Q(s, a), bei Gleichstand gewinnt die kleinste Aktion
    pub fn best_action(&self, features: &[f32; F]) -> usize {
        let mut best_action = 0;
        let mut best_q = Q_FLOOR;
        for action in 0..A {
            let q = self.q_value(features, action);
            if q > best_q {
                best_q = q;
                best_action = action;
            }
        }
        best_action
    }

    /// Epsilon-greedy Aktionswahl
    ///
    /// Zieht u = (rng mod 1000) / 1000; für u < ε wird eine zufällige
    /// Aktion gewählt, sonst die beste.
    pub fn choose_action<R: RandomSource>(
        &self,
        features: &[f32; F],
        epsilon: f32,
        rng: &mut R,
    ) -> usize {
        let roll = (rng.next_u32() % 1000) as f32 / 1000.0;
        if roll < epsilon {
            (rng.next_u32() % A as u32) as usize
        } else {
            self.best_action(features)
        }
    }

    /// δ = r + γ · max_a' Q(s', a') − Q(s, a)
    ///
    /// `next == None` markiert einen Endzustand (kein zukünftiger Wert).
    pub fn td_error(
        &self,
        features: &[f32; F],
        action: usize,
        reward: f32,
        next: Option<&[f32; F]>,
        gamma: f32,
    ) -> f32 {
        let future = next.map_or(0.0, |next| self.max_q(next));
        reward + gamma * future - self.q_value(features, action)
    }

    /// w[a][i] += α · δ · φ_i
    ///
    /// Gibt alle Gewichte zurück, die sich um mehr als
    /// [`WEIGHT_SYNC_EPSILON`] verändert haben.
    pub fn apply_td(
        &mut self,
        features: &[f32; F],
        action: usize,
        td_error: f32,
        alpha: f32,
    ) -> WeightChanges<F> {
        let mut changes = WeightChanges::new();
        let row = &mut self.weights[action];
        for (feature, (weight, phi)) in row.iter_mut().zip(features.iter()).enumerate() {
            let old = *weight;
            *weight += alpha * td_error * phi;
            let delta = *weight - old;
            if delta > WEIGHT_SYNC_EPSILON || delta < -WEIGHT_SYNC_EPSILON {
                // Kapazität F reicht immer, ein Eintrag pro Feature
                let _ = changes.push(WeightChange {
                    action,
                    feature,
                    value: *weight,
                });
            }
        }
        changes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedRng(u32);

    impl RandomSource for FixedRng {
        fn next_u32(&mut self) -> u32 {
            self.0
        }
    }

    #[test]
    fn test_q_value_is_dot_product() {
        let q = LinearQ::<2, 3>::from_weights([[1.0, 2.0, 3.0], [0.5, 0.0, -1.0]]);
        let phi = [1.0, 1.0, 2.0];
        assert_eq!(q.q_value(&phi, 0), 9.0);
        assert_eq!(q.q_value(&phi, 1), -1.5);
    }

    #[test]
    fn test_best_action_prefers_lowest_index_on_tie() {
        let q = LinearQ::<3, 1>::from_weights([[1.0], [1.0], [0.5]]);
        assert_eq!(q.best_action(&[1.0]), 0);
    }

    #[test]
    fn test_max_q_of_zeroed_table_is_zero() {
        let q = LinearQ::<4, 2>::zeroed();
        assert_eq!(q.max_q(&[3.0, -2.0]), 0.0);
    }

    #[test]
    fn test_greedy_when_roll_above_epsilon() {
        let q = LinearQ::<2, 1>::from_weights([[0.0], [1.0]]);
        // roll = 999 / 1000 = 0.999 >= 0.5
        let mut rng = FixedRng(999);
        assert_eq!(q.choose_action(&[1.0], 0.5, &mut rng), 1);
    }

    #[test]
    fn test_random_when_roll_below_epsilon() {
        let q = LinearQ::<5, 1>::from_weights([[9.0], [0.0], [0.0], [0.0], [0.0]]);
        // roll = 3 / 1000 < 1.0, Aktion = 3 mod 5
        let mut rng = FixedRng(3);
        assert_eq!(q.choose_action(&[1.0], 1.0, &mut rng), 3);
    }

    #[test]
    fn test_td_error_terminal_ignores_future() {
        let q = LinearQ::<1, 1>::from_weights([[2.0]]);
        let err = q.td_error(&[1.0], 0, -100.0, None, 0.98);
        assert_eq!(err, -102.0);
    }

    #[test]
    fn test_apply_td_updates_only_selected_row() {
        let mut q = LinearQ::<2, 2>::zeroed();
        let changes = q.apply_td(&[1.0, 0.0], 1, 10.0, 0.5);
        assert_eq!(q.weights(), &[[0.0, 0.0], [5.0, 0.0]]);
        assert_eq!(changes.len(), 1);
        assert_eq!(
            changes[0],
            WeightChange {
                action: 1,
                feature: 0,
                value: 5.0
            }
        );
    }

    #[test]
    fn test_exploration_decays_to_floor() {
        let mut exploration = Exploration::new(0.1, 0.5, 0.05);
        exploration.decay();
        assert_eq!(exploration.epsilon(), 0.05);
        exploration.decay();
        assert_eq!(exploration.epsilon(), 0.05);
    }
}
