//! Integration Tests für den linearen Q-Learner
//!
//! Laufen auf dem Host (x86_64) mit einer skriptbaren Zufallsquelle.

use esp_core::qlearn::WEIGHT_SYNC_EPSILON;
use esp_core::{Exploration, LinearQ, RandomSource};

// ============================================================================
// Mock Random Source
// ============================================================================

/// Liefert die Werte der Reihe nach, danach immer 0
pub struct ScriptedRng {
    values: [u32; 8],
    index: usize,
}

impl ScriptedRng {
    pub fn new(values: &[u32]) -> Self {
        let mut buffer = [0u32; 8];
        buffer[..values.len()].copy_from_slice(values);
        Self {
            values: buffer,
            index: 0,
        }
    }

    pub fn draws(&self) -> usize {
        self.index
    }
}

impl RandomSource for ScriptedRng {
    fn next_u32(&mut self) -> u32 {
        let value = self.values.get(self.index).copied().unwrap_or(0);
        self.index += 1;
        value
    }
}

// ============================================================================
// Tests: Q-Werte
// ============================================================================

#[test]
fn test_q_value_is_dot_product() {
    let q = LinearQ::<2, 3>::from_weights([[1.0, 2.0, 3.0], [0.5, 0.0, -1.0]]);
    let features = [1.0, 0.5, 2.0];
    assert_eq!(q.q_value(&features, 0), 8.0);
    assert_eq!(q.q_value(&features, 1), -1.5);
    assert_eq!(q.max_q(&features), 8.0);
}

#[test]
fn test_best_action_tie_picks_lowest_index() {
    let q = LinearQ::<3, 2>::zeroed();
    assert_eq!(q.best_action(&[0.3, 1.0]), 0);
}

#[test]
fn test_best_action_prefers_highest_q() {
    let q = LinearQ::<3, 2>::from_weights([[0.0, 0.0], [0.0, 1.0], [0.0, 2.0]]);
    assert_eq!(q.best_action(&[0.0, 1.0]), 2);
}

#[test]
fn test_max_q_all_negative() {
    let q = LinearQ::<2, 1>::from_weights([[-5.0], [-3.0]]);
    assert_eq!(q.max_q(&[1.0]), -3.0);
}

// ============================================================================
// Tests: Epsilon-greedy
// ============================================================================

#[test]
fn test_explore_when_roll_below_epsilon() {
    let q = LinearQ::<4, 1>::from_weights([[0.0], [0.0], [9.0], [0.0]]);
    // roll = 100 / 1000 = 0.1 < 0.5, danach Aktion 7 % 4 = 3
    let mut rng = ScriptedRng::new(&[100, 7]);
    assert_eq!(q.choose_action(&[1.0], 0.5, &mut rng), 3);
    assert_eq!(rng.draws(), 2);
}

#[test]
fn test_exploit_when_roll_above_epsilon() {
    let q = LinearQ::<4, 1>::from_weights([[0.0], [0.0], [9.0], [0.0]]);
    // roll = 1999 % 1000 / 1000 = 0.999
    let mut rng = ScriptedRng::new(&[1999]);
    assert_eq!(q.choose_action(&[1.0], 0.5, &mut rng), 2);
    assert_eq!(rng.draws(), 1);
}

#[test]
fn test_zero_epsilon_never_explores() {
    let q = LinearQ::<2, 1>::from_weights([[0.0], [1.0]]);
    let mut rng = ScriptedRng::new(&[0]);
    assert_eq!(q.choose_action(&[1.0], 0.0, &mut rng), 1);
}

// ============================================================================
// Tests: TD-Update
// ============================================================================

#[test]
fn test_td_error_terminal_ignores_future() {
    let q = LinearQ::<2, 1>::from_weights([[1.0], [10.0]]);
    let td = q.td_error(&[1.0], 0, -100.0, None, 0.9);
    assert_eq!(td, -101.0);
}

#[test]
fn test_td_error_uses_max_next_q() {
    let q = LinearQ::<2, 1>::from_weights([[1.0], [10.0]]);
    // 1 + 0.5 * 10 - 1
    let td = q.td_error(&[1.0], 0, 1.0, Some(&[1.0]), 0.5);
    assert_eq!(td, 5.0);
}

#[test]
fn test_apply_td_reports_changed_weights_only() {
    let mut q = LinearQ::<2, 3>::zeroed();
    let changes = q.apply_td(&[1.0, 0.0, 0.5], 1, 2.0, 0.5);

    assert_eq!(changes.len(), 2);
    assert_eq!((changes[0].action, changes[0].feature), (1, 0));
    assert_eq!(changes[0].value, 1.0);
    assert_eq!((changes[1].action, changes[1].feature), (1, 2));
    assert_eq!(changes[1].value, 0.5);

    assert_eq!(q.weights(), &[[0.0, 0.0, 0.0], [1.0, 0.0, 0.5]]);
}

#[test]
fn test_apply_td_tiny_change_not_reported() {
    let mut q = LinearQ::<1, 1>::zeroed();
    let changes = q.apply_td(&[1.0], 0, WEIGHT_SYNC_EPSILON / 10.0, 1.0);
    assert!(changes.is_empty());
}

#[test]
fn test_apply_td_negative_change_reported() {
    let mut q = LinearQ::<1, 2>::zeroed();
    let changes = q.apply_td(&[1.0, 1.0], 0, -1.0, 0.1);
    assert_eq!(changes.len(), 2);
    assert!(changes.iter().all(|change| change.value < 0.0));
}

// ============================================================================
// Tests: Exploration
// ============================================================================

#[test]
fn test_exploration_decays_to_floor() {
    let mut exploration = Exploration::new(1.0, 0.5, 0.2);
    exploration.decay();
    assert_eq!(exploration.epsilon(), 0.5);
    exploration.decay();
    assert_eq!(exploration.epsilon(), 0.25);
    exploration.decay();
    assert_eq!(exploration.epsilon(), 0.2);
    exploration.decay();
    assert_eq!(exploration.epsilon(), 0.2);
}

#[test]
fn test_exploration_start_below_floor_is_clamped() {
    let exploration = Exploration::new(0.01, 0.99, 0.05);
    assert_eq!(exploration.epsilon(), 0.05);
}
