//! Integration Tests für die Trainings-Schleife
//!
//! Simulator und Datenbank sind Mocks, die Hover-Physik läuft lokal
//! und deterministisch (Startgeschwindigkeit fest statt zufällig).

use embassy_futures::block_on;
use esp_core::envs::HoverObservation;
use esp_core::{
    EpisodeStatus, Hover, Hyperparameters, LinkError, RandomSource, Restore, SimulationClient,
    SyncPolicy, Task, Trainer, TrainingStats, WeightStore,
};

// ============================================================================
// Mock Simulator: Hover-Physik
// ============================================================================

const GRAVITY: f32 = -0.5;
const THRUST_POWER: f32 = 1.2;
const MAX_HEIGHT: f32 = 100.0;
const STARTING_HEIGHT: f32 = 50.0;
const SIM_MAX_STEPS: u32 = 500;

pub struct HoverSim {
    position: f32,
    velocity: f32,
    current_step: u32,
    pub resets: u32,
}

impl HoverSim {
    pub fn new() -> Self {
        Self {
            position: STARTING_HEIGHT,
            velocity: 0.0,
            current_step: 0,
            resets: 0,
        }
    }
}

impl SimulationClient<HoverObservation> for HoverSim {
    async fn reset(&mut self) -> Result<HoverObservation, LinkError> {
        self.position = STARTING_HEIGHT;
        self.velocity = 0.0;
        self.current_step = 0;
        self.resets += 1;
        Ok(HoverObservation {
            position: self.position,
            velocity: self.velocity,
            ..Default::default()
        })
    }

    async fn step(&mut self, action: usize) -> Result<HoverObservation, LinkError> {
        if action > 1 {
            return Err(LinkError::Status(400));
        }
        self.current_step += 1;
        if action == 1 {
            self.velocity += THRUST_POWER;
        }
        self.velocity += GRAVITY;
        self.position += self.velocity;

        let done = self.position <= 0.0
            || self.position >= MAX_HEIGHT
            || self.current_step >= SIM_MAX_STEPS;
        Ok(HoverObservation {
            position: self.position,
            velocity: self.velocity,
            reward: if done { -100.0 } else { 1.0 },
            done,
        })
    }
}

// ============================================================================
// Mock Simulator: nie fertig / bricht ab / offline
// ============================================================================

/// Meldet nie `done`, zählt die Schritte
#[derive(Default)]
pub struct EndlessSim {
    pub steps: u32,
}

impl SimulationClient<HoverObservation> for EndlessSim {
    async fn reset(&mut self) -> Result<HoverObservation, LinkError> {
        Ok(HoverObservation::default())
    }

    async fn step(&mut self, _action: usize) -> Result<HoverObservation, LinkError> {
        self.steps += 1;
        Ok(HoverObservation {
            position: 50.0,
            reward: 1.0,
            ..Default::default()
        })
    }
}

/// `/step` schlägt nach `ok_steps` erfolgreichen Schritten fehl
pub struct FlakySim {
    pub ok_steps: u32,
}

impl SimulationClient<HoverObservation> for FlakySim {
    async fn reset(&mut self) -> Result<HoverObservation, LinkError> {
        Ok(HoverObservation::default())
    }

    async fn step(&mut self, _action: usize) -> Result<HoverObservation, LinkError> {
        if self.ok_steps == 0 {
            return Err(LinkError::Unreachable);
        }
        self.ok_steps -= 1;
        Ok(HoverObservation {
            position: 50.0,
            reward: 1.0,
            ..Default::default()
        })
    }
}

pub struct OfflineSim;

impl SimulationClient<HoverObservation> for OfflineSim {
    async fn reset(&mut self) -> Result<HoverObservation, LinkError> {
        Err(LinkError::Unreachable)
    }

    async fn step(&mut self, _action: usize) -> Result<HoverObservation, LinkError> {
        Err(LinkError::Unreachable)
    }
}

// ============================================================================
// Mock Weight Store
// ============================================================================

/// Verhält sich wie die Datenbank: Schreibzugriffe landen in `table`
#[derive(Default)]
pub struct MockStore<const A: usize, const F: usize> {
    pub table: Option<[[f32; F]; A]>,
    pub fail_load: bool,
    pub fail_puts: bool,
    pub loads: usize,
    pub weight_puts: Vec<(usize, usize, f32)>,
    pub table_puts: usize,
}

impl<const A: usize, const F: usize> WeightStore<A, F> for MockStore<A, F> {
    async fn load(&mut self) -> Result<Option<[[f32; F]; A]>, LinkError> {
        self.loads += 1;
        if self.fail_load {
            return Err(LinkError::Unreachable);
        }
        Ok(self.table)
    }

    async fn put_weight(&mut self, action: usize, feature: usize, value: f32) -> Result<(), LinkError> {
        if self.fail_puts {
            return Err(LinkError::Status(401));
        }
        self.weight_puts.push((action, feature, value));
        self.table.get_or_insert([[0.0; F]; A])[action][feature] = value;
        Ok(())
    }

    async fn put_all(&mut self, weights: &[[f32; F]; A]) -> Result<(), LinkError> {
        if self.fail_puts {
            return Err(LinkError::Status(401));
        }
        self.table_puts += 1;
        self.table = Some(*weights);
        Ok(())
    }
}

// ============================================================================
// Mock Random Source
// ============================================================================

/// roll = 0 → exploriert immer, Aktion 0
pub struct ZeroRng;

impl RandomSource for ZeroRng {
    fn next_u32(&mut self) -> u32 {
        0
    }
}

fn hover_params(max_steps: u32, episodes: u32) -> Hyperparameters {
    Hyperparameters {
        max_steps,
        episodes,
        ..Hover::hyperparameters()
    }
}

// ============================================================================
// Tests: Episoden-Verlauf
// ============================================================================

#[test]
fn test_hover_episode_falls_to_ground() {
    let mut trainer = Trainer::<Hover, 2, 3>::new(SyncPolicy::PerChange);
    let mut sim = HoverSim::new();
    let mut store = MockStore::<2, 3>::default();

    let outcome = block_on(trainer.run_episode(&mut sim, &mut store, &mut ZeroRng));

    // Ohne Schub: Position 50 - 0.25·k·(k+1), Boden nach 14 Schritten
    assert_eq!(outcome.status, EpisodeStatus::Completed);
    assert_eq!(outcome.steps, 14);
    assert_eq!(outcome.total_reward, 13.0 - 100.0);
    assert_eq!(outcome.episode, 1);
    assert_eq!(outcome.epsilon, 1.0);
    assert_eq!(outcome.failed_syncs, 0);
    assert_eq!(sim.resets, 1);
}

#[test]
fn test_per_change_sync_mirrors_local_table() {
    let mut trainer = Trainer::<Hover, 2, 3>::new(SyncPolicy::PerChange);
    let mut store = MockStore::<2, 3>::default();

    block_on(trainer.run_episode(&mut HoverSim::new(), &mut store, &mut ZeroRng));

    assert!(!store.weight_puts.is_empty());
    assert_eq!(store.table_puts, 0);
    // Nur Aktion 0 wurde gespielt
    assert!(store.weight_puts.iter().all(|&(action, _, _)| action == 0));
    assert_eq!(store.table, Some(*trainer.q().weights()));
}

#[test]
fn test_per_episode_sync_writes_table_once() {
    let mut trainer = Trainer::<Hover, 2, 3>::new(SyncPolicy::PerEpisode);
    let mut store = MockStore::<2, 3>::default();

    block_on(trainer.run_episode(&mut HoverSim::new(), &mut store, &mut ZeroRng));

    assert!(store.weight_puts.is_empty());
    assert_eq!(store.table_puts, 1);
    assert_eq!(store.table, Some(*trainer.q().weights()));
}

#[test]
fn test_episode_times_out_after_step_limit() {
    let mut trainer =
        Trainer::<Hover, 2, 3>::with_hyperparameters(hover_params(800, 10), SyncPolicy::PerEpisode);
    let mut sim = EndlessSim::default();
    let mut store = MockStore::<2, 3>::default();

    let outcome = block_on(trainer.run_episode(&mut sim, &mut store, &mut ZeroRng));

    assert_eq!(outcome.status, EpisodeStatus::TimedOut);
    assert_eq!(outcome.steps, 801);
    assert_eq!(sim.steps, 801);
    assert_eq!(outcome.total_reward, 801.0);
}

#[test]
fn test_step_failure_aborts_episode() {
    let mut trainer = Trainer::<Hover, 2, 3>::new(SyncPolicy::PerEpisode);
    let mut store = MockStore::<2, 3>::default();

    let outcome =
        block_on(trainer.run_episode(&mut FlakySim { ok_steps: 3 }, &mut store, &mut ZeroRng));

    assert_eq!(outcome.status, EpisodeStatus::Aborted);
    assert_eq!(outcome.steps, 3);
    // Die drei gelernten Schritte werden trotzdem gesichert
    assert_eq!(store.table_puts, 1);
}

#[test]
fn test_reset_failure_skips_without_sync() {
    let mut trainer = Trainer::<Hover, 2, 3>::new(SyncPolicy::PerEpisode);
    let mut store = MockStore::<2, 3>::default();

    let outcome = block_on(trainer.run_episode(&mut OfflineSim, &mut store, &mut ZeroRng));

    assert_eq!(outcome.status, EpisodeStatus::Skipped);
    assert_eq!(store.table_puts, 0);
    assert_eq!(trainer.episodes_run(), 1);
}

#[test]
fn test_failed_puts_are_counted() {
    let mut trainer = Trainer::<Hover, 2, 3>::new(SyncPolicy::PerChange);
    let mut store = MockStore::<2, 3> {
        fail_puts: true,
        ..Default::default()
    };

    let outcome = block_on(trainer.run_episode(&mut HoverSim::new(), &mut store, &mut ZeroRng));

    assert_eq!(outcome.status, EpisodeStatus::Completed);
    assert!(outcome.failed_syncs > 0);
    assert!(store.weight_puts.is_empty());
    assert_eq!(store.table, None);
}

// ============================================================================
// Tests: Gewichte laden
// ============================================================================

#[test]
fn test_restore_loads_stored_table() {
    let stored = [[0.5, -0.25, 1.0], [0.0, 2.0, -1.0]];
    let mut trainer = Trainer::<Hover, 2, 3>::new(SyncPolicy::PerChange);
    let mut store = MockStore::<2, 3> {
        table: Some(stored),
        ..Default::default()
    };

    assert_eq!(block_on(trainer.restore(&mut store)), Restore::Loaded);
    assert_eq!(trainer.q().weights(), &stored);
}

#[test]
fn test_restore_unreachable_store_initializes() {
    let mut trainer = Trainer::<Hover, 2, 3>::new(SyncPolicy::PerChange);
    let mut store = MockStore::<2, 3> {
        fail_load: true,
        ..Default::default()
    };

    assert_eq!(block_on(trainer.restore(&mut store)), Restore::Initialized);
    assert_eq!(trainer.q().weights(), &[[0.0; 3]; 2]);
}

#[test]
fn test_episode_start_refreshes_weights() {
    let stored = [[1.0, 1.0, 1.0], [2.0, 2.0, 2.0]];
    let mut trainer = Trainer::<Hover, 2, 3>::new(SyncPolicy::PerChange);
    let mut store = MockStore::<2, 3> {
        table: Some(stored),
        ..Default::default()
    };

    block_on(trainer.run_episode(&mut OfflineSim, &mut store, &mut ZeroRng));

    assert_eq!(store.loads, 1);
    assert_eq!(trainer.q().weights(), &stored);
}

#[test]
fn test_refresh_failure_keeps_local_weights() {
    let stored = [[0.5, 0.5, 0.5], [0.0, 0.0, 0.0]];
    let mut trainer = Trainer::<Hover, 2, 3>::new(SyncPolicy::PerChange);
    let mut store = MockStore::<2, 3> {
        table: Some(stored),
        ..Default::default()
    };
    block_on(trainer.restore(&mut store));

    store.fail_load = true;
    block_on(trainer.run_episode(&mut OfflineSim, &mut store, &mut ZeroRng));

    assert_eq!(trainer.q().weights(), &stored);
}

// ============================================================================
// Tests: Epsilon und Episoden-Zähler
// ============================================================================

#[test]
fn test_epsilon_decays_per_episode() {
    let mut trainer =
        Trainer::<Hover, 2, 3>::with_hyperparameters(hover_params(500, 2), SyncPolicy::PerChange);
    let mut store = MockStore::<2, 3>::default();

    let first = block_on(trainer.run_episode(&mut OfflineSim, &mut store, &mut ZeroRng));
    let second = block_on(trainer.run_episode(&mut OfflineSim, &mut store, &mut ZeroRng));

    assert_eq!(first.epsilon, 1.0);
    assert_eq!(second.epsilon, 0.995);
    assert_eq!(second.episode, 2);
    assert!(trainer.is_finished());
}

#[test]
fn test_training_stats_from_outcome() {
    let mut trainer = Trainer::<Hover, 2, 3>::new(SyncPolicy::PerChange);
    let mut store = MockStore::<2, 3>::default();
    let outcome = block_on(trainer.run_episode(&mut HoverSim::new(), &mut store, &mut ZeroRng));

    let stats = TrainingStats::from_outcome(Hover::NAME, &outcome);
    assert_eq!(stats.task, "hover");
    assert_eq!(stats.steps, outcome.steps);
    assert_eq!(stats.status, EpisodeStatus::Completed);
}
