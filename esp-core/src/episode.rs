//! Trainings-Schleife
//!
//! Pure Business Logic ohne Hardware-Abhängigkeit: Simulator, Gewichts-
//! Speicher und Zufallsquelle kommen über Traits herein, damit die
//! komplette Episode auf dem Host getestet werden kann.

use core::marker::PhantomData;

#[cfg(feature = "serde")]
use serde::Serialize;

use crate::envs::Task;
use crate::qlearn::{Exploration, Hyperparameters, LinearQ};
use crate::traits::{RandomSource, SimulationClient, WeightStore};

/// Wann geänderte Gewichte in die Datenbank geschrieben werden
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPolicy {
    /// Jedes geänderte Gewicht sofort nach dem Schritt (ein PUT pro Gewicht)
    PerChange,
    /// Komplette Tabelle einmal am Ende der Episode
    PerEpisode,
}

/// Wie eine Episode geendet hat
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EpisodeStatus {
    /// Simulator hat `done` gemeldet
    Completed,
    /// Schritt-Limit überschritten
    TimedOut,
    /// `/step` fehlgeschlagen, Episode abgebrochen
    Aborted,
    /// `/reset` fehlgeschlagen, Episode übersprungen
    Skipped,
}

/// Ergebnis einer Episode
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpisodeOutcome {
    /// Laufende Nummer, beginnt bei 1
    pub episode: u32,
    pub steps: u32,
    pub total_reward: f32,
    /// Epsilon, mit dem die Episode gespielt wurde
    pub epsilon: f32,
    pub status: EpisodeStatus,
    /// Anzahl fehlgeschlagener Schreibzugriffe auf den Speicher
    pub failed_syncs: u32,
}

/// Ergebnis von [`Trainer::restore`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Restore {
    /// Tabelle aus dem Speicher übernommen
    Loaded,
    /// Speicher leer oder nicht erreichbar, Start mit Nullen
    Initialized,
}

/// Q-Learning Agent für eine konkrete Task
pub struct Trainer<T: Task<A, F>, const A: usize, const F: usize> {
    q: LinearQ<A, F>,
    exploration: Exploration,
    params: Hyperparameters,
    sync: SyncPolicy,
    episode: u32,
    _task: PhantomData<T>,
}

impl<T: Task<A, F>, const A: usize, const F: usize> Trainer<T, A, F> {
    /// Erstellt einen Trainer mit den Standard-Parametern der Task
    pub fn new(sync: SyncPolicy) -> Self {
        Self::with_hyperparameters(T::hyperparameters(), sync)
    }

    pub fn with_hyperparameters(params: Hyperparameters, sync: SyncPolicy) -> Self {
        Self {
            q: LinearQ::zeroed(),
            exploration: params.exploration(),
            params,
            sync,
            episode: 0,
            _task: PhantomData,
        }
    }

    pub fn q(&self) -> &LinearQ<A, F> {
        &self.q
    }

    pub fn epsilon(&self) -> f32 {
        self.exploration.epsilon()
    }

    /// Anzahl bereits gespielter Episoden
    pub fn episodes_run(&self) -> u32 {
        self.episode
    }

    pub fn hyperparameters(&self) -> &Hyperparameters {
        &self.params
    }

    pub fn is_finished(&self) -> bool {
        self.episode >= self.params.episodes
    }

    /// Lädt die Gewichte beim Start
    ///
    /// Ist die Datenbank leer oder nicht erreichbar, wird mit Nullen begonnen.
    pub async fn restore<W: WeightStore<A, F>>(&mut self, store: &mut W) -> Restore {
        match store.load().await {
            Ok(Some(weights)) => {
                self.q.replace(weights);
                Restore::Loaded
            }
            Ok(None) | Err(_) => {
                self.q.reset();
                Restore::Initialized
            }
        }
    }

    /// Spielt eine komplette Episode
    ///
    /// 1. Gewichte aus dem Speicher auffrischen (bei Fehler lokal weiter)
    /// 2. Simulator zurücksetzen (bei Fehler wird die Episode übersprungen)
    /// 3. Schritte bis `done`, Abbruch oder Schritt-Limit
    /// 4. Epsilon abklingen lassen
    pub async fn run_episode<S, W, R>(
        &mut self,
        sim: &mut S,
        store: &mut W,
        rng: &mut R,
    ) -> EpisodeOutcome
    where
        S: SimulationClient<T::Observation>,
        W: WeightStore<A, F>,
        R: RandomSource,
    {
        if let Ok(Some(weights)) = store.load().await {
            self.q.replace(weights);
        }

        let epsilon = self.exploration.epsilon();
        let mut observation = match sim.reset().await {
            Ok(observation) => observation,
            Err(_) => return self.finish(epsilon, 0, 0.0, EpisodeStatus::Skipped, 0),
        };

        let mut steps = 0u32;
        let mut total_reward = 0.0f32;
        let mut failed_syncs = 0u32;

        let status = loop {
            let features = T::features(&observation);
            let action = self.q.choose_action(&features, epsilon, rng);

            let next = match sim.step(action).await {
                Ok(next) => next,
                Err(_) => break EpisodeStatus::Aborted,
            };
            let reward = T::reward(&next);
            let done = T::is_done(&next);
            total_reward += reward;

            let next_features = T::features(&next);
            let td_error = self.q.td_error(
                &features,
                action,
                reward,
                (!done).then_some(&next_features),
                self.params.gamma,
            );
            let changes = self
                .q
                .apply_td(&features, action, td_error, self.params.alpha);

            if self.sync == SyncPolicy::PerChange {
                for change in changes {
                    if store
                        .put_weight(change.action, change.feature, change.value)
                        .await
                        .is_err()
                    {
                        failed_syncs += 1;
                    }
                }
            }

            steps += 1;
            if done {
                break EpisodeStatus::Completed;
            }
            if steps > self.params.max_steps {
                break EpisodeStatus::TimedOut;
            }
            observation = next;
        };

        if self.sync == SyncPolicy::PerEpisode
            && steps > 0
            && store.put_all(self.q.weights()).await.is_err()
        {
            failed_syncs += 1;
        }

        self.finish(epsilon, steps, total_reward, status, failed_syncs)
    }

    fn finish(
        &mut self,
        epsilon: f32,
        steps: u32,
        total_reward: f32,
        status: EpisodeStatus,
        failed_syncs: u32,
    ) -> EpisodeOutcome {
        self.exploration.decay();
        self.episode += 1;
        EpisodeOutcome {
            episode: self.episode,
            steps,
            total_reward,
            epsilon,
            status,
            failed_syncs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envs::{Hover, HoverObservation};
    use crate::traits::LinkError;
    use embassy_futures::block_on;

    struct OfflineSim;

    impl SimulationClient<HoverObservation> for OfflineSim {
        async fn reset(&mut self) -> Result<HoverObservation, LinkError> {
            Err(LinkError::Unreachable)
        }

        async fn step(&mut self, _action: usize) -> Result<HoverObservation, LinkError> {
            Err(LinkError::Unreachable)
        }
    }

    struct EmptyStore;

    impl WeightStore<2, 3> for EmptyStore {
        async fn load(&mut self) -> Result<Option<[[f32; 3]; 2]>, LinkError> {
            Ok(None)
        }

        async fn put_weight(&mut self, _: usize, _: usize, _: f32) -> Result<(), LinkError> {
            Ok(())
        }

        async fn put_all(&mut self, _: &[[f32; 3]; 2]) -> Result<(), LinkError> {
            Ok(())
        }
    }

    struct ZeroRng;

    impl RandomSource for ZeroRng {
        fn next_u32(&mut self) -> u32 {
            0
        }
    }

    #[test]
    fn test_restore_empty_store_initializes() {
        let mut trainer = Trainer::<Hover, 2, 3>::new(SyncPolicy::PerChange);
        let restore = block_on(trainer.restore(&mut EmptyStore));
        assert_eq!(restore, Restore::Initialized);
        assert_eq!(trainer.q().weights(), &[[0.0; 3]; 2]);
    }

    #[test]
    fn test_skipped_episode_still_decays_epsilon() {
        let mut trainer = Trainer::<Hover, 2, 3>::new(SyncPolicy::PerChange);
        let before = trainer.epsilon();
        let outcome = block_on(trainer.run_episode(&mut OfflineSim, &mut EmptyStore, &mut ZeroRng));
        assert_eq!(outcome.status, EpisodeStatus::Skipped);
        assert_eq!(outcome.steps, 0);
        assert_eq!(outcome.episode, 1);
        assert_eq!(outcome.epsilon, before);
        assert!(trainer.epsilon() < before);
    }
}
