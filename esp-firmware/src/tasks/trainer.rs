// Trainer Task - Q-Learning gegen den Simulations-Server
use defmt::{info, warn};
use embassy_net::Stack;
use embassy_time::{Duration, Timer};
use esp_core::{EpisodeStatus, Restore, Task, Telemetry, Trainer, TrainingStats};

use super::wifi::wait_for_network;
use crate::TelemetryPublisher;
use crate::config::*;
use crate::hal::HardwareRng;
use crate::net::{FirebaseStore, HttpSimulator, SharedRestClient};

type Observation = <ActiveTask as Task<ACTIONS, FEATURES>>::Observation;

const TASK_NAME: &str = <ActiveTask as Task<ACTIONS, FEATURES>>::NAME;

/// Trainer Task
///
/// - Lädt die Gewichte aus Firebase (leer → Start mit Nullen)
/// - Spielt Episoden bis die Episoden-Anzahl erreicht ist
/// - Published nach jeder Episode die Statistik als Telemetrie
///
/// Ist der Simulator nicht erreichbar, wird die Episode übersprungen und
/// nach einer Pause erneut versucht.
#[embassy_executor::task]
pub async fn trainer_task(
    stack: &'static Stack<'static>,
    rest: &'static SharedRestClient,
    publisher: TelemetryPublisher,
) {
    info!("RL: Task started ({}), waiting for network...", TASK_NAME);
    wait_for_network(stack).await;

    let mut sim = HttpSimulator::<Observation>::new(rest, SIM_SERVER_URL);
    let mut store =
        FirebaseStore::<ActiveTask, ACTIONS, FEATURES>::new(rest, FIREBASE_HOST, FIREBASE_SECRET);
    let mut rng = HardwareRng::new();
    let mut trainer = Trainer::<ActiveTask, ACTIONS, FEATURES>::new(SYNC_POLICY);

    match trainer.restore(&mut store).await {
        Restore::Loaded => info!("RL: Weights loaded from Firebase"),
        Restore::Initialized => warn!("RL: No stored weights, starting from zero"),
    }

    let episodes = trainer.hyperparameters().episodes;
    while !trainer.is_finished() {
        let outcome = trainer.run_episode(&mut sim, &mut store, &mut rng).await;

        match outcome.status {
            EpisodeStatus::Skipped => {
                warn!(
                    "RL: Episode {} skipped, simulator unreachable at {}",
                    outcome.episode, SIM_SERVER_URL
                );
            }
            status => {
                info!(
                    "RL: Episode {}/{} {} after {} steps, reward {}, epsilon {}",
                    outcome.episode,
                    episodes,
                    status,
                    outcome.steps,
                    outcome.total_reward,
                    outcome.epsilon
                );
                if outcome.failed_syncs > 0 {
                    warn!("RL: {} weight updates not synced", outcome.failed_syncs);
                }
            }
        }

        publisher.publish_immediate(Telemetry::Training(TrainingStats::from_outcome(
            TASK_NAME, &outcome,
        )));

        let pause = if outcome.status == EpisodeStatus::Skipped {
            Duration::from_secs(SIM_RETRY_DELAY_SECS)
        } else {
            Duration::from_millis(EPISODE_PAUSE_MS)
        };
        Timer::after(pause).await;
    }

    info!("RL: Training finished after {} episodes", trainer.episodes_run());
}
