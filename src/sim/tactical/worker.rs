//! Tactical intent worker
//!
//! Runs the behavior tree on its own thread. The simulation hands over an
//! owned [`TacticalSnapshot`] through a bounded channel and later picks up an
//! owned [`IntentResponse`] without ever blocking the tick.

use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError, TrySendError};
use rayon::prelude::*;
use tracing::{debug, info};

use crate::sim::constants::tactical::EVALUATION_INTERVAL_MS;
use crate::sim::tactical::buffer::{IntentEntry, IntentResponse, TacticalSnapshot};
use crate::sim::tactical::tree::{opfor_brain, Node, TacticalState};

/// Turns a snapshot into per-hostile desired vectors
pub trait IntentEvaluator: Send + 'static {
    fn evaluate(&self, snapshot: TacticalSnapshot) -> IntentResponse;
}

/// Evaluates the opfor behavior tree for every hostile in the snapshot
#[derive(Debug, Clone)]
pub struct BehaviorTreeEvaluator {
    brain: Node,
}

impl BehaviorTreeEvaluator {
    pub fn new(brain: Node) -> Self {
        Self { brain }
    }
}

impl Default for BehaviorTreeEvaluator {
    fn default() -> Self {
        Self::new(opfor_brain())
    }
}

impl IntentEvaluator for BehaviorTreeEvaluator {
    fn evaluate(&self, snapshot: TacticalSnapshot) -> IntentResponse {
        let generation = snapshot.generation();
        let (mut hostiles, state) = TacticalState::parse(&snapshot);
        drop(snapshot);

        hostiles.par_iter_mut().for_each(|hostile| {
            self.brain.evaluate(hostile, &state);
        });

        IntentResponse::from_entries(
            generation,
            hostiles.into_iter().map(|h| IntentEntry {
                id: h.id,
                desired: h.desired,
            }),
        )
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum WorkerError {
    #[error("Failed to spawn intent worker thread: {0}")]
    Spawn(String),
    #[error("Intent worker is still evaluating the previous snapshot")]
    Busy,
    #[error("Intent worker disconnected")]
    Disconnected,
}

/// Handle to the worker thread
///
/// Dropping the handle closes the request channel and joins the thread.
pub struct IntentWorker {
    request_tx: Option<Sender<TacticalSnapshot>>,
    response_rx: Receiver<IntentResponse>,
    handle: Option<JoinHandle<()>>,
}

impl IntentWorker {
    /// Spawn the worker running the default behavior tree
    pub fn spawn() -> Result<Self, WorkerError> {
        Self::with_evaluator(BehaviorTreeEvaluator::default())
    }

    pub fn with_evaluator<E: IntentEvaluator>(evaluator: E) -> Result<Self, WorkerError> {
        // One request in flight, one response waiting
        let (request_tx, request_rx) = bounded::<TacticalSnapshot>(1);
        let (response_tx, response_rx) = bounded::<IntentResponse>(1);

        let handle = std::thread::Builder::new()
            .name("tactical-intent".to_string())
            .spawn(move || {
                for snapshot in request_rx.iter() {
                    let generation = snapshot.generation();
                    let agents = snapshot.len();
                    let response = evaluator.evaluate(snapshot);
                    debug!(
                        "Evaluated generation {} snapshot: {} agents -> {} intents",
                        generation,
                        agents,
                        response.len()
                    );
                    if response_tx.send(response).is_err() {
                        break;
                    }
                }
                info!("Tactical intent worker stopped");
            })
            .map_err(|e| WorkerError::Spawn(e.to_string()))?;

        Ok(Self {
            request_tx: Some(request_tx),
            response_rx,
            handle: Some(handle),
        })
    }

    /// Hand a snapshot to the worker (non-blocking)
    pub fn try_submit(&self, snapshot: TacticalSnapshot) -> Result<(), WorkerError> {
        let sender = self.request_tx.as_ref().ok_or(WorkerError::Disconnected)?;
        sender.try_send(snapshot).map_err(|e| match e {
            TrySendError::Full(_) => WorkerError::Busy,
            TrySendError::Disconnected(_) => WorkerError::Disconnected,
        })
    }

    /// Take a finished response if one is waiting (non-blocking)
    pub fn try_recv(&self) -> Result<Option<IntentResponse>, WorkerError> {
        match self.response_rx.try_recv() {
            Ok(response) => Ok(Some(response)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(WorkerError::Disconnected),
        }
    }

    /// Wait up to `timeout` for a response
    pub fn recv_timeout(&self, timeout: Duration) -> Option<IntentResponse> {
        self.response_rx.recv_timeout(timeout).ok()
    }
}

impl Drop for IntentWorker {
    fn drop(&mut self) {
        self.request_tx.take();
        // Disconnect responses so a worker blocked on send exits instead of waiting
        drop(std::mem::replace(&mut self.response_rx, crossbeam_channel::never()));
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Fixed wall-time cadence for worker dispatches, independent of sim dt
#[derive(Debug, Clone)]
pub struct IntentScheduler {
    interval: Duration,
    elapsed: Duration,
}

impl IntentScheduler {
    /// The first poll is due immediately
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            elapsed: interval,
        }
    }

    /// Advance by the wall time since the last poll; true when a dispatch is due
    pub fn poll(&mut self, wall_dt: Duration) -> bool {
        self.elapsed += wall_dt;
        if self.elapsed >= self.interval {
            self.elapsed = Duration::ZERO;
            true
        } else {
            false
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Default for IntentScheduler {
    fn default() -> Self {
        Self::new(Duration::from_millis(EVALUATION_INTERVAL_MS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::agent::AgentId;
    use crate::util::vec2::Vec2;

    const WAIT: Duration = Duration::from_secs(5);

    /// Echoes every hostile back with a fixed vector
    struct FixedEvaluator(Vec2);

    impl IntentEvaluator for FixedEvaluator {
        fn evaluate(&self, snapshot: TacticalSnapshot) -> IntentResponse {
            let (hostiles, _) = TacticalState::parse(&snapshot);
            IntentResponse::from_entries(
                snapshot.generation(),
                hostiles.into_iter().map(|h| IntentEntry {
                    id: h.id,
                    desired: self.0,
                }),
            )
        }
    }

    /// Panics on the first snapshot
    struct CrashingEvaluator;

    impl IntentEvaluator for CrashingEvaluator {
        fn evaluate(&self, _snapshot: TacticalSnapshot) -> IntentResponse {
            panic!("evaluator crashed");
        }
    }

    fn two_hostiles_one_friendly(generation: u64) -> TacticalSnapshot {
        TacticalSnapshot::from_raw(
            generation,
            vec![
                0.0, 0.0, 0.0, 1.0, 1.0, //
                100.0, 0.0, 0.0, 2.0, 1.0, //
                5.0, 0.0, 0.0, 3.0, 0.0,
            ],
        )
    }

    #[test]
    fn test_behavior_tree_evaluator_answers_every_hostile() {
        let response = BehaviorTreeEvaluator::default().evaluate(two_hostiles_one_friendly(4));
        assert_eq!(response.generation(), 4);
        assert_eq!(response.len(), 2);

        let entries: Vec<_> = response.entries().collect();
        // Hostile 1 is 5 units from the friendly: evades toward -X
        assert_eq!(entries[0].id, AgentId(1));
        assert!(entries[0].desired.x < 0.0);
        // Hostile 2 is 95 units from the centroid: approaches toward -X
        assert_eq!(entries[1].id, AgentId(2));
        assert!(entries[1].desired.approx_eq(Vec2::new(-1.0, 0.0), 1e-5));
    }

    #[test]
    fn test_worker_round_trip() {
        let worker = IntentWorker::with_evaluator(FixedEvaluator(Vec2::new(0.0, 1.0))).unwrap();
        worker.try_submit(two_hostiles_one_friendly(9)).unwrap();

        let response = worker.recv_timeout(WAIT).expect("worker should answer");
        assert_eq!(response.generation(), 9);
        assert_eq!(response.len(), 2);
        assert!(response.entries().all(|e| e.desired == Vec2::new(0.0, 1.0)));
    }

    #[test]
    fn test_try_recv_empty_is_not_an_error() {
        let worker = IntentWorker::spawn().unwrap();
        assert!(matches!(worker.try_recv(), Ok(None)));
    }

    #[test]
    fn test_crashed_worker_reports_disconnected() {
        let worker = IntentWorker::with_evaluator(CrashingEvaluator).unwrap();
        worker.try_submit(two_hostiles_one_friendly(0)).unwrap();

        let mut result = worker.try_recv();
        for _ in 0..500 {
            if matches!(result, Err(WorkerError::Disconnected)) {
                break;
            }
            std::thread::sleep(Duration::from_millis(10));
            result = worker.try_recv();
        }
        assert!(matches!(result, Err(WorkerError::Disconnected)));
    }

    #[test]
    fn test_drop_joins_worker() {
        let worker = IntentWorker::spawn().unwrap();
        worker.try_submit(two_hostiles_one_friendly(1)).unwrap();
        drop(worker);
    }

    #[test]
    fn test_scheduler_cadence() {
        let mut scheduler = IntentScheduler::new(Duration::from_millis(500));
        assert!(scheduler.poll(Duration::ZERO), "first poll is due");
        assert!(!scheduler.poll(Duration::from_millis(200)));
        assert!(!scheduler.poll(Duration::from_millis(200)));
        assert!(scheduler.poll(Duration::from_millis(200)));
        assert!(!scheduler.poll(Duration::from_millis(100)));
    }

    #[test]
    fn test_scheduler_default_interval() {
        assert_eq!(IntentScheduler::default().interval(), Duration::from_millis(500));
    }
}
