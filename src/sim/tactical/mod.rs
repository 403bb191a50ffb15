//! Tactical intent layer: behavior tree, transfer buffers and the worker thread

pub mod buffer;
pub mod tree;
pub mod worker;

pub use buffer::{IntentEntry, IntentResponse, SnapshotEntry, TacticalSnapshot};
pub use tree::{opfor_brain, Node, Status};
pub use worker::{BehaviorTreeEvaluator, IntentEvaluator, IntentScheduler, IntentWorker, WorkerError};
