//! Command channel from the UI layer into the simulation
//!
//! Any number of senders push commands without blocking; the simulation
//! drains everything pending at the start of each tick.

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};

use crate::sim::agent::AgentId;
use crate::sim::clock::MotionState;
use crate::sim::scenario::ScenarioProfile;

/// Default capacity, far above what an operator can issue between ticks
const DEFAULT_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq)]
pub enum SimCommand {
    /// Replace the agent set with a freshly generated profile
    Reset(ScenarioProfile),
    Pause,
    Resume,
    /// Flag one agent for visual emphasis, or clear the selection
    Select(Option<AgentId>),
    SetMotion(MotionState),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("Command buffer is full")]
    Full,
    #[error("Simulation has stopped")]
    Disconnected,
}

pub struct CommandBuffer {
    sender: Sender<SimCommand>,
    receiver: Receiver<SimCommand>,
    capacity: usize,
}

impl CommandBuffer {
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        Self {
            sender,
            receiver,
            capacity,
        }
    }

    /// New sender handle for a UI-side producer
    pub fn sender(&self) -> CommandSender {
        CommandSender {
            sender: self.sender.clone(),
        }
    }

    /// Everything queued since the last drain, in submission order
    pub fn drain(&self) -> Vec<SimCommand> {
        self.receiver.try_iter().collect()
    }

    #[inline]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for CommandBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// Clonable producer handle
#[derive(Clone)]
pub struct CommandSender {
    sender: Sender<SimCommand>,
}

impl CommandSender {
    #[inline]
    pub fn try_send(&self, command: SimCommand) -> Result<(), CommandError> {
        self.sender.try_send(command).map_err(|e| match e {
            TrySendError::Full(_) => CommandError::Full,
            TrySendError::Disconnected(_) => CommandError::Disconnected,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_preserves_order() {
        let buffer = CommandBuffer::new(8);
        let sender = buffer.sender();

        sender.try_send(SimCommand::Pause).unwrap();
        sender.try_send(SimCommand::Select(Some(AgentId(4)))).unwrap();
        sender.try_send(SimCommand::Resume).unwrap();
        assert_eq!(buffer.pending_count(), 3);

        let commands = buffer.drain();
        assert_eq!(
            commands,
            vec![SimCommand::Pause, SimCommand::Select(Some(AgentId(4))), SimCommand::Resume]
        );
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_backpressure() {
        let buffer = CommandBuffer::new(2);
        let sender = buffer.sender();

        assert!(sender.try_send(SimCommand::Pause).is_ok());
        assert!(sender.try_send(SimCommand::Resume).is_ok());
        assert_eq!(sender.try_send(SimCommand::Pause), Err(CommandError::Full));

        buffer.drain();
        assert!(sender.try_send(SimCommand::Reset(ScenarioProfile::Clear)).is_ok());
    }

    #[test]
    fn test_disconnected_after_buffer_dropped() {
        let buffer = CommandBuffer::new(2);
        let sender = buffer.sender();
        drop(buffer);
        assert_eq!(sender.try_send(SimCommand::Pause), Err(CommandError::Disconnected));
    }

    #[test]
    fn test_cloned_senders_share_queue() {
        let buffer = CommandBuffer::default();
        let a = buffer.sender();
        let b = a.clone();
        a.try_send(SimCommand::SetMotion(MotionState::new(true, false))).unwrap();
        b.try_send(SimCommand::Reset(ScenarioProfile::Skirmish)).unwrap();
        assert_eq!(buffer.drain().len(), 2);
        assert_eq!(buffer.capacity(), DEFAULT_CAPACITY);
    }
}
