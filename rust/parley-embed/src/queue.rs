//! Commands issued by the host page, and the queue that holds them until
//! the embedded widget is ready.

use std::collections::VecDeque;

use crate::Outbound;

/// An imperative request from the host page
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Expand the widget
    Open,
    /// Collapse the widget
    Close,
    /// Flip between expanded and collapsed
    Toggle,
    /// Send a chat message on the visitor's behalf
    SendMessage(String),
}

impl Command {
    /// The host API method that produced this command
    pub fn name(&self) -> &'static str {
        match self {
            Command::Open => "open",
            Command::Close => "close",
            Command::Toggle => "toggle",
            Command::SendMessage(_) => "sendMessage",
        }
    }
}

impl From<Command> for Outbound {
    fn from(value: Command) -> Self {
        match value {
            Command::Open => Outbound::Open,
            Command::Close => Outbound::Close,
            Command::Toggle => Outbound::Toggle,
            Command::SendMessage(text) => Outbound::Message { text },
        }
    }
}

/// FIFO buffer of commands issued before the widget reported ready
///
/// Every queued command is handed out exactly once, either by
/// [`CommandQueue::drain`] or not at all when [`CommandQueue::clear`] drops
/// it.
#[derive(Debug, Default)]
pub struct CommandQueue {
    pending: VecDeque<Command>,
}

impl CommandQueue {
    /// Append a command to the tail of the queue
    pub fn push(&mut self, command: Command) {
        self.pending.push_back(command);
    }

    /// Take every queued command, head first, leaving the queue empty
    pub fn drain(&mut self) -> impl Iterator<Item = Command> + use<> {
        std::mem::take(&mut self.pending).into_iter()
    }

    /// Drop every queued command without running it. Returns how many were
    /// dropped.
    pub fn clear(&mut self) -> usize {
        let dropped = self.pending.len();
        self.pending.clear();
        dropped
    }

    /// The number of queued commands
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether nothing is queued
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// The queued commands, head first
    pub fn iter(&self) -> impl Iterator<Item = &Command> {
        self.pending.iter()
    }
}
