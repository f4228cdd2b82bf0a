//! Routed messages

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::connector::NodeId;
use crate::{NetworkError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Command,
    Telemetry,
    Payload,
    Ack,
    Fail,
}

impl MessageKind {
    /// Acknowledgements and failure reports are never acknowledged themselves.
    pub fn expects_ack(self) -> bool {
        !matches!(self, MessageKind::Ack | MessageKind::Fail)
    }
}

/// A message carries its complete path, fixed when it is originated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    id: Uuid,
    kind: MessageKind,
    path: Vec<NodeId>,
    in_reply_to: Option<Uuid>,
}

impl Message {
    pub fn new(kind: MessageKind, path: Vec<NodeId>) -> Result<Self> {
        if path.is_empty() {
            return Err(NetworkError::EmptyPath);
        }
        Ok(Self {
            id: Uuid::new_v4(),
            kind,
            path,
            in_reply_to: None,
        })
    }

    /// A message answering `self` along `path`.
    pub fn reply(&self, kind: MessageKind, path: Vec<NodeId>) -> Result<Self> {
        let mut reply = Self::new(kind, path)?;
        reply.in_reply_to = Some(self.id);
        Ok(reply)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    pub fn path(&self) -> &[NodeId] {
        &self.path
    }

    pub fn in_reply_to(&self) -> Option<Uuid> {
        self.in_reply_to
    }

    pub fn origin(&self) -> NodeId {
        self.path[0]
    }

    pub fn destination(&self) -> NodeId {
        self.path[self.path.len() - 1]
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.path.contains(&node)
    }

    fn position(&self, node: NodeId) -> Option<usize> {
        self.path.iter().position(|n| *n == node)
    }

    /// The hop after `node`, if `node` is on the path and not its last entry.
    pub fn next_after(&self, node: NodeId) -> Option<NodeId> {
        self.path.get(self.position(node)? + 1).copied()
    }

    pub fn previous_before(&self, node: NodeId) -> Option<NodeId> {
        let index = self.position(node)?;
        index.checked_sub(1).map(|i| self.path[i])
    }
}
