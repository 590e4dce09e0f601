//! Consumer-group lifecycle.
//!
//! The poll loop is the only writer: it folds every [`GroupEvent`] into the
//! current [`GroupState`] and publishes the result on a `watch` channel.

use tokio::sync::watch;

/// Membership generation, bumped on every fresh assignment.
pub type Generation = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupState {
    /// Subscribed, waiting for the first assignment.
    Joining,
    /// Partitions assigned, nothing received yet in this generation.
    Assigned { generation: Generation },
    /// Messages are flowing for this generation.
    Consuming { generation: Generation },
    /// Partitions revoked (or the rebalance failed); waiting for reassignment.
    Rebalancing { generation: Generation },
    /// Membership closed. Terminal.
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupEvent {
    Assigned { partitions: usize },
    Revoked { partitions: usize },
    RebalanceFailed(String),
    MessageReceived,
    Shutdown,
}

impl GroupState {
    pub fn apply(self, event: &GroupEvent) -> Self {
        use GroupEvent as E;
        use GroupState as S;

        match (self, event) {
            (S::Closed, _) | (_, E::Shutdown) => S::Closed,

            (S::Joining, E::Assigned { .. }) => S::Assigned { generation: 1 },
            (S::Assigned { generation }, E::Assigned { .. })
            | (S::Consuming { generation }, E::Assigned { .. })
            | (S::Rebalancing { generation }, E::Assigned { .. }) => S::Assigned {
                generation: generation + 1,
            },

            (S::Assigned { generation }, E::MessageReceived) => S::Consuming { generation },

            (S::Assigned { generation }, E::Revoked { .. } | E::RebalanceFailed(_))
            | (S::Consuming { generation }, E::Revoked { .. } | E::RebalanceFailed(_)) => {
                S::Rebalancing { generation }
            }

            (state, _) => state,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Assigned { .. } | Self::Consuming { .. })
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }

    pub fn generation(&self) -> Option<Generation> {
        match self {
            Self::Assigned { generation }
            | Self::Consuming { generation }
            | Self::Rebalancing { generation } => Some(*generation),
            Self::Joining | Self::Closed => None,
        }
    }
}

/// Read side of the group state, cheap to clone and hand out.
#[derive(Debug, Clone)]
pub struct ReadyGate {
    state: watch::Receiver<GroupState>,
}

impl ReadyGate {
    pub(crate) fn new(state: watch::Receiver<GroupState>) -> Self {
        Self { state }
    }

    /// Resolves once a partition assignment is held.
    ///
    /// Returns `false` if the group closed (or its owner went away) first.
    pub async fn wait(&self) -> bool {
        let mut state = self.state.clone();
        match state.wait_for(|s| s.is_ready() || s.is_closed()).await {
            Ok(s) => s.is_ready(),
            Err(_) => false,
        }
    }
}
