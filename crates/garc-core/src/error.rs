use thiserror::Error;

use garc_model::ModelError;

use crate::client::ClientError;
use crate::owner::ChildKind;

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("invalid runner: {0}")]
    Model(#[from] ModelError),

    #[error("failed to {action} {kind} {name}: {source}")]
    Child {
        action: &'static str,
        kind: ChildKind,
        name: String,
        #[source]
        source: ClientError,
    },

    #[error("cluster error: {0}")]
    Client(#[from] ClientError),
}

impl ReconcileError {
    pub(crate) fn child(
        action: &'static str,
        kind: ChildKind,
        name: impl Into<String>,
    ) -> impl FnOnce(ClientError) -> Self {
        let name = name.into();
        move |source| ReconcileError::Child {
            action,
            kind,
            name,
            source,
        }
    }

    /// True when the failure is a write conflict worth a short requeue.
    pub fn is_conflict(&self) -> bool {
        match self {
            ReconcileError::Child { source, .. } | ReconcileError::Client(source) => {
                source.is_conflict()
            }
            ReconcileError::Model(_) => false,
        }
    }
}
