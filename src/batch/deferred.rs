use super::BatchError;
use crate::codec::decode_result;
use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone)]
enum CellState {
    Pending,
    Resolved(Value),
    Failed(Arc<Error>),
}

/// Write-once slot shared between the coordinator and the caller's handle.
#[derive(Debug, Clone)]
pub(crate) struct DeferredCell {
    id: u64,
    method: String,
    state: Arc<Mutex<CellState>>,
}

impl DeferredCell {
    pub(crate) fn new(id: u64, method: impl Into<String>) -> Self {
        Self {
            id,
            method: method.into(),
            state: Arc::new(Mutex::new(CellState::Pending)),
        }
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    fn lock(&self) -> MutexGuard<'_, CellState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Store the response envelope. Returns `false` if the cell was already written.
    pub(crate) fn resolve(&self, envelope: Value) -> bool {
        let mut state = self.lock();
        match *state {
            CellState::Pending => {
                *state = CellState::Resolved(envelope);
                true
            }
            _ => false,
        }
    }

    pub(crate) fn fail(&self, error: Arc<Error>) -> bool {
        let mut state = self.lock();
        match *state {
            CellState::Pending => {
                *state = CellState::Failed(error);
                true
            }
            _ => false,
        }
    }
}

/// Handle to the outcome of one call registered on a batch.
///
/// Reading it before the batch was sent yields [`BatchError::NotReady`]. A
/// fault stored for this item is raised as [`Error::Deferred`] on every read.
#[derive(Debug, Clone)]
pub struct DeferredResult<T> {
    cell: DeferredCell,
    _marker: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> DeferredResult<T> {
    pub(crate) fn new(cell: DeferredCell) -> Self {
        Self {
            cell,
            _marker: PhantomData,
        }
    }

    /// Request id of the call inside its batch.
    pub fn request_id(&self) -> u64 {
        self.cell.id
    }

    pub fn method(&self) -> &str {
        &self.cell.method
    }

    /// `true` once the item holds either a value or an error.
    pub fn is_ready(&self) -> bool {
        !matches!(*self.cell.lock(), CellState::Pending)
    }

    pub fn is_failed(&self) -> bool {
        matches!(*self.cell.lock(), CellState::Failed(_))
    }

    pub fn get(&self) -> Result<T> {
        let state = self.cell.lock().clone();
        match state {
            CellState::Pending => Err(BatchError::NotReady {
                id: self.cell.id,
                method: self.cell.method.clone(),
            }
            .into()),
            CellState::Failed(error) => Err(Error::Deferred(error)),
            CellState::Resolved(envelope) => decode_result(&self.cell.method, envelope),
        }
    }
}
