use super::deferred::{DeferredCell, DeferredResult};
use super::BatchError;
use crate::codec::encode_params;
use crate::overseer::{item_id, GroupedFault, RequestPayload};
use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// How faults reach the caller once a batch was sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatchMode {
    /// The first fault is returned from `send`; items after it stay pending.
    #[default]
    Eager,
    /// Every fault is stored on its item and raised when that item is read.
    DelayErrors,
}

/// Calls registered so far plus the cells their results go to.
#[derive(Debug, Default)]
pub(crate) struct BatchCore {
    calls: Vec<(String, Value)>,
    cells: Vec<DeferredCell>,
    mode: BatchMode,
}

impl BatchCore {
    pub(crate) fn new(mode: BatchMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.calls.len()
    }

    pub(crate) fn mode(&self) -> BatchMode {
        self.mode
    }

    /// Record a call; ids follow registration order starting at 0.
    pub(crate) fn register<T, P>(&mut self, method: &str, params: &P) -> Result<DeferredResult<T>>
    where
        T: DeserializeOwned,
        P: Serialize + ?Sized,
    {
        let params = encode_params(params)?;
        let cell = DeferredCell::new(self.calls.len() as u64, method);
        self.calls.push((method.to_string(), params));
        self.cells.push(cell.clone());
        Ok(DeferredResult::new(cell))
    }

    pub(crate) fn payload(&self) -> Result<RequestPayload> {
        if self.calls.is_empty() {
            return Err(BatchError::NothingToSend.into());
        }
        Ok(RequestPayload::batch(self.calls.iter().cloned()))
    }

    /// Route the overseer's outcome to the registered cells.
    pub(crate) fn distribute(self, outcome: Result<Value>) -> Result<()> {
        let mut failures: Vec<(DeferredCell, Error)> = Vec::new();
        match outcome {
            Ok(Value::Array(items)) => {
                let mut by_id = index_items(items);
                for cell in &self.cells {
                    match by_id.remove(&cell.id()) {
                        Some(item) => {
                            cell.resolve(item);
                        }
                        None => failures.push((
                            cell.clone(),
                            BatchError::MissingResponse { id: cell.id() }.into(),
                        )),
                    }
                }
            }
            Ok(other) => {
                let message = format!("expected a batch response array, got `{}`", other);
                for cell in &self.cells {
                    failures.push((
                        cell.clone(),
                        Error::Decode {
                            method: "batch".to_string(),
                            message: message.clone(),
                        },
                    ));
                }
            }
            Err(err) => match err.grouped_fault().filter(|group| group.is_correlated()).cloned() {
                Some(group) => self.correlate(group, &mut failures),
                None => return self.broadcast(err),
            },
        }
        self.settle(failures)
    }

    /// Faults naming a request id go to that item; items without one are
    /// served from the whole response when it carries their result.
    fn correlate(&self, group: GroupedFault, failures: &mut Vec<(DeferredCell, Error)>) {
        let correlated = group.correlated();
        let mut whole = match group.primary().whole_response.clone() {
            Some(Value::Array(items)) => index_items(items),
            _ => HashMap::new(),
        };
        for cell in &self.cells {
            if let Some(fault) = correlated.get(&cell.id()) {
                failures.push((cell.clone(), GroupedFault::single((*fault).clone()).into()));
                continue;
            }
            match whole.remove(&cell.id()) {
                Some(item) if item.get("result").is_some() => {
                    cell.resolve(item);
                }
                _ => failures.push((cell.clone(), group.clone().into())),
            }
        }
    }

    /// One fault for the whole batch reaches every item.
    fn broadcast(self, err: Error) -> Result<()> {
        debug!(items = self.cells.len(), error = %err, "batch failed as a whole");
        match self.mode {
            BatchMode::Eager => Err(err),
            BatchMode::DelayErrors => {
                let shared = Arc::new(err);
                for cell in &self.cells {
                    cell.fail(shared.clone());
                }
                Ok(())
            }
        }
    }

    fn settle(self, failures: Vec<(DeferredCell, Error)>) -> Result<()> {
        match self.mode {
            BatchMode::Eager => match failures.into_iter().next() {
                Some((cell, err)) => {
                    debug!(id = cell.id(), error = %err, "batch item failed");
                    Err(err)
                }
                None => Ok(()),
            },
            BatchMode::DelayErrors => {
                for (cell, err) in failures {
                    cell.fail(Arc::new(err));
                }
                Ok(())
            }
        }
    }
}

fn index_items(items: Vec<Value>) -> HashMap<u64, Value> {
    items
        .into_iter()
        .filter_map(|item| {
            let id = item.as_object().and_then(item_id)?;
            Some((id, item))
        })
        .collect()
}
