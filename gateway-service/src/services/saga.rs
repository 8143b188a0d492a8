//! Step-list saga executor.
//!
//! Steps run in order against a shared state value. When a step fails, or the
//! request is cancelled, every step that already completed is compensated in
//! reverse order and the original error is returned. An in-flight step is
//! abandoned on cancellation unless it opts out with `cancellable() == false`;
//! such a step finishes, and cancellation is observed before the next one.
//! Compensation is never raced against cancellation.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::ServiceError;

#[async_trait]
pub trait SagaStep<S: Send + Sync>: Send + Sync {
    fn name(&self) -> &'static str;

    async fn execute(&self, state: &mut S) -> Result<(), ServiceError>;

    /// `false` for steps whose remote effect can only be undone with the
    /// response they produce.
    fn cancellable(&self) -> bool {
        true
    }

    /// Undo a completed `execute`. Steps with no remote effect keep the default.
    async fn compensate(&self, _state: &S) -> Result<(), ServiceError> {
        Ok(())
    }
}

pub struct Saga<S> {
    name: &'static str,
    steps: Vec<Box<dyn SagaStep<S>>>,
}

impl<S: Send + Sync> Saga<S> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            steps: Vec::new(),
        }
    }

    pub fn step(mut self, step: impl SagaStep<S> + 'static) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    pub async fn run(&self, state: &mut S, cancel: &CancellationToken) -> Result<(), ServiceError> {
        let mut completed: Vec<&dyn SagaStep<S>> = Vec::with_capacity(self.steps.len());

        for step in &self.steps {
            let outcome = if cancel.is_cancelled() {
                Err(ServiceError::Cancelled)
            } else if step.cancellable() {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => Err(ServiceError::Cancelled),
                    result = step.execute(state) => result,
                }
            } else {
                step.execute(state).await
            };

            match outcome {
                Ok(()) => {
                    tracing::debug!(saga = self.name, step = step.name(), "Saga step completed");
                    completed.push(step.as_ref());
                }
                Err(err) => {
                    tracing::warn!(
                        saga = self.name,
                        step = step.name(),
                        error = %err,
                        "Saga step failed, compensating"
                    );
                    self.compensate(&completed, state).await;
                    return Err(err);
                }
            }
        }

        Ok(())
    }

    async fn compensate(&self, completed: &[&dyn SagaStep<S>], state: &S) {
        for step in completed.iter().rev() {
            match step.compensate(state).await {
                Ok(()) => {
                    tracing::info!(saga = self.name, step = step.name(), "Saga step compensated")
                }
                Err(e) => tracing::error!(
                    saga = self.name,
                    step = step.name(),
                    error = %e,
                    critical = true,
                    "Saga compensation failed, state left inconsistent"
                ),
            }
        }
    }
}
