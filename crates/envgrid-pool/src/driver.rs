//! Placement driver: prepares environments against one backend's catalog.
//!
//! Planning is pure CPU work with no suspension points, so batches run on
//! tokio's blocking workers. Each task owns its environment; the catalog is
//! shared read-only behind an `Arc`.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

use envgrid_placement::{CapabilitySource, plan_placement};

use crate::environment::{Environment, EnvironmentStatus};
use crate::error::{PoolError, PoolResult};
use crate::pool::EnvironmentPool;

/// Outcome of preparing one environment in a batch.
pub type Prepared = (Environment, PoolResult<()>);

pub struct PlacementDriver<S> {
    source: Arc<S>,
}

impl<S> Clone for PlacementDriver<S> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
        }
    }
}

impl<S: CapabilitySource + 'static> PlacementDriver<S> {
    pub fn new(source: Arc<S>) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &Arc<S> {
        &self.source
    }

    /// Bind a new environment to concrete catalog entries.
    ///
    /// On success the environment holds the realized nodes and moves to
    /// `Prepared`. Failures that a catalog refresh cannot fix mark it `Bad`.
    pub fn prepare(&self, environment: &mut Environment) -> PoolResult<()> {
        if environment.status() != EnvironmentStatus::New {
            return Err(PoolError::InvalidStatus {
                name: environment.name.clone(),
                status: environment.status().to_string(),
            });
        }

        match plan_placement(environment.requirement().nodes(), self.source.as_ref()) {
            Ok(plan) => {
                info!(
                    environment = %environment.name,
                    pool_key = %plan.pool_key,
                    cost = plan.cost,
                    "environment prepared"
                );
                environment.apply_plan(plan);
                Ok(())
            }
            Err(e) => {
                warn!(environment = %environment.name, error = %e, "environment preparation failed");
                if !e.is_retryable() {
                    environment.set_status(EnvironmentStatus::Bad);
                }
                Err(PoolError::Placement {
                    name: environment.name.clone(),
                    source: e,
                })
            }
        }
    }

    /// Prepare a batch with at most `concurrency` placements in flight.
    ///
    /// Results come back in input order, one per environment. A worker that
    /// panics marks its environment `Bad` and reports `PoolError::Worker`;
    /// the environment is still returned.
    pub async fn prepare_all(
        &self,
        environments: Vec<Environment>,
        concurrency: usize,
    ) -> PoolResult<Vec<Prepared>> {
        let total = environments.len();
        let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
        let mut tasks = JoinSet::new();

        for (index, mut environment) in environments.into_iter().enumerate() {
            let permit = Arc::clone(&semaphore)
                .acquire_owned()
                .await
                .map_err(|e| PoolError::Worker(e.to_string()))?;
            let driver = self.clone();
            tasks.spawn_blocking(move || {
                let _permit = permit;
                let result = catch_unwind(AssertUnwindSafe(|| driver.prepare(&mut environment)))
                    .unwrap_or_else(|payload| {
                        let message = panic_message(payload.as_ref());
                        warn!(environment = %environment.name, error = %message, "placement worker panicked");
                        environment.set_status(EnvironmentStatus::Bad);
                        Err(PoolError::Worker(message))
                    });
                (index, environment, result)
            });
        }

        let mut outcomes = Vec::with_capacity(total);
        while let Some(joined) = tasks.join_next().await {
            let outcome = joined.map_err(|e| PoolError::Worker(e.to_string()))?;
            outcomes.push(outcome);
        }
        outcomes.sort_by_key(|(index, _, _)| *index);

        let failed = outcomes.iter().filter(|(_, _, r)| r.is_err()).count();
        info!(total, failed, concurrency, "batch prepared");

        Ok(outcomes
            .into_iter()
            .map(|(_, environment, result)| (environment, result))
            .collect())
    }

    /// Prepare every `New` environment of a pool in place.
    ///
    /// Returns the per-environment failures; the pool keeps its order.
    pub async fn prepare_pool(
        &self,
        pool: &mut EnvironmentPool,
        concurrency: usize,
    ) -> PoolResult<Vec<(String, PoolError)>> {
        let mut settled = Vec::new();
        let mut pending_indices = Vec::new();
        let mut pending = Vec::new();
        for (index, environment) in pool.take_all().into_iter().enumerate() {
            if environment.status() == EnvironmentStatus::New {
                pending_indices.push(index);
                pending.push(environment);
            } else {
                settled.push((index, environment));
            }
        }

        let outcomes = match self.prepare_all(pending, concurrency).await {
            Ok(outcomes) => outcomes,
            Err(e) => {
                pool.restore(settled.into_iter().map(|(_, environment)| environment));
                return Err(e);
            }
        };

        let mut failures = Vec::new();
        for (index, (environment, result)) in pending_indices.into_iter().zip(outcomes) {
            if let Err(e) = result {
                failures.push((environment.name.clone(), e));
            }
            settled.push((index, environment));
        }
        settled.sort_by_key(|(index, _)| *index);
        pool.restore(settled.into_iter().map(|(_, environment)| environment));

        Ok(failures)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "worker panicked".to_string()
    }
}
