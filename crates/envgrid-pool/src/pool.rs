//! Environment pool: reuses environments for identical requirements.

use tracing::{debug, info};

use envgrid_config::GridConfig;
use envgrid_space::EnvironmentSpace;

use crate::environment::Environment;
use crate::error::{PoolError, PoolResult};

/// Environments in insertion order, unique by name.
#[derive(Debug, Default)]
pub struct EnvironmentPool {
    environments: Vec<Environment>,
}

impl EnvironmentPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Predefined environments for every `[[environments]]` entry.
    pub fn from_config(config: &GridConfig) -> PoolResult<Self> {
        let mut pool = Self::new();
        for (environment, space) in config
            .environments
            .iter()
            .zip(config.environment_spaces()?)
        {
            pool.insert(Environment::new(environment.name.clone(), space, true))?;
        }
        info!(count = pool.len(), "environments loaded from config");
        Ok(pool)
    }

    /// Reuse an idle environment offering exactly `requirement`, or create one.
    pub fn get_or_create(&mut self, requirement: EnvironmentSpace) -> PoolResult<&mut Environment> {
        if let Some(index) = self
            .environments
            .iter()
            .position(|env| !env.is_in_use && env.capability() == requirement)
        {
            debug!(environment = %self.environments[index].name, "reusing environment");
            return Ok(&mut self.environments[index]);
        }
        self.from_requirement(requirement)
    }

    /// Always create a generated environment for `requirement`.
    pub fn from_requirement(&mut self, requirement: EnvironmentSpace) -> PoolResult<&mut Environment> {
        self.insert(Environment::new(None, requirement, false))
    }

    /// Declare a named environment ahead of time.
    pub fn insert_predefined(
        &mut self,
        name: impl Into<String>,
        requirement: EnvironmentSpace,
    ) -> PoolResult<&mut Environment> {
        self.insert(Environment::new(Some(name.into()), requirement, true))
    }

    fn insert(&mut self, environment: Environment) -> PoolResult<&mut Environment> {
        if self.contains(&environment.name) {
            return Err(PoolError::AlreadyExists(environment.name));
        }
        debug!(
            environment = %environment.name,
            id = environment.id,
            nodes = environment.requirement().len(),
            "environment added"
        );
        self.environments.push(environment);
        let last = self.environments.len() - 1;
        Ok(&mut self.environments[last])
    }

    /// Mark an environment as taken by (or returned from) a test run.
    pub fn set_in_use(&mut self, name: &str, in_use: bool) -> PoolResult<()> {
        let environment = self
            .get_mut(name)
            .ok_or_else(|| PoolError::EnvironmentNotFound(name.to_string()))?;
        environment.is_in_use = in_use;
        debug!(environment = %name, in_use, "environment usage changed");
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.environments.iter().any(|env| env.name == name)
    }

    pub fn get(&self, name: &str) -> Option<&Environment> {
        self.environments.iter().find(|env| env.name == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Environment> {
        self.environments.iter_mut().find(|env| env.name == name)
    }

    pub fn remove(&mut self, name: &str) -> PoolResult<Environment> {
        let index = self
            .environments
            .iter()
            .position(|env| env.name == name)
            .ok_or_else(|| PoolError::EnvironmentNotFound(name.to_string()))?;
        Ok(self.environments.remove(index))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Environment> {
        self.environments.iter()
    }

    pub fn len(&self) -> usize {
        self.environments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.environments.is_empty()
    }

    pub(crate) fn take_all(&mut self) -> Vec<Environment> {
        std::mem::take(&mut self.environments)
    }

    /// Put back environments previously taken, keeping their order.
    pub(crate) fn restore(&mut self, environments: impl IntoIterator<Item = Environment>) {
        self.environments.extend(environments);
    }
}
