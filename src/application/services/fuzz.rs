//! Randomized relocation harness
//!
//! Applies random legal moves and validates the tree after each one. The
//! first violation stops the run and carries the full mutation history.

use std::fmt;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{error, info};

use crate::application::services::TreeService;
use crate::application::{ApplicationError, ApplicationResult};
use crate::config::FuzzConfig;
use crate::domain::{DomainError, InvariantReport, Mutation, Violation};

/// Result of a fuzz run that never broke an invariant.
#[derive(Debug, Clone)]
pub struct FuzzReport {
    pub iterations: usize,
    pub seed: u64,
    pub history: Vec<Mutation>,
}

impl fmt::Display for FuzzReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Applied {} random moves (seed {}), tree is valid",
            self.iterations, self.seed
        )
    }
}

/// Seeded driver for `TreeService::move_random_node_with`.
#[derive(Debug, Clone)]
pub struct Fuzzer {
    iterations: usize,
    seed: u64,
}

impl Fuzzer {
    /// A random seed is drawn when `seed` is `None`.
    pub fn new(iterations: usize, seed: Option<u64>) -> Self {
        Self {
            iterations,
            seed: seed.unwrap_or_else(rand::random),
        }
    }

    pub fn from_config(config: &FuzzConfig) -> Self {
        Self::new(config.iterations, config.seed)
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Run the configured number of random moves against `service`.
    ///
    /// Usage errors from the moves themselves (e.g. a tree that is too small)
    /// are returned as-is; corruption is reported as `InvariantViolation`.
    pub fn run(&self, service: &mut TreeService) -> ApplicationResult<FuzzReport> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut history = Vec::new();
        info!(
            "fuzzing {} moves on {} store (seed {})",
            self.iterations,
            service.backend_name(),
            self.seed
        );

        let initial = service.validate()?;
        if !initial.is_valid() {
            return Err(self.violation(0, initial.violations, history));
        }

        for iteration in 1..=self.iterations {
            let mutation = service.move_random_node_with(&mut rng)?;
            history.push(mutation);

            let validation = service.validate()?;
            if !validation.is_valid() {
                error!("invariant violated after mutation {}", iteration);
                return Err(self.violation(iteration, validation.violations, history));
            }
        }

        Ok(FuzzReport {
            iterations: self.iterations,
            seed: self.seed,
            history,
        })
    }

    fn violation(
        &self,
        iteration: usize,
        violations: Vec<Violation>,
        history: Vec<Mutation>,
    ) -> ApplicationError {
        DomainError::InvariantViolation(Box::new(InvariantReport {
            iteration,
            seed: self.seed,
            violations,
            history,
        }))
        .into()
    }
}
