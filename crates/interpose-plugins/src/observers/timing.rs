//! Timing observer - per-statement call counts and elapsed time

use crate::registry::{property, Properties};
use dashmap::DashMap;
use interpose_core::{Invocation, Method, Observer, Result, Signature, Statement};
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CallStats {
    pub calls: u64,
    pub failures: u64,
    pub total: Duration,
}

pub struct TimingObserver {
    slow_threshold: Duration,
    stats: DashMap<String, CallStats>,
}

impl TimingObserver {
    pub const DEFAULT_SLOW_THRESHOLD_MS: u64 = 1000;

    pub fn new(slow_threshold: Duration) -> Self {
        Self {
            slow_threshold,
            stats: DashMap::new(),
        }
    }

    /// Properties: `slow_threshold_ms` (default 1000).
    pub fn from_properties(properties: &Properties) -> Result<Self> {
        let ms = property(
            properties,
            "slow_threshold_ms",
            Self::DEFAULT_SLOW_THRESHOLD_MS,
        )?;
        Ok(Self::new(Duration::from_millis(ms)))
    }

    pub fn stats(&self, statement_id: &str) -> Option<CallStats> {
        self.stats.get(statement_id).map(|s| *s)
    }

    /// All recorded statements, sorted by id.
    pub fn snapshot(&self) -> Vec<(String, CallStats)> {
        let mut all: Vec<(String, CallStats)> = self
            .stats
            .iter()
            .map(|e| (e.key().clone(), *e.value()))
            .collect();
        all.sort_by(|a, b| a.0.cmp(&b.0));
        all
    }
}

impl Default for TimingObserver {
    fn default() -> Self {
        Self::new(Duration::from_millis(Self::DEFAULT_SLOW_THRESHOLD_MS))
    }
}

impl Observer for TimingObserver {
    fn name(&self) -> &str {
        "timing"
    }

    fn signatures(&self) -> Vec<Signature> {
        vec![
            Signature::of(Method::ExecutorQuery),
            Signature::of(Method::ExecutorQueryWithBounds),
            Signature::of(Method::ExecutorUpdate),
        ]
    }

    fn intercept(&self, invocation: &Invocation<'_>) -> Result<Value> {
        let statement: Statement = invocation.decode_arg(0)?;
        let start = Instant::now();
        let result = invocation.proceed();
        let elapsed = start.elapsed();

        {
            let mut entry = self.stats.entry(statement.id.clone()).or_default();
            entry.calls += 1;
            entry.total += elapsed;
            if result.is_err() {
                entry.failures += 1;
            }
        }

        let elapsed_ms = elapsed.as_millis() as u64;
        if elapsed >= self.slow_threshold {
            warn!(statement = %statement.id, sql = %statement.sql(), elapsed_ms, "slow statement");
        } else {
            debug!(statement = %statement.id, elapsed_ms, ok = result.is_ok(), "statement timed");
        }
        result
    }
}
