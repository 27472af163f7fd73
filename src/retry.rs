// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Retry policy wrapping fallible async operations.
//!
//! The policy is stateless: one [`RetryConfig`] is shared by every provider
//! invocation and carries no state between calls. Errors are not classified,
//! every failure is retried until the attempt budget is spent.

use std::future::Future;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;
use tracing::warn;

/// Backoff strategy applied between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryStrategy {
    /// Single attempt, errors surface immediately
    None,
    /// Constant delay between attempts
    Fixed,
    /// Delay doubles with every attempt
    Exponential,
}

impl FromStr for RetryStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(RetryStrategy::None),
            "simple" | "fixed" => Ok(RetryStrategy::Fixed),
            "exponential" => Ok(RetryStrategy::Exponential),
            other => Err(format!(
                "unknown retry type '{}', expected one of: none, simple, fixed, exponential",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    pub strategy: RetryStrategy,
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            strategy: RetryStrategy::Fixed,
            max_attempts: 3,
            base_delay: Duration::from_secs(5),
        }
    }
}

/// The last error of an operation whose attempts were all used up
#[derive(Error, Debug)]
#[error("gave up after {attempts} attempt(s): {source}")]
pub struct RetryError<E: std::error::Error + 'static> {
    pub attempts: u32,
    #[source]
    pub source: E,
}

impl RetryConfig {
    /// Config that never retries
    pub fn none() -> Self {
        Self {
            strategy: RetryStrategy::None,
            max_attempts: 1,
            base_delay: Duration::ZERO,
        }
    }

    /// Number of attempts the policy will make, at least one
    pub fn attempt_budget(&self) -> u32 {
        match self.strategy {
            RetryStrategy::None => 1,
            _ => self.max_attempts.max(1),
        }
    }

    /// Delay to wait before the given attempt (1-based). The first attempt never waits.
    pub fn delay_before_attempt(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        match self.strategy {
            RetryStrategy::None => Duration::ZERO,
            RetryStrategy::Fixed => self.base_delay,
            RetryStrategy::Exponential => {
                let factor = 2u32.checked_pow(attempt - 1).unwrap_or(u32::MAX);
                self.base_delay.saturating_mul(factor)
            }
        }
    }

    /// Run `op` until it succeeds or the attempt budget is exhausted.
    pub async fn run<T, E, F, Fut>(&self, label: &str, mut op: F) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::error::Error + 'static,
    {
        let budget = self.attempt_budget();
        let mut attempt = 1;

        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if attempt >= budget => {
                    return Err(RetryError {
                        attempts: attempt,
                        source: err,
                    });
                }
                Err(err) => {
                    let delay = self.delay_before_attempt(attempt + 1);
                    warn!(
                        attempt,
                        max_attempts = budget,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "{} failed, retrying",
                        label
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
