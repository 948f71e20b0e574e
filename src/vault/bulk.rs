//! Concurrent fan-out of single-value provider calls.
//!
//! Every entry becomes one job.  Jobs are pushed onto a channel that a
//! group of worker threads (one per entry unless a bound is set) drain
//! together; each worker reports `(key, result)` over a second channel.
//! The calling thread collects exactly one report per entry and is the
//! only one that builds the result map.
//!
//! A batch succeeds only if every entry succeeds.  Otherwise the
//! caller gets a `BatchError` naming each failed key.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, RecvTimeoutError};

use crate::errors::{BatchError, ItemFailure, Result, VaultError};
use crate::provider::{KeyProvider, Operation, ProviderError, ResourceIdentity};

/// Tuning for bulk operations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BulkOptions {
    /// Upper bound on concurrent provider calls; `None` means one
    /// worker per entry.
    pub max_parallelism: Option<usize>,

    /// Deadline for the whole batch; `None` waits for every worker.
    pub batch_timeout: Option<Duration>,
}

type Job = (String, String);
type Report = (String, std::result::Result<String, ProviderError>);

/// Run `operation` over every entry of `entries` and return the results
/// keyed by the original names.
pub fn run(
    provider: &Arc<dyn KeyProvider>,
    identity: &ResourceIdentity,
    operation: Operation,
    entries: &HashMap<String, String>,
    options: &BulkOptions,
) -> Result<HashMap<String, String>> {
    let total = entries.len();
    if total == 0 {
        return Ok(HashMap::new());
    }

    let workers = options
        .max_parallelism
        .map_or(total, |limit| limit.clamp(1, total));

    let (job_tx, job_rx) = unbounded::<Job>();
    for (key, value) in entries {
        // The receiver is still held here, so the send cannot fail.
        let _ = job_tx.send((key.clone(), value.clone()));
    }
    // Workers stop once the queue is empty.
    drop(job_tx);

    let (report_tx, report_rx) = unbounded::<Report>();
    let cancelled = Arc::new(AtomicBool::new(false));

    for index in 0..workers {
        let job_rx = job_rx.clone();
        let report_tx = report_tx.clone();
        let cancelled = Arc::clone(&cancelled);
        let provider = Arc::clone(provider);
        let identity = identity.clone();

        thread::Builder::new()
            .name(format!("kmsvault-{operation}-{index}"))
            .spawn(move || {
                for (key, value) in job_rx.iter() {
                    if cancelled.load(Ordering::Relaxed) {
                        break;
                    }
                    let outcome = apply(provider.as_ref(), &identity, operation, &value);
                    if report_tx.send((key, outcome)).is_err() {
                        break;
                    }
                }
            })?;
    }
    // Workers hold the only senders now, so a dead worker shows up as a
    // disconnected channel instead of a hang.
    drop(report_tx);
    drop(job_rx);

    let deadline = options.batch_timeout.map(|t| Instant::now() + t);
    let mut pending: HashSet<&String> = entries.keys().collect();
    let mut results = HashMap::with_capacity(total);
    let mut failures = Vec::new();
    let mut timed_out = false;

    while !pending.is_empty() {
        let report = match deadline {
            Some(deadline) => match report_rx.recv_deadline(deadline) {
                Ok(report) => report,
                Err(RecvTimeoutError::Timeout) => {
                    timed_out = true;
                    break;
                }
                Err(RecvTimeoutError::Disconnected) => break,
            },
            None => match report_rx.recv() {
                Ok(report) => report,
                Err(_) => break,
            },
        };

        let (key, outcome) = report;
        pending.remove(&key);
        match outcome {
            Ok(value) => {
                results.insert(key, value);
            }
            Err(cause) => failures.push(ItemFailure { key, cause }),
        }
    }

    if !pending.is_empty() {
        // Idle workers must not pick up jobs nobody will collect.
        cancelled.store(true, Ordering::Relaxed);

        for key in pending {
            failures.push(ItemFailure {
                key: key.clone(),
                cause: if timed_out {
                    ProviderError::Timeout
                } else {
                    ProviderError::WorkerLost
                },
            });
        }
    }

    if failures.is_empty() {
        return Ok(results);
    }

    failures.sort_by(|a, b| a.key.cmp(&b.key));
    Err(VaultError::Batch(BatchError {
        operation,
        total,
        failures,
    }))
}

/// One provider call, with the decrypted bytes checked for UTF-8.
fn apply(
    provider: &dyn KeyProvider,
    identity: &ResourceIdentity,
    operation: Operation,
    value: &str,
) -> std::result::Result<String, ProviderError> {
    match operation {
        Operation::Encrypt => provider.encrypt(identity, value.as_bytes()),
        Operation::Decrypt => {
            let bytes = provider.decrypt(identity, value)?;
            String::from_utf8(bytes).map_err(|_| ProviderError::InvalidUtf8)
        }
    }
}
