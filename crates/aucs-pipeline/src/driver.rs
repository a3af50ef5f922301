//! Parallel subscore execution (§4.11: "Subscore stages are independent
//! and may run concurrently"; §5: "parallel CPU workers coordinated by
//! the pipeline driver").

use std::time::{Duration, Instant};

use crate::error::PipelineError;

/// One unit of concurrent work: a named task plus the closure that
/// computes it. Subscores are the primary use (one task per module), but
/// any CPU-bound, independent closure fits (e.g. per-metro partitions
/// within a single subscore).
pub struct Task<'a, T> {
    pub name: &'static str,
    pub work: Box<dyn FnOnce() -> T + Send + 'a>,
}

/// Run `tasks` across up to `max_workers` OS threads, bounded by
/// `timeout`. Returns results in the same order as `tasks` regardless of
/// completion order (§5: "no ordering guarantees across parallel
/// partitions" applies to execution, not to how the driver reassembles
/// results for the caller). Any task whose result doesn't arrive before
/// the deadline causes the whole batch to fail as a stage timeout — the
/// spec model is "driver cancels a stage by signaling partitions" (§5),
/// which this realizes by dropping the scope and discarding in-flight
/// results rather than waiting on them.
pub fn run_parallel<T: Send>(tasks: Vec<Task<'_, T>>, max_workers: usize, timeout: Duration) -> Result<Vec<T>, PipelineError> {
    let max_workers = max_workers.max(1);
    let expected = tasks.len();
    let (tx, rx) = crossbeam_channel::bounded::<(usize, T)>(expected.max(1));
    let deadline = Instant::now() + timeout;

    std::thread::scope(|scope| -> Result<(), PipelineError> {
        let chunks: Vec<Vec<(usize, Task<'_, T>)>> = {
            let mut indexed: Vec<(usize, Task<'_, T>)> = tasks.into_iter().enumerate().collect();
            let mut buckets: Vec<Vec<(usize, Task<'_, T>)>> = (0..max_workers).map(|_| Vec::new()).collect();
            let mut i = 0;
            while let Some(item) = indexed.pop() {
                buckets[i % max_workers].push(item);
                i += 1;
            }
            buckets
        };

        for chunk in chunks {
            if chunk.is_empty() {
                continue;
            }
            let tx = tx.clone();
            scope.spawn(move || {
                for (idx, task) in chunk {
                    let result = (task.work)();
                    if tx.send((idx, result)).is_err() {
                        return;
                    }
                }
            });
        }
        drop(tx);
        Ok(())
    })?;

    let mut slots: Vec<Option<T>> = (0..expected).map(|_| None).collect();
    let mut received = 0usize;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() && received < expected {
            return Err(PipelineError::Timeout {
                stage: "parallel_subscores".to_string(),
                timeout_ms: timeout.as_millis() as u64,
            });
        }
        match rx.recv_timeout(remaining.max(Duration::from_millis(1))) {
            Ok((idx, value)) => {
                slots[idx] = Some(value);
                received += 1;
                if received == expected {
                    break;
                }
            }
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => {
                return Err(PipelineError::Timeout {
                    stage: "parallel_subscores".to_string(),
                    timeout_ms: timeout.as_millis() as u64,
                });
            }
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break,
        }
    }

    Ok(slots.into_iter().flatten().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tasks_execute_and_preserve_order() {
        let tasks = vec![
            Task { name: "ea", work: Box::new(|| 1) },
            Task { name: "lca", work: Box::new(|| 2) },
            Task { name: "morr", work: Box::new(|| 3) },
        ];
        let results = run_parallel(tasks, 2, Duration::from_secs(5)).unwrap();
        assert_eq!(results, vec![1, 2, 3]);
    }

    #[test]
    fn single_worker_still_completes_all_tasks() {
        let tasks: Vec<Task<'_, i32>> = (0..5).map(|i| Task { name: "t", work: Box::new(move || i * 2) }).collect();
        let results = run_parallel(tasks, 1, Duration::from_secs(5)).unwrap();
        assert_eq!(results, vec![0, 2, 4, 6, 8]);
    }
}
