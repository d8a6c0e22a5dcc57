// Bounded worker pool with ordered results
//
// The producer runs on the calling thread and feeds a bounded job queue
// (2 items per worker); workers run as scoped threads and report back over
// an unbounded channel tagged with the sequence index. Results are
// reassembled in sequence order once every worker has exited.

use super::types::JobControl;
use crate::error::{MediaError, MediaResult};
use crossbeam::channel;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

/// Run `work` over every item of `source` on up to `workers` threads and
/// return the outputs in source order.
///
/// The first failure (from the source, from `work`, or from `control`)
/// stops the producer and the remaining workers; the error earliest in
/// sequence order is returned and no partial output is.
pub fn run_ordered<S, I, T, F>(
    source: S,
    workers: usize,
    control: &JobControl,
    work: F,
) -> MediaResult<Vec<T>>
where
    S: IntoIterator<Item = MediaResult<I>>,
    I: Send,
    T: Send,
    F: Fn(I) -> MediaResult<T> + Sync,
{
    control.check()?;

    let workers = workers.max(1);
    let (job_tx, job_rx) = channel::bounded::<(usize, I)>(workers * 2);
    let (result_tx, result_rx) = channel::unbounded::<(usize, MediaResult<T>)>();
    let abort = AtomicBool::new(false);

    let producer_failure = thread::scope(|scope| {
        for worker_id in 0..workers {
            let job_rx = job_rx.clone();
            let result_tx = result_tx.clone();
            let work = &work;
            let abort = &abort;
            scope.spawn(move || {
                for (seq, item) in job_rx {
                    if abort.load(Ordering::Relaxed) {
                        break;
                    }
                    let result = control.check().and_then(|_| work(item));
                    if result.is_err() {
                        abort.store(true, Ordering::Relaxed);
                    }
                    if result_tx.send((seq, result)).is_err() {
                        break;
                    }
                }
                tracing::trace!("Worker {} finished", worker_id);
            });
        }
        // Workers hold the only remaining handles.
        drop(job_rx);
        drop(result_tx);

        let mut failure = None;
        for (seq, item) in source.into_iter().enumerate() {
            if abort.load(Ordering::Relaxed) {
                break;
            }
            match control.check().and(item) {
                Ok(item) => {
                    if job_tx.send((seq, item)).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    abort.store(true, Ordering::Relaxed);
                    failure = Some(e);
                    break;
                }
            }
        }
        drop(job_tx);
        failure
    });

    let mut ordered = BTreeMap::new();
    let mut worker_failure: Option<(usize, MediaError)> = None;
    for (seq, result) in result_rx.iter() {
        match result {
            Ok(value) => {
                ordered.insert(seq, value);
            }
            Err(e) => {
                if worker_failure.as_ref().map_or(true, |(first, _)| seq < *first) {
                    worker_failure = Some((seq, e));
                }
            }
        }
    }

    if let Some((_, e)) = worker_failure {
        return Err(e);
    }
    if let Some(e) = producer_failure {
        return Err(e);
    }
    Ok(ordered.into_values().collect())
}
