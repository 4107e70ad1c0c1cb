//! crates/job_ledger_core/src/allocation.rs
//!
//! Hours-weighted percentage renormalization.
//!
//! Each task of a job owns `100 * hours / total_hours` percent of the job. The
//! shares are recomputed for the whole job whenever a task is created, deleted,
//! or has its hours changed, so they always sum to 100 for a job with tasks.

use crate::domain::Task;

/// Computes each entry's share of the total, in percent.
///
/// Returns `None` for an empty list or a zero total, in which case nothing
/// should be renormalized.
pub fn hour_shares(hours: &[i32]) -> Option<Vec<f64>> {
    let total: i64 = hours.iter().map(|h| i64::from(*h)).sum();
    if total <= 0 {
        return None;
    }
    let total = total as f64;
    Some(hours.iter().map(|h| 100.0 * f64::from(*h) / total).collect())
}

/// Rewrites `task_percentage` for every task of one job.
///
/// Returns false when the job has no tasks (nothing to renormalize).
pub fn renormalize(tasks: &mut [Task]) -> bool {
    let hours: Vec<i32> = tasks.iter().map(|t| t.hours).collect();
    match hour_shares(&hours) {
        Some(shares) => {
            for (task, share) in tasks.iter_mut().zip(shares) {
                task.task_percentage = share;
            }
            true
        }
        None => false,
    }
}
