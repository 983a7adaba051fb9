//! Pending index jobs, keyed by signal set.
//!
//! Jobs are served newest first: a new or merged request moves to the top,
//! so under sustained traffic older entries may wait.

use super::message::IndexJob;

/// What happened to a job pushed onto the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enqueued {
  /// No job for the signal set was queued; a new entry was added
  Scheduled,
  /// An existing entry absorbed the request
  Rescheduled,
}

#[derive(Debug, Default)]
pub struct WorkQueue {
  // top of the stack is the end of the vec
  jobs: Vec<IndexJob>,
}

impl WorkQueue {
  pub fn new() -> Self {
    Self::default()
  }

  /// Add a job, merging with a queued job for the same signal set.
  pub fn push(&mut self, job: IndexJob) -> Enqueued {
    match self.jobs.iter().position(|queued| queued.cid == job.cid) {
      Some(pos) => {
        let mut merged = self.jobs.remove(pos);
        merged.merge(&job);
        self.jobs.push(merged);
        Enqueued::Rescheduled
      }
      None => {
        self.jobs.push(job);
        Enqueued::Scheduled
      }
    }
  }

  /// Take the most recently touched job.
  pub fn pop(&mut self) -> Option<IndexJob> {
    self.jobs.pop()
  }

  /// Drop the queued job for `cid`. Returns whether one was queued.
  pub fn remove(&mut self, cid: &str) -> bool {
    let before = self.jobs.len();
    self.jobs.retain(|job| job.cid != cid);
    self.jobs.len() != before
  }

  pub fn clear(&mut self) -> usize {
    let dropped = self.jobs.len();
    self.jobs.clear();
    dropped
  }

  pub fn is_empty(&self) -> bool {
    self.jobs.is_empty()
  }

  pub fn len(&self) -> usize {
    self.jobs.len()
  }

  pub fn snapshot(&self) -> Vec<IndexJob> {
    self.jobs.clone()
  }
}
