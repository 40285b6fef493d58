//! Background job table.
//!
//! A job is a thread running a whole pipeline (spawn, wait, print). Jobs stay
//! in the table after they finish and are only removed by `fg`.

use crate::command::ExitCode;
use crate::error::{ShellError, ShellResult};
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle, ThreadId};

pub type JobId = u64;

/// Handle to a background execution.
pub struct JobHandle {
    thread: JoinHandle<ExitCode>,
}

impl JobHandle {
    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    pub fn thread_id(&self) -> ThreadId {
        self.thread.thread().id()
    }

    /// Block until the execution ends and return its exit code.
    pub fn join(self) -> ShellResult<ExitCode> {
        self.thread
            .join()
            .map_err(|_| ShellError::Io(std::io::Error::other("background job panicked")))
    }
}

struct Job {
    id: JobId,
    handle: JobHandle,
    label: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Running,
    Done,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Running => f.write_str("Running"),
            JobStatus::Done => f.write_str("Done"),
        }
    }
}

/// One row of `jobs` output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobLine {
    pub id: JobId,
    pub status: JobStatus,
    pub label: String,
}

impl fmt::Display for JobLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} {}", self.id, self.status, self.label)
    }
}

/// What `submit` tells the user about a freshly started job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobStarted {
    pub id: JobId,
    pub thread: ThreadId,
    pub label: String,
}

impl fmt::Display for JobStarted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {:?} Started '{}'", self.id, self.thread, self.label)
    }
}

struct JobList {
    next_id: JobId,
    jobs: Vec<Job>,
}

/// Insertion-ordered table of background jobs. Ids start at 1 and are never reused.
pub struct JobTable {
    inner: Mutex<JobList>,
}

impl Default for JobTable {
    fn default() -> Self {
        Self {
            inner: Mutex::new(JobList {
                next_id: 1,
                jobs: Vec::new(),
            }),
        }
    }
}

impl JobTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, JobList> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start `work` on its own thread and record it under the next id.
    pub fn submit<F>(&self, label: impl Into<String>, work: F) -> ShellResult<JobStarted>
    where
        F: FnOnce() -> ExitCode + Send + 'static,
    {
        let label = label.into();
        let mut list = self.lock();
        let id = list.next_id;
        let thread = thread::Builder::new()
            .name(format!("job-{id}"))
            .spawn(work)?;
        list.next_id += 1;

        let handle = JobHandle { thread };
        let started = JobStarted {
            id,
            thread: handle.thread_id(),
            label: label.clone(),
        };
        tracing::debug!(id, %label, "job started");
        list.jobs.push(Job { id, handle, label });
        Ok(started)
    }

    pub fn list(&self) -> Vec<JobLine> {
        self.lock()
            .jobs
            .iter()
            .map(|job| JobLine {
                id: job.id,
                status: if job.handle.is_finished() {
                    JobStatus::Done
                } else {
                    JobStatus::Running
                },
                label: job.label.clone(),
            })
            .collect()
    }

    /// Wait for job `id` to finish, drop it from the table and return its exit code.
    ///
    /// The entry is taken out before joining so the lock is never held while blocked.
    pub fn bring_to_foreground(&self, id: JobId) -> ShellResult<ExitCode> {
        let job = {
            let mut list = self.lock();
            let pos = list
                .jobs
                .iter()
                .position(|job| job.id == id)
                .ok_or(ShellError::NoSuchJob(id))?;
            list.jobs.remove(pos)
        };
        tracing::debug!(id, label = %job.label, "waiting for job");
        job.handle.join()
    }

    pub fn len(&self) -> usize {
        self.lock().jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
