//! Running test cells on a cluster through `kubectl`.
//!
//! A test cell is applied, its job pod is awaited, its log is streamed
//! and saved, and the cell is deleted again. Every wait is a bounded poll
//! that gives up early once the cancellation flag is cleared.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use cellc_common::constants::{JOB_COMPLETION_TIMEOUT, POD_RUNNING_TIMEOUT, POLL_INTERVAL};
use cellc_common::error::{CellError, Result};
use cellc_image::shell::ShellCommand;

/// How long to look for the job pod before skipping a test.
const POD_LOOKUP_TIMEOUT: Duration = Duration::from_secs(60);

/// Pod phases that end the wait for a test pod.
const SETTLED_POD_STATES: [&str; 3] = ["Running", "Error", "Completed"];

/// Resource name of Cell objects on the cluster.
const CELL_RESOURCE: &str = "cells.mesh.cellery.io";

/// Cluster operations needed to run a test cell.
pub trait Cluster {
    /// Applies the document at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the cluster rejects the document.
    fn apply(&self, path: &Path) -> Result<()>;

    /// Lists pods as `kubectl get pods --no-headers` prints them.
    ///
    /// # Errors
    ///
    /// Returns an error if the listing fails.
    fn pods(&self) -> Result<String>;

    /// Reads the status of the job condition named `condition`.
    ///
    /// # Errors
    ///
    /// Returns an error if the job cannot be queried.
    fn job_condition(&self, job: &str, condition: &str) -> Result<String>;

    /// Follows the log of `container` in `pod` until it ends.
    ///
    /// # Errors
    ///
    /// Returns an error if the log cannot be read.
    fn follow_logs(&self, pod: &str, container: &str) -> Result<()>;

    /// Returns the full log of `container` in `pod`.
    ///
    /// # Errors
    ///
    /// Returns an error if the log cannot be read.
    fn logs(&self, pod: &str, container: &str) -> Result<String>;

    /// Deletes the Cell object `name`.
    ///
    /// # Errors
    ///
    /// Returns an error if the deletion fails.
    fn delete_cell(&self, name: &str) -> Result<()>;
}

/// The `kubectl` command line tool.
#[derive(Debug, Clone)]
pub struct Kubectl {
    program: PathBuf,
}

impl Kubectl {
    /// Locates `kubectl` on the `PATH`.
    ///
    /// # Errors
    ///
    /// Returns [`CellError::NotFound`] if `kubectl` is not installed.
    pub fn locate() -> Result<Self> {
        let program = which::which("kubectl").map_err(|_| CellError::NotFound {
            kind: "kubectl binary",
            id: "kubectl (install kubectl to run tests)".into(),
        })?;
        Ok(Self { program })
    }

    fn command<'a>(&self, args: impl IntoIterator<Item = &'a str>) -> ShellCommand {
        ShellCommand::new(&self.program).args(args)
    }
}

impl Cluster for Kubectl {
    fn apply(&self, path: &Path) -> Result<()> {
        let file = path.display().to_string();
        let _ = self.command(["apply", "-f", file.as_str()]).run()?;
        Ok(())
    }

    fn pods(&self) -> Result<String> {
        self.command(["get", "pods", "--no-headers"]).run()
    }

    fn job_condition(&self, job: &str, condition: &str) -> Result<String> {
        let query = format!(
            "jsonpath={{.status.conditions[?(@.type==\"{condition}\")].status}}"
        );
        self.command(["get", "jobs", job, "-o", query.as_str()]).run()
    }

    #[allow(clippy::print_stdout)]
    fn follow_logs(&self, pod: &str, container: &str) -> Result<()> {
        let _ = self.command(["logs", pod, container, "-f"]).run_with(
            |line| println!("Log: {line}"),
            |line| tracing::warn!(target: "cellc::test", "{line}"),
        )?;
        Ok(())
    }

    fn logs(&self, pod: &str, container: &str) -> Result<String> {
        self.command(["logs", pod, container]).run()
    }

    fn delete_cell(&self, name: &str) -> Result<()> {
        let _ = self.command(["delete", CELL_RESOURCE, name]).run()?;
        Ok(())
    }
}

/// Result of a bounded wait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Poll<T> {
    /// The condition was met.
    Ready(T),
    /// Every attempt was used up.
    TimedOut,
    /// The cancellation flag was cleared.
    Cancelled,
}

/// Repeats a check at a fixed interval for a bounded number of attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Poller {
    interval: Duration,
    attempts: u32,
}

impl Poller {
    /// Polls every `interval` for at most `budget`.
    pub fn new(budget: Duration, interval: Duration) -> Self {
        let attempts = budget.as_millis() / interval.as_millis().max(1);
        Self {
            interval,
            attempts: u32::try_from(attempts).unwrap_or(u32::MAX).max(1),
        }
    }

    /// Polls every `interval`, `attempts` times.
    #[cfg(test)]
    pub const fn with_attempts(interval: Duration, attempts: u32) -> Self {
        Self { interval, attempts }
    }

    /// Runs `check` until it yields a value, the attempts run out, or
    /// `running` is cleared.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by `check`.
    pub fn poll<T>(
        &self,
        running: &AtomicBool,
        mut check: impl FnMut() -> Result<Option<T>>,
    ) -> Result<Poll<T>> {
        for attempt in 0..self.attempts {
            if !running.load(Ordering::SeqCst) {
                return Ok(Poll::Cancelled);
            }
            if let Some(value) = check()? {
                return Ok(Poll::Ready(value));
            }
            if attempt + 1 < self.attempts {
                thread::sleep(self.interval);
            }
        }
        Ok(Poll::TimedOut)
    }
}

/// How one test ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestOutcome {
    /// The job completed.
    Passed,
    /// The job failed.
    Failed,
    /// The test could not be run or observed to the end.
    Skipped(String),
    /// The run was interrupted.
    Cancelled,
}

/// A test cell ready to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestTarget {
    /// Name of the Cell object.
    pub cell: String,
    /// Name of the job's service template.
    pub service: String,
    /// Path of the Cell document.
    pub path: PathBuf,
}

impl TestTarget {
    /// Prefix shared by the names of the job's pods.
    pub fn pod_prefix(&self) -> String {
        format!("{}--{}-job", self.cell, self.service)
    }

    /// Name of the job object.
    pub fn job_name(&self) -> String {
        format!("{}--{}", self.cell, self.service)
    }
}

/// Runs test cells one at a time on a [`Cluster`].
pub struct TestRunner<'a, C: Cluster> {
    cluster: &'a C,
    running: Arc<AtomicBool>,
    logs_dir: PathBuf,
    settle: Duration,
    pod_lookup: Poller,
    pod_running: Poller,
    job_completion: Poller,
}

impl<'a, C: Cluster> TestRunner<'a, C> {
    /// Creates a runner with the default timeouts, saving logs under
    /// `logs_dir`. Clearing `running` cancels the current test.
    pub fn new(cluster: &'a C, running: Arc<AtomicBool>, logs_dir: impl Into<PathBuf>) -> Self {
        Self {
            cluster,
            running,
            logs_dir: logs_dir.into(),
            settle: POLL_INTERVAL,
            pod_lookup: Poller::new(POD_LOOKUP_TIMEOUT, POLL_INTERVAL),
            pod_running: Poller::new(POD_RUNNING_TIMEOUT, POLL_INTERVAL),
            job_completion: Poller::new(JOB_COMPLETION_TIMEOUT, POLL_INTERVAL),
        }
    }

    /// Replaces every wait with `poller` and drops the settle delay.
    #[cfg(test)]
    #[must_use]
    pub fn with_poller(mut self, poller: Poller) -> Self {
        self.settle = Duration::ZERO;
        self.pod_lookup = poller;
        self.pod_running = poller;
        self.job_completion = poller;
        self
    }

    /// Runs `target` and always tries to delete its cell afterwards.
    ///
    /// # Errors
    ///
    /// Returns an error if the cluster cannot be reached or the log
    /// cannot be saved.
    pub fn run(&self, target: &TestTarget) -> Result<TestOutcome> {
        tracing::info!(test = %target.cell, "running test");
        self.cluster.apply(&target.path)?;
        let outcome = self.observe(target);
        if let Err(e) = self.cluster.delete_cell(&target.cell) {
            tracing::warn!(test = %target.cell, error = %e, "failed to delete test cell");
        }
        let outcome = outcome?;
        tracing::info!(test = %target.cell, ?outcome, "test finished");
        Ok(outcome)
    }

    fn observe(&self, target: &TestTarget) -> Result<TestOutcome> {
        thread::sleep(self.settle);
        let prefix = target.pod_prefix();

        let pod = match self
            .pod_lookup
            .poll(&self.running, || Ok(find_pod(&self.cluster.pods()?, &prefix).map(|p| p.name)))?
        {
            Poll::Ready(pod) => pod,
            Poll::TimedOut => {
                tracing::warn!(test = %target.cell, "test pod not found, skipping");
                return Ok(TestOutcome::Skipped("test pod not found".into()));
            }
            Poll::Cancelled => return Ok(TestOutcome::Cancelled),
        };

        match self.pod_running.poll(&self.running, || {
            Ok(find_pod(&self.cluster.pods()?, &prefix)
                .filter(|p| SETTLED_POD_STATES.iter().any(|s| p.status.contains(s))))
        })? {
            Poll::Ready(status) => {
                tracing::debug!(pod = %pod, status = %status.status, "test pod settled");
            }
            Poll::TimedOut => {
                tracing::warn!(test = %target.cell, pod = %pod, "test pod did not start, skipping");
                return Ok(TestOutcome::Skipped("test pod did not start".into()));
            }
            Poll::Cancelled => return Ok(TestOutcome::Cancelled),
        }

        if let Err(e) = self.cluster.follow_logs(&pod, &target.service) {
            tracing::warn!(pod = %pod, error = %e, "log stream ended with an error");
        }

        let job = target.job_name();
        let outcome = match self.job_completion.poll(&self.running, || {
            if self.cluster.job_condition(&job, "Complete")?.trim() == "True" {
                return Ok(Some(TestOutcome::Passed));
            }
            if self.cluster.job_condition(&job, "Failed")?.trim() == "True" {
                return Ok(Some(TestOutcome::Failed));
            }
            Ok(None)
        })? {
            Poll::Ready(outcome) => outcome,
            Poll::TimedOut => {
                tracing::warn!(job = %job, "job did not finish in time");
                return Ok(TestOutcome::Skipped("job did not finish in time".into()));
            }
            Poll::Cancelled => return Ok(TestOutcome::Cancelled),
        };

        self.save_logs(&pod, target)?;
        Ok(outcome)
    }

    fn save_logs(&self, pod: &str, target: &TestTarget) -> Result<()> {
        let log = self.cluster.logs(pod, &target.service)?;
        let path = self.logs_dir.join(format!("{}.log", target.cell));
        fs::create_dir_all(&self.logs_dir).map_err(|e| CellError::Io {
            path: self.logs_dir.clone(),
            source: e,
        })?;
        fs::write(&path, log).map_err(|e| CellError::Io {
            path: path.clone(),
            source: e,
        })?;
        tracing::info!(path = %path.display(), "saved test log");
        Ok(())
    }
}

/// A row of the pod listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodStatus {
    /// Pod name.
    pub name: String,
    /// Status column.
    pub status: String,
}

/// Finds the first pod whose name starts with `prefix` in a
/// `kubectl get pods --no-headers` listing.
pub fn find_pod(listing: &str, prefix: &str) -> Option<PodStatus> {
    listing.lines().find_map(|line| {
        let mut columns = line.split_whitespace();
        let name = columns.next()?;
        if !name.starts_with(prefix) {
            return None;
        }
        let status = columns.nth(1).unwrap_or_default();
        Some(PodStatus {
            name: name.to_string(),
            status: status.to_string(),
        })
    })
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::VecDeque;

    use super::*;

    const POD: &str = "smoke--smoke-job-x7k2p";

    /// Replays scripted pod listings and job conditions.
    #[derive(Default)]
    struct FakeCluster {
        listings: RefCell<VecDeque<String>>,
        complete: RefCell<VecDeque<&'static str>>,
        failed: &'static str,
        calls: RefCell<Vec<String>>,
    }

    impl FakeCluster {
        fn with_listings(listings: &[&str]) -> Self {
            Self {
                listings: RefCell::new(listings.iter().map(ToString::to_string).collect()),
                ..Self::default()
            }
        }

        fn record(&self, call: String) {
            self.calls.borrow_mut().push(call);
        }
    }

    impl Cluster for FakeCluster {
        fn apply(&self, path: &Path) -> Result<()> {
            self.record(format!("apply {}", path.display()));
            Ok(())
        }

        fn pods(&self) -> Result<String> {
            let mut listings = self.listings.borrow_mut();
            let listing = if listings.len() > 1 {
                listings.pop_front().unwrap_or_default()
            } else {
                listings.front().cloned().unwrap_or_default()
            };
            Ok(listing)
        }

        fn job_condition(&self, _job: &str, condition: &str) -> Result<String> {
            if condition == "Failed" {
                return Ok(self.failed.to_string());
            }
            Ok(self.complete.borrow_mut().pop_front().unwrap_or("").to_string())
        }

        fn follow_logs(&self, pod: &str, container: &str) -> Result<()> {
            self.record(format!("follow {pod} {container}"));
            Ok(())
        }

        fn logs(&self, _pod: &str, _container: &str) -> Result<String> {
            Ok("all tests passed\n".into())
        }

        fn delete_cell(&self, name: &str) -> Result<()> {
            self.record(format!("delete {name}"));
            Ok(())
        }
    }

    fn target() -> TestTarget {
        TestTarget {
            cell: "smoke".into(),
            service: "smoke".into(),
            path: PathBuf::from("target/cellery/smoke.yaml"),
        }
    }

    fn runner<'a>(
        cluster: &'a FakeCluster,
        logs: &Path,
        running: Arc<AtomicBool>,
    ) -> TestRunner<'a, FakeCluster> {
        TestRunner::new(cluster, running, logs)
            .with_poller(Poller::with_attempts(Duration::ZERO, 3))
    }

    // ── Pod listing ──────────────────────────────────────────────────

    #[test]
    fn find_pod_matches_prefix_and_reads_status() {
        let listing = "other-pod 1/1 Running 0 2m\nsmoke--smoke-job-x7k2p 0/1 ContainerCreating 0 3s\n";
        let pod = find_pod(listing, "smoke--smoke-job").expect("pod");
        assert_eq!(pod.name, POD);
        assert_eq!(pod.status, "ContainerCreating");
        assert!(find_pod(listing, "missing").is_none());
    }

    // ── Polling ──────────────────────────────────────────────────────

    #[test]
    fn poller_counts_attempts_from_budget() {
        let poller = Poller::new(Duration::from_secs(60), Duration::from_secs(5));
        assert_eq!(poller, Poller::with_attempts(Duration::from_secs(5), 12));
        let tiny = Poller::new(Duration::ZERO, Duration::from_secs(5));
        assert_eq!(tiny.attempts, 1);
    }

    #[test]
    fn poller_times_out_and_cancels() {
        let running = AtomicBool::new(true);
        let poller = Poller::with_attempts(Duration::ZERO, 4);
        let mut calls = 0;
        let result: Poll<()> = poller
            .poll(&running, || {
                calls += 1;
                Ok(None)
            })
            .expect("poll");
        assert_eq!(result, Poll::TimedOut);
        assert_eq!(calls, 4);

        running.store(false, Ordering::SeqCst);
        let result: Poll<()> = poller.poll(&running, || Ok(None)).expect("poll");
        assert_eq!(result, Poll::Cancelled);
    }

    // ── Test runs ────────────────────────────────────────────────────

    #[test]
    fn completed_job_passes_and_saves_log() {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let cluster = FakeCluster::with_listings(&[
            "",
            "smoke--smoke-job-x7k2p 0/1 Pending 0 1s",
            "smoke--smoke-job-x7k2p 1/1 Running 0 4s",
        ]);
        cluster.complete.borrow_mut().extend(["", "True"]);
        let outcome = runner(&cluster, dir.path(), Arc::new(AtomicBool::new(true)))
            .run(&target())
            .expect("run");

        assert_eq!(outcome, TestOutcome::Passed);
        let log = fs::read_to_string(dir.path().join("smoke.log")).expect("log");
        assert_eq!(log, "all tests passed\n");
        let calls = cluster.calls.borrow();
        assert_eq!(calls[0], "apply target/cellery/smoke.yaml");
        assert_eq!(calls[1], format!("follow {POD} smoke"));
        assert_eq!(calls.last().map(String::as_str), Some("delete smoke"));
    }

    #[test]
    fn failed_job_is_reported() {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let mut cluster = FakeCluster::with_listings(&["smoke--smoke-job-x7k2p 0/1 Error 0 9s"]);
        cluster.failed = "True";
        let outcome = runner(&cluster, dir.path(), Arc::new(AtomicBool::new(true)))
            .run(&target())
            .expect("run");
        assert_eq!(outcome, TestOutcome::Failed);
    }

    #[test]
    fn missing_pod_skips_and_still_deletes() {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let cluster = FakeCluster::with_listings(&["unrelated 1/1 Running 0 1m"]);
        let outcome = runner(&cluster, dir.path(), Arc::new(AtomicBool::new(true)))
            .run(&target())
            .expect("run");
        assert!(matches!(outcome, TestOutcome::Skipped(_)));
        assert!(!dir.path().join("smoke.log").exists());
        assert_eq!(cluster.calls.borrow().last().map(String::as_str), Some("delete smoke"));
    }

    #[test]
    fn cancellation_deletes_the_cell() {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let cluster = FakeCluster::with_listings(&[""]);
        let outcome = runner(&cluster, dir.path(), Arc::new(AtomicBool::new(false)))
            .run(&target())
            .expect("run");
        assert_eq!(outcome, TestOutcome::Cancelled);
        assert_eq!(cluster.calls.borrow().last().map(String::as_str), Some("delete smoke"));
    }
}
