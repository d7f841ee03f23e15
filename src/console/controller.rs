//! Structured console controller.
//!
//! Drives a session as discrete command/response exchanges: each submitted
//! line becomes a history record, runs on the execution backend, and comes
//! back as a structured result plus transcript output. Lines starting with
//! `:` are special commands handled locally and never reach the backend.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::SessionDriver;
use crate::backend::ExecBackend;
use crate::error::ConsoleError;
use crate::events::{EventSink, ServerEvent};
use crate::history::now_ms;
use crate::session::{SessionId, SessionRegistry, SessionStatus};
use crate::target::{ProbeReport, TargetLifecycle, LOCAL_TARGET};
use crate::Result;

/// Structured command/response session strategy.
pub struct ConsoleController {
    registry: Arc<SessionRegistry>,
    backend: Arc<dyn ExecBackend>,
    lifecycle: Arc<dyn TargetLifecycle>,
    history_capacity: usize,
    command_timeout: Duration,
}

fn prompt(target: &str) -> String {
    format!("root@{}:~$ ", target)
}

/// Prefix every stderr line so it stands out in the transcript.
fn stderr_lines(stderr: &str) -> String {
    let mut out = String::new();
    for line in stderr.lines() {
        out.push_str("! ");
        out.push_str(line);
        out.push('\n');
    }
    out
}

impl ConsoleController {
    pub fn new(
        registry: Arc<SessionRegistry>,
        backend: Arc<dyn ExecBackend>,
        lifecycle: Arc<dyn TargetLifecycle>,
        history_capacity: usize,
        command_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            backend,
            lifecycle,
            history_capacity,
            command_timeout,
        }
    }

    /// Emit the status event and its human-readable transcript lines.
    async fn report_probe(target: &str, report: &ProbeReport, sink: &EventSink) {
        sink.emit(ServerEvent::TerminalStatus {
            reachable: report.reachable,
            running: report.running,
            detail: report.detail.clone(),
        })
        .await;

        if report.reachable && report.running {
            sink.output(format!("Target {} is running.\n", target)).await;
        } else if report.reachable {
            sink.output(format!(
                "Target {} is present but not running. Type :start to start it.\n",
                target
            ))
            .await;
        } else {
            sink.output(format!(
                "Target {} is unreachable: {}\n",
                target, report.detail
            ))
            .await;
        }
    }

    fn status_for(report: &ProbeReport) -> SessionStatus {
        if report.reachable && report.running {
            SessionStatus::Ready
        } else {
            SessionStatus::Degraded
        }
    }

    async fn handle_history(&self, id: SessionId, sink: &EventSink) -> Result<()> {
        let (target, records) = self
            .registry
            .update(&id, |s| (s.target.clone(), s.history.snapshot()))?;

        if records.is_empty() {
            sink.output("No commands in history.\n").await;
        } else {
            let mut out = String::new();
            for record in &records {
                match record.exit_code {
                    Some(code) => {
                        out.push_str(&format!("[{}] {} (exit={})\n", record.id, record.command, code))
                    }
                    None => out.push_str(&format!("[{}] {} (running)\n", record.id, record.command)),
                }
            }
            sink.output(out).await;
        }
        sink.output(prompt(&target)).await;
        Ok(())
    }

    async fn handle_clear(&self, id: SessionId, sink: &EventSink) -> Result<()> {
        // Clears the display only; history is untouched.
        let target = self.registry.update(&id, |s| s.target.clone())?;
        sink.emit(ServerEvent::TerminalClear).await;
        sink.output(prompt(&target)).await;
        Ok(())
    }

    async fn handle_start(&self, id: SessionId, sink: &EventSink) -> Result<()> {
        let target = self.registry.update(&id, |s| s.target.clone())?;

        if target == LOCAL_TARGET {
            sink.output("Target local is always available.\n").await;
            sink.output(prompt(&target)).await;
            return Ok(());
        }

        let registry = Arc::clone(&self.registry);
        let lifecycle = Arc::clone(&self.lifecycle);
        let sink = sink.clone();

        // Starting may take seconds; never block the dispatch path.
        tokio::spawn(async move {
            sink.output(format!("Starting {}...\n", target)).await;

            match lifecycle.start(&target).await {
                Ok(()) => {
                    let report = lifecycle.probe(&target).await;
                    Self::report_probe(&target, &report, &sink).await;
                    let status = Self::status_for(&report);
                    if let Err(e) = registry.update(&id, |s| s.set_status(status)) {
                        debug!(session = %id, error = %e, "status update after start skipped");
                    }
                }
                Err(e) => {
                    warn!(session = %id, %target, error = %e, "start failed");
                    sink.output(format!("! {}\n", e)).await;
                }
            }
            sink.output(prompt(&target)).await;
        });

        Ok(())
    }

    /// Submit a command line: run immediately, or queue behind the one
    /// already executing. One command runs at a time per session.
    async fn submit(&self, id: SessionId, command: String, sink: &EventSink) -> Result<()> {
        let run_now = self.registry.update(&id, |s| {
            if s.executing {
                s.queue.push_back(command.clone());
                false
            } else {
                s.executing = true;
                true
            }
        })?;

        if !run_now {
            debug!(session = %id, "command queued behind running command");
            return Ok(());
        }

        let registry = Arc::clone(&self.registry);
        let backend = Arc::clone(&self.backend);
        let timeout = self.command_timeout;
        let sink = sink.clone();

        tokio::spawn(async move {
            run_command_loop(registry, backend, timeout, id, command, sink).await;
        });

        Ok(())
    }
}

/// Worker loop for one session's serialized command stream.
///
/// Runs the given command, then drains anything queued behind it. A
/// `SessionNotFound` from the registry means the client disconnected while
/// the command ran; the result is discarded and the loop ends.
async fn run_command_loop(
    registry: Arc<SessionRegistry>,
    backend: Arc<dyn ExecBackend>,
    timeout: Duration,
    id: SessionId,
    first: String,
    sink: EventSink,
) {
    let mut command = first;

    loop {
        let record = match registry.update(&id, |s| s.begin_command(command.clone())) {
            Ok(record) => record,
            Err(e) => {
                debug!(session = %id, error = %e, "session gone before command start");
                return;
            }
        };

        sink.emit(ServerEvent::TerminalCommandStarted {
            id: record.id,
            command: record.command.clone(),
            started_at: record.started_at,
        })
        .await;
        sink.output(format!("{}\n", command)).await;

        let outcome = backend.run(&command, timeout).await;
        let finished_at = now_ms();

        let completed = match registry.update(&id, |s| {
            s.finish_command(record.id, &outcome, finished_at)
        }) {
            Ok(completed) => completed,
            Err(ConsoleError::SessionNotFound(_)) => {
                debug!(session = %id, "result discarded, session disconnected");
                return;
            }
            Err(e) => {
                warn!(session = %id, error = %e, "command completion failed");
                return;
            }
        };

        let target = match registry.update(&id, |s| s.target.clone()) {
            Ok(target) => target,
            Err(_) => return,
        };

        if let Some(completed) = completed {
            sink.emit(ServerEvent::TerminalCommandResult {
                id: completed.id,
                command: completed.command.clone(),
                stdout: completed.stdout.clone(),
                stderr: completed.stderr.clone(),
                exit_code: completed.exit_code.unwrap_or(1),
                started_at: completed.started_at,
                finished_at: completed.finished_at.unwrap_or(finished_at),
                duration_ms: completed.duration_ms.unwrap_or(0),
            })
            .await;
        } else {
            // History rotated past the record; still show the output.
            debug!(session = %id, record = record.id, "record evicted before completion");
        }

        if !outcome.stdout.is_empty() {
            sink.output(outcome.stdout.clone()).await;
        }
        if !outcome.stderr.is_empty() {
            sink.output(stderr_lines(&outcome.stderr)).await;
        }
        sink.output(prompt(&target)).await;

        let next = match registry.update(&id, |s| {
            match s.queue.pop_front() {
                Some(next) => Some(next),
                None => {
                    s.executing = false;
                    None
                }
            }
        }) {
            Ok(next) => next,
            Err(_) => return,
        };

        match next {
            Some(next) => command = next,
            None => return,
        }
    }
}

#[async_trait]
impl SessionDriver for ConsoleController {
    async fn connect(&self, id: SessionId, target: &str, sink: &EventSink) -> Result<()> {
        info!(session = %id, %target, backend = %self.backend.describe(), "console connect");

        self.registry.register(id, target, self.history_capacity)?;
        sink.output(format!("=== Connecting to {} ===\n", target)).await;

        let report = self.lifecycle.probe(target).await;
        Self::report_probe(target, &report, sink).await;

        let status = Self::status_for(&report);
        self.registry.update(&id, |s| s.set_status(status))??;

        sink.output("Special commands: :history  :clear  :start\n").await;
        sink.output(prompt(target)).await;

        let history = self.registry.update(&id, |s| s.history.snapshot())?;
        sink.emit(ServerEvent::TerminalHistoryFull { history }).await;

        Ok(())
    }

    async fn input(&self, id: SessionId, data: &str, sink: &EventSink) -> Result<()> {
        let target = match self.registry.update(&id, |s| s.target.clone()) {
            Ok(target) => target,
            Err(ConsoleError::SessionNotFound(_)) => {
                sink.output("Session not found. Reconnect to continue.\n").await;
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        let line = data.trim();
        if line.is_empty() {
            sink.output(prompt(&target)).await;
            return Ok(());
        }

        match line {
            ":history" => self.handle_history(id, sink).await,
            ":clear" => self.handle_clear(id, sink).await,
            ":start" => self.handle_start(id, sink).await,
            _ => self.submit(id, line.to_string(), sink).await,
        }
    }

    async fn disconnect(&self, id: SessionId) -> Result<()> {
        if let Some(session) = self.registry.remove(&id)? {
            info!(
                session = %id,
                target = %session.target,
                commands = session.history.len(),
                "console disconnect"
            );
        }
        Ok(())
    }
}
