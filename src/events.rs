//! Event channel frames and the emit seam.
//!
//! The console never talks to a socket directly; it emits typed server
//! events into an [`EventSink`], and the transport layer serializes them
//! as JSON text frames. Client frames arrive the same way in reverse.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::debug;

use crate::history::CommandRecord;

/// Events pushed from the server to a connected console client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ServerEvent {
    /// A chunk of transcript text to render verbatim.
    TerminalOutput { data: String },
    /// Target reachability and run-state report.
    TerminalStatus {
        reachable: bool,
        running: bool,
        detail: String,
    },
    /// Instruction to wipe the client display. Does not touch history.
    TerminalClear,
    /// A command has been accepted and started executing.
    TerminalCommandStarted {
        id: u64,
        command: String,
        started_at: u64,
    },
    /// A command finished; the complete structured record.
    TerminalCommandResult {
        id: u64,
        command: String,
        stdout: String,
        stderr: String,
        exit_code: i32,
        started_at: u64,
        finished_at: u64,
        duration_ms: u64,
    },
    /// Full history snapshot, oldest first.
    TerminalHistoryFull { history: Vec<CommandRecord> },
}

/// Events received from a console client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Open a console against the named target.
    TerminalStart { target: String },
    /// A line (structured mode) or raw bytes (attach mode) of input.
    TerminalInput { data: InputData },
}

/// Input payload shape.
///
/// Clients send either a bare string or an object with a `data` field;
/// both deserialize to the same text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum InputData {
    Text(String),
    Framed { data: String },
}

impl InputData {
    /// The carried text, whichever shape it arrived in.
    pub fn text(&self) -> &str {
        match self {
            Self::Text(s) => s,
            Self::Framed { data } => data,
        }
    }
}

/// Sending half of a session's event channel.
///
/// Cheap to clone; every emitter for one session feeds the same
/// transport queue, so frame order is the order of emit calls.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::Sender<ServerEvent>,
}

impl EventSink {
    /// Wrap a channel sender.
    pub fn new(tx: mpsc::Sender<ServerEvent>) -> Self {
        Self { tx }
    }

    /// Create a sink and its receiving half with the given queue depth.
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<ServerEvent>) {
        let (tx, rx) = mpsc::channel(buffer);
        (Self::new(tx), rx)
    }

    /// Emit an event; silently dropped if the client has gone away.
    pub async fn emit(&self, event: ServerEvent) {
        if self.tx.send(event).await.is_err() {
            debug!("event dropped, client channel closed");
        }
    }

    /// Emit a transcript output chunk.
    pub async fn output(&self, data: impl Into<String>) {
        self.emit(ServerEvent::TerminalOutput { data: data.into() })
            .await;
    }

    /// Blocking emit for use from dedicated reader threads.
    pub fn emit_blocking(&self, event: ServerEvent) {
        if self.tx.blocking_send(event).is_err() {
            debug!("event dropped, client channel closed");
        }
    }

    /// Whether the receiving side is gone.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_event_tags() {
        let json = serde_json::to_string(&ServerEvent::TerminalOutput {
            data: "hi\n".to_string(),
        })
        .unwrap();
        assert!(json.contains(r#""event":"terminal_output""#));

        let json = serde_json::to_string(&ServerEvent::TerminalClear).unwrap();
        assert!(json.contains(r#""event":"terminal_clear""#));

        let json = serde_json::to_string(&ServerEvent::TerminalStatus {
            reachable: true,
            running: false,
            detail: String::new(),
        })
        .unwrap();
        assert!(json.contains(r#""event":"terminal_status""#));
    }

    #[test]
    fn test_command_result_fields() {
        let json = serde_json::to_string(&ServerEvent::TerminalCommandResult {
            id: 3,
            command: "uptime".to_string(),
            stdout: "up 4 days\n".to_string(),
            stderr: String::new(),
            exit_code: 0,
            started_at: 1000,
            finished_at: 1250,
            duration_ms: 250,
        })
        .unwrap();
        assert!(json.contains(r#""event":"terminal_command_result""#));
        assert!(json.contains(r#""exit_code":0"#));
        assert!(json.contains(r#""duration_ms":250"#));
    }

    #[test]
    fn test_client_event_parse() {
        let event: ClientEvent =
            serde_json::from_str(r#"{"event":"terminal_start","target":"web1"}"#).unwrap();
        assert_eq!(
            event,
            ClientEvent::TerminalStart {
                target: "web1".to_string()
            }
        );
    }

    #[test]
    fn test_input_data_shapes() {
        let event: ClientEvent =
            serde_json::from_str(r#"{"event":"terminal_input","data":"ls -la"}"#).unwrap();
        let ClientEvent::TerminalInput { data } = event else {
            panic!("wrong variant");
        };
        assert_eq!(data.text(), "ls -la");

        let event: ClientEvent =
            serde_json::from_str(r#"{"event":"terminal_input","data":{"data":"pwd"}}"#)
                .unwrap();
        let ClientEvent::TerminalInput { data } = event else {
            panic!("wrong variant");
        };
        assert_eq!(data.text(), "pwd");
    }

    #[tokio::test]
    async fn test_sink_preserves_order() {
        let (sink, mut rx) = EventSink::channel(8);
        sink.output("a").await;
        sink.output("b").await;
        sink.emit(ServerEvent::TerminalClear).await;

        assert_eq!(
            rx.recv().await,
            Some(ServerEvent::TerminalOutput {
                data: "a".to_string()
            })
        );
        assert_eq!(
            rx.recv().await,
            Some(ServerEvent::TerminalOutput {
                data: "b".to_string()
            })
        );
        assert_eq!(rx.recv().await, Some(ServerEvent::TerminalClear));
    }

    #[tokio::test]
    async fn test_emit_after_close_is_silent() {
        let (sink, rx) = EventSink::channel(1);
        drop(rx);
        // Must not panic or error.
        sink.output("lost").await;
        assert!(sink.is_closed());
    }
}
