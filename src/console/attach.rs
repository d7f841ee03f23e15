//! Raw PTY attach bridge.
//!
//! Alternative session strategy: instead of structured command/response
//! exchanges, the client is wired byte-for-byte to an interactive shell
//! running inside the target under a pseudo-terminal. Input is written to
//! the PTY verbatim (no trimming, no special commands) and everything the
//! PTY produces streams back as output frames. No command history is kept;
//! the byte stream has no command boundaries to record.
//!
//! PTY I/O is blocking, so each attached session owns two dedicated
//! threads: a reader relaying output into the event channel and a writer
//! draining an input queue. The async dispatch path only ever touches the
//! queue, never the PTY itself.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::sync::mpsc;
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;
use portable_pty::{native_pty_system, CommandBuilder, PtySize};
use tracing::{debug, info, warn};

use super::SessionDriver;
use crate::error::ConsoleError;
use crate::events::{EventSink, ServerEvent};
use crate::session::{SessionId, SessionRegistry, SessionStatus};
use crate::target::{valid_target, LOCAL_TARGET};
use crate::Result;

const DEFAULT_ROWS: u16 = 24;
const DEFAULT_COLS: u16 = 80;
const READ_BUF_SIZE: usize = 4096;

/// Live PTY endpoints for one attached session.
///
/// Input bytes are queued to the writer thread; dropping the sender on
/// disconnect is what ends that thread.
struct AttachBridge {
    input_tx: mpsc::Sender<Vec<u8>>,
    child: Mutex<Box<dyn portable_pty::Child + Send + Sync>>,
}

/// Raw byte-relay session strategy.
pub struct RawAttachConsole {
    registry: Arc<SessionRegistry>,
    bridges: RwLock<HashMap<SessionId, AttachBridge>>,
    shell: String,
    history_capacity: usize,
}

impl RawAttachConsole {
    pub fn new(registry: Arc<SessionRegistry>, shell: impl Into<String>, history_capacity: usize) -> Self {
        Self {
            registry,
            bridges: RwLock::new(HashMap::new()),
            shell: shell.into(),
            history_capacity,
        }
    }

    /// The command spawned under the PTY for a target.
    fn build_command(&self, target: &str) -> CommandBuilder {
        if target == LOCAL_TARGET {
            CommandBuilder::new(&self.shell)
        } else {
            let mut cmd = CommandBuilder::new("docker");
            cmd.arg("exec");
            cmd.arg("-i");
            cmd.arg("-t");
            cmd.arg(target);
            cmd.arg(&self.shell);
            cmd
        }
    }

    fn spawn_bridge(&self, id: SessionId, target: &str, sink: &EventSink) -> Result<()> {
        let pty_system = native_pty_system();
        let pair = pty_system
            .openpty(PtySize {
                rows: DEFAULT_ROWS,
                cols: DEFAULT_COLS,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|e| ConsoleError::Pty(e.to_string()))?;

        let child = pair
            .slave
            .spawn_command(self.build_command(target))
            .map_err(|e| ConsoleError::Pty(e.to_string()))?;

        let mut reader = pair
            .master
            .try_clone_reader()
            .map_err(|e| ConsoleError::Pty(e.to_string()))?;

        let mut writer = pair
            .master
            .take_writer()
            .map_err(|e| ConsoleError::Pty(e.to_string()))?;

        let (input_tx, input_rx) = mpsc::channel::<Vec<u8>>();

        {
            let mut bridges = self.bridges.write().map_err(|_| ConsoleError::LockPoisoned)?;
            bridges.insert(
                id,
                AttachBridge {
                    input_tx,
                    child: Mutex::new(child),
                },
            );
        }

        // PTY writes block under backpressure (the child may stop draining
        // its input); a dedicated thread absorbs that so the dispatch path
        // never does. The thread ends when the bridge drops the sender.
        std::thread::spawn(move || {
            while let Ok(bytes) = input_rx.recv() {
                if writer
                    .write_all(&bytes)
                    .and_then(|_| writer.flush())
                    .is_err()
                {
                    debug!(session = %id, "pty writer closed");
                    break;
                }
            }
            debug!(session = %id, "pty writer thread finished");
        });

        // PTY reads are blocking; a dedicated thread relays them into the
        // async event channel. The master half stays alive on this thread.
        let reader_sink = sink.clone();
        let master = pair.master;
        std::thread::spawn(move || {
            let _master = master;
            let mut buf = [0u8; READ_BUF_SIZE];
            loop {
                match reader.read(&mut buf) {
                    // EOF: the shell exited.
                    Ok(0) => break,
                    Ok(n) => {
                        let data = String::from_utf8_lossy(&buf[..n]).into_owned();
                        if reader_sink.is_closed() {
                            break;
                        }
                        reader_sink.emit_blocking(ServerEvent::TerminalOutput { data });
                    }
                    Err(e) => {
                        // EIO is the normal "slave side closed" signal on Linux.
                        #[cfg(unix)]
                        if e.raw_os_error() == Some(libc::EIO) {
                            break;
                        }
                        debug!(session = %id, error = %e, "pty read ended");
                        break;
                    }
                }
            }
            debug!(session = %id, "pty reader thread finished");
        });

        Ok(())
    }
}

#[async_trait]
impl SessionDriver for RawAttachConsole {
    async fn connect(&self, id: SessionId, target: &str, sink: &EventSink) -> Result<()> {
        info!(session = %id, %target, "raw attach connect");

        if !valid_target(target) {
            sink.output(format!("! Invalid target name: {:?}\n", target)).await;
            return Err(ConsoleError::TargetUnreachable(format!(
                "invalid target name: {:?}",
                target
            )));
        }

        self.registry.register(id, target, self.history_capacity)?;

        match self.spawn_bridge(id, target, sink) {
            Ok(()) => {
                self.registry
                    .update(&id, |s| s.set_status(SessionStatus::Ready))??;
                // A live PTY is the reachability proof in this mode.
                sink.emit(ServerEvent::TerminalStatus {
                    reachable: true,
                    running: true,
                    detail: String::new(),
                })
                .await;
                Ok(())
            }
            Err(e) => {
                warn!(session = %id, %target, error = %e, "attach failed");
                self.registry
                    .update(&id, |s| s.set_status(SessionStatus::Degraded))??;
                sink.emit(ServerEvent::TerminalStatus {
                    reachable: false,
                    running: false,
                    detail: e.to_string(),
                })
                .await;
                sink.output(format!("! Attach failed: {}\n", e)).await;
                Err(e)
            }
        }
    }

    async fn input(&self, id: SessionId, data: &str, _sink: &EventSink) -> Result<()> {
        self.registry.update(&id, |s| s.touch())?;

        let bridges = self.bridges.read().map_err(|_| ConsoleError::LockPoisoned)?;
        let bridge = bridges
            .get(&id)
            .ok_or_else(|| ConsoleError::SessionNotFound(id.to_string()))?;

        // Bytes pass through untouched; the remote shell owns echo,
        // line editing, and control sequences. Queuing to the writer
        // thread keeps PTY backpressure off the dispatch path.
        bridge
            .input_tx
            .send(data.as_bytes().to_vec())
            .map_err(|_| ConsoleError::Transport("attach writer gone".to_string()))?;
        Ok(())
    }

    async fn disconnect(&self, id: SessionId) -> Result<()> {
        let bridge = {
            let mut bridges = self.bridges.write().map_err(|_| ConsoleError::LockPoisoned)?;
            bridges.remove(&id)
        };

        if let Some(bridge) = bridge {
            let mut child = bridge.child.lock().map_err(|_| ConsoleError::LockPoisoned)?;
            if let Err(e) = child.kill() {
                debug!(session = %id, error = %e, "attach child already gone");
            }
        }

        self.registry.remove(&id)?;
        info!(session = %id, "raw attach disconnect");
        Ok(())
    }
}
