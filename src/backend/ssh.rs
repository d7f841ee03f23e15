//! Remote SSH execution backend.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use russh::client::{self, Handle};
use russh::keys::PrivateKeyWithHashAlg;
use russh::{ChannelMsg, Disconnect};
use tracing::debug;

use super::{ExecBackend, ExecOutcome};
use crate::error::ConsoleError;
use crate::Result;

/// Transport setup timeout, separate from the per-command timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Executes commands non-interactively on a remote host over SSH.
///
/// A fresh connection is opened per command and always closed before the
/// outcome is returned. stdout and stderr arrive multiplexed on the one
/// channel message stream, so draining both cannot deadlock on a full
/// pipe buffer.
#[derive(Debug, Clone)]
pub struct SshBackend {
    host: String,
    user: String,
    key_path: String,
    port: u16,
}

/// Client handler that accepts any server key.
///
/// Host key pinning is a deployment concern; the reference behavior
/// auto-accepts unknown hosts.
struct AcceptingClient;

impl client::Handler for AcceptingClient {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        _server_public_key: &russh::keys::PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        Ok(true)
    }
}

impl SshBackend {
    /// Create a backend for the given host, user, and private key.
    pub fn new(
        host: impl Into<String>,
        user: impl Into<String>,
        key_path: impl Into<String>,
        port: u16,
    ) -> Self {
        Self {
            host: host.into(),
            user: user.into(),
            key_path: key_path.into(),
            port,
        }
    }

    async fn connect(&self) -> Result<Handle<AcceptingClient>> {
        let config = Arc::new(client::Config::default());
        let addr = (self.host.as_str(), self.port);

        let handle = tokio::time::timeout(
            CONNECT_TIMEOUT,
            client::connect(config, addr, AcceptingClient),
        )
        .await
        .map_err(|_| {
            ConsoleError::BackendUnavailable(format!(
                "SSH connect timeout to {}:{}",
                self.host, self.port
            ))
        })?
        .map_err(|e| ConsoleError::BackendUnavailable(format!("SSH connect error: {}", e)))?;

        Ok(handle)
    }

    async fn authenticate(&self, handle: &mut Handle<AcceptingClient>) -> Result<()> {
        let key = russh::keys::load_secret_key(&self.key_path, None)
            .map_err(|e| ConsoleError::BackendUnavailable(format!("SSH key error: {}", e)))?;

        let hash_alg = handle
            .best_supported_rsa_hash()
            .await
            .map_err(|e| ConsoleError::Transport(format!("SSH negotiation error: {}", e)))?
            .flatten();

        let auth = handle
            .authenticate_publickey(
                self.user.clone(),
                PrivateKeyWithHashAlg::new(Arc::new(key), hash_alg),
            )
            .await
            .map_err(|e| ConsoleError::BackendUnavailable(format!("SSH auth error: {}", e)))?;

        if !auth.success() {
            return Err(ConsoleError::BackendUnavailable(format!(
                "SSH auth rejected for user {}",
                self.user
            )));
        }
        Ok(())
    }

    /// Open a session channel, run the command, and drain until close.
    async fn run_on(handle: &Handle<AcceptingClient>, command: &str) -> Result<ExecOutcome> {
        let mut channel = handle
            .channel_open_session()
            .await
            .map_err(|e| ConsoleError::Transport(format!("SSH channel error: {}", e)))?;

        channel
            .exec(true, command)
            .await
            .map_err(|e| ConsoleError::Transport(format!("SSH exec request error: {}", e)))?;

        let mut stdout = String::new();
        let mut stderr = String::new();
        let mut exit_code = None;

        while let Some(msg) = channel.wait().await {
            match msg {
                ChannelMsg::Data { ref data } => {
                    stdout.push_str(&String::from_utf8_lossy(&data[..]));
                }
                ChannelMsg::ExtendedData { ref data, ext } if ext == 1 => {
                    stderr.push_str(&String::from_utf8_lossy(&data[..]));
                }
                ChannelMsg::ExitStatus { exit_status } => {
                    exit_code = Some(exit_status as i32);
                }
                // Keep draining; the loop ends when the channel closes.
                ChannelMsg::Eof | ChannelMsg::Close => {}
                _ => {}
            }
        }

        Ok(ExecOutcome {
            stdout,
            stderr,
            exit_code: exit_code.unwrap_or(1),
        })
    }

    async fn exec_remote(&self, command: &str, timeout: Duration) -> Result<ExecOutcome> {
        let mut handle = self.connect().await?;

        if let Err(e) = self.authenticate(&mut handle).await {
            let _ = handle.disconnect(Disconnect::ByApplication, "", "en").await;
            return Err(e);
        }

        let result = tokio::time::timeout(timeout, Self::run_on(&handle, command)).await;

        // The connection is always closed before returning.
        let _ = handle.disconnect(Disconnect::ByApplication, "", "en").await;

        match result {
            Err(_) => Err(ConsoleError::CommandTimeout(timeout.as_secs())),
            Ok(outcome) => outcome,
        }
    }
}

#[async_trait]
impl ExecBackend for SshBackend {
    async fn run(&self, command: &str, timeout: Duration) -> ExecOutcome {
        debug!(host = %self.host, user = %self.user, %command, "running remote command");

        match self.exec_remote(command, timeout).await {
            Ok(outcome) => outcome,
            Err(ConsoleError::CommandTimeout(_)) => ExecOutcome::timed_out(timeout),
            Err(e) => ExecOutcome::failure(format!("SSH exec error: {}", e)),
        }
    }

    fn describe(&self) -> String {
        format!("ssh {}@{}:{}", self.user, self.host, self.port)
    }
}
