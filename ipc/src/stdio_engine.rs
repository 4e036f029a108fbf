use async_trait::async_trait;
use crafter_core::errors::{EngineError, EngineResult};
use crafter_core::{GameEngine, Observation, PlayerStatus, StepOutcome};
use std::process::Stdio;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::{debug, info, warn};

use crate::engine_messages::{EnginePayload, EngineRequest, EngineResponse};

/// Line-delimited JSON request/response exchange with an engine bridge.
///
/// Strictly one request in flight: every request is answered before the
/// next one is written.
pub struct EngineConnection<R, W> {
    reader: R,
    writer: W,
    player: PlayerStatus,
}

impl<R, W> EngineConnection<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader,
            writer,
            player: PlayerStatus::default(),
        }
    }

    async fn send(&mut self, request: &EngineRequest) -> EngineResult<()> {
        let mut line = serde_json::to_vec(request)?;
        line.push(b'\n');
        self.writer.write_all(&line).await?;
        self.writer.flush().await?;
        Ok(())
    }

    async fn request(&mut self, request: &EngineRequest) -> EngineResult<EnginePayload> {
        debug!(?request, "Sending engine request");
        self.send(request).await?;

        let mut line = String::new();
        let bytes_read = self.reader.read_line(&mut line).await?;
        if bytes_read == 0 {
            return Err(EngineError::Closed);
        }

        let response: EngineResponse = serde_json::from_str(line.trim()).map_err(|e| {
            EngineError::Protocol(format!("Invalid response line '{}': {}", line.trim(), e))
        })?;

        match response {
            EngineResponse::Ok(payload) => {
                self.player = payload.player.clone();
                Ok(payload)
            }
            EngineResponse::Error { message } => Err(EngineError::Remote(message)),
        }
    }

    /// Tells the bridge to exit. No response is expected.
    pub async fn close(&mut self) -> EngineResult<()> {
        self.send(&EngineRequest::Close).await
    }
}

#[async_trait]
impl<R, W> GameEngine for EngineConnection<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn reset(&mut self) -> EngineResult<Observation> {
        let payload = self.request(&EngineRequest::Reset).await?;
        Ok(payload.observation)
    }

    async fn step(&mut self, action_id: u32) -> EngineResult<StepOutcome> {
        let payload = self.request(&EngineRequest::Step { action: action_id }).await?;
        Ok(StepOutcome {
            observation: payload.observation,
            reward: payload.reward,
            done: payload.done,
            info: payload.info,
        })
    }

    fn player(&self) -> &PlayerStatus {
        &self.player
    }
}

/// Game engine running as a child process that speaks the bridge protocol
/// on its stdin/stdout. The engine's stderr is passed through.
pub struct StdioEngine {
    connection: EngineConnection<BufReader<ChildStdout>, ChildStdin>,
    child: Child,
}

impl StdioEngine {
    /// Spawns `command args... --seed <seed>`.
    pub async fn launch(command: &str, args: &[String], seed: u64) -> EngineResult<Self> {
        let mut cmd = Command::new(command);
        cmd.args(args)
            .arg("--seed")
            .arg(seed.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .map_err(|e| EngineError::Launch(format!("Failed to spawn '{}': {}", command, e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| EngineError::Launch("Failed to get engine stdin".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| EngineError::Launch("Failed to get engine stdout".to_string()))?;

        info!(command, seed, "Launched engine bridge");
        Ok(Self {
            connection: EngineConnection::new(BufReader::new(stdout), stdin),
            child,
        })
    }

    /// Asks the bridge to exit and waits for it.
    pub async fn shutdown(mut self) -> EngineResult<()> {
        if let Err(e) = self.connection.close().await {
            warn!(error = %e, "Failed to send close request, killing engine");
            self.child.kill().await?;
            return Ok(());
        }
        let status = self.child.wait().await?;
        debug!(%status, "Engine bridge exited");
        Ok(())
    }
}

#[async_trait]
impl GameEngine for StdioEngine {
    async fn reset(&mut self) -> EngineResult<Observation> {
        self.connection.reset().await
    }

    async fn step(&mut self, action_id: u32) -> EngineResult<StepOutcome> {
        self.connection.step(action_id).await
    }

    fn player(&self) -> &PlayerStatus {
        self.connection.player()
    }
}
