//! Async client for the warehouse bridge process.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::{oneshot, Mutex};

use super::error::{WarehouseError, WarehouseResult};
use super::protocol::{
    codes, methods, ErrorInfo, ExecuteQueryParams, ExecuteQueryResponse, PingResponse,
    RequestEnvelope, ResponseEnvelope, WireParam,
};
use super::Warehouse;
use crate::config::Settings;
use crate::sql::BoundQuery;
use crate::table::ResultTable;

/// Extra time the client waits beyond the warehouse-side query timeout.
const TIMEOUT_GRACE: Duration = Duration::from_secs(10);

type PendingMap = Arc<Mutex<HashMap<String, oneshot::Sender<ResponseEnvelope>>>>;

/// Where queries run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeTarget {
    pub project: String,
    pub location: String,
    /// Warehouse-side limit; the client waits this long plus a grace period.
    pub timeout: Duration,
}

/// Warehouse backed by an external bridge executable.
///
/// The bridge is spawned as a child process and speaks NDJSON over
/// stdin/stdout. Each request has a unique ID for correlation with
/// responses, enabling concurrent queries from one page render.
pub struct BridgeWarehouse {
    /// Writer for sending requests to bridge stdin.
    stdin: Arc<Mutex<BufWriter<ChildStdin>>>,

    /// Map of pending request IDs to response channels.
    pending: PendingMap,

    /// Handle to the bridge child process.
    _child: Child,

    /// Handle to the background reader task.
    reader_task: tokio::task::JoinHandle<()>,

    target: BridgeTarget,
}

impl BridgeWarehouse {
    /// Spawn the bridge executable with `args`.
    pub async fn spawn<P: AsRef<Path>>(
        bridge_path: P,
        args: &[String],
        target: BridgeTarget,
    ) -> WarehouseResult<Self> {
        let mut child = Command::new(bridge_path.as_ref())
            .args(args)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(WarehouseError::SpawnFailed)?;

        let missing = |what: &str| {
            WarehouseError::SpawnFailed(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                format!("bridge {} not captured", what),
            ))
        };
        let stdin = child.stdin.take().ok_or_else(|| missing("stdin"))?;
        let stdout = child.stdout.take().ok_or_else(|| missing("stdout"))?;

        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let reader_task = Self::spawn_reader_task(stdout, pending.clone());

        tracing::info!(
            path = %bridge_path.as_ref().display(),
            project = %target.project,
            "spawned warehouse bridge"
        );
        Ok(Self {
            stdin: Arc::new(Mutex::new(BufWriter::new(stdin))),
            pending,
            _child: child,
            reader_task,
            target,
        })
    }

    /// Spawn the bridge configured in `settings`.
    pub async fn spawn_with_settings(settings: &Settings) -> WarehouseResult<Self> {
        let path = settings
            .bridge_path()
            .map_err(|e| {
                WarehouseError::SpawnFailed(std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    e.to_string(),
                ))
            })?
            .ok_or_else(|| {
                WarehouseError::SpawnFailed(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "bridge executable not configured. Set bridge.path in healthpanel.toml",
                ))
            })?;
        let target = BridgeTarget {
            project: settings.warehouse.project_id.clone(),
            location: settings.warehouse.location.clone(),
            timeout: settings.warehouse.timeout(),
        };
        Self::spawn(path, &settings.bridge.args, target).await
    }

    /// Spawn the background task that reads responses from the bridge.
    fn spawn_reader_task(stdout: ChildStdout, pending: PendingMap) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut reader = BufReader::new(stdout);
            let mut line = String::new();

            loop {
                line.clear();
                match reader.read_line(&mut line).await {
                    Ok(0) => break,
                    Ok(_) => match serde_json::from_str::<ResponseEnvelope>(&line) {
                        Ok(resp) => {
                            if let Some(tx) = pending.lock().await.remove(&resp.id) {
                                let _ = tx.send(resp);
                            }
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "bridge: failed to parse response line");
                        }
                    },
                    Err(e) => {
                        tracing::warn!(error = %e, "bridge: read error");
                        break;
                    }
                }
            }

            // Bridge exited - fail every pending request
            let mut pending = pending.lock().await;
            for (id, tx) in pending.drain() {
                let _ = tx.send(ResponseEnvelope {
                    id,
                    success: false,
                    result: None,
                    error: Some(ErrorInfo {
                        code: codes::BRIDGE_EXITED.to_string(),
                        message: "Bridge process exited unexpectedly".to_string(),
                    }),
                });
            }
        })
    }

    /// Send a request to the bridge and wait for a response.
    pub async fn request<P, R>(&self, method: &str, params: P) -> WarehouseResult<R>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        let id = uuid::Uuid::new_v4().to_string();
        let request = RequestEnvelope {
            id: id.clone(),
            method: method.to_string(),
            params: serde_json::to_value(params).map_err(WarehouseError::SerializeFailed)?,
        };

        let line =
            serde_json::to_string(&request).map_err(WarehouseError::SerializeFailed)? + "\n";

        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id.clone(), tx);

        let written = {
            let mut stdin = self.stdin.lock().await;
            match stdin.write_all(line.as_bytes()).await {
                Ok(()) => stdin.flush().await,
                Err(e) => Err(e),
            }
        };
        if let Err(e) = written {
            self.pending.lock().await.remove(&id);
            return Err(WarehouseError::WriteFailed(e));
        }

        let wait = self.target.timeout + TIMEOUT_GRACE;
        let response = match tokio::time::timeout(wait, rx).await {
            Ok(Ok(resp)) => resp,
            Ok(Err(_)) => return Err(WarehouseError::ChannelClosed),
            Err(_) => {
                // Timeout - drop the pending entry so it does not leak
                self.pending.lock().await.remove(&id);
                return Err(WarehouseError::Timeout(wait.as_secs()));
            }
        };

        if response.success {
            let result = response.result.unwrap_or(serde_json::Value::Null);
            serde_json::from_value(result).map_err(WarehouseError::DeserializeFailed)
        } else {
            let error = response.error.unwrap_or_else(|| ErrorInfo {
                code: "UNKNOWN".to_string(),
                message: "Unknown error".to_string(),
            });
            Err(Self::classify_error(&error.code, &error.message))
        }
    }

    /// Classify a bridge error into a more specific error type.
    fn classify_error(code: &str, message: &str) -> WarehouseError {
        match code {
            codes::AUTH_FAILED => WarehouseError::AuthFailed(message.to_string()),
            codes::INVALID_QUERY => WarehouseError::InvalidQuery(message.to_string()),
            codes::QUOTA_EXCEEDED => WarehouseError::QuotaExceeded(message.to_string()),
            codes::METHOD_NOT_FOUND => WarehouseError::MethodNotFound(message.to_string()),
            codes::BRIDGE_EXITED => WarehouseError::BridgeExited,
            _ => WarehouseError::remote(code, message),
        }
    }

    pub async fn ping(&self) -> WarehouseResult<PingResponse> {
        self.request(methods::PING, serde_json::json!({})).await
    }

    /// `false` once the reader task has finished, i.e. the bridge exited.
    pub fn is_alive(&self) -> bool {
        !self.reader_task.is_finished()
    }

    pub fn target(&self) -> &BridgeTarget {
        &self.target
    }
}

#[async_trait]
impl Warehouse for BridgeWarehouse {
    async fn execute(&self, query: &BoundQuery) -> WarehouseResult<ResultTable> {
        let started = Instant::now();
        let params = ExecuteQueryParams {
            sql: query.sql.clone(),
            params: query.params.iter().map(WireParam::from).collect(),
            project: self.target.project.clone(),
            location: self.target.location.clone(),
            timeout_seconds: self.target.timeout.as_secs(),
        };
        let response: ExecuteQueryResponse = self.request(methods::EXECUTE_QUERY, params).await?;
        let table = ResultTable::from_wire(response.columns, response.rows)?;
        tracing::info!(
            rows = table.num_rows(),
            bytes_processed = response.bytes_processed,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "warehouse query finished"
        );
        Ok(table)
    }
}
