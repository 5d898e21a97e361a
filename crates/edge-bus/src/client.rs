//! Signed HTTP client for the Bus.
//!
//! Every request body is canonical JSON sent verbatim with detached
//! `X-Timestamp` / `X-Signature` headers. Retryable failures (transport,
//! 429, 5xx) back off exponentially with jitter; terminal reports retry
//! against a hard deadline because losing one strands a command IN_FLIGHT
//! on the Bus.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::Rng;
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use edge_auth::{Clock, MessageSigner, SystemClock};
use edge_core::{CommandEnvelope, CommandId, CommandStatus, Receipt};

use crate::error::{BusError, Result};
use crate::queue::{BoxFuture, QueueClient};
use crate::wire::{AckResponse, ClaimRequest, ClaimResponse, PullRequest, PullResponse, ReportRequest};

const SIGNATURE_HEADER: &str = "X-Signature";
const TIMESTAMP_HEADER: &str = "X-Timestamp";

/// Bus connection settings.
#[derive(Debug, Clone)]
pub struct BusConfig {
    /// Base URL, e.g. `https://bus.example.com`.
    pub base_url: String,
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// Attempts for pull/claim before giving up this cycle.
    pub max_attempts: u32,
    /// First backoff delay; doubles per attempt.
    pub backoff_base: Duration,
    /// Backoff ceiling.
    pub backoff_cap: Duration,
    /// Hard deadline for delivering a terminal report.
    pub report_deadline: Duration,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
            request_timeout: Duration::from_secs(10),
            max_attempts: 3,
            backoff_base: Duration::from_millis(250),
            backoff_cap: Duration::from_secs(6),
            report_deadline: Duration::from_secs(60),
        }
    }
}

/// Jittered exponential delay for the given zero-based attempt.
fn backoff_delay(config: &BusConfig, attempt: u32) -> Duration {
    let base = config.backoff_base.as_millis() as u64;
    let cap = config.backoff_cap.as_millis() as u64;
    let exp = base.saturating_mul(1u64 << attempt.min(16)).min(cap);
    let jitter = rand::thread_rng().gen_range(0..=exp / 4 + 1);
    Duration::from_millis(exp.saturating_add(jitter).min(cap))
}

/// Bounded retry for pull/claim traffic: give up after `max_attempts`.
async fn send_with_retry<T, F, Fut>(config: &BusConfig, path: &str, mut send: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0u32;
    loop {
        match send().await {
            Ok(resp) => return Ok(resp),
            Err(e) if e.is_retryable() && attempt + 1 < config.max_attempts => {
                let delay = backoff_delay(config, attempt);
                warn!(path, attempt, delay_ms = delay.as_millis() as u64, error = %e, "bus request failed, retrying");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Deadline-bounded retry for terminal reports.
///
/// A report gets a deadline, not an attempt count: an undelivered report
/// strands the command IN_FLIGHT on the Bus. Non-retryable failures still
/// surface immediately.
async fn send_until_deadline<F, Fut>(
    config: &BusConfig,
    command_id: &CommandId,
    mut send: F,
) -> Result<AckResponse>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<AckResponse>>,
{
    let started = Instant::now();
    let mut attempt = 0u32;
    loop {
        match send().await {
            Ok(ack) => return Ok(ack),
            Err(e) if !e.is_retryable() => return Err(e),
            Err(e) => {
                attempt += 1;
                let delay = backoff_delay(config, attempt.saturating_sub(1));
                if started.elapsed() + delay > config.report_deadline {
                    warn!(command_id = %command_id, attempts = attempt, error = %e, "report deadline exceeded");
                    return Err(BusError::ReportDeadline { attempts: attempt });
                }
                warn!(command_id = %command_id, attempt, delay_ms = delay.as_millis() as u64, error = %e, "report failed, retrying");
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// HTTP implementation of [`QueueClient`].
pub struct BusClient {
    http: reqwest::Client,
    config: BusConfig,
    agent_id: String,
    signer: MessageSigner,
    clock: Arc<dyn Clock>,
}

impl BusClient {
    pub fn new(config: BusConfig, agent_id: String, signer: MessageSigner) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| BusError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            config,
            agent_id,
            signer,
            clock: Arc::new(SystemClock),
        })
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    async fn signed_post<Req, Resp>(&self, path: &str, payload: &Req) -> Result<Resp>
    where
        Req: Serialize,
        Resp: DeserializeOwned,
    {
        let signed = self.signer.sign(payload, self.clock.as_ref())?;
        let url = format!("{}{path}", self.config.base_url.trim_end_matches('/'));

        let response = self
            .http
            .post(&url)
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .header(TIMESTAMP_HEADER, signed.ts.to_string())
            .header(SIGNATURE_HEADER, &signed.sig)
            .body(signed.body)
            .send()
            .await
            .map_err(|e| BusError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BusError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<Resp>()
            .await
            .map_err(|e| BusError::Decode(e.to_string()))
    }
}

impl QueueClient for BusClient {
    fn fetch_pending(&self, limit: usize) -> BoxFuture<'_, Result<Vec<CommandEnvelope>>> {
        Box::pin(async move {
            let request = PullRequest {
                agent_id: self.agent_id.clone(),
                limit,
                ts: self.clock.now_unix(),
            };
            let path = "/api/commands/pull";
            let resp: PullResponse =
                send_with_retry(&self.config, path, || self.signed_post(path, &request)).await?;
            debug!(count = resp.commands.len(), "pulled commands");
            Ok(resp.commands)
        })
    }

    fn claim(&self, command_id: CommandId) -> BoxFuture<'_, Result<bool>> {
        Box::pin(async move {
            let request = ClaimRequest {
                agent_id: self.agent_id.clone(),
                command_id,
                ts: self.clock.now_unix(),
            };
            let path = "/api/commands/claim";
            let resp: ClaimResponse =
                send_with_retry(&self.config, path, || self.signed_post(path, &request)).await?;
            Ok(resp.claimed)
        })
    }

    fn report(
        &self,
        command_id: CommandId,
        status: CommandStatus,
        receipt: Receipt,
    ) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            let request = ReportRequest {
                agent_id: self.agent_id.clone(),
                command_id: command_id.clone(),
                status,
                receipt,
                ts: self.clock.now_unix(),
            };
            let ack = send_until_deadline(&self.config, &command_id, || {
                self.signed_post::<_, AckResponse>("/api/commands/ack", &request)
            })
            .await?;
            if !ack.ok {
                return Err(BusError::Decode("bus rejected ack".to_string()));
            }
            Ok(())
        })
    }
}
