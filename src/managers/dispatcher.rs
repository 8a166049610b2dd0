use crate::constants::protocols::ALLOWED_METHODS;
use crate::errors::{PipelineError, TransportFailure};
use crate::models::TransportAttempt;
use crate::services::logger::Logger;
use crate::services::transport::{HttpTransport, OutboundRequest, TransportResponse};
use std::sync::Arc;
use std::time::Instant;

pub fn ensure_method_allowed(method: &str) -> Result<(), PipelineError> {
    if ALLOWED_METHODS.contains(&method) {
        return Ok(());
    }
    Err(PipelineError::contract("Unsupported HTTP method")
        .with_details(serde_json::json!({"method": method, "allowed": ALLOWED_METHODS})))
}

#[derive(Debug, Clone, PartialEq)]
pub enum DispatchFailure {
    Transport(TransportFailure),
    Status { status: u16, body: String },
}

#[derive(Debug)]
enum DispatchState {
    FirstAttempt,
    FallbackAttempt,
    Succeeded(TransportResponse),
    Failed(DispatchFailure),
}

/// Outcome of one dispatch plus every attempt made, in order.
#[derive(Debug)]
pub struct DispatchReport {
    pub result: Result<TransportResponse, DispatchFailure>,
    pub attempts: Vec<TransportAttempt>,
}

/// Issues a request with at most two attempts: first trusting the
/// environment's proxy settings, then once more without them when the first
/// failure looks proxy- or connection-related.
#[derive(Clone)]
pub struct Dispatcher {
    logger: Logger,
    transport: Arc<dyn HttpTransport>,
}

impl Dispatcher {
    pub fn new(logger: Logger, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            logger: logger.child("dispatch"),
            transport,
        }
    }

    async fn attempt(
        &self,
        request: &OutboundRequest,
        trust_env: bool,
        attempts: &mut Vec<TransportAttempt>,
    ) -> Result<TransportResponse, DispatchFailure> {
        let started = Instant::now();
        let outcome = self
            .transport
            .send(request, trust_env)
            .await
            .map_err(|failure| failure.scrub(&request.url, &request.display_url));
        let duration_ms = started.elapsed().as_millis() as u64;
        let record = match &outcome {
            Ok(response) => TransportAttempt {
                trust_env,
                outcome: if response.is_success() { "ok" } else { "http_error" }.to_string(),
                status: Some(response.status),
                error: None,
                duration_ms,
            },
            Err(failure) => TransportAttempt {
                trust_env,
                outcome: failure.label().to_string(),
                status: None,
                error: Some(failure.to_string()),
                duration_ms,
            },
        };
        self.logger.debug(
            "Dispatch attempt",
            Some(&serde_json::json!({
                "url": request.display_url,
                "trust_env": trust_env,
                "outcome": record.outcome,
                "duration_ms": duration_ms,
            })),
        );
        attempts.push(record);
        match outcome {
            Ok(response) if response.is_success() => Ok(response),
            Ok(response) => Err(DispatchFailure::Status {
                status: response.status,
                body: response.body,
            }),
            Err(failure) => Err(DispatchFailure::Transport(failure)),
        }
    }

    fn after_first(failure: DispatchFailure, trusted: bool) -> DispatchState {
        match &failure {
            DispatchFailure::Transport(TransportFailure::Proxy(_)) => DispatchState::FallbackAttempt,
            DispatchFailure::Transport(TransportFailure::Connect(_)) if trusted => {
                DispatchState::FallbackAttempt
            }
            _ => DispatchState::Failed(failure),
        }
    }

    pub async fn dispatch(&self, request: &OutboundRequest) -> DispatchReport {
        let mut attempts = Vec::with_capacity(2);
        let mut state = DispatchState::FirstAttempt;
        loop {
            state = match state {
                DispatchState::FirstAttempt => match self.attempt(request, true, &mut attempts).await {
                    Ok(response) => DispatchState::Succeeded(response),
                    Err(failure) => Self::after_first(failure, true),
                },
                DispatchState::FallbackAttempt => {
                    self.logger.warn(
                        "Retrying without environment proxy settings",
                        Some(&serde_json::json!({"url": request.display_url})),
                    );
                    match self.attempt(request, false, &mut attempts).await {
                        Ok(response) => DispatchState::Succeeded(response),
                        Err(failure) => DispatchState::Failed(failure),
                    }
                }
                DispatchState::Succeeded(response) => {
                    return DispatchReport {
                        result: Ok(response),
                        attempts,
                    };
                }
                DispatchState::Failed(failure) => {
                    self.logger.warn(
                        "Dispatch failed",
                        Some(&serde_json::json!({
                            "url": request.display_url,
                            "attempts": attempts.len(),
                        })),
                    );
                    return DispatchReport {
                        result: Err(failure),
                        attempts,
                    };
                }
            };
        }
    }
}
