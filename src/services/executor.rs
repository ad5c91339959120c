//! Code executor: forwards run/analyze requests to a remote runner.
//!
//! DESIGN
//! ======
//! The HTTP routes only see the `CodeExecutor` trait so tests can inject a
//! mock. `HttpExecutor` posts the request body unchanged to the configured
//! upstream and expects the same `{success, output}` shape back.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error};

// =============================================================================
// TYPES
// =============================================================================

/// Request body relayed to the runner. Only `code` is interpreted here;
/// `language` and any other fields pass through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeRequest {
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// Result shape the browser client renders. `output` is a string for runs
/// and may be structured JSON for analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeOutcome {
    pub success: bool,
    #[serde(default)]
    pub output: Value,
}

impl CodeOutcome {
    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self { success: false, output: Value::String(message.into()) }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecAction {
    Run,
    Analyze,
}

impl ExecAction {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Run => "run",
            Self::Analyze => "analyze",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("no upstream configured for {0}")]
    NotConfigured(&'static str),
    #[error("upstream request failed: {0}")]
    Request(String),
    #[error("upstream returned status {status}")]
    Status { status: u16, body: String },
    #[error("upstream response parse failed: {0}")]
    Decode(String),
}

impl crate::error::ErrorCode for ExecError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotConfigured(_) => "E_EXEC_NOT_CONFIGURED",
            Self::Request(_) => "E_EXEC_REQUEST",
            Self::Status { .. } => "E_EXEC_STATUS",
            Self::Decode(_) => "E_EXEC_DECODE",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Request(_) | Self::Status { status: 429 | 500..=599, .. })
    }
}

// =============================================================================
// TRAIT
// =============================================================================

#[async_trait]
pub trait CodeExecutor: Send + Sync {
    async fn execute(&self, action: ExecAction, req: &CodeRequest) -> Result<CodeOutcome, ExecError>;
}

// =============================================================================
// HTTP EXECUTOR
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

pub struct HttpExecutor {
    http: reqwest::Client,
    run_url: Option<String>,
    analyze_url: Option<String>,
}

impl HttpExecutor {
    /// # Errors
    ///
    /// Returns `ExecError::Request` if the HTTP client cannot be built.
    pub fn new(run_url: Option<String>, analyze_url: Option<String>, timeouts: ExecTimeouts) -> Result<Self, ExecError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeouts.request_secs))
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .build()
            .map_err(|e| ExecError::Request(e.to_string()))?;
        Ok(Self { http, run_url, analyze_url })
    }

    fn url(&self, action: ExecAction) -> Option<&str> {
        match action {
            ExecAction::Run => self.run_url.as_deref(),
            ExecAction::Analyze => self.analyze_url.as_deref(),
        }
    }
}

#[async_trait]
impl CodeExecutor for HttpExecutor {
    async fn execute(&self, action: ExecAction, req: &CodeRequest) -> Result<CodeOutcome, ExecError> {
        let url = self.url(action).ok_or(ExecError::NotConfigured(action.as_str()))?;
        debug!(
            action = action.as_str(),
            language = req.language.as_deref().unwrap_or("-"),
            bytes = req.code.len(),
            "forwarding to executor"
        );

        let response = self
            .http
            .post(url)
            .json(req)
            .send()
            .await
            .map_err(|e| ExecError::Request(e.to_string()))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| ExecError::Request(e.to_string()))?;
        if !(200..300).contains(&status) {
            error!(action = action.as_str(), status, "executor upstream error");
            return Err(ExecError::Status { status, body: text });
        }
        serde_json::from_str(&text).map_err(|e| ExecError::Decode(e.to_string()))
    }
}

#[cfg(test)]
#[path = "executor_test.rs"]
mod tests;
