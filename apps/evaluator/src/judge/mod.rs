//! Judge Invoker: sends a prompt to language-model providers in a configured
//! order and returns the first answer that parses.
//!
//! A transport error, a timeout, or an unparseable answer from provider *i*
//! is logged and the call falls through to provider *i+1*. Only when every
//! provider has failed does the caller see [`JudgeError::AllProvidersExhausted`].

pub mod scoring;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::llm_client::{prompts::resume_block, LlmProvider};
use crate::models::JudgeVerdict;
use crate::prompt::EvaluationPrompt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Transport,
    Timeout,
    Parse,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderFailure {
    pub provider: String,
    pub kind: FailureKind,
    pub reason: String,
}

impl fmt::Display for ProviderFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:?}): {}", self.provider, self.kind, self.reason)
    }
}

#[derive(Debug, Error)]
pub enum JudgeError {
    #[error("no configured provider matches the requested order {0:?}")]
    NoProviders(Vec<String>),

    #[error("all providers exhausted: {}", summarize(.0))]
    AllProvidersExhausted(Vec<ProviderFailure>),
}

fn summarize(failures: &[ProviderFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// A parsed answer plus the provider that produced it.
#[derive(Debug, Clone)]
pub struct Judged<T> {
    pub value: T,
    pub provider: String,
}

const EVALUATE_INSTRUCTION: &str = "\
Evaluate the resume above against the rubric in your instructions. \
Complete the self-check, then respond with the JSON object only.";

pub struct JudgeInvoker {
    providers: Vec<Arc<dyn LlmProvider>>,
    timeout: Duration,
}

impl JudgeInvoker {
    pub fn new(providers: Vec<Arc<dyn LlmProvider>>, timeout: Duration) -> Self {
        Self { providers, timeout }
    }

    pub fn provider_names(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.name().to_string()).collect()
    }

    /// Providers in the requested order. Unknown names are skipped with a
    /// warning; an empty order means "every provider, registration order".
    fn ordered(&self, order: &[String]) -> Vec<Arc<dyn LlmProvider>> {
        if order.is_empty() {
            return self.providers.clone();
        }
        let mut out = Vec::new();
        for name in order {
            match self.providers.iter().find(|p| p.name() == name) {
                Some(p) => out.push(p.clone()),
                None => warn!("Judge provider '{name}' is not configured; skipping"),
            }
        }
        out
    }

    /// Tries providers in `order` until one returns text that `parse` accepts.
    pub async fn invoke<T>(
        &self,
        system: &str,
        prompt: &str,
        order: &[String],
        parse: impl Fn(&str) -> Result<T, String>,
    ) -> Result<Judged<T>, JudgeError> {
        let providers = self.ordered(order);
        if providers.is_empty() {
            return Err(JudgeError::NoProviders(order.to_vec()));
        }

        let mut failures = Vec::new();
        for provider in providers {
            let name = provider.name().to_string();
            let outcome = tokio::time::timeout(self.timeout, provider.complete(prompt, system)).await;

            let failure = match outcome {
                Err(_) => ProviderFailure {
                    provider: name,
                    kind: FailureKind::Timeout,
                    reason: format!("no answer within {}s", self.timeout.as_secs()),
                },
                Ok(Err(e)) => ProviderFailure {
                    provider: name,
                    kind: FailureKind::Transport,
                    reason: e.to_string(),
                },
                Ok(Ok(text)) => match parse(&text) {
                    Ok(value) => {
                        info!("Judge answer accepted from {name} ({} chars)", text.len());
                        return Ok(Judged {
                            value,
                            provider: name,
                        });
                    }
                    Err(reason) => ProviderFailure {
                        provider: name,
                        kind: FailureKind::Parse,
                        reason,
                    },
                },
            };

            warn!("Judge provider failed, trying next: {failure}");
            failures.push(failure);
        }

        Err(JudgeError::AllProvidersExhausted(failures))
    }

    /// Scores `resume_text` with the evaluation prompt as system instructions.
    pub async fn evaluate(
        &self,
        prompt: &EvaluationPrompt,
        resume_text: &str,
        order: &[String],
    ) -> Result<Judged<JudgeVerdict>, JudgeError> {
        let user = format!("{}\n\n{EVALUATE_INSTRUCTION}", resume_block(resume_text));
        self.invoke(&prompt.system_prompt_text, &user, order, scoring::parse_verdict)
            .await
    }
}
