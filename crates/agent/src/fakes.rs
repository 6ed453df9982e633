//! Scripted collaborators for exercising the agent without network access.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::llm::{LlmClient, LlmError};
use crate::search::{SearchClient, SearchError, SearchHit};

type LlmScript = dyn Fn(&str) -> Result<String, LlmError> + Send + Sync;
type SearchScript = dyn Fn(&str, usize) -> Result<Vec<SearchHit>, SearchError> + Send + Sync;

#[derive(Clone)]
pub struct ScriptedLlm {
    script: Arc<LlmScript>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl ScriptedLlm {
    pub fn new<F>(script: F) -> Self
    where
        F: Fn(&str) -> Result<String, LlmError> + Send + Sync + 'static,
    {
        Self { script: Arc::new(script), prompts: Arc::new(Mutex::new(Vec::new())) }
    }

    /// Answers every extraction by echoing the quoted user text back.
    pub fn echo() -> Self {
        Self::new(|prompt| Ok(quoted_input(prompt).to_string()))
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|prompts| prompts.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        (self.script)(prompt)
    }
}

/// The user text an extraction prompt was built around: `... format: 'text'`.
pub fn quoted_input(prompt: &str) -> &str {
    prompt
        .rsplit_once(": '")
        .map(|(_, tail)| tail.strip_suffix('\'').unwrap_or(tail))
        .unwrap_or_default()
}

#[derive(Clone)]
pub struct ScriptedSearch {
    script: Arc<SearchScript>,
    calls: Arc<Mutex<Vec<(String, usize)>>>,
}

impl ScriptedSearch {
    pub fn new<F>(script: F) -> Self
    where
        F: Fn(&str, usize) -> Result<Vec<SearchHit>, SearchError> + Send + Sync + 'static,
    {
        Self { script: Arc::new(script), calls: Arc::new(Mutex::new(Vec::new())) }
    }

    pub fn calls(&self) -> Vec<(String, usize)> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl SearchClient for ScriptedSearch {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, SearchError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((query.to_string(), max_results));
        }
        (self.script)(query, max_results)
    }
}
