//! Scripted model endpoints for orchestrator and batch tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use quorum_core::endpoint::{EndpointFactory, ModelEndpoint, ModelReply, ModelSpec};
use quorum_core::error::{EndpointError, EndpointResult};
use quorum_core::ConsensusRequest;

pub type Script = Arc<dyn Fn(&str, &str) -> EndpointResult<String> + Send + Sync>;

/// One call as seen by a scripted endpoint.
#[derive(Debug, Clone)]
pub struct Call {
    pub model: String,
    pub system: String,
    pub user: String,
}

#[derive(Default)]
struct Shared {
    calls: Mutex<Vec<Call>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

/// Endpoint factory keyed by model name.
#[derive(Clone, Default)]
pub struct ScriptedFactory {
    scripts: HashMap<String, (Script, f64, Duration)>,
    shared: Arc<Shared>,
}

impl ScriptedFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `model` with a latency (reported) and a delay (slept).
    pub fn model<F>(mut self, model: &str, latency_secs: f64, script: F) -> Self
    where
        F: Fn(&str, &str) -> EndpointResult<String> + Send + Sync + 'static,
    {
        self.scripts.insert(
            model.to_string(),
            (Arc::new(script), latency_secs, Duration::ZERO),
        );
        self
    }

    pub fn slow_model<F>(mut self, model: &str, delay: Duration, script: F) -> Self
    where
        F: Fn(&str, &str) -> EndpointResult<String> + Send + Sync + 'static,
    {
        self.scripts.insert(
            model.to_string(),
            (Arc::new(script), delay.as_secs_f64(), delay),
        );
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.shared.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, model: &str) -> usize {
        self.calls().iter().filter(|c| c.model == model).count()
    }

    pub fn max_in_flight(&self) -> usize {
        self.shared.max_in_flight.load(Ordering::SeqCst)
    }
}

impl EndpointFactory for ScriptedFactory {
    fn endpoint(&self, spec: &ModelSpec) -> EndpointResult<Arc<dyn ModelEndpoint>> {
        let (script, latency_secs, delay) = self
            .scripts
            .get(&spec.model)
            .cloned()
            .ok_or_else(|| EndpointError::UnsupportedProvider(spec.model.clone()))?;
        Ok(Arc::new(ScriptedEndpoint {
            model: spec.model.clone(),
            script,
            latency_secs,
            delay,
            shared: Arc::clone(&self.shared),
        }))
    }
}

struct ScriptedEndpoint {
    model: String,
    script: Script,
    latency_secs: f64,
    delay: Duration,
    shared: Arc<Shared>,
}

#[async_trait]
impl ModelEndpoint for ScriptedEndpoint {
    async fn call(
        &self,
        system_prompt: &str,
        user_content: &str,
        _temperature: f32,
    ) -> EndpointResult<ModelReply> {
        self.shared.calls.lock().unwrap().push(Call {
            model: self.model.clone(),
            system: system_prompt.to_string(),
            user: user_content.to_string(),
        });

        let now = self.shared.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.shared.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.shared.in_flight.fetch_sub(1, Ordering::SeqCst);

        let text = (self.script)(system_prompt, user_content)?;
        Ok(ModelReply {
            text,
            latency_secs: self.latency_secs,
        })
    }
}

pub fn reply(text: &'static str) -> impl Fn(&str, &str) -> EndpointResult<String> + Send + Sync {
    move |_, _| Ok(text.to_string())
}

pub fn transient() -> impl Fn(&str, &str) -> EndpointResult<String> + Send + Sync {
    |_, _| {
        Err(EndpointError::Status {
            status: 503,
            body: "overloaded".into(),
        })
    }
}

pub fn unauthorized() -> impl Fn(&str, &str) -> EndpointResult<String> + Send + Sync {
    |_, _| {
        Err(EndpointError::Status {
            status: 401,
            body: "Unauthorized".into(),
        })
    }
}

/// Request over models named in `workers`, judged by `judge`.
pub fn request(workers: &[&str], judge: &str, content: &str) -> ConsensusRequest {
    ConsensusRequest {
        workers: workers
            .iter()
            .map(|m| ModelSpec::new("openai", *m).with_api_key("sk-test"))
            .collect(),
        judge: ModelSpec::new("anthropic", judge).with_api_key("ak-test"),
        worker_prompt: "Label the ticket. Reply with comma separated labels.".into(),
        judge_prompt: "Pick the best labels.".into(),
        content: content.into(),
        enable_quality_scoring: false,
        enable_disagreement_analysis: false,
        run_id: None,
        row_index: 0,
    }
}
