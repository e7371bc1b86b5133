//! Shared fixtures: scripted generation transport and pipeline builders.

use async_trait::async_trait;
use devlog::activity::IdeasFeed;
use devlog::document::DocumentWriter;
use devlog::error::DevlogError;
use devlog::overrides::StackOverrides;
use devlog::pipeline::DayGenerator;
use devlog::prompt::{GenerationParams, GenerationRequest, PromptBuilder, PromptRules};
use devlog::provider::{CompletionTransport, GenerationClient, RetryPolicy};
use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Replies with a fixed script, one entry per call
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Result<String, DevlogError>>>,
    prompts: Mutex<Vec<String>>,
    calls: AtomicU32,
}

impl ScriptedTransport {
    pub fn new(script: Vec<Result<String, DevlogError>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            prompts: Mutex::new(Vec::new()),
            calls: AtomicU32::new(0),
        })
    }

    pub fn replying(replies: &[&str]) -> Arc<Self> {
        Self::new(replies.iter().map(|r| Ok(r.to_string())).collect())
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionTransport for ScriptedTransport {
    async fn send(&self, request: &GenerationRequest) -> Result<String, DevlogError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(request.prompt.clone());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(DevlogError::ProviderResponse("script exhausted".to_string())))
    }

    fn provider_name(&self) -> &str {
        "scripted"
    }
}

pub fn fast_policy() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 6,
        base_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(4),
    }
}

pub fn client(transport: Arc<ScriptedTransport>) -> GenerationClient {
    GenerationClient::new(transport, fast_policy())
}

pub fn params() -> GenerationParams {
    GenerationParams {
        model: "test/model".to_string(),
        temperature: 0.45,
        max_tokens: 2600,
    }
}

pub fn prompts() -> PromptBuilder {
    PromptBuilder::new(
        Arc::new(StackOverrides::builtin()),
        PromptRules::new("Test Author", 500, 1100),
    )
}

pub fn batch_fallback_tags() -> Vec<String> {
    vec!["engineering".into(), "software".into(), "build-in-public".into()]
}

pub fn generator(transport: Arc<ScriptedTransport>, blog_dir: &Path) -> DayGenerator {
    DayGenerator::new(
        prompts(),
        client(transport),
        params(),
        batch_fallback_tags(),
        DocumentWriter::new(blog_dir, "mdx", "Test Author"),
    )
}

/// A well-formed reply with three section headings
pub fn reply(title: &str) -> String {
    serde_json::json!({
        "title": title,
        "excerpt": "What moved today and why it matters.",
        "tags": ["rust", "tooling", "build-in-public"],
        "content": "## Context\n\nSome context.\n\n## What changed\n\nDetails.\n\n## Next\n\nPlans.\n"
    })
    .to_string()
}

pub fn feed(json: &str) -> IdeasFeed {
    IdeasFeed::from_json_str(json).unwrap()
}

pub fn headings(text: &str) -> usize {
    text.lines().filter(|l| l.starts_with("## ")).count()
}

pub fn list_dir(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}
