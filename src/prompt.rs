//! Prompt construction.
//!
//! Pure mapping from one day's [`ActivityRecord`] to the natural-language
//! request sent to the generator. The output contract spelled out here (JSON
//! keys, tag band, no front matter in `content`) is what `decode` and
//! `document` rely on; keep them in step.

use crate::activity::{ActivityRecord, ActivitySignal, CommitEntry, DATE_FORMAT};
use crate::decode::{MAX_TAGS, MIN_TAGS};
use crate::overrides::StackOverrides;
use serde_json::Value;
use std::sync::Arc;

/// Projects named in the "touched" line
pub const MAX_LISTED_PROJECTS: usize = 8;
/// Projects checked against the stack corrections
pub const MAX_OVERRIDE_PROJECTS: usize = 12;
pub const DEFAULT_COMMIT_LIST_CAP: usize = 120;
pub const EXCERPT_MAX_CHARS: usize = 170;
pub const MIN_SECTION_HEADINGS: usize = 3;

/// One request to the generation service. Built fresh per day, never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Sampling parameters shared by every request in a run
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParams {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Instructions handed to the generator alongside the activity data
#[derive(Debug, Clone, PartialEq)]
pub struct PromptRules {
    pub author: String,
    pub min_words: u32,
    pub max_words: u32,
    /// Reserved technology tag, allowed only for posts about the host project
    pub reserved_tag: String,
    pub host_project: String,
    pub substitute_tags: Vec<String>,
    /// Extra authoritative notes appended after per-project corrections
    pub stack_notes: Vec<String>,
    pub commit_list_cap: usize,
}

impl PromptRules {
    pub fn new(author: impl Into<String>, min_words: u32, max_words: u32) -> Self {
        Self {
            author: author.into(),
            min_words,
            max_words,
            reserved_tag: "Next.js".to_string(),
            host_project: "this blog project (`my-portfolio` / `dashwood.net`)".to_string(),
            substitute_tags: ["Laravel", "Hybrid Architecture", "Frontend", "Full-Stack", "PHP"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            stack_notes: Vec::new(),
            commit_list_cap: DEFAULT_COMMIT_LIST_CAP,
        }
    }
}

/// Builds generation requests; cheap to clone into worker tasks
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    stack: Arc<StackOverrides>,
    rules: PromptRules,
}

impl PromptBuilder {
    pub fn new(stack: Arc<StackOverrides>, rules: PromptRules) -> Self {
        Self { stack, rules }
    }

    pub fn rules(&self) -> &PromptRules {
        &self.rules
    }

    pub fn request(&self, record: &ActivityRecord, params: &GenerationParams) -> GenerationRequest {
        GenerationRequest {
            prompt: self.build(record),
            model: params.model.clone(),
            temperature: params.temperature,
            max_tokens: params.max_tokens,
        }
    }

    pub fn build(&self, record: &ActivityRecord) -> String {
        match &record.signal {
            ActivitySignal::Ideas(ideas) => self.build_ideas_prompt(record, ideas),
            ActivitySignal::Commits(commits) => self.build_commits_prompt(record, commits),
        }
    }

    fn build_ideas_prompt(&self, record: &ActivityRecord, ideas: &[Value]) -> String {
        let primary = ideas.first().cloned().unwrap_or_else(|| Value::Object(Default::default()));
        let secondary = Value::Array(ideas.iter().skip(1).cloned().collect());

        format!(
            "Write one polished developer blog post for {author}'s portfolio.

DATE: {date}
PROJECTS TOUCHED: {projects}
ANALYZED COMMITS: {commit_count}

STACK CORRECTIONS (authoritative):
{stack}

PRIMARY IDEA:
{primary}

ADDITIONAL IDEAS:
{secondary}

{schema}
Rules:
- First-person voice, practical, builder-focused.
{common}
- Ground claims in the supplied context; do not invent fake projects/events.
- If supplied ideas conflict with stack corrections, rewrite them to be technically accurate.
- Keep tone punchy and human (not corporate).
{tagging}",
            author = self.rules.author,
            date = record.date.format(DATE_FORMAT),
            projects = self.projects_line(record),
            commit_count = record.commit_count,
            stack = self.stack_corrections(record),
            primary = pretty(&primary),
            secondary = pretty(&secondary),
            schema = json_schema_block(),
            common = self.common_rules(),
            tagging = self.tagging_rules(),
        )
    }

    fn build_commits_prompt(&self, record: &ActivityRecord, commits: &[CommitEntry]) -> String {
        let by_project = commits_by_project(commits);
        let project_lines = by_project
            .iter()
            .map(|(name, count)| format!("- {}: {} commits", name, count))
            .collect::<Vec<_>>()
            .join("\n");
        let commit_lines = commits
            .iter()
            .take(self.rules.commit_list_cap)
            .map(|c| format!("- [{}] {} ({})", c.project, c.message, c.short_sha()))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            "Write ONE daily engineering recap blog post for {date}.

CONTEXT:
- This post should summarize all git activity from that date.
- Audience: technical readers following real build-in-public progress.
- Author: {author}.

ACTIVITY SUMMARY:
- Total commits: {total}
- Projects touched: {project_count} ({projects})

COMMITS BY PROJECT:
{project_lines}

COMMIT LIST:
{commit_lines}

STACK CORRECTIONS (authoritative):
{stack}

{schema}
Rules:
- First-person voice, practical and specific.
{common}
- Ground claims in commits above; do not invent fake work.
- If activity spans multiple projects, structure post with clear sub-sections.
{tagging}",
            date = record.date.format(DATE_FORMAT),
            author = self.rules.author,
            total = commits.len(),
            project_count = by_project.len(),
            projects = self.projects_line(record),
            project_lines = project_lines,
            commit_lines = commit_lines,
            stack = self.stack_corrections(record),
            schema = json_schema_block(),
            common = self.common_rules(),
            tagging = self.tagging_rules(),
        )
    }

    fn projects_line(&self, record: &ActivityRecord) -> String {
        let listed: Vec<&str> = distinct(&record.projects)
            .into_iter()
            .take(MAX_LISTED_PROJECTS)
            .collect();
        if listed.is_empty() {
            "Unknown".to_string()
        } else {
            listed.join(", ")
        }
    }

    fn stack_corrections(&self, record: &ActivityRecord) -> String {
        let candidates = distinct(&record.projects)
            .into_iter()
            .take(MAX_OVERRIDE_PROJECTS);
        let mut lines: Vec<String> = self
            .stack
            .applicable(candidates)
            .into_iter()
            .map(|(project, correction)| format!("- {}: {}", project, correction))
            .collect();
        lines.extend(self.rules.stack_notes.iter().map(|n| format!("- {}", n)));

        if lines.is_empty() {
            "(No project-specific stack overrides.)".to_string()
        } else {
            lines.join("\n")
        }
    }

    fn common_rules(&self) -> String {
        format!(
            "- {min}-{max} words.
- Must include at least {headings} section headings using Markdown (## Heading).
- Treat STACK CORRECTIONS as truth even if labels, ideas, or commit text suggest otherwise.
- Excerpt must be 1 sentence, under {excerpt} chars.
- Tags: {tag_min}-{tag_max} concise tags.",
            min = self.rules.min_words,
            max = self.rules.max_words,
            headings = MIN_SECTION_HEADINGS,
            excerpt = EXCERPT_MAX_CHARS,
            tag_min = MIN_TAGS,
            tag_max = MAX_TAGS,
        )
    }

    fn tagging_rules(&self) -> String {
        let substitutes = self
            .rules
            .substitute_tags
            .iter()
            .map(|t| format!("`{}`", t))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "- {author} only uses {tag} for {host}.
- Do NOT use `{tag}` as a tag unless the post is explicitly about {host}.
- For all other projects, prefer tags like {substitutes}.
- `content` must be markdown body only (NO frontmatter).
",
            author = self.rules.author,
            tag = self.rules.reserved_tag,
            host = self.rules.host_project,
            substitutes = substitutes,
        )
    }
}

fn json_schema_block() -> &'static str {
    "Return STRICT JSON only (no markdown fences, no prose outside JSON):
{
  \"title\": \"\",
  \"excerpt\": \"\",
  \"tags\": [\"\", \"\", \"\"],
  \"content\": \"\"
}
"
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

fn distinct(projects: &[String]) -> Vec<&str> {
    let mut seen: Vec<&str> = Vec::new();
    for p in projects {
        if !seen.contains(&p.as_str()) {
            seen.push(p.as_str());
        }
    }
    seen
}

/// Commit counts per project, most active first; ties keep first-seen order.
pub fn commits_by_project(commits: &[CommitEntry]) -> Vec<(String, usize)> {
    let mut counts: Vec<(String, usize)> = Vec::new();
    for commit in commits {
        match counts.iter_mut().find(|(name, _)| name == &commit.project) {
            Some((_, n)) => *n += 1,
            None => counts.push((commit.project.clone(), 1)),
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
}
