//! Pipeline orchestration.
//!
//! [`DayGenerator`] runs prompt -> generation -> decode -> validate -> write for
//! one day. [`BatchRunner`] fans that out over a work list with bounded
//! parallelism; [`DailyRecap`] runs it once for a git-derived day and publishes
//! the result.

use crate::activity::ActivityRecord;
use crate::aggregate::{ActivityAggregator, CommitLogSource, DayWindow, RepositoryRef};
use crate::decode::{decode_response, GenerationResult};
use crate::document::{DocumentWriter, ExistingDocuments};
use crate::error::DevlogError;
use crate::prompt::{GenerationParams, GenerationRequest, PromptBuilder};
use crate::provider::GenerationClient;
use crate::publish::{CommandRunner, GitPublisher};
use crate::selector::WorkItem;
use chrono::{FixedOffset, NaiveDate};
use futures::stream::{FuturesUnordered, StreamExt};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// Everything needed to turn one day's record into a document
#[derive(Clone)]
pub struct DayGenerator {
    prompts: PromptBuilder,
    client: GenerationClient,
    params: GenerationParams,
    fallback_tags: Vec<String>,
    writer: DocumentWriter,
}

impl DayGenerator {
    pub fn new(
        prompts: PromptBuilder,
        client: GenerationClient,
        params: GenerationParams,
        fallback_tags: Vec<String>,
        writer: DocumentWriter,
    ) -> Self {
        Self {
            prompts,
            client,
            params,
            fallback_tags,
            writer,
        }
    }

    pub fn writer(&self) -> &DocumentWriter {
        &self.writer
    }

    pub fn prepare(&self, record: &ActivityRecord) -> GenerationRequest {
        self.prompts.request(record, &self.params)
    }

    /// Generate and validate without touching the filesystem.
    pub async fn generate(&self, record: &ActivityRecord) -> Result<GenerationResult, DevlogError> {
        let request = self.prepare(record);
        let raw = self.client.generate(&request).await?;
        decode_response(&raw)?.validate(&self.fallback_tags)
    }

    /// Generate, then write the document, replacing `item.replaces`.
    pub async fn run(&self, item: &WorkItem) -> Result<PathBuf, DevlogError> {
        let result = self.generate(&item.record).await?;
        self.writer.write(item.date, &result, &item.replaces)
    }
}

/// Result of one unit of work, reported in completion order
#[derive(Debug)]
pub struct UnitOutcome {
    /// 1-based completion position
    pub position: usize,
    pub total: usize,
    pub date: NaiveDate,
    pub result: Result<PathBuf, DevlogError>,
}

impl UnitOutcome {
    /// `[n/total] wrote <file>` or `[n/total] FAIL <date>: <error>`
    pub fn progress_line(&self) -> String {
        match &self.result {
            Ok(path) => {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string());
                format!("[{}/{}] wrote {}", self.position, self.total, name)
            }
            Err(err) => format!("[{}/{}] FAIL {}: {}", self.position, self.total, self.date, err),
        }
    }
}

/// Final tallies of a batch run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub created: usize,
    pub failed: usize,
    pub targeted: usize,
}

impl BatchSummary {
    /// Non-zero iff any unit failed.
    pub fn exit_code(&self) -> i32 {
        if self.failed > 0 {
            1
        } else {
            0
        }
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Done. Created={}, Failed={}, Targeted={}",
            self.created, self.failed, self.targeted
        )
    }
}

/// Runs a work list with at most `workers` days in flight
pub struct BatchRunner {
    generator: Arc<DayGenerator>,
    workers: usize,
}

impl BatchRunner {
    /// `workers` below 1 is raised to 1.
    pub fn new(generator: DayGenerator, workers: usize) -> Self {
        Self {
            generator: Arc::new(generator),
            workers: workers.max(1),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run every item; `on_outcome` sees each result as it completes.
    ///
    /// A failed day is counted and reported, never propagated; sibling days
    /// keep running.
    pub async fn run<F>(&self, items: Vec<WorkItem>, mut on_outcome: F) -> BatchSummary
    where
        F: FnMut(&UnitOutcome),
    {
        let total = items.len();
        let semaphore = Arc::new(Semaphore::new(self.workers));
        let mut tasks = FuturesUnordered::new();

        info!(targets = total, workers = self.workers, "Starting batch");

        for item in items {
            let generator = Arc::clone(&self.generator);
            let semaphore = Arc::clone(&semaphore);
            let date = item.date;
            let handle = tokio::spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|e| DevlogError::TaskFailed(e.to_string()))?;
                debug!(date = %item.date, "Generating");
                generator.run(&item).await
            });
            tasks.push(async move { (date, handle.await) });
        }

        let mut summary = BatchSummary {
            targeted: total,
            ..Default::default()
        };
        let mut position = 0;
        while let Some((date, joined)) = tasks.next().await {
            position += 1;
            let result = match joined {
                Ok(result) => result,
                Err(join_err) => Err(DevlogError::TaskFailed(join_err.to_string())),
            };
            match &result {
                Ok(path) => {
                    summary.created += 1;
                    info!(date = %date, path = %path.display(), "Document written");
                }
                Err(err) => {
                    summary.failed += 1;
                    warn!(date = %date, error = %err, "Day failed");
                }
            }
            on_outcome(&UnitOutcome {
                position,
                total,
                date,
                result,
            });
        }

        info!(
            created = summary.created,
            failed = summary.failed,
            targeted = summary.targeted,
            "Batch finished"
        );
        summary
    }
}

/// How a single-date recap ended
#[derive(Debug, PartialEq)]
pub enum RecapOutcome {
    /// A document already exists and overwrite was not requested
    AlreadyExists(Vec<PathBuf>),
    /// No commits in the day window
    NoActivity,
    /// Prompt prepared; nothing called or written
    DryRun { commits: u64, prompt_chars: usize },
    Published { path: PathBuf, commits: u64 },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecapOptions {
    pub overwrite: bool,
    pub dry_run: bool,
}

/// Single-date, git-derived flow: aggregate, generate, write, publish
pub struct DailyRecap<S: CommitLogSource, R: CommandRunner> {
    aggregator: ActivityAggregator<S>,
    repositories: Vec<RepositoryRef>,
    offset: FixedOffset,
    prompts: PromptBuilder,
    params: GenerationParams,
    fallback_tags: Vec<String>,
    writer: DocumentWriter,
    publisher: GitPublisher<R>,
}

impl<S: CommitLogSource, R: CommandRunner> DailyRecap<S, R> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        aggregator: ActivityAggregator<S>,
        repositories: Vec<RepositoryRef>,
        offset: FixedOffset,
        prompts: PromptBuilder,
        params: GenerationParams,
        fallback_tags: Vec<String>,
        writer: DocumentWriter,
        publisher: GitPublisher<R>,
    ) -> Self {
        Self {
            aggregator,
            repositories,
            offset,
            prompts,
            params,
            fallback_tags,
            writer,
            publisher,
        }
    }

    pub fn publisher(&self) -> &GitPublisher<R> {
        &self.publisher
    }

    /// Run the recap for `date`.
    ///
    /// `connect` is only invoked once a document is actually going to be
    /// generated, so credential problems never surface on skip, empty, or
    /// dry-run paths. A publish failure is returned as an error; the written
    /// document stays on disk.
    pub async fn run<C>(
        &self,
        date: NaiveDate,
        options: RecapOptions,
        connect: C,
    ) -> Result<RecapOutcome, DevlogError>
    where
        C: FnOnce() -> Result<GenerationClient, DevlogError>,
    {
        let existing = ExistingDocuments::scan(self.writer.dir(), self.writer.extension())?;
        let prior = existing.for_date(&date).to_vec();
        if !prior.is_empty() && !options.overwrite {
            info!(date = %date, "Document already exists, skipping");
            return Ok(RecapOutcome::AlreadyExists(prior));
        }

        let window = DayWindow::new(date, self.offset);
        let record = self.aggregator.record_for(&window, &self.repositories);
        if !record.is_eligible() {
            info!(date = %date, "No commits for date");
            return Ok(RecapOutcome::NoActivity);
        }

        let request = self.prompts.request(&record, &self.params);
        if options.dry_run {
            return Ok(RecapOutcome::DryRun {
                commits: record.commit_count,
                prompt_chars: request.prompt.chars().count(),
            });
        }

        let generator = DayGenerator::new(
            self.prompts.clone(),
            connect()?,
            self.params.clone(),
            self.fallback_tags.clone(),
            self.writer.clone(),
        );
        let commits = record.commit_count;
        let item = WorkItem {
            date,
            record,
            replaces: prior,
        };
        let path = generator.run(&item).await?;
        self.publish(&path, date)?;
        Ok(RecapOutcome::Published { path, commits })
    }

    fn publish(&self, path: &Path, date: NaiveDate) -> Result<(), DevlogError> {
        self.publisher.publish(path, date).map_err(|e| {
            warn!(path = %path.display(), error = %e, "Publishing failed; document left on disk");
            e
        })
    }
}
