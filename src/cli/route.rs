//! CLI route: single route table and run context. Dispatches to the pipeline and
//! writes the user-facing report.

use crate::activity::{parse_date, IdeasFeed, DATE_FORMAT};
use crate::aggregate::{parse_utc_offset, yesterday, ActivityAggregator, GitCommitLog, RepositoryRegistry};
use crate::config::{resolve, ConfigLoader, DevlogConfig};
use crate::document::{DocumentWriter, ExistingDocuments};
use crate::error::DevlogError;
use crate::pipeline::{BatchRunner, DailyRecap, DayGenerator, RecapOptions, RecapOutcome};
use crate::prompt::PromptBuilder;
use crate::provider::{
    resolve_api_key, GenerationClient, HttpSettings, OpenRouterTransport,
};
use crate::publish::{CommandRunner, GitPublisher, SystemCommandRunner};
use crate::selector::{select_targets, SelectionCriteria};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use crate::cli::parse::Commands;

/// Number of targets listed in the pre-run report
const LISTED_TARGETS: usize = 8;

/// Runtime context for CLI execution: workspace root and validated configuration.
pub struct RunContext {
    workspace_root: PathBuf,
    config: DevlogConfig,
}

impl RunContext {
    /// Load configuration (explicit file, or the layered sources) and validate it.
    pub fn new(workspace_root: PathBuf, config_path: Option<PathBuf>) -> Result<Self, DevlogError> {
        let config = if let Some(ref cfg_path) = config_path {
            ConfigLoader::load_from_file(cfg_path)?
        } else {
            ConfigLoader::load(&workspace_root)?
        };
        Self::from_config(workspace_root, config)
    }

    pub fn from_config(workspace_root: PathBuf, config: DevlogConfig) -> Result<Self, DevlogError> {
        config.validate().map_err(|errors| {
            DevlogError::ConfigError(
                errors
                    .iter()
                    .map(|e| e.to_string())
                    .collect::<Vec<_>>()
                    .join("; "),
            )
        })?;
        Ok(Self {
            workspace_root,
            config,
        })
    }

    pub fn config(&self) -> &DevlogConfig {
        &self.config
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    /// Run `command`, writing the report to `out`; returns the process exit code.
    pub fn execute(&self, command: &Commands, out: &mut dyn Write) -> Result<i32, DevlogError> {
        match command {
            Commands::Batch {
                ideas_file,
                from_date,
                to_date,
                limit,
                overwrite,
                dry_run,
                workers,
                model,
                author,
                refresh_feed,
            } => {
                let args = BatchArgs {
                    ideas_file: ideas_file.clone(),
                    from_date: from_date.as_deref().map(parse_date).transpose()?,
                    to_date: to_date.as_deref().map(parse_date).transpose()?,
                    limit: (*limit > 0).then_some(*limit),
                    overwrite: *overwrite,
                    dry_run: *dry_run,
                    workers: workers.unwrap_or(self.config.batch.workers).max(1),
                    model: model.clone().unwrap_or_else(|| self.config.generation.model.clone()),
                    author: author.clone().unwrap_or_else(|| self.config.output.author.clone()),
                    refresh_feed: *refresh_feed,
                };
                self.handle_batch(args, out)
            }
            Commands::Recap {
                date,
                model,
                author,
                overwrite,
                dry_run,
            } => {
                let offset = parse_utc_offset(&self.config.recap.timezone_offset)?;
                let date = match date.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
                    Some(raw) => parse_date(raw)?,
                    None => yesterday(offset),
                };
                let args = RecapArgs {
                    date,
                    model: model.clone().unwrap_or_else(|| self.config.generation.model.clone()),
                    author: author.clone().unwrap_or_else(|| self.config.output.author.clone()),
                    options: RecapOptions {
                        overwrite: *overwrite,
                        dry_run: *dry_run,
                    },
                };
                self.handle_recap(args, offset, out)
            }
        }
    }

    fn handle_batch(&self, args: BatchArgs, out: &mut dyn Write) -> Result<i32, DevlogError> {
        let feed_path = args
            .ideas_file
            .clone()
            .or_else(|| self.config.batch.ideas_file.clone())
            .map(|p| resolve(&self.workspace_root, &p))
            .ok_or_else(|| {
                DevlogError::ConfigError(
                    "No ideas feed: pass --ideas-file or set batch.ideas_file".to_string(),
                )
            })?;

        if args.refresh_feed {
            self.refresh_feed(out)?;
        }

        let feed = IdeasFeed::load(&feed_path)?;
        let blog_dir = self.config.blog_dir(&self.workspace_root);
        let existing = ExistingDocuments::scan(&blog_dir, &self.config.output.extension)?;

        let criteria = SelectionCriteria {
            from: args.from_date,
            to: args.to_date,
            overwrite: args.overwrite,
            limit: args.limit,
        };
        let targets = select_targets(feed.records(), &existing, &criteria);

        writeln!(out, "Daily ideas loaded: {}", feed.len())?;
        writeln!(out, "Existing dated posts: {}", existing.document_count())?;
        writeln!(out, "Target posts to generate: {}", targets.len())?;
        if !targets.is_empty() {
            writeln!(out, "First targets:")?;
            for item in targets.iter().take(LISTED_TARGETS) {
                writeln!(out, " - {}", item.date.format(DATE_FORMAT))?;
            }
        }

        if args.dry_run {
            return Ok(0);
        }

        let client = self.connect()?;
        let rules = self
            .config
            .prompt_rules(&self.config.batch.word_band, &args.author)
            .map_err(DevlogError::ConfigError)?;
        let mut params = self.config.generation_params(self.config.batch.max_tokens);
        params.model = args.model.clone();

        let generator = DayGenerator::new(
            PromptBuilder::new(Arc::new(self.config.stack_overrides()), rules),
            client,
            params,
            self.config.batch.fallback_tags.clone(),
            DocumentWriter::new(blog_dir, self.config.output.extension.clone(), args.author.clone()),
        );
        let runner = BatchRunner::new(generator, args.workers);
        writeln!(
            out,
            "Writer model: {} | Parallel workers: {}",
            args.model,
            runner.workers()
        )?;

        let rt = runtime()?;
        let summary = rt.block_on(runner.run(targets, |outcome| {
            let _ = writeln!(out, "{}", outcome.progress_line());
        }));

        writeln!(out, "\n{}", summary)?;
        Ok(summary.exit_code())
    }

    fn handle_recap(
        &self,
        args: RecapArgs,
        offset: chrono::FixedOffset,
        out: &mut dyn Write,
    ) -> Result<i32, DevlogError> {
        let date_key = args.date.format(DATE_FORMAT).to_string();
        writeln!(out, "Target date: {}", date_key)?;

        let registry_path = self
            .config
            .recap
            .registry_file
            .as_ref()
            .map(|p| resolve(&self.workspace_root, p))
            .ok_or_else(|| {
                DevlogError::ConfigError("recap.registry_file is not configured".to_string())
            })?;
        let repositories = RepositoryRegistry::load(&registry_path)?
            .with_labels(&self.config.label_overrides());

        let rules = self
            .config
            .prompt_rules(&self.config.recap.word_band, &args.author)
            .map_err(DevlogError::ConfigError)?;
        let mut params = self.config.generation_params(self.config.recap.max_tokens);
        params.model = args.model.clone();

        let recap = DailyRecap::new(
            ActivityAggregator::new(GitCommitLog),
            repositories,
            offset,
            PromptBuilder::new(Arc::new(self.config.stack_overrides()), rules),
            params,
            self.config.recap.fallback_tags.clone(),
            DocumentWriter::new(
                self.config.blog_dir(&self.workspace_root),
                self.config.output.extension.clone(),
                args.author.clone(),
            ),
            GitPublisher::new(
                SystemCommandRunner,
                self.workspace_root.clone(),
                self.config.recap.commit_message_prefix.clone(),
            ),
        );

        let rt = runtime()?;
        let outcome = rt.block_on(recap.run(args.date, args.options, || self.connect()))?;
        match outcome {
            RecapOutcome::AlreadyExists(paths) => {
                let name = paths
                    .first()
                    .and_then(|p| p.file_name())
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                writeln!(out, "Post already exists for {}: {} (skip)", date_key, name)?;
            }
            RecapOutcome::NoActivity => {
                writeln!(out, "Found 0 commits on {}", date_key)?;
                writeln!(out, "No git activity for target date; nothing to publish.")?;
            }
            RecapOutcome::DryRun { commits, .. } => {
                writeln!(out, "Found {} commits on {}", commits, date_key)?;
                writeln!(out, "[dry-run] Prompt prepared; skipping model call/write/commit/push.")?;
            }
            RecapOutcome::Published { path, commits } => {
                writeln!(out, "Found {} commits on {}", commits, date_key)?;
                writeln!(out, "Wrote {}", path.display())?;
                writeln!(out, "Committed and pushed.")?;
            }
        }
        Ok(0)
    }

    fn refresh_feed(&self, out: &mut dyn Write) -> Result<(), DevlogError> {
        let command = &self.config.batch.refresh_command;
        let (program, rest) = command.split_first().ok_or_else(|| {
            DevlogError::ConfigError(
                "--refresh-feed requires batch.refresh_command".to_string(),
            )
        })?;
        let cwd = self
            .config
            .batch
            .refresh_cwd
            .as_ref()
            .map(|p| resolve(&self.workspace_root, p))
            .unwrap_or_else(|| self.workspace_root.clone());

        writeln!(out, "Regenerating daily ideas: {}", command.join(" "))?;
        info!(command = %command.join(" "), cwd = %cwd.display(), "Refreshing ideas feed");
        SystemCommandRunner
            .run(program, rest, &cwd)
            .map_err(|e| DevlogError::ConfigError(format!("Feed refresh failed: {}", e)))?;
        Ok(())
    }

    /// Build the generation client; resolves the credential.
    fn connect(&self) -> Result<GenerationClient, DevlogError> {
        let api_key = resolve_api_key(&self.config.credentials)?;
        let generation = &self.config.generation;
        let transport = OpenRouterTransport::new(HttpSettings {
            endpoint: generation.endpoint.clone(),
            api_key,
            referer: generation.referer.clone(),
            connect_timeout: generation.connect_timeout(),
            request_timeout: generation.request_timeout(),
        })?;
        Ok(GenerationClient::new(Arc::new(transport), self.config.retry.policy()))
    }
}

struct BatchArgs {
    ideas_file: Option<PathBuf>,
    from_date: Option<chrono::NaiveDate>,
    to_date: Option<chrono::NaiveDate>,
    limit: Option<usize>,
    overwrite: bool,
    dry_run: bool,
    workers: usize,
    model: String,
    author: String,
    refresh_feed: bool,
}

struct RecapArgs {
    date: chrono::NaiveDate,
    model: String,
    author: String,
    options: RecapOptions,
}

fn runtime() -> Result<tokio::runtime::Runtime, DevlogError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| DevlogError::TaskFailed(format!("Failed to create async runtime: {}", e)))
}
