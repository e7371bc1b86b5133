//! Recap flow end to end with fake git plumbing, plus one real `git` check.

use super::support::*;
use devlog::activity::parse_date;
use devlog::aggregate::{
    parse_utc_offset, ActivityAggregator, CommitLogSource, DayWindow, GitCommitLog,
    RepositoryRef,
};
use devlog::cli::{Commands, RunContext};
use devlog::config::DevlogConfig;
use devlog::document::DocumentWriter;
use devlog::error::DevlogError;
use devlog::pipeline::{DailyRecap, RecapOptions, RecapOutcome};
use devlog::provider::GenerationClient;
use devlog::publish::{CommandRunner, GitPublisher};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Mutex;
use tempfile::TempDir;

struct FakeLog(HashMap<PathBuf, Vec<String>>);

impl CommitLogSource for FakeLog {
    fn log_lines(&self, repo: &Path, _window: &DayWindow) -> Result<Vec<String>, DevlogError> {
        Ok(self.0.get(repo).cloned().unwrap_or_default())
    }
}

#[derive(Default)]
struct RecordingRunner {
    calls: Mutex<Vec<Vec<String>>>,
    fail_push: bool,
}

impl RecordingRunner {
    fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }
}

impl CommandRunner for RecordingRunner {
    fn run(&self, program: &str, args: &[String], _cwd: &Path) -> Result<String, DevlogError> {
        self.calls.lock().unwrap().push(args.to_vec());
        if self.fail_push && args.first().map(String::as_str) == Some("push") {
            return Err(DevlogError::GitCommand {
                command: format!("{} push", program),
                stderr: "remote rejected".to_string(),
            });
        }
        Ok(String::new())
    }
}

struct Fixture {
    _temp: TempDir,
    site: PathBuf,
    blog_dir: PathBuf,
    repo: PathBuf,
}

fn fixture() -> Fixture {
    let temp = TempDir::new().unwrap();
    let site = temp.path().join("site");
    let blog_dir = site.join("content/blog");
    let repo = temp.path().join("repos/api");
    std::fs::create_dir_all(&site).unwrap();
    std::fs::create_dir_all(&repo).unwrap();
    Fixture {
        _temp: temp,
        site,
        blog_dir,
        repo,
    }
}

fn recap(
    fx: &Fixture,
    log: HashMap<PathBuf, Vec<String>>,
    runner: RecordingRunner,
) -> DailyRecap<FakeLog, RecordingRunner> {
    DailyRecap::new(
        ActivityAggregator::new(FakeLog(log)),
        vec![RepositoryRef {
            path: fx.repo.clone(),
            label: "api".to_string(),
        }],
        parse_utc_offset("-06:00").unwrap(),
        prompts(),
        params(),
        vec!["engineering".into(), "git".into(), "build-in-public".into()],
        DocumentWriter::new(&fx.blog_dir, "mdx", "Test Author"),
        GitPublisher::new(runner, &fx.site, "blog: daily git recap"),
    )
}

fn two_commits(fx: &Fixture) -> HashMap<PathBuf, Vec<String>> {
    let mut log = HashMap::new();
    log.insert(
        fx.repo.clone(),
        vec![
            "bbbbbbbbbbbb|2026-02-19 16:00:00 -0600|feat: second".to_string(),
            "aaaaaaaaaaaa|2026-02-19 09:00:00 -0600|fix: first".to_string(),
        ],
    );
    log
}

fn never_connect() -> Result<GenerationClient, DevlogError> {
    Err(DevlogError::CredentialNotFound {
        key: "SHOULD_NOT_BE_RESOLVED".to_string(),
    })
}

#[tokio::test]
async fn test_zero_commits_writes_nothing_and_succeeds() {
    let fx = fixture();
    let recap = recap(&fx, HashMap::new(), RecordingRunner::default());

    let outcome = recap
        .run(parse_date("2026-02-19").unwrap(), RecapOptions::default(), never_connect)
        .await
        .unwrap();

    assert_eq!(outcome, RecapOutcome::NoActivity);
    assert!(!fx.blog_dir.exists());
    assert!(recap.publisher().runner().calls().is_empty());
}

#[test]
fn test_zero_commits_exits_zero_through_cli() {
    let fx = fixture();
    let registry = fx.site.join("repos.json");
    std::fs::write(
        &registry,
        serde_json::json!([[fx.repo.join("does-not-exist"), "ghost", "missing repo"]]).to_string(),
    )
    .unwrap();

    let mut config = DevlogConfig::default();
    config.recap.registry_file = Some(registry);
    let context = RunContext::from_config(fx.site.clone(), config).unwrap();

    let mut out = Vec::new();
    let code = context
        .execute(
            &Commands::Recap {
                date: Some("2026-02-19".to_string()),
                model: None,
                author: None,
                overwrite: false,
                dry_run: false,
            },
            &mut out,
        )
        .unwrap();
    let text = String::from_utf8(out).unwrap();

    assert_eq!(code, 0);
    assert!(text.contains("Target date: 2026-02-19"));
    assert!(text.contains("No git activity for target date"));
    assert!(!fx.blog_dir.exists());
}

#[tokio::test]
async fn test_dry_run_prepares_prompt_only() {
    let fx = fixture();
    let recap = recap(&fx, two_commits(&fx), RecordingRunner::default());

    let outcome = recap
        .run(
            parse_date("2026-02-19").unwrap(),
            RecapOptions {
                dry_run: true,
                ..Default::default()
            },
            never_connect,
        )
        .await
        .unwrap();

    match outcome {
        RecapOutcome::DryRun { commits, prompt_chars } => {
            assert_eq!(commits, 2);
            assert!(prompt_chars > 0);
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert!(!fx.blog_dir.exists());
    assert!(recap.publisher().runner().calls().is_empty());
}

#[tokio::test]
async fn test_generates_writes_and_publishes_only_the_new_file() {
    let fx = fixture();
    let recap = recap(&fx, two_commits(&fx), RecordingRunner::default());
    let transport = ScriptedTransport::replying(&[&reply("Two Commits, One Story")]);

    let outcome = recap
        .run(parse_date("2026-02-19").unwrap(), RecapOptions::default(), || {
            Ok(client(transport.clone()))
        })
        .await
        .unwrap();

    let expected = fx.blog_dir.join("2026-02-19-two-commits-one-story.mdx");
    assert_eq!(
        outcome,
        RecapOutcome::Published {
            path: expected.clone(),
            commits: 2
        }
    );
    assert!(expected.exists());

    // Commits reach the prompt oldest first
    let prompt = &transport.prompts()[0];
    let first = prompt.find("fix: first").unwrap();
    let second = prompt.find("feat: second").unwrap();
    assert!(first < second);

    let calls = recap.publisher().runner().calls();
    let relative = "content/blog/2026-02-19-two-commits-one-story.mdx".to_string();
    assert_eq!(calls.len(), 3);
    assert_eq!(calls[0], vec!["add".to_string(), relative.clone()]);
    assert_eq!(
        calls[1],
        vec![
            "commit".to_string(),
            "-m".to_string(),
            "blog: daily git recap 2026-02-19".to_string(),
            "--".to_string(),
            relative
        ]
    );
    assert_eq!(calls[2], vec!["push".to_string()]);
}

#[tokio::test]
async fn test_existing_post_skips_before_aggregation() {
    let fx = fixture();
    std::fs::create_dir_all(&fx.blog_dir).unwrap();
    let existing = fx.blog_dir.join("2026-02-19-already-here.mdx");
    std::fs::write(&existing, "x").unwrap();
    let recap = recap(&fx, two_commits(&fx), RecordingRunner::default());

    let outcome = recap
        .run(parse_date("2026-02-19").unwrap(), RecapOptions::default(), never_connect)
        .await
        .unwrap();

    assert_eq!(outcome, RecapOutcome::AlreadyExists(vec![existing.clone()]));
    assert!(existing.exists());
}

#[tokio::test]
async fn test_overwrite_replaces_prior_post() {
    let fx = fixture();
    std::fs::create_dir_all(&fx.blog_dir).unwrap();
    let old = fx.blog_dir.join("2026-02-19-already-here.mdx");
    std::fs::write(&old, "x").unwrap();
    let recap = recap(&fx, two_commits(&fx), RecordingRunner::default());
    let transport = ScriptedTransport::replying(&[&reply("Rewritten")]);

    recap
        .run(
            parse_date("2026-02-19").unwrap(),
            RecapOptions {
                overwrite: true,
                ..Default::default()
            },
            || Ok(client(transport.clone())),
        )
        .await
        .unwrap();

    assert!(!old.exists());
    assert_eq!(list_dir(&fx.blog_dir), vec!["2026-02-19-rewritten.mdx"]);
}

#[tokio::test]
async fn test_publish_failure_leaves_document_on_disk() {
    let fx = fixture();
    let runner = RecordingRunner {
        fail_push: true,
        ..Default::default()
    };
    let recap = recap(&fx, two_commits(&fx), runner);
    let transport = ScriptedTransport::replying(&[&reply("Pushed Later")]);

    let err = recap
        .run(parse_date("2026-02-19").unwrap(), RecapOptions::default(), || {
            Ok(client(transport.clone()))
        })
        .await
        .unwrap_err();

    assert!(matches!(err, DevlogError::GitCommand { .. }));
    assert!(fx.blog_dir.join("2026-02-19-pushed-later.mdx").exists());
}

fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

fn git(repo: &Path, args: &[&str], date: Option<&str>) {
    let mut cmd = Command::new("git");
    cmd.arg("-C")
        .arg(repo)
        .args(["-c", "user.name=Test", "-c", "user.email=test@example.com"])
        .args(["-c", "commit.gpgsign=false"])
        .args(args);
    if let Some(date) = date {
        cmd.env("GIT_AUTHOR_DATE", date).env("GIT_COMMITTER_DATE", date);
    }
    let status = cmd.output().unwrap().status;
    assert!(status.success(), "git {:?} failed", args);
}

#[test]
fn test_real_git_log_respects_day_window_and_skips_merges() {
    if !git_available() {
        return;
    }
    let temp = TempDir::new().unwrap();
    let repo = temp.path().join("repo");
    std::fs::create_dir_all(&repo).unwrap();
    git(&repo, &["init", "-q"], None);

    std::fs::write(repo.join("a.txt"), "a").unwrap();
    git(&repo, &["add", "a.txt"], None);
    git(&repo, &["commit", "-q", "-m", "before the day"], Some("2026-02-18T20:00:00-06:00"));

    std::fs::write(repo.join("b.txt"), "b").unwrap();
    git(&repo, &["add", "b.txt"], None);
    git(&repo, &["commit", "-q", "-m", "inside | the day"], Some("2026-02-19T10:00:00-06:00"));

    std::fs::write(repo.join("c.txt"), "c").unwrap();
    git(&repo, &["add", "c.txt"], None);
    git(&repo, &["commit", "-q", "-m", "after the day"], Some("2026-02-20T01:00:00-06:00"));

    let window = DayWindow::new(
        parse_date("2026-02-19").unwrap(),
        parse_utc_offset("-06:00").unwrap(),
    );
    let aggregator = ActivityAggregator::new(GitCommitLog);
    let commits = aggregator.collect(
        &window,
        &[RepositoryRef {
            path: repo.clone(),
            label: "repo".to_string(),
        }],
    );

    assert_eq!(commits.len(), 1);
    assert_eq!(commits[0].message, "inside | the day");
    assert_eq!(commits[0].project, "repo");
    assert_eq!(commits[0].sha.len(), 40);
}
