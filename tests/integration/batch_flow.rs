//! Batch flow end to end: feed -> selection -> generation -> documents.

use super::support::*;
use devlog::activity::parse_date;
use devlog::document::ExistingDocuments;
use devlog::error::DevlogError;
use devlog::pipeline::BatchRunner;
use devlog::selector::{select_targets, SelectionCriteria};
use tempfile::TempDir;

const ONE_DAY: &str = r#"{"daily": {
    "2026-02-19": {
        "projects": ["devlog", "AustinsElite (Next.js)"],
        "commit_count": 7,
        "ideas": [{"angle": "retry state machine"}, {"angle": "slug rules"}]
    }
}}"#;

#[tokio::test]
async fn test_single_eligible_day_produces_one_document() {
    let temp = TempDir::new().unwrap();
    let blog_dir = temp.path().join("content/blog");
    let feed = feed(ONE_DAY);

    let criteria = SelectionCriteria {
        from: Some(parse_date("2026-02-01").unwrap()),
        to: Some(parse_date("2026-02-28").unwrap()),
        ..Default::default()
    };
    let existing = ExistingDocuments::scan(&blog_dir, "mdx").unwrap();
    let targets = select_targets(feed.records(), &existing, &criteria);
    assert_eq!(targets.len(), 1);

    let transport = ScriptedTransport::replying(&[&reply("Taming Flaky Model Replies")]);
    let runner = BatchRunner::new(generator(transport.clone(), &blog_dir), 4);
    let mut lines = Vec::new();
    let summary = runner.run(targets, |o| lines.push(o.progress_line())).await;

    assert_eq!(summary.to_string(), "Done. Created=1, Failed=0, Targeted=1");
    assert_eq!(summary.exit_code(), 0);
    assert_eq!(lines, vec!["[1/1] wrote 2026-02-19-taming-flaky-model-replies.mdx"]);

    let files = list_dir(&blog_dir);
    assert_eq!(files, vec!["2026-02-19-taming-flaky-model-replies.mdx"]);
    let text = std::fs::read_to_string(blog_dir.join(&files[0])).unwrap();
    assert!(text.starts_with("---\n"));
    assert!(text.contains("date: \"2026-02-19\""));
    assert!(text.contains("author: \"Test Author\""));
    assert!(headings(&text) >= 3);
    assert!(text.ends_with("Plans.\n"));

    // Stack corrections reach the generator for projects present that day
    let prompt = &transport.prompts()[0];
    assert!(prompt.contains("2026-02-19"));
    assert!(prompt.contains("Laravel 12"));
}

#[tokio::test]
async fn test_existing_document_excluded_then_replaced_with_overwrite() {
    let temp = TempDir::new().unwrap();
    let blog_dir = temp.path().join("blog");
    std::fs::create_dir_all(&blog_dir).unwrap();
    let old = blog_dir.join("2026-02-19-old-title.mdx");
    std::fs::write(&old, "---\ntitle: \"Old\"\n---\n\nold\n").unwrap();
    let feed = feed(ONE_DAY);

    let existing = ExistingDocuments::scan(&blog_dir, "mdx").unwrap();
    let skipped = select_targets(feed.records(), &existing, &SelectionCriteria::default());
    assert!(skipped.is_empty());

    let criteria = SelectionCriteria {
        overwrite: true,
        ..Default::default()
    };
    let targets = select_targets(feed.records(), &existing, &criteria);
    assert_eq!(targets.len(), 1);
    assert_eq!(targets[0].replaces, vec![old.clone()]);

    let transport = ScriptedTransport::replying(&[&reply("A Fresh Title")]);
    let summary = BatchRunner::new(generator(transport, &blog_dir), 1)
        .run(targets, |_| {})
        .await;

    assert_eq!(summary.created, 1);
    assert!(!old.exists());
    assert_eq!(list_dir(&blog_dir), vec!["2026-02-19-a-fresh-title.mdx"]);

    // A second pass without overwrite has nothing to do
    let existing = ExistingDocuments::scan(&blog_dir, "mdx").unwrap();
    assert!(select_targets(feed.records(), &existing, &SelectionCriteria::default()).is_empty());
}

#[tokio::test]
async fn test_failures_are_isolated_and_counted() {
    let temp = TempDir::new().unwrap();
    let blog_dir = temp.path().join("blog");
    let feed = feed(
        r#"{"daily": {
            "2026-02-17": {"projects": ["a"], "commit_count": 1, "ideas": [{"n": 1}]},
            "2026-02-18": {"projects": ["a"], "commit_count": 1, "ideas": [{"n": 2}]},
            "2026-02-19": {"projects": ["a"], "commit_count": 1, "ideas": [{"n": 3}]}
        }}"#,
    );
    let targets = select_targets(
        feed.records(),
        &ExistingDocuments::default(),
        &SelectionCriteria::default(),
    );

    // One good reply, one without content, one terminal HTTP error
    let transport = ScriptedTransport::new(vec![
        Ok(reply("Kept")),
        Ok(r#"{"title": "No body", "content": ""}"#.to_string()),
        Err(DevlogError::ProviderHttp {
            status: 401,
            body: "unauthorized".to_string(),
        }),
    ]);
    let mut failures = Vec::new();
    let summary = BatchRunner::new(generator(transport.clone(), &blog_dir), 1)
        .run(targets, |o| {
            if o.result.is_err() {
                failures.push(o.progress_line());
            }
        })
        .await;

    assert_eq!(summary.created, 1);
    assert_eq!(summary.failed, 2);
    assert_eq!(summary.targeted, 3);
    assert_eq!(summary.exit_code(), 1);
    assert_eq!(failures.len(), 2);
    assert!(failures.iter().all(|l| l.contains("FAIL 2026-02-")));
    // The 401 is terminal: no retries beyond the three scripted calls
    assert_eq!(transport.calls(), 3);
    assert_eq!(list_dir(&blog_dir).len(), 1);
}

#[tokio::test]
async fn test_transient_failures_recover_within_retry_budget() {
    let temp = TempDir::new().unwrap();
    let transport = ScriptedTransport::new(vec![
        Err(DevlogError::ProviderHttp {
            status: 429,
            body: "slow down".to_string(),
        }),
        Err(DevlogError::ProviderConnection("reset".to_string())),
        Ok(format!("```json\n{}\n```", reply("Third Time Lucky"))),
    ]);
    let feed = feed(ONE_DAY);
    let targets = select_targets(
        feed.records(),
        &ExistingDocuments::default(),
        &SelectionCriteria::default(),
    );

    let summary = BatchRunner::new(generator(transport.clone(), temp.path()), 2)
        .run(targets, |_| {})
        .await;

    assert_eq!(summary.created, 1);
    assert_eq!(transport.calls(), 3);
    assert!(temp.path().join("2026-02-19-third-time-lucky.mdx").exists());
}

#[tokio::test]
async fn test_six_transient_failures_fail_the_day_after_six_attempts() {
    let temp = TempDir::new().unwrap();
    let transport = ScriptedTransport::new(
        (0..6)
            .map(|_| {
                Err(DevlogError::ProviderHttp {
                    status: 503,
                    body: "unavailable".to_string(),
                })
            })
            .chain(std::iter::once(Ok(reply("Never Reached"))))
            .collect(),
    );
    let feed = feed(ONE_DAY);
    let targets = select_targets(
        feed.records(),
        &ExistingDocuments::default(),
        &SelectionCriteria::default(),
    );

    let mut lines = Vec::new();
    let summary = BatchRunner::new(generator(transport.clone(), temp.path()), 1)
        .run(targets, |o| lines.push(o.progress_line()))
        .await;

    assert_eq!(summary.failed, 1);
    assert_eq!(transport.calls(), 6);
    assert!(lines[0].contains("after 6 attempts"));
    assert!(list_dir(temp.path()).is_empty());
}
