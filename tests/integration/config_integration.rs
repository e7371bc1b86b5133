//! Layered configuration through the public loader and run context.

use devlog::cli::RunContext;
use devlog::config::ConfigLoader;
use std::path::Path;
use std::sync::Mutex;
use tempfile::TempDir;

// XDG_CONFIG_HOME is process-wide
static XDG_ENV_MUTEX: Mutex<()> = Mutex::new(());

fn write(path: &Path, text: &str) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, text).unwrap();
}

#[test]
fn test_xdg_global_then_workspace_precedence() {
    let _guard = XDG_ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let temp = TempDir::new().unwrap();
    let xdg = temp.path().join("xdg");
    write(
        &xdg.join("devlog/config.toml"),
        r#"
[output]
author = "Global Author"
extension = "md"

[recap]
timezone_offset = "+01:00"
"#,
    );
    let workspace = temp.path().join("site");
    write(
        &workspace.join("config/devlog.toml"),
        r#"
[output]
extension = "mdx"

[batch]
ideas_file = "data/ideas.json"
workers = 3
"#,
    );

    let original = std::env::var_os("XDG_CONFIG_HOME");
    std::env::set_var("XDG_CONFIG_HOME", &xdg);
    let xdg_path = ConfigLoader::xdg_config_path();
    let loaded = ConfigLoader::load(&workspace);
    match original {
        Some(value) => std::env::set_var("XDG_CONFIG_HOME", value),
        None => std::env::remove_var("XDG_CONFIG_HOME"),
    }

    assert_eq!(xdg_path, Some(xdg.join("devlog/config.toml")));
    let config = loaded.unwrap();
    assert_eq!(config.output.author, "Global Author");
    assert_eq!(config.output.extension, "mdx");
    assert_eq!(config.recap.timezone_offset, "+01:00");
    assert_eq!(config.batch.workers, 3);
    assert_eq!(
        config.batch.ideas_file.as_deref(),
        Some(Path::new("data/ideas.json"))
    );
}

#[test]
fn test_explicit_config_file_is_validated() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("bad.toml");
    write(
        &file,
        r#"
[retry]
max_attempts = 0

[batch]
word_band = "1100-500"
"#,
    );

    let err = RunContext::new(temp.path().to_path_buf(), Some(file))
        .err()
        .unwrap();
    assert!(err.is_configuration());
    let message = err.to_string();
    assert!(message.contains("max_attempts"));
    assert!(message.contains("word band"));
}

#[test]
fn test_explicit_config_file_loads() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("devlog.toml");
    write(
        &file,
        r#"
[generation]
model = "other/model"
referer = "https://example.com"

[credentials]
env_var = "DEVLOG_TEST_KEY"
candidate_files = ["secrets/.env"]
"#,
    );

    let context = RunContext::new(temp.path().to_path_buf(), Some(file)).unwrap();
    let config = context.config();
    assert_eq!(config.generation.model, "other/model");
    assert_eq!(config.generation.referer.as_deref(), Some("https://example.com"));
    assert_eq!(config.credentials.env_var, "DEVLOG_TEST_KEY");
    assert_eq!(config.credentials.key_name, "OPENROUTER_API_KEY");
    assert_eq!(config.credentials.candidate_files, vec!["secrets/.env"]);
}
