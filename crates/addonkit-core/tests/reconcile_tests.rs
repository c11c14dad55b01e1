//! Integration tests for the addonkit reconcile engine.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use addonkit_core::engine::DisableReason;
use addonkit_core::reporter::LogLevel;
use addonkit_core::{
    Engine, EngineConfig, EngineError, JsonStateStore, PassOutcome, RecordingReporter, Reporter,
    update_state,
};
use addonkit_schema::{AddonName, DesiredState};
use mockito::{Matcher, Mock, Server, ServerGuard};
use serde_json::{Value, json};
use tempfile::TempDir;

/// A mock catalog server plus a temporary addon home.
struct TestContext {
    server: ServerGuard,
    temp_dir: TempDir,
    reporter: Arc<RecordingReporter>,
}

impl TestContext {
    async fn new() -> Self {
        Self {
            server: Server::new_async().await,
            temp_dir: TempDir::new().expect("failed to create temp dir"),
            reporter: Arc::new(RecordingReporter::new()),
        }
    }

    fn home(&self) -> &Path {
        self.temp_dir.path()
    }

    fn artifact_dir(&self) -> PathBuf {
        self.home().join("addons")
    }

    fn state_path(&self) -> PathBuf {
        self.home().join("addons.json")
    }

    fn catalog_url(&self) -> String {
        format!("{}/catalog.json", self.server.url())
    }

    /// The catalog used by most tests.
    fn commands_catalog(&self) -> Value {
        json!({
            "baseURL": format!("{}/", self.server.url()),
            "extensions": {
                "Commands": {
                    "description": "Adds commands",
                    "versions": { "2.1.0": "1.7.1", "2.0.0": "1.1.5" }
                },
                "Extra": {
                    "description": "Something else",
                    "versions": { "1.0.0": "1.0.0" }
                }
            }
        })
    }

    async fn serve_catalog(&mut self, catalog: &Value) -> Mock {
        self.server
            .mock("GET", "/catalog.json")
            .with_status(200)
            .with_body(catalog.to_string())
            .create_async()
            .await
    }

    /// Artifact downloads, not yet created so callers can add expectations.
    fn artifact_mock(&mut self, status: usize) -> Mock {
        self.server
            .mock("GET", Matcher::Regex(r"^/[^/]+/releases/download/".to_string()))
            .with_status(status)
            .with_body("artifact-bytes")
    }

    async fn serve_artifacts(&mut self, status: usize) -> Mock {
        self.artifact_mock(status).create_async().await
    }

    fn engine(&self, host_version: &str) -> Engine {
        let config = EngineConfig::new(host_version, self.catalog_url(), self.artifact_dir());
        self.engine_with(config)
    }

    fn engine_with(&self, config: EngineConfig) -> Engine {
        let reporter: Arc<dyn Reporter> = self.reporter.clone();
        Engine::new(
            &config,
            Arc::new(JsonStateStore::new(self.state_path())),
            reporter,
        )
        .expect("failed to build engine")
    }

    fn write_state(&self, state: &Value) {
        std::fs::write(self.state_path(), state.to_string()).unwrap();
    }

    fn read_state(&self) -> DesiredState {
        DesiredState::from_json(&std::fs::read(self.state_path()).unwrap()).unwrap()
    }

    fn touch(&self, file: &str) {
        std::fs::create_dir_all(self.artifact_dir()).unwrap();
        std::fs::write(self.artifact_dir().join(file), b"old").unwrap();
    }

    fn artifacts(&self) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(self.artifact_dir()) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}

fn installed(outcome: &PassOutcome, name: &str) -> Option<String> {
    outcome.state.get(name)?.installed_version.clone()
}

fn name(s: &str) -> AddonName {
    AddonName::new(s).unwrap()
}

fn enabled(version: &str) -> Value {
    json!({ "enabled": true, "installedVersion": version })
}

#[tokio::test]
async fn test_new_addons_are_merged_disabled() {
    let mut ctx = TestContext::new().await;
    let catalog = ctx.commands_catalog();
    ctx.serve_catalog(&catalog).await;
    let downloads = ctx.artifact_mock(200).expect(0).create_async().await;

    let outcome = ctx.engine("1.7.1").reconcile(false).await.unwrap();

    assert_eq!(outcome.report.added.len(), 2);
    let state = ctx.read_state();
    let commands = state.get("Commands").unwrap();
    assert!(!commands.enabled);
    assert_eq!(commands.installed_version, None);
    assert_eq!(commands.description.as_deref(), Some("Adds commands"));
    assert!(ctx.artifacts().is_empty());
    downloads.assert_async().await;
}

#[tokio::test]
async fn test_compatible_version_is_kept() {
    let mut ctx = TestContext::new().await;
    ctx.write_state(&json!({ "addons": { "Commands": enabled("2.0.0") } }));
    let catalog = ctx.commands_catalog();
    ctx.serve_catalog(&catalog).await;
    ctx.serve_artifacts(200).await;

    let outcome = ctx.engine("1.7.1").reconcile(false).await.unwrap();

    assert_eq!(installed(&outcome, "Commands").as_deref(), Some("2.0.0"));
    assert!(outcome.report.switched.is_empty());
    assert_eq!(ctx.artifacts(), vec!["Commands-2.0.0.jar"]);
    assert_eq!(
        std::fs::read(ctx.artifact_dir().join("Commands-2.0.0.jar")).unwrap(),
        b"artifact-bytes"
    );
}

#[tokio::test]
async fn test_unlisted_version_is_replaced() {
    let mut ctx = TestContext::new().await;
    ctx.write_state(&json!({ "addons": { "Commands": enabled("1.9.0") } }));
    ctx.touch("Commands-1.9.0.jar");
    let catalog = ctx.commands_catalog();
    ctx.serve_catalog(&catalog).await;
    ctx.serve_artifacts(200).await;

    let outcome = ctx.engine("1.7.1").reconcile(false).await.unwrap();

    assert_eq!(installed(&outcome, "Commands").as_deref(), Some("2.1.0"));
    assert_eq!(outcome.report.switched.len(), 1);
    assert_eq!(outcome.report.switched[0].from.as_deref(), Some("1.9.0"));
    assert_eq!(ctx.artifacts(), vec!["Commands-2.1.0.jar"]);
    assert_eq!(
        ctx.read_state().get("Commands").unwrap().installed_version.as_deref(),
        Some("2.1.0")
    );
}

#[tokio::test]
async fn test_older_host_switches_to_older_version() {
    let mut ctx = TestContext::new().await;
    ctx.write_state(&json!({ "addons": { "Commands": enabled("2.1.0") } }));
    ctx.touch("Commands-2.1.0.jar");
    let catalog = ctx.commands_catalog();
    ctx.serve_catalog(&catalog).await;
    ctx.serve_artifacts(200).await;

    let outcome = ctx.engine("1.1.5").reconcile(false).await.unwrap();

    assert_eq!(installed(&outcome, "Commands").as_deref(), Some("2.0.0"));
    assert_eq!(ctx.artifacts(), vec!["Commands-2.0.0.jar"]);
    assert!(
        ctx.reporter
            .messages(LogLevel::Warning)
            .iter()
            .any(|m| m.contains("no longer compatible"))
    );
}

#[tokio::test]
async fn test_upgrade_only_when_requested() {
    let mut ctx = TestContext::new().await;
    ctx.write_state(&json!({ "addons": { "Commands": enabled("2.0.0") } }));
    let catalog = ctx.commands_catalog();
    ctx.serve_catalog(&catalog).await;
    ctx.serve_artifacts(200).await;
    let engine = ctx.engine("1.7.1");

    let outcome = engine.reconcile(false).await.unwrap();
    assert_eq!(installed(&outcome, "Commands").as_deref(), Some("2.0.0"));

    let outcome = engine.reconcile(true).await.unwrap();
    assert_eq!(installed(&outcome, "Commands").as_deref(), Some("2.1.0"));
    assert_eq!(ctx.artifacts(), vec!["Commands-2.1.0.jar"]);
}

#[tokio::test]
async fn test_auto_upgrade_setting_drives_upgrade() {
    let mut ctx = TestContext::new().await;
    ctx.write_state(&json!({
        "addons": { "Commands": enabled("2.0.0") },
        "settings": { "autoUpgrade": true }
    }));
    let catalog = ctx.commands_catalog();
    ctx.serve_catalog(&catalog).await;
    ctx.serve_artifacts(200).await;

    let outcome = ctx.engine("1.7.1").reconcile_with_settings().await.unwrap();

    assert_eq!(installed(&outcome, "Commands").as_deref(), Some("2.1.0"));
}

#[tokio::test]
async fn test_no_compatible_version_disables() {
    let mut ctx = TestContext::new().await;
    ctx.write_state(&json!({ "addons": { "Commands": enabled("2.0.0") } }));
    ctx.touch("Commands-2.0.0.jar");
    let catalog = ctx.commands_catalog();
    ctx.serve_catalog(&catalog).await;
    let downloads = ctx.artifact_mock(200).expect(0).create_async().await;

    let outcome = ctx.engine("1.0.0").reconcile(false).await.unwrap();

    assert_eq!(
        outcome.report.disabled,
        vec![(name("Commands"), DisableReason::Incompatible)]
    );
    assert!(!ctx.read_state().get("Commands").unwrap().enabled);
    assert!(ctx.artifacts().is_empty());
    downloads.assert_async().await;
}

#[tokio::test]
async fn test_addon_removed_from_catalog_is_disabled() {
    let mut ctx = TestContext::new().await;
    ctx.write_state(&json!({
        "addons": {
            "Commands": enabled("2.0.0"),
            "Gone": enabled("1.0.0")
        }
    }));
    ctx.touch("Commands-2.0.0.jar");
    ctx.touch("Gone-1.0.0.jar");
    let catalog = ctx.commands_catalog();
    ctx.serve_catalog(&catalog).await;

    let outcome = ctx.engine("1.7.1").reconcile(false).await.unwrap();

    assert_eq!(
        outcome.report.disabled,
        vec![(name("Gone"), DisableReason::RemovedFromCatalog)]
    );
    let state = ctx.read_state();
    assert!(!state.get("Gone").unwrap().enabled);
    assert!(state.get("Commands").unwrap().enabled);
    assert_eq!(ctx.artifacts(), vec!["Commands-2.0.0.jar"]);
    assert!(
        ctx.reporter
            .messages(LogLevel::Warning)
            .iter()
            .any(|m| m.contains("Gone no longer exists"))
    );
}

#[tokio::test]
async fn test_unreachable_catalog_changes_nothing() {
    let mut ctx = TestContext::new().await;
    ctx.write_state(&json!({ "addons": { "Commands": enabled("1.9.0") } }));
    ctx.touch("Commands-1.9.0.jar");
    ctx.touch("Stale-1.0.0.jar");
    ctx.server
        .mock("GET", Matcher::Any)
        .with_status(503)
        .create_async()
        .await;
    let state_before = std::fs::read(ctx.state_path()).unwrap();
    let files_before = ctx.artifacts();

    let config = EngineConfig::new("1.7.1", ctx.catalog_url(), ctx.artifact_dir())
        .with_backup_url(format!("{}/backup.json", ctx.server.url()));
    let err = ctx.engine_with(config).reconcile(true).await.unwrap_err();

    assert!(matches!(err, EngineError::Fetch(_)));
    assert_eq!(std::fs::read(ctx.state_path()).unwrap(), state_before);
    assert_eq!(ctx.artifacts(), files_before);
    assert!(
        ctx.reporter
            .messages(LogLevel::Warning)
            .iter()
            .any(|m| m.contains("Failed to load addon catalog"))
    );
}

#[tokio::test]
async fn test_backup_source_is_used() {
    let mut ctx = TestContext::new().await;
    ctx.server
        .mock("GET", "/catalog.json")
        .with_status(500)
        .create_async()
        .await;
    let catalog = ctx.commands_catalog();
    ctx.server
        .mock("GET", "/backup.json")
        .with_status(200)
        .with_body(catalog.to_string())
        .create_async()
        .await;

    let config = EngineConfig::new("1.7.1", ctx.catalog_url(), ctx.artifact_dir())
        .with_backup_url(format!("{}/backup.json", ctx.server.url()));
    let outcome = ctx.engine_with(config).reconcile(false).await.unwrap();

    assert!(outcome.catalog.contains("Commands"));
    assert_eq!(outcome.report.added.len(), 2);
}

#[tokio::test]
async fn test_second_pass_is_a_noop() {
    let mut ctx = TestContext::new().await;
    ctx.write_state(&json!({ "addons": { "Commands": enabled("1.9.0") } }));
    let catalog = ctx.commands_catalog();
    ctx.serve_catalog(&catalog).await;
    let downloads = ctx.artifact_mock(200).expect(1).create_async().await;
    let engine = ctx.engine("1.7.1");

    engine.reconcile(false).await.unwrap();
    let state_after_first = std::fs::read(ctx.state_path()).unwrap();
    let files_after_first = ctx.artifacts();

    let outcome = engine.reconcile(false).await.unwrap();

    assert!(outcome.report.is_noop());
    assert_eq!(std::fs::read(ctx.state_path()).unwrap(), state_after_first);
    assert_eq!(ctx.artifacts(), files_after_first);
    downloads.assert_async().await;
}

#[tokio::test]
async fn test_failed_download_is_retried_next_pass() {
    let mut ctx = TestContext::new().await;
    ctx.write_state(&json!({ "addons": { "Commands": enabled("2.0.0") } }));
    let catalog = ctx.commands_catalog();
    ctx.serve_catalog(&catalog).await;
    let broken = ctx.serve_artifacts(404).await;
    let engine = ctx.engine("1.7.1");

    let outcome = engine.reconcile(false).await.unwrap();
    assert_eq!(outcome.report.failures.len(), 1);
    assert!(outcome.report.installed.is_empty());
    assert_eq!(installed(&outcome, "Commands").as_deref(), Some("2.0.0"));
    assert!(ctx.artifacts().is_empty(), "no partial file may be left behind");

    broken.remove_async().await;
    ctx.serve_artifacts(200).await;

    let outcome = engine.reconcile(false).await.unwrap();
    assert!(outcome.report.failures.is_empty());
    assert_eq!(outcome.report.installed.len(), 1);
    assert_eq!(ctx.artifacts(), vec!["Commands-2.0.0.jar"]);
}

#[tokio::test]
async fn test_foreign_files_are_left_alone() {
    let mut ctx = TestContext::new().await;
    ctx.write_state(&json!({ "addons": { "Commands": enabled("2.0.0") } }));
    ctx.touch("Commands-2.0.0.jar");
    ctx.touch("notes.txt");
    ctx.touch("Unrelated-1.0.0.jar");
    ctx.touch("Commands-latest.jar");
    let catalog = ctx.commands_catalog();
    ctx.serve_catalog(&catalog).await;

    ctx.engine("1.7.1").reconcile(false).await.unwrap();

    assert_eq!(
        ctx.artifacts(),
        vec![
            "Commands-2.0.0.jar",
            "Commands-latest.jar",
            "Unrelated-1.0.0.jar",
            "notes.txt"
        ]
    );
}

#[tokio::test]
async fn test_malformed_catalog_entry_is_skipped() {
    let mut ctx = TestContext::new().await;
    ctx.write_state(&json!({ "addons": { "Commands": enabled("2.0.0") } }));
    let catalog = json!({
        "baseURL": format!("{}/", ctx.server.url()),
        "extensions": {
            "Commands": { "versions": { "2.0.0": "1.1.5", "two": "1.0.0" } },
            "Broken": { "versions": "nope" }
        }
    });
    ctx.serve_catalog(&catalog).await;
    ctx.serve_artifacts(200).await;

    let outcome = ctx.engine("1.7.1").reconcile(false).await.unwrap();

    assert_eq!(outcome.catalog.rejected.len(), 2);
    assert_eq!(installed(&outcome, "Commands").as_deref(), Some("2.0.0"));
    assert!(outcome.state.get("Broken").is_none());
    assert_eq!(
        ctx.reporter
            .messages(LogLevel::Warning)
            .iter()
            .filter(|m| m.contains("Skipping malformed catalog entry"))
            .count(),
        2
    );
}

#[tokio::test]
async fn test_malformed_entry_of_enabled_addon_is_held() {
    let mut ctx = TestContext::new().await;
    ctx.write_state(&json!({
        "addons": {
            "Broken": { "enabled": true, "installedVersion": "1.0.0", "description": "Kept" }
        }
    }));
    ctx.touch("Broken-1.0.0.jar");
    let catalog = json!({
        "baseURL": format!("{}/", ctx.server.url()),
        "extensions": {
            "Broken": { "description": 42, "versions": { "1.0.0": "1.0.0" } }
        }
    });
    ctx.serve_catalog(&catalog).await;
    let downloads = ctx.artifact_mock(200).expect(0).create_async().await;
    let state_before = std::fs::read(ctx.state_path()).unwrap();

    let outcome = ctx.engine("1.7.1").reconcile(false).await.unwrap();

    assert_eq!(outcome.report.held, vec![name("Broken")]);
    assert!(outcome.report.disabled.is_empty());
    assert!(outcome.report.removed.is_empty());
    assert_eq!(std::fs::read(ctx.state_path()).unwrap(), state_before);
    assert_eq!(ctx.artifacts(), vec!["Broken-1.0.0.jar"]);
    assert!(
        ctx.reporter
            .messages(LogLevel::Warning)
            .iter()
            .any(|m| m.contains("Catalog entry for Broken is malformed"))
    );
    downloads.assert_async().await;
}

#[tokio::test]
async fn test_unreadable_artifact_dir_aborts_pass() {
    let mut ctx = TestContext::new().await;
    ctx.write_state(&json!({ "addons": { "Commands": { "enabled": true } } }));
    let catalog = ctx.commands_catalog();
    ctx.serve_catalog(&catalog).await;
    let downloads = ctx.artifact_mock(200).expect(0).create_async().await;
    // A regular file where the directory should be.
    let not_a_dir = ctx.home().join("not-a-dir");
    std::fs::write(&not_a_dir, b"x").unwrap();

    let state_before = std::fs::read(ctx.state_path()).unwrap();

    let config = EngineConfig::new("1.7.1", ctx.catalog_url(), not_a_dir.clone());
    let err = ctx.engine_with(config).reconcile(false).await.unwrap_err();

    assert!(matches!(err, EngineError::Artifacts(_)));
    assert_eq!(std::fs::read(&not_a_dir).unwrap(), b"x");
    assert_eq!(std::fs::read(ctx.state_path()).unwrap(), state_before);
    assert!(
        ctx.reporter
            .messages(LogLevel::Error)
            .iter()
            .any(|m| m.contains("Cannot read addon artifact directory"))
    );
    downloads.assert_async().await;
}

#[tokio::test]
async fn test_unparseable_installed_version_is_never_removed_by_path() {
    let mut ctx = TestContext::new().await;
    ctx.write_state(&json!({ "addons": { "Gone": enabled("1/../../victim") } }));
    // Gone-1/../../victim.jar resolves to <home>/victim.jar.
    std::fs::create_dir_all(ctx.artifact_dir().join("Gone-1")).unwrap();
    let victim = ctx.home().join("victim.jar");
    std::fs::write(&victim, b"keep me").unwrap();
    let catalog = ctx.commands_catalog();
    ctx.serve_catalog(&catalog).await;

    let outcome = ctx.engine("1.7.1").reconcile(false).await.unwrap();

    assert_eq!(
        outcome.report.disabled,
        vec![(name("Gone"), DisableReason::RemovedFromCatalog)]
    );
    assert!(outcome.report.removed.is_empty());
    assert_eq!(std::fs::read(&victim).unwrap(), b"keep me");
}

#[tokio::test]
async fn test_failed_first_pass_creates_no_state_file() {
    let mut ctx = TestContext::new().await;
    ctx.server
        .mock("GET", Matcher::Any)
        .with_status(503)
        .create_async()
        .await;

    let engine = ctx.engine("1.7.1");
    assert!(engine.reconcile(false).await.is_err());
    assert!(engine.fetch_catalog_only().await.is_err());
    assert!(!ctx.state_path().exists());
}

#[tokio::test]
async fn test_first_pass_creates_state_file() {
    let mut ctx = TestContext::new().await;
    let catalog = json!({ "baseURL": format!("{}/", ctx.server.url()), "extensions": {} });
    ctx.serve_catalog(&catalog).await;

    let outcome = ctx.engine("1.7.1").reconcile(false).await.unwrap();

    assert!(outcome.report.is_noop());
    assert_eq!(ctx.read_state(), DesiredState::default());
}

#[tokio::test]
async fn test_fetch_catalog_only_leaves_artifacts() {
    let mut ctx = TestContext::new().await;
    ctx.write_state(&json!({ "addons": { "Commands": enabled("1.9.0") } }));
    ctx.touch("Commands-1.9.0.jar");
    let catalog = ctx.commands_catalog();
    ctx.serve_catalog(&catalog).await;
    let downloads = ctx.artifact_mock(200).expect(0).create_async().await;

    let outcome = ctx.engine("1.7.1").fetch_catalog_only().await.unwrap();

    assert_eq!(outcome.report.added, vec![name("Extra")]);
    assert_eq!(installed(&outcome, "Commands").as_deref(), Some("1.9.0"));
    assert_eq!(ctx.artifacts(), vec!["Commands-1.9.0.jar"]);
    downloads.assert_async().await;
}

#[tokio::test]
async fn test_enable_then_reconcile_installs() {
    let mut ctx = TestContext::new().await;
    let catalog = ctx.commands_catalog();
    ctx.serve_catalog(&catalog).await;
    ctx.serve_artifacts(200).await;
    let engine = ctx.engine("1.7.1");

    engine.fetch_catalog_only().await.unwrap();
    let store = JsonStateStore::new(ctx.state_path());
    update_state(&store, |state| state.set_enabled(name("Commands"), true))
        .await
        .unwrap();
    let outcome = engine.reconcile(false).await.unwrap();

    assert_eq!(installed(&outcome, "Commands").as_deref(), Some("2.1.0"));
    assert_eq!(ctx.artifacts(), vec!["Commands-2.1.0.jar"]);
    assert_eq!(
        outcome.report.installed,
        vec![(name("Commands"), "2.1.0".to_string())]
    );
}

#[tokio::test]
async fn test_invalid_host_version_is_rejected() {
    let ctx = TestContext::new().await;
    let config = EngineConfig::new("not-a-version", ctx.catalog_url(), ctx.artifact_dir());
    let reporter: Arc<dyn Reporter> = ctx.reporter.clone();

    let err = Engine::new(
        &config,
        Arc::new(JsonStateStore::new(ctx.state_path())),
        reporter,
    )
    .unwrap_err();

    assert!(matches!(err, EngineError::InvalidHostVersion(_)));
}
