/// Integration tests for sortback
///
/// These tests exercise complete end-to-end workflows: organizing a
/// directory, inspecting the recorded history, and rolling the filesystem
/// back to earlier points in the timeline.
use sortback::cli::{Cli, Command, run};
use sortback::config::Config;
use sortback::file_type::FileType;
use sortback::history::{HistoryStore, OperationDraft, OperationKind};
use sortback::organizer::Organizer;
use sortback::rollback::{RollbackEngine, RollbackError};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

// ============================================================================
// Test Utilities
// ============================================================================

/// A test fixture with a temporary directory, a configuration whose target
/// directories and history file all live inside it, and helpers for
/// creating and checking files.
struct TestFixture {
    temp_dir: TempDir,
    config: Config,
}

impl TestFixture {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");

        let mut config = Config::default();
        config.paths.source_dir = Some(temp_dir.path().join("inbox"));
        for file_type in FileType::ALL {
            config.paths.targets.insert(
                file_type.key().to_string(),
                temp_dir.path().join("sorted").join(file_type.key()),
            );
        }
        config.history.file = Some(temp_dir.path().join("history.json"));

        fs::create_dir(temp_dir.path().join("inbox")).expect("Failed to create inbox");

        TestFixture { temp_dir, config }
    }

    fn inbox(&self) -> PathBuf {
        self.temp_dir.path().join("inbox")
    }

    /// Create a file in the inbox with some content.
    fn create_file(&self, name: &str) -> PathBuf {
        let file_path = self.inbox().join(name);
        let mut file = File::create(&file_path).expect("Failed to create file");
        file.write_all(name.as_bytes())
            .expect("Failed to write file content");
        file_path
    }

    fn create_files(&self, names: &[&str]) {
        for name in names {
            self.create_file(name);
        }
    }

    fn store(&self) -> HistoryStore {
        HistoryStore::load(self.config.history_file_path())
    }

    fn organizer(&self) -> Organizer<'_> {
        Organizer::new(&self.config).expect("Failed to build organizer")
    }

    /// Organize the inbox, recording to history, and return the timeline ID.
    fn organize_recorded(&self, store: &mut HistoryStore) -> Option<String> {
        self.organizer()
            .organize(&self.inbox(), None, Some(store))
            .expect("Organize failed")
            .timeline_id
    }

    fn sorted_path(&self, type_key: &str, name: &str) -> PathBuf {
        self.temp_dir.path().join("sorted").join(type_key).join(name)
    }

    fn assert_exists(&self, path: &Path) {
        assert!(path.exists(), "Expected path to exist: {}", path.display());
    }

    fn assert_not_exists(&self, path: &Path) {
        assert!(
            !path.exists(),
            "Expected path to be gone: {}",
            path.display()
        );
    }
}

// ============================================================================
// Organize workflows
// ============================================================================

#[test]
fn test_organize_routes_files_and_records_history() {
    let fixture = TestFixture::new();
    fixture.create_files(&["photo.jpg", "paper.pdf", "clip.mp4", "track.mp3"]);

    let mut store = fixture.store();
    let id = fixture
        .organize_recorded(&mut store)
        .expect("run should be recorded");

    fixture.assert_exists(&fixture.sorted_path("image", "photo.jpg"));
    fixture.assert_exists(&fixture.sorted_path("pdf", "paper.pdf"));
    fixture.assert_exists(&fixture.sorted_path("video", "clip.mp4"));
    fixture.assert_exists(&fixture.sorted_path("audio", "track.mp3"));

    let entry = store.get_entry_by_timeline(&id).expect("entry exists");
    assert_eq!(entry.operation_type, OperationKind::OrganizeFiles);
    assert_eq!(entry.files_moved.len(), 4);
    assert!(entry.reversible);
    assert_eq!(entry.operation_data.get("moved").and_then(|v| v.as_u64()), Some(4));
}

#[test]
fn test_unknown_extensions_are_left_alone() {
    let fixture = TestFixture::new();
    let mystery = fixture.create_file("data.blob");
    fixture.create_file("photo.png");

    let mut store = fixture.store();
    fixture.organize_recorded(&mut store);

    fixture.assert_exists(&mystery);
    fixture.assert_exists(&fixture.sorted_path("image", "photo.png"));
}

#[test]
fn test_screenshot_filename_routes_to_images() {
    let fixture = TestFixture::new();
    fixture.create_file("Screenshot 2026-08-30.png");

    let mut store = fixture.store();
    fixture.organize_recorded(&mut store);

    fixture.assert_exists(&fixture.sorted_path("image", "Screenshot 2026-08-30.png"));
}

#[test]
fn test_two_runs_get_distinct_increasing_ids() {
    let fixture = TestFixture::new();
    let mut store = fixture.store();

    fixture.create_file("one.pdf");
    let first = fixture.organize_recorded(&mut store).expect("first id");

    fixture.create_file("two.pdf");
    let second = fixture.organize_recorded(&mut store).expect("second id");

    assert_ne!(first, second);
    let first_n: u64 = first.trim_start_matches('T').parse().expect("numeric");
    let second_n: u64 = second.trim_start_matches('T').parse().expect("numeric");
    assert!(second_n > first_n);
}

#[test]
fn test_ids_survive_store_reload() {
    let fixture = TestFixture::new();

    fixture.create_file("one.pdf");
    let mut store = fixture.store();
    fixture.organize_recorded(&mut store).expect("first id");
    drop(store);

    // A fresh process sees the persisted history and continues the counter.
    fixture.create_file("two.pdf");
    let mut reloaded = fixture.store();
    assert_eq!(reloaded.len(), 1);
    let second = fixture.organize_recorded(&mut reloaded).expect("second id");
    assert_eq!(second, "T2");
}

// ============================================================================
// Undo and rollback
// ============================================================================

#[test]
fn test_undo_last_restores_files() {
    let fixture = TestFixture::new();
    let original = fixture.create_file("paper.pdf");

    let mut store = fixture.store();
    fixture.organize_recorded(&mut store);
    fixture.assert_not_exists(&original);

    let message = RollbackEngine::rollback_last_operation(&mut store).expect("undo failed");
    assert!(message.contains("T1"));

    fixture.assert_exists(&original);
    fixture.assert_not_exists(&fixture.sorted_path("pdf", "paper.pdf"));
    // Only the one entry was removed and no rollback record was added
    // (known asymmetry with rollback_to_timeline).
    assert!(store.is_empty());
}

#[test]
fn test_rollback_to_timeline_undoes_later_runs_only() {
    let fixture = TestFixture::new();
    let mut store = fixture.store();

    let first_file = fixture.create_file("keep.pdf");
    let t1 = fixture.organize_recorded(&mut store).expect("t1");

    let second_file = fixture.create_file("undo_me.jpg");
    fixture.organize_recorded(&mut store).expect("t2");
    let third_file = fixture.create_file("undo_me_too.mp3");
    fixture.organize_recorded(&mut store).expect("t3");

    let message =
        RollbackEngine::rollback_to_timeline(&mut store, &t1).expect("rollback failed");
    assert!(message.contains(&t1));

    // The first run's move is intact; the later runs are reversed.
    fixture.assert_not_exists(&first_file);
    fixture.assert_exists(&fixture.sorted_path("pdf", "keep.pdf"));
    fixture.assert_exists(&second_file);
    fixture.assert_exists(&third_file);

    // Log now holds T1 plus the rollback audit record.
    assert_eq!(store.len(), 2);
    let audit = store.get_last_entry().expect("audit record");
    assert_eq!(audit.operation_type, OperationKind::Rollback);
    assert!(!audit.reversible);

    // The persisted file agrees with memory.
    let reloaded = fixture.store();
    assert_eq!(reloaded.entries(), store.entries());
}

#[test]
fn test_rollback_blocked_by_non_reversible_entry() {
    let fixture = TestFixture::new();
    let mut store = fixture.store();

    fixture.create_file("a.pdf");
    let t1 = fixture.organize_recorded(&mut store).expect("t1");

    let blocker = store
        .record_operation(
            OperationDraft::new(OperationKind::ConfigChange, "changed targets").irreversible(),
        )
        .expect("record");

    fixture.create_file("b.pdf");
    fixture.organize_recorded(&mut store).expect("t3");

    let err = RollbackEngine::rollback_to_timeline(&mut store, &t1)
        .expect_err("blocked rollback must fail");
    match &err {
        RollbackError::BlockedByLaterEntry { blocking_id } => {
            assert_eq!(blocking_id, &blocker);
        }
        other => panic!("expected BlockedByLaterEntry, got {:?}", other),
    }
    // The message names the blocking entry for the user.
    assert!(err.to_string().contains(&blocker));

    // Nothing was removed.
    assert_eq!(store.len(), 3);
}

#[test]
fn test_undo_tolerates_user_deleted_file() {
    let fixture = TestFixture::new();
    let mut store = fixture.store();

    let a = fixture.create_file("a.pdf");
    let b = fixture.create_file("b.pdf");
    fixture.organize_recorded(&mut store);

    // The user deletes one organized file before undoing.
    fs::remove_file(fixture.sorted_path("pdf", "b.pdf")).expect("delete");

    RollbackEngine::rollback_last_operation(&mut store).expect("undo should tolerate this");
    fixture.assert_exists(&a);
    fixture.assert_not_exists(&b);
}

#[test]
fn test_undo_empty_history_fails_cleanly() {
    let fixture = TestFixture::new();
    let mut store = fixture.store();

    let err = RollbackEngine::rollback_last_operation(&mut store).expect_err("must fail");
    assert_eq!(err.to_string(), "No operations to rollback");
}

// ============================================================================
// CLI layer
// ============================================================================

fn run_command(fixture: &TestFixture, command: Command) -> Result<(), String> {
    // Persist the fixture's config so the CLI path loads it like a user's.
    let config_path = fixture.temp_dir.path().join("config.toml");
    let toml_str = toml::to_string(&fixture.config).expect("serialize config");
    fs::write(&config_path, toml_str).expect("write config");

    run(Cli {
        config: Some(config_path),
        command,
    })
}

#[test]
fn test_cli_organize_and_undo_round_trip() {
    let fixture = TestFixture::new();
    let original = fixture.create_file("paper.pdf");

    run_command(
        &fixture,
        Command::Organize {
            dir: None,
            types: Vec::new(),
            dry_run: false,
        },
    )
    .expect("organize command failed");
    fixture.assert_not_exists(&original);
    fixture.assert_exists(&fixture.sorted_path("pdf", "paper.pdf"));

    run_command(&fixture, Command::Undo { timeline_id: None }).expect("undo command failed");
    fixture.assert_exists(&original);
}

#[test]
fn test_cli_dry_run_changes_nothing() {
    let fixture = TestFixture::new();
    let original = fixture.create_file("photo.jpg");

    run_command(
        &fixture,
        Command::Organize {
            dir: None,
            types: Vec::new(),
            dry_run: true,
        },
    )
    .expect("dry run failed");

    fixture.assert_exists(&original);
    assert!(fixture.store().is_empty());
}

#[test]
fn test_cli_undo_unknown_timeline_reports_it() {
    let fixture = TestFixture::new();
    fixture.create_file("a.pdf");
    run_command(
        &fixture,
        Command::Organize {
            dir: None,
            types: Vec::new(),
            dry_run: false,
        },
    )
    .expect("organize failed");

    let err = run_command(
        &fixture,
        Command::Undo {
            timeline_id: Some("T99".to_string()),
        },
    )
    .expect_err("unknown timeline must fail");
    assert!(err.contains("T99"));
}

#[test]
fn test_cli_custom_organize() {
    let fixture = TestFixture::new();
    fixture.create_files(&["build.log", "notes.txt"]);
    let target = fixture.temp_dir.path().join("logs");

    run_command(
        &fixture,
        Command::Custom {
            dir: fixture.inbox(),
            extensions: vec!["log".to_string()],
            target: target.clone(),
        },
    )
    .expect("custom command failed");

    assert!(target.join("build.log").exists());
    fixture.assert_exists(&fixture.inbox().join("notes.txt"));

    let store = fixture.store();
    let entry = store.get_last_entry().expect("recorded");
    assert_eq!(entry.operation_type, OperationKind::CustomOrganize);
}

#[test]
fn test_cli_history_disabled() {
    let mut fixture = TestFixture::new();
    fixture.config.history.enabled = false;
    let original = fixture.create_file("paper.pdf");

    // Organizing still works, it just is not recorded.
    run_command(
        &fixture,
        Command::Organize {
            dir: None,
            types: Vec::new(),
            dry_run: false,
        },
    )
    .expect("organize failed");
    fixture.assert_not_exists(&original);
    assert!(fixture.store().is_empty());

    // History and undo refuse to run.
    assert!(run_command(&fixture, Command::History { limit: 10 }).is_err());
    assert!(run_command(&fixture, Command::Undo { timeline_id: None }).is_err());
}

#[test]
fn test_cli_cleanup_reports_zero_on_fresh_history() {
    let fixture = TestFixture::new();
    fixture.create_file("a.pdf");
    run_command(
        &fixture,
        Command::Organize {
            dir: None,
            types: Vec::new(),
            dry_run: false,
        },
    )
    .expect("organize failed");

    run_command(&fixture, Command::Cleanup { days: Some(30) }).expect("cleanup failed");
    assert_eq!(fixture.store().len(), 1);
}
