//! SQLite store: persistence across reopen and transactional atomicity

use tempfile::TempDir;

use nestree::application::services::TreeService;
use nestree::application::ApplicationError;
use nestree::config::{Backend, Settings};
use nestree::domain::{DomainError, Node};
use nestree::infrastructure::di::ServiceContainer;
use nestree::infrastructure::{NestedSetStore, Side, SqliteStore};
use nestree::util::testing;

fn open(path: &std::path::Path) -> TreeService {
    testing::init_test_setup();
    TreeService::new(Box::new(SqliteStore::open(path).unwrap()), "root").unwrap()
}

#[test]
fn given_seeded_db_when_reopening_then_tree_persists() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("nested/tree.db");
    let before = {
        let mut tree = open(&db);
        tree.load_reference_forest().unwrap();
        tree.move_node("aa", "c").unwrap();
        tree.nodes().unwrap()
    };

    // Act
    let tree = open(&db);

    // Assert
    assert_eq!(tree.nodes().unwrap(), before);
    assert!(tree.validate().unwrap().is_valid());
}

#[test]
fn given_failed_batch_when_rolling_back_then_store_unchanged() {
    testing::init_test_setup();
    let dir = TempDir::new().unwrap();
    let mut store = SqliteStore::open(dir.path().join("tree.db")).unwrap();
    store.insert(&Node::root("root")).unwrap();

    store.begin().unwrap();
    store.shift_bounds(Side::Right, 2..=i64::MAX, 2).unwrap();
    let dup = store.insert(&Node::root("root"));
    assert!(dup.is_err());
    store.rollback().unwrap();

    assert_eq!(store.all().unwrap(), vec![Node::root("root")]);
}

#[test]
fn given_rejected_operation_when_reopening_then_nothing_written() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("tree.db");
    {
        let mut tree = open(&db);
        tree.load_reference_forest().unwrap();
        let err = tree.move_node("b", "bbbb").unwrap_err();
        assert!(matches!(
            err.as_domain(),
            Some(DomainError::CycleViolation { .. })
        ));
    }

    let tree = open(&db);

    assert_eq!(tree.node("b").unwrap().parent.as_deref(), Some("root"));
    assert_eq!(tree.node_count().unwrap(), 16);
}

#[test]
fn given_sqlite_settings_when_building_container_then_uses_db_path() {
    testing::init_test_setup();
    let dir = TempDir::new().unwrap();
    let settings = Settings {
        backend: Backend::Sqlite,
        db_path: dir.path().join("container.db"),
        ..Settings::default()
    };

    let mut container = ServiceContainer::new(settings).unwrap();
    container.tree.add_node("a", None).unwrap();

    assert_eq!(container.tree.backend_name(), "sqlite");
    assert!(dir.path().join("container.db").exists());
}

#[test]
fn given_db_seeded_with_root_when_reopening_with_other_root_name_then_config_error() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("tree.db");
    open(&db).add_node("a", None).unwrap();

    // Act
    let result = TreeService::new(Box::new(SqliteStore::open(&db).unwrap()), "top");

    // Assert
    let err = result.err().expect("mismatched root name is rejected");
    assert!(matches!(err, ApplicationError::Config { .. }));
    assert!(err.to_string().contains("\"root\""));
    let tree = open(&db);
    assert_eq!(tree.node_count().unwrap(), 2);
}
