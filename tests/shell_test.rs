//! Scripted sessions against the interactive shell

use std::io::Cursor;

use nestree::application::services::TreeService;
use nestree::cli::shell;
use nestree::infrastructure::{MemoryStore, SqliteStore};
use nestree::util::testing;

fn run_script(tree: &mut TreeService, script: &str) -> String {
    testing::init_test_setup();
    let mut out = Vec::new();
    shell::run(tree, Cursor::new(script.as_bytes()), &mut out).unwrap();
    String::from_utf8(out).unwrap()
}

#[test]
fn given_script_when_running_shell_then_applies_commands_in_order() {
    // Arrange
    let mut tree = TreeService::new(Box::new(MemoryStore::new()), "root").unwrap();

    // Act
    let out = run_script(&mut tree, "+ a\n+ aa a\n+ b\nm aa b\nc b\nv\nq\n");

    // Assert
    assert!(out.contains("Added a under root"));
    assert!(out.contains("Added aa under a"));
    assert!(out.contains("Moved aa to b"));
    assert!(out.contains("Tree is valid"));
    assert_eq!(tree.node("aa").unwrap().parent.as_deref(), Some("b"));
}

#[test]
fn given_failing_command_when_running_shell_then_reports_and_continues() {
    let mut tree = TreeService::new(Box::new(MemoryStore::new()), "root").unwrap();

    let out = run_script(&mut tree, "- nope\nx\n+ a\n");

    assert!(out.contains("Error: remove: node \"nope\" does not exist"));
    assert!(out.contains("no existing command: \"x\""));
    assert!(out.contains("Added a under root"));
    assert_eq!(tree.node_count().unwrap(), 2);
}

#[test]
fn given_seed_and_random_moves_when_running_shell_then_tree_stays_valid() {
    let mut tree = TreeService::new(Box::new(SqliteStore::open_in_memory().unwrap()), "root")
        .unwrap();

    let out = run_script(&mut tree, "b\nr 25\np aaaa\nl\n");

    assert!(out.contains("Reference forest loaded (15 nodes)"));
    assert_eq!(out.matches("Moved ").count(), 25);
    assert!(out.contains("Tree is valid"));
    assert!(out.contains("root l:1 r:32 d:0 p:-"));
    assert!(tree.validate().unwrap().is_valid());
}

#[test]
fn given_quit_when_running_shell_then_ignores_remaining_lines() {
    let mut tree = TreeService::new(Box::new(MemoryStore::new()), "root").unwrap();

    run_script(&mut tree, "q\n+ a\n");

    assert_eq!(tree.node_count().unwrap(), 1);
}
