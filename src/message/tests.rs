use super::*;
use crate::changeset::ChangeStatus;
use std::path::Path;

fn staged(paths: &[&str]) -> Vec<Change> {
    paths
        .iter()
        .map(|path| Change::new(*path, ChangeStatus::Modified))
        .collect()
}

fn generate_for(changes: &[Change]) -> Option<String> {
    generate(changes, Path::new("/repo"))
}

#[test]
fn test_nothing_staged() {
    assert_eq!(generate(&[], Path::new("/repo")), None);
}

#[test]
fn test_single_source_file_is_a_feature() {
    assert_eq!(
        generate_for(&staged(&["/repo/src/parser.rs"])),
        Some("feat: update parser.rs".to_string())
    );
}

#[test]
fn test_multiple_files_are_counted() {
    assert_eq!(
        generate_for(&staged(&["/repo/src/a.rs", "/repo/src/b.rs", "/repo/src/c.rs"])),
        Some("feat: update 3 files".to_string())
    );
}

#[test]
fn test_tests_win_over_docs() {
    assert_eq!(
        generate_for(&staged(&["/repo/README.md", "/repo/tests/cli.rs"])),
        Some("test: update 2 files".to_string())
    );
}

#[test]
fn test_docs() {
    assert_eq!(
        generate_for(&staged(&["/repo/docs/guide.md"])),
        Some("docs: update guide.md".to_string())
    );
}

#[test]
fn test_config_files_are_chores() {
    assert_eq!(
        generate_for(&staged(&["/repo/package.json"])),
        Some("chore: update package.json".to_string())
    );
    assert_eq!(
        generate_for(&staged(&["/repo/Cargo.toml", "/repo/src/main.rs"])),
        Some("chore: update 2 files".to_string())
    );
}

#[test]
fn test_single_file_name_hints() {
    assert_eq!(
        generate_for(&staged(&["/repo/src/bugfix_parser.rs"])),
        Some("fix: update bugfix_parser.rs".to_string())
    );
    assert_eq!(
        generate_for(&staged(&["/repo/web/main.css"])),
        Some("style: update main.css".to_string())
    );
}

#[test]
fn test_name_hints_ignored_for_multiple_files() {
    assert_eq!(
        generate_for(&staged(&["/repo/src/fix.rs", "/repo/src/other.rs"])),
        Some("feat: update 2 files".to_string())
    );
}

#[test]
fn test_long_lines() {
    assert!(!has_long_lines("feat: short"));
    assert!(has_long_lines(&"x".repeat(MAX_LINE_LENGTH + 1)));
    // characters, not bytes
    assert!(!has_long_lines(&"é".repeat(MAX_LINE_LENGTH)));
    assert!(has_long_lines(&"é".repeat(MAX_LINE_LENGTH + 1)));
    assert!(has_long_lines(&format!(
        "summary\n\n- {}",
        "y".repeat(MAX_LINE_LENGTH)
    )));
}

#[test]
fn test_checkout_location_is_ignored() {
    let changes = vec![Change::new("/home/tester/project/src/lib.rs", ChangeStatus::Modified)];

    assert_eq!(
        generate(&changes, Path::new("/home/tester/project")),
        Some("feat: update lib.rs".to_string())
    );
}
