use super::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// helper to initialise a test git repository
fn setup_test_repo() -> (TempDir, Repository, GitRepo) {
    let temp_dir = TempDir::new().unwrap();
    let repo = Repository::init(temp_dir.path()).unwrap();

    // configure git user for commits
    let mut config = repo.config().unwrap();
    config.set_str("user.name", "Test User").unwrap();
    config.set_str("user.email", "test@example.com").unwrap();

    let vcs = GitRepo::open(temp_dir.path()).unwrap();
    (temp_dir, repo, vcs)
}

/// helper to create a file with content
fn create_file(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

/// helper to commit all changes
fn commit_all(repo: &Repository, message: &str) {
    let mut index = repo.index().unwrap();
    index
        .add_all(["*"].iter(), git2::IndexAddOption::DEFAULT, None)
        .unwrap();
    index.write().unwrap();

    let tree_id = index.write_tree().unwrap();
    let tree = repo.find_tree(tree_id).unwrap();
    let signature = repo.signature().unwrap();

    let parent_commit = repo.head().ok().and_then(|h| h.peel_to_commit().ok());

    if let Some(parent) = parent_commit {
        repo.commit(
            Some("HEAD"),
            &signature,
            &signature,
            message,
            &tree,
            &[&parent],
        )
        .unwrap();
    } else {
        // first commit
        repo.commit(Some("HEAD"), &signature, &signature, message, &tree, &[])
            .unwrap();
    }
}

/// absolute path string for a file in the repository
fn abs(vcs: &GitRepo, relative: &str) -> String {
    vcs.workdir().join(relative).to_string_lossy().to_string()
}

#[test]
fn test_untracked_file_is_a_working_tree_change() {
    let (_temp_dir, _repo, vcs) = setup_test_repo();
    create_file(&vcs.workdir().join("new.txt"), "hello");

    let changes = vcs.working_tree_changes().unwrap();

    assert_eq!(
        changes,
        vec![Change::new(abs(&vcs, "new.txt"), ChangeStatus::Untracked)]
    );
    assert!(vcs.staged_changes().unwrap().is_empty());
}

#[test]
fn test_untracked_directories_are_expanded() {
    let (_temp_dir, _repo, vcs) = setup_test_repo();
    create_file(&vcs.workdir().join("dir/a.txt"), "a");
    create_file(&vcs.workdir().join("dir/sub/b.txt"), "b");

    let mut paths: Vec<String> = vcs
        .working_tree_changes()
        .unwrap()
        .into_iter()
        .map(|c| c.path)
        .collect();
    paths.sort();

    assert_eq!(
        paths,
        vec![abs(&vcs, "dir/a.txt"), abs(&vcs, "dir/sub/b.txt")]
    );
}

#[test]
fn test_modified_and_deleted_files() {
    let (_temp_dir, repo, vcs) = setup_test_repo();
    create_file(&vcs.workdir().join("keep.txt"), "one");
    create_file(&vcs.workdir().join("gone.txt"), "two");
    commit_all(&repo, "initial commit");

    create_file(&vcs.workdir().join("keep.txt"), "changed");
    fs::remove_file(vcs.workdir().join("gone.txt")).unwrap();

    let mut changes = vcs.working_tree_changes().unwrap();
    changes.sort_by(|a, b| a.path.cmp(&b.path));

    assert_eq!(
        changes,
        vec![
            Change::new(abs(&vcs, "gone.txt"), ChangeStatus::Deleted),
            Change::new(abs(&vcs, "keep.txt"), ChangeStatus::Modified),
        ]
    );
}

#[test]
fn test_stage_moves_change_to_index() {
    let (_temp_dir, repo, vcs) = setup_test_repo();
    create_file(&vcs.workdir().join("a.txt"), "one");
    commit_all(&repo, "initial commit");
    create_file(&vcs.workdir().join("a.txt"), "two");

    vcs.stage(&[abs(&vcs, "a.txt")]).unwrap();

    assert!(vcs.working_tree_changes().unwrap().is_empty());
    assert_eq!(
        vcs.staged_changes().unwrap(),
        vec![Change::new(abs(&vcs, "a.txt"), ChangeStatus::Modified)]
    );
}

#[test]
fn test_stage_new_file_before_first_commit() {
    let (_temp_dir, _repo, vcs) = setup_test_repo();
    create_file(&vcs.workdir().join("a.txt"), "one");

    vcs.stage(&[abs(&vcs, "a.txt")]).unwrap();

    assert_eq!(
        vcs.staged_changes().unwrap(),
        vec![Change::new(abs(&vcs, "a.txt"), ChangeStatus::Added)]
    );
}

#[test]
fn test_stage_deletion() {
    let (_temp_dir, repo, vcs) = setup_test_repo();
    create_file(&vcs.workdir().join("a.txt"), "one");
    commit_all(&repo, "initial commit");
    fs::remove_file(vcs.workdir().join("a.txt")).unwrap();

    vcs.stage(&[abs(&vcs, "a.txt")]).unwrap();

    assert_eq!(
        vcs.staged_changes().unwrap(),
        vec![Change::new(abs(&vcs, "a.txt"), ChangeStatus::Deleted)]
    );
}

#[test]
fn test_stage_outside_repository_fails_without_touching_index() {
    let (_temp_dir, _repo, vcs) = setup_test_repo();
    create_file(&vcs.workdir().join("a.txt"), "one");

    let result = vcs.stage(&[abs(&vcs, "a.txt"), "/definitely/elsewhere.txt".to_string()]);

    assert!(result.is_err());
    assert!(vcs.staged_changes().unwrap().is_empty());
}

#[test]
fn test_staged_rename_detected() {
    let (_temp_dir, repo, vcs) = setup_test_repo();
    create_file(&vcs.workdir().join("old_name.txt"), "file content");
    commit_all(&repo, "initial commit");
    fs::rename(
        vcs.workdir().join("old_name.txt"),
        vcs.workdir().join("new_name.txt"),
    )
    .unwrap();

    vcs.stage(&[abs(&vcs, "old_name.txt"), abs(&vcs, "new_name.txt")])
        .unwrap();

    assert_eq!(
        vcs.staged_changes().unwrap(),
        vec![Change::renamed(
            abs(&vcs, "new_name.txt"),
            abs(&vcs, "old_name.txt")
        )]
    );
}

#[test]
fn test_unstage_restores_working_tree_change() {
    let (_temp_dir, repo, vcs) = setup_test_repo();
    create_file(&vcs.workdir().join("a.txt"), "one");
    commit_all(&repo, "initial commit");
    create_file(&vcs.workdir().join("a.txt"), "two");
    vcs.stage(&[abs(&vcs, "a.txt")]).unwrap();

    vcs.unstage(&[abs(&vcs, "a.txt")]).unwrap();

    assert!(vcs.staged_changes().unwrap().is_empty());
    assert_eq!(
        vcs.working_tree_changes().unwrap(),
        vec![Change::new(abs(&vcs, "a.txt"), ChangeStatus::Modified)]
    );
}

#[test]
fn test_unstage_before_first_commit() {
    let (_temp_dir, _repo, vcs) = setup_test_repo();
    create_file(&vcs.workdir().join("a.txt"), "one");
    vcs.stage(&[abs(&vcs, "a.txt")]).unwrap();

    vcs.unstage(&[abs(&vcs, "a.txt")]).unwrap();

    assert!(vcs.staged_changes().unwrap().is_empty());
    assert_eq!(
        vcs.working_tree_changes().unwrap(),
        vec![Change::new(abs(&vcs, "a.txt"), ChangeStatus::Untracked)]
    );
}

#[test]
fn test_discard_modified_file() {
    let (_temp_dir, repo, vcs) = setup_test_repo();
    create_file(&vcs.workdir().join("a.txt"), "original");
    commit_all(&repo, "initial commit");
    create_file(&vcs.workdir().join("a.txt"), "changed");

    vcs.discard(&[abs(&vcs, "a.txt")]).unwrap();

    assert_eq!(
        fs::read_to_string(vcs.workdir().join("a.txt")).unwrap(),
        "original"
    );
    assert!(vcs.working_tree_changes().unwrap().is_empty());
}

#[test]
fn test_discard_restores_deleted_file() {
    let (_temp_dir, repo, vcs) = setup_test_repo();
    create_file(&vcs.workdir().join("a.txt"), "original");
    commit_all(&repo, "initial commit");
    fs::remove_file(vcs.workdir().join("a.txt")).unwrap();

    vcs.discard(&[abs(&vcs, "a.txt")]).unwrap();

    assert!(vcs.workdir().join("a.txt").exists());
}

#[test]
fn test_discard_deletes_untracked_file() {
    let (_temp_dir, repo, vcs) = setup_test_repo();
    create_file(&vcs.workdir().join("a.txt"), "original");
    commit_all(&repo, "initial commit");
    create_file(&vcs.workdir().join("scratch.txt"), "temp");

    vcs.discard(&[abs(&vcs, "scratch.txt")]).unwrap();

    assert!(!vcs.workdir().join("scratch.txt").exists());
    assert!(vcs.working_tree_changes().unwrap().is_empty());
}

#[test]
fn test_discard_leaves_other_files_alone() {
    let (_temp_dir, repo, vcs) = setup_test_repo();
    create_file(&vcs.workdir().join("a.txt"), "a");
    create_file(&vcs.workdir().join("b.txt"), "b");
    commit_all(&repo, "initial commit");
    create_file(&vcs.workdir().join("a.txt"), "a2");
    create_file(&vcs.workdir().join("b.txt"), "b2");

    vcs.discard(&[abs(&vcs, "a.txt")]).unwrap();

    assert_eq!(fs::read_to_string(vcs.workdir().join("b.txt")).unwrap(), "b2");
    assert_eq!(
        vcs.working_tree_changes().unwrap(),
        vec![Change::new(abs(&vcs, "b.txt"), ChangeStatus::Modified)]
    );
}

#[test]
fn test_current_branch_on_unborn_head() {
    let (_temp_dir, repo, vcs) = setup_test_repo();
    repo.set_head("refs/heads/trunk").unwrap();

    assert_eq!(vcs.current_branch().unwrap(), Some("trunk".to_string()));
}

#[test]
fn test_list_and_checkout_branches() {
    let (_temp_dir, repo, vcs) = setup_test_repo();
    create_file(&vcs.workdir().join("a.txt"), "main");
    commit_all(&repo, "initial commit");
    let original = vcs.current_branch().unwrap().unwrap();

    let head = repo.head().unwrap().peel_to_commit().unwrap();
    repo.branch("feature", &head, false).unwrap();

    let branches = vcs.list_branches().unwrap();
    assert!(branches.contains(&"feature".to_string()));
    assert!(branches.contains(&original));

    vcs.checkout("feature").unwrap();
    assert_eq!(vcs.current_branch().unwrap(), Some("feature".to_string()));

    vcs.checkout(&original).unwrap();
    assert_eq!(vcs.current_branch().unwrap(), Some(original));
}

#[test]
fn test_checkout_missing_branch_fails() {
    let (_temp_dir, repo, vcs) = setup_test_repo();
    create_file(&vcs.workdir().join("a.txt"), "main");
    commit_all(&repo, "initial commit");

    assert!(vcs.checkout("does-not-exist").is_err());
}

#[test]
fn test_checkout_refuses_to_clobber_local_changes() {
    let (_temp_dir, repo, vcs) = setup_test_repo();
    create_file(&vcs.workdir().join("a.txt"), "one");
    commit_all(&repo, "initial commit");
    let original = vcs.current_branch().unwrap().unwrap();

    let head = repo.head().unwrap().peel_to_commit().unwrap();
    repo.branch("feature", &head, false).unwrap();
    vcs.checkout("feature").unwrap();
    create_file(&vcs.workdir().join("a.txt"), "two");
    commit_all(&repo, "feature commit");

    // local edit conflicts with the version on the original branch
    create_file(&vcs.workdir().join("a.txt"), "local edit");

    assert!(vcs.checkout(&original).is_err());
    assert_eq!(
        fs::read_to_string(vcs.workdir().join("a.txt")).unwrap(),
        "local edit"
    );
}

#[test]
fn test_open_from_subdirectory() {
    let (temp_dir, _repo, vcs) = setup_test_repo();
    fs::create_dir_all(temp_dir.path().join("nested/deeper")).unwrap();

    let nested = GitRepo::open(&temp_dir.path().join("nested/deeper")).unwrap();

    assert_eq!(nested.workdir(), vcs.workdir());
}

#[test]
fn test_open_outside_repository_fails() {
    let temp_dir = TempDir::new().unwrap();

    // a parent of the temp dir could itself be a repository, so open a path
    // that can't be discovered from
    let result = GitRepo::open(&temp_dir.path().join("missing"));

    assert!(result.is_err());
}
