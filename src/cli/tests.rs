use super::*;
use clap::CommandFactory;

fn parse(args: &[&str]) -> Cli {
    Cli::try_parse_from(std::iter::once("git-changegroups").chain(args.iter().copied())).unwrap()
}

#[test]
fn test_cli_definition_is_valid() {
    Cli::command().debug_assert();
}

#[test]
fn test_no_subcommand() {
    let cli = parse(&[]);

    assert_eq!(cli.command, None);
    assert!(!cli.quiet);
}

#[test]
fn test_global_flags_after_subcommand() {
    let cli = parse(&["status", "--quiet", "-C", "/tmp", "--store", "groups.json"]);

    assert_eq!(cli.command, Some(Command::Status));
    assert!(cli.quiet);
    assert_eq!(cli.directory, Some(PathBuf::from("/tmp")));
    assert_eq!(cli.store, Some(PathBuf::from("groups.json")));
}

#[test]
fn test_add_takes_group_then_paths() {
    let cli = parse(&["add", "feature", "a.rs", "b.rs"]);

    assert_eq!(
        cli.command,
        Some(Command::Add {
            group: "feature".to_string(),
            paths: vec!["a.rs".to_string(), "b.rs".to_string()],
        })
    );
}

#[test]
fn test_add_requires_paths() {
    let args = ["git-changegroups", "add", "feature"];

    assert!(Cli::try_parse_from(args).is_err());
}

#[test]
fn test_group_subcommands() {
    assert_eq!(
        parse(&["group", "create"]).command,
        Some(Command::Group(GroupCommand::Create { name: None }))
    );
    assert_eq!(
        parse(&["group", "delete", "feature", "--yes"]).command,
        Some(Command::Group(GroupCommand::Delete {
            group: "feature".to_string(),
            yes: true,
        }))
    );
}

#[test]
fn test_stage_modes_are_exclusive() {
    assert!(Cli::try_parse_from(["git-changegroups", "stage"]).is_err());
    assert!(
        Cli::try_parse_from(["git-changegroups", "stage", "--group", "g", "--ungrouped"]).is_err()
    );
    assert!(Cli::try_parse_from(["git-changegroups", "stage", "a.rs", "--ungrouped"]).is_err());

    let cli = parse(&["stage", "--ungrouped"]);
    assert_eq!(
        cli.command,
        Some(Command::Stage(StageArgs {
            paths: Vec::new(),
            group: None,
            ungrouped: true,
        }))
    );
}

#[test]
fn test_unstage_all_conflicts_with_paths() {
    assert!(Cli::try_parse_from(["git-changegroups", "unstage"]).is_err());
    assert!(Cli::try_parse_from(["git-changegroups", "unstage", "a.rs", "--all"]).is_err());
    assert!(Cli::try_parse_from(["git-changegroups", "unstage", "--all"]).is_ok());
}

#[test]
fn test_commit_options() {
    let cli = parse(&["commit", "-m", "fix: thing", "-g", "feature"]);

    assert_eq!(
        cli.command,
        Some(Command::Commit {
            message: Some("fix: thing".to_string()),
            group: Some("feature".to_string()),
        })
    );
}
