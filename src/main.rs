mod changeset;
mod cli;
mod config;
mod constants;
mod context;
mod git;
mod groups;
mod message;
mod reconcile;
mod settings;
mod ui;
mod watch;

use crate::changeset::Change;
use crate::cli::{Cli, Command, GroupCommand, StageArgs};
use crate::config::Config;
use crate::constants::MAX_LINE_LENGTH;
use crate::context::Session;
use crate::git::VcsService;
use crate::groups::Group;
use crate::reconcile::{Assignment, Outcome, expand_renames, paths_with_origins};
use anyhow::{Context, Result, bail};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

fn main() {
    if let Err(e) = run() {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse_args();

    let base = match &cli.directory {
        Some(dir) => dir
            .canonicalize()
            .with_context(|| format!("cannot change to {}", dir.display()))?,
        None => std::env::current_dir().context("failed to read current directory")?,
    };

    let mut config = Config::load(|key| std::env::var(key).ok())?;
    if let Some(store) = &cli.store {
        config.store_path = Some(base.join(store));
    }
    ui::set_verbose(cli.verbose || config.verbose);

    // not being in a repository is reported, not treated as a failure
    if git2::Repository::discover(&base).is_err() {
        warning!("not in a git repository");
        return Ok(());
    }

    let session = Session::open(&base, config)?;
    verbose!("working tree {}", session.vcs.workdir().display());
    verbose!("group store {}", session.store_path().display());

    let command = cli.command.unwrap_or(Command::Status);
    let refresh = !matches!(command, Command::Status | Command::Watch);
    let mutated = execute(&session, command)?;

    if refresh && mutated && session.config.refresh_after_mutation && !cli.quiet {
        info!();
        render_status(&session)?;
    }

    Ok(())
}

/// run one command; returns whether it changed groups or the repository
fn execute(session: &Session, command: Command) -> Result<bool> {
    match command {
        Command::Status => {
            render_status(session)?;
            Ok(false)
        }
        Command::Group(command) => execute_group(session, command),
        Command::Add { group, paths } => add_files(session, &group, &paths),
        Command::Remove { paths } => remove_files(session, &paths),
        Command::Move { path, group } => add_files(session, &group, &[path]),
        Command::Local { paths } => set_local(session, &paths, true),
        Command::Unlocal { paths } => set_local(session, &paths, false),
        Command::Stage(args) => stage(session, args),
        Command::Unstage { paths, all } => unstage(session, &paths, all),
        Command::Discard { paths, group, yes } => discard(session, &paths, group.as_deref(), yes),
        Command::Commit { message, group } => commit(session, message, group.as_deref()),
        Command::Message => {
            let staged = session.vcs.staged_changes()?;
            match message::generate(&staged, session.vcs.workdir()) {
                Some(message) => info!(message),
                None => info!("nothing staged"),
            }
            Ok(false)
        }
        Command::Branch { list } => {
            let current = session.vcs.current_branch()?;
            if list {
                for branch in session.vcs.list_branches()? {
                    if current.as_deref() == Some(branch.as_str()) {
                        status!("* {}", branch);
                    } else {
                        info!("  {}", branch);
                    }
                }
            } else {
                match current {
                    Some(branch) => info!(branch),
                    None => info!("HEAD detached"),
                }
            }
            Ok(false)
        }
        Command::Checkout { branch } => {
            session.vcs.checkout(&branch)?;
            status!("switched to {}", branch);
            Ok(true)
        }
        Command::Watch => {
            watch_changes(session)?;
            Ok(false)
        }
    }
}

fn execute_group(session: &Session, command: GroupCommand) -> Result<bool> {
    let store = &session.store;
    match command {
        GroupCommand::Create { name } => {
            let name = match name {
                Some(name) => name.trim().to_string(),
                None => {
                    ui::require_terminal("a group name is required")?;
                    status!("group name:");
                    ui::edit_one_line("")?
                }
            };
            if name.is_empty() {
                bail!("group name cannot be empty");
            }
            let id = store.create_group(&name)?;
            status!("created group {} [{}]", name, id.short());
            Ok(true)
        }
        GroupCommand::Delete { group, yes } => {
            let group = store.resolve(&group)?;
            let question = format!(
                "delete group \"{}\"? its {} will become ungrouped",
                group.name,
                ui::file_count(group.files.len())
            );
            if !confirmed(session, yes, &question)? {
                return Ok(false);
            }
            if !store.delete_group(&group.id)? {
                info!("group {} no longer exists", group.name);
                return Ok(false);
            }
            status!("deleted group {}", group.name);
            Ok(true)
        }
        GroupCommand::Rename { group, name } => {
            let group = store.resolve(&group)?;
            let name = match name {
                Some(name) => name.trim().to_string(),
                None => {
                    ui::require_terminal("a new group name is required")?;
                    status!("rename group:");
                    ui::edit_one_line(&group.name)?
                }
            };
            if name.is_empty() {
                bail!("group name cannot be empty");
            }
            if !store.rename_group(&group.id, &name)? {
                info!("group is already named {}", name);
                return Ok(false);
            }
            status!("renamed {} to {}", group.name, name);
            Ok(true)
        }
        GroupCommand::List => {
            let groups = store.list_groups();
            if groups.is_empty() {
                info!("no groups");
                return Ok(false);
            }
            let partition = session.reconciler().compute_partition()?;
            for group in &groups {
                let (changed, unchanged) = partition
                    .group(&group.id)
                    .map_or((0, 0), |view| (view.changes.len(), view.stale.len()));
                info!(
                    "{}  {}  {} ({} changed, {} unchanged)",
                    group.id.short().dimmed(),
                    group.name.bold(),
                    ui::file_count(group.files.len()),
                    changed,
                    unchanged
                );
            }
            Ok(false)
        }
    }
}

/// ask before a destructive operation unless skipped by flag or configuration
fn confirmed(session: &Session, skip: bool, question: &str) -> Result<bool> {
    if skip || !session.config.confirm_destructive {
        return Ok(true);
    }
    ui::require_terminal("confirmation required, pass --yes to skip it")?;
    if ui::confirm(question)? {
        Ok(true)
    } else {
        info!("aborted");
        Ok(false)
    }
}

fn add_files(session: &Session, group: &str, paths: &[String]) -> Result<bool> {
    let group = session.store.resolve(group)?;
    let reconciler = session.reconciler();
    let workdir = session.vcs.workdir();

    // each file is its own write; an error leaves earlier files assigned
    let mut mutated = false;
    for path in session.resolve_paths(paths)? {
        let shown = ui::display_path(workdir, &path);
        match reconciler.assign_file(&path, &group.id)? {
            Assignment::Added => {
                status!("added {} to {}", shown, group.name);
                mutated = true;
            }
            Assignment::Moved(previous) => {
                status!("moved {} from {} to {}", shown, previous.name, group.name);
                mutated = true;
            }
            Assignment::AlreadyMember => info!("{} is already in {}", shown, group.name),
            Assignment::NoSuchGroup => {
                warning!("group {} no longer exists", group.name);
                break;
            }
        }
    }
    Ok(mutated)
}

fn remove_files(session: &Session, paths: &[String]) -> Result<bool> {
    let reconciler = session.reconciler();
    let workdir = session.vcs.workdir();

    let mut mutated = false;
    for path in session.resolve_paths(paths)? {
        let shown = ui::display_path(workdir, &path);
        match reconciler.unassign_file(&path)? {
            Some(group) => {
                status!("removed {} from {}", shown, group.name);
                mutated = true;
            }
            None => info!("{} is not in a group", shown),
        }
    }
    Ok(mutated)
}

fn set_local(session: &Session, paths: &[String], is_local: bool) -> Result<bool> {
    let reconciler = session.reconciler();
    let workdir = session.vcs.workdir();
    let state = if is_local { "local-only" } else { "shared" };

    let mut mutated = false;
    for path in session.resolve_paths(paths)? {
        let shown = ui::display_path(workdir, &path);
        match reconciler.set_local(&path, is_local)? {
            Some(group) => {
                status!("{} in {} is {}", shown, group.name, state);
                mutated = true;
            }
            None => info!("{} is not in a group", shown),
        }
    }
    Ok(mutated)
}

/// report a group-level operation; returns whether anything was done
fn report(session: &Session, outcome: Outcome, group: &Group, done: &str, todo: &str) -> bool {
    match outcome {
        Outcome::Applied(paths) => {
            status!("{} {} from {}", done, ui::file_count(paths.len()), group.name);
            for path in &paths {
                verbose!("  {}", ui::display_path(session.vcs.workdir(), path));
            }
            true
        }
        Outcome::Nothing => {
            info!("nothing to {} in {}", todo, group.name);
            false
        }
        Outcome::NoSuchGroup => {
            info!("group {} no longer exists", group.name);
            false
        }
    }
}

fn stage(session: &Session, args: StageArgs) -> Result<bool> {
    if args.ungrouped {
        return match session.reconciler().stage_ungrouped()? {
            Outcome::Applied(paths) => {
                status!("staged {} ungrouped", ui::file_count(paths.len()));
                Ok(true)
            }
            _ => {
                info!("no ungrouped changes to stage");
                Ok(false)
            }
        };
    }

    if let Some(group) = args.group {
        let group = session.store.resolve(&group)?;
        let outcome = session.reconciler().stage_group(&group.id)?;
        return Ok(report(session, outcome, &group, "staged", "stage"));
    }

    let paths = session.resolve_paths(&args.paths)?;
    let changes = session.vcs.working_tree_changes()?;
    let paths = expand_renames(&paths, &changes);
    session.vcs.stage(&paths)?;
    status!("staged {}", ui::file_count(args.paths.len()));
    Ok(true)
}

fn unstage(session: &Session, paths: &[String], all: bool) -> Result<bool> {
    let staged = session.vcs.staged_changes()?;
    let paths = if all {
        paths_with_origins(&staged)
    } else {
        expand_renames(&session.resolve_paths(paths)?, &staged)
    };
    if staged.is_empty() || paths.is_empty() {
        info!("nothing staged");
        return Ok(false);
    }
    session.vcs.unstage(&paths)?;
    status!("unstaged {}", ui::file_count(paths.len()));
    Ok(true)
}

fn discard(session: &Session, paths: &[String], group: Option<&str>, yes: bool) -> Result<bool> {
    if let Some(group) = group {
        let group = session.store.resolve(group)?;
        let question = format!(
            "discard all shared changes in {}? this cannot be undone",
            group.name
        );
        if !confirmed(session, yes, &question)? {
            return Ok(false);
        }
        let outcome = session.reconciler().discard_group(&group.id)?;
        return Ok(report(session, outcome, &group, "discarded", "discard"));
    }

    let paths = session.resolve_paths(paths)?;
    let question = format!(
        "discard changes to {}? this cannot be undone",
        ui::file_count(paths.len())
    );
    if !confirmed(session, yes, &question)? {
        return Ok(false);
    }
    session.vcs.discard(&paths)?;
    status!("discarded changes to {}", ui::file_count(paths.len()));
    Ok(true)
}

fn commit(session: &Session, message: Option<String>, group: Option<&str>) -> Result<bool> {
    let mut mutated = false;
    if let Some(group) = group {
        let group = session.store.resolve(group)?;
        let outcome = session.reconciler().stage_group(&group.id)?;
        mutated = report(session, outcome, &group, "staged", "stage");
    }

    let staged = session.vcs.staged_changes()?;
    if staged.is_empty() {
        info!("nothing staged to commit");
        return Ok(mutated);
    }

    let message = match message {
        Some(message) if !message.trim().is_empty() => message,
        Some(_) => bail!("commit message cannot be empty"),
        None => {
            ui::require_terminal("interactive terminal required, pass a message with -m")?;
            match confirm_message(session, &staged)? {
                Some(message) => message,
                None => return Ok(mutated),
            }
        }
    };

    session.vcs.commit(&message)?;
    Ok(true)
}

/// offer the suggested message for confirmation or editing; `None` if declined
fn confirm_message(session: &Session, staged: &[Change]) -> Result<Option<String>> {
    let workdir = session.vcs.workdir();
    let mut multi_line = false;
    let mut message = message::generate(staged, workdir)
        .unwrap_or_else(|| format!("update {}", ui::file_count(staged.len())));

    loop {
        ui::display_commit_info(
            &message,
            staged,
            workdir,
            session.config.max_files_to_show,
            MAX_LINE_LENGTH,
        );

        if message::has_long_lines(&message) {
            warning!(
                "warning: commit message {} longer than {} chars",
                if message.lines().count() > 1 { "has lines" } else { "is" },
                MAX_LINE_LENGTH
            );
        }
        if !multi_line && message.contains('\n') {
            warning!("warning: commit message contains multiple lines");
        }

        let options = [
            "YES",
            "no",
            "edit",
            if multi_line { "short" } else { "long" },
        ];
        match ui::prompt(&options)?.as_str() {
            "y" => return Ok(Some(message)),
            "n" => return Ok(None),
            "s" => {
                multi_line = false;
                message = message.lines().next().unwrap_or("").to_string();
            }
            action @ ("e" | "l") => {
                if action == "l" {
                    multi_line = true;
                }
                let edited = if multi_line {
                    ui::edit_multi_line(&message)?
                } else {
                    info!();
                    ui::edit_one_line(&message)?
                };
                if edited.is_empty() {
                    warning!("empty commit message, not committing");
                    return Ok(None);
                }
                message = edited;
            }
            _ => {}
        }
    }
}

fn render_status(session: &Session) -> Result<()> {
    match session.vcs.current_branch()? {
        Some(branch) => info!("On branch {}", branch.bold()),
        None => info!("HEAD detached"),
    }
    info!();
    let partition = session.reconciler().compute_partition()?;
    ui::render_partition(&partition, session.vcs.workdir());
    Ok(())
}

fn waiting_spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message("watching for changes (ctrl-c to stop)");
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

fn watch_changes(session: &Session) -> Result<()> {
    let debounce = Duration::from_millis(session.config.watch_debounce_ms);
    let subscription = watch::subscribe(
        session.vcs.workdir(),
        session.vcs.git_dir(),
        session.store_path(),
        debounce,
    )?;

    render_status(session)?;
    loop {
        let spinner = waiting_spinner();
        let next = subscription.next_change();
        spinner.finish_and_clear();

        let Some(paths) = next else {
            return Ok(());
        };
        verbose!("{} changed", ui::file_count(paths.len()));

        info!();
        // a transient failure (e.g. a locked index) shouldn't end the watch
        if let Err(e) = render_status(session) {
            error!("{:#}", e);
        }
    }
}
