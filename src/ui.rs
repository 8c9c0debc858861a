use crate::changeset::{Change, ChangeStatus};
use crate::reconcile::Partition;
use anyhow::{Context, Result, bail};
use colored::{ColoredString, Colorize};
use num_format::{Locale, ToFormattedString};
use std::io::IsTerminal;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

static VERBOSE: AtomicBool = AtomicBool::new(false);

pub fn set_verbose(verbose: bool) {
    VERBOSE.store(verbose, Ordering::Relaxed);
}

pub fn is_verbose() -> bool {
    VERBOSE.load(Ordering::Relaxed)
}

#[macro_export]
macro_rules! warning {
    // format string literal (with or without inline formatting)
    ($fmt:literal $(, $($arg:tt)*)?) => {{
        use colored::Colorize;
        use std::io::{self, Write};
        let _ = writeln!(io::stderr(), "{}", format!($fmt $(, $($arg)*)?).yellow());
    }};
    // arbitrary expression (non-literal)
    ($expr:expr) => {{
        use colored::Colorize;
        use std::io::{self, Write};
        let _ = writeln!(io::stderr(), "{}", format!("{}", $expr).yellow());
    }};
}

#[macro_export]
macro_rules! error {
    ($fmt:literal $(, $($arg:tt)*)?) => {{
        use colored::Colorize;
        use std::io::{self, Write};
        let _ = writeln!(io::stderr(), "{}", format!($fmt $(, $($arg)*)?).red());
    }};
    ($expr:expr) => {{
        use colored::Colorize;
        use std::io::{self, Write};
        let _ = writeln!(io::stderr(), "{}", format!("{}", $expr).red());
    }};
}

#[macro_export]
macro_rules! status {
    ($fmt:literal $(, $($arg:tt)*)?) => {{
        use colored::Colorize;
        use std::io::{self, Write};
        let _ = writeln!(io::stdout(), "{}", format!($fmt $(, $($arg)*)?).green());
    }};
    ($expr:expr) => {{
        use colored::Colorize;
        use std::io::{self, Write};
        let _ = writeln!(io::stdout(), "{}", format!("{}", $expr).green());
    }};
}

#[macro_export]
macro_rules! info {
    () => {{
        use std::io::{self, Write};
        let _ = writeln!(io::stdout());
    }};
    ($fmt:literal $(, $($arg:tt)*)?) => {{
        use std::io::{self, Write};
        let _ = writeln!(io::stdout(), $fmt $(, $($arg)*)?);
    }};
    ($expr:expr) => {{
        use std::io::{self, Write};
        let _ = writeln!(io::stdout(), "{}", $expr);
    }};
}

/// diagnostics, only shown with --verbose
#[macro_export]
macro_rules! verbose {
    ($fmt:literal $(, $($arg:tt)*)?) => {{
        if $crate::ui::is_verbose() {
            use colored::Colorize;
            use std::io::{self, Write};
            let _ = writeln!(io::stderr(), "{}", format!($fmt $(, $($arg)*)?).dimmed());
        }
    }};
}

pub fn is_interactive() -> bool {
    std::io::stdin().is_terminal() && std::io::stdout().is_terminal()
}

/// fail with `reason` unless attached to a terminal
pub fn require_terminal(reason: &str) -> Result<()> {
    if !is_interactive() {
        bail!("{reason}");
    }
    Ok(())
}

/// "1 file" / "1,024 files"
pub fn file_count(count: usize) -> String {
    let word = if count == 1 { "file" } else { "files" };
    format!("{} {}", count.to_formatted_string(&Locale::en), word)
}

/// path as shown to the user: relative to the working tree when inside it
pub fn display_path(workdir: &Path, path: &str) -> String {
    match Path::new(path).strip_prefix(workdir) {
        Ok(relative) => relative.to_string_lossy().to_string(),
        Err(_) => path.to_string(),
    }
}

fn marker(status: ChangeStatus) -> ColoredString {
    let marker = status.marker().to_string();
    match status {
        ChangeStatus::Added | ChangeStatus::Untracked => marker.green(),
        ChangeStatus::Modified | ChangeStatus::Renamed => marker.yellow(),
        ChangeStatus::Deleted => marker.red(),
        ChangeStatus::Changed => marker.normal(),
    }
}

fn change_line(workdir: &Path, change: &Change) -> String {
    let path = display_path(workdir, &change.path);
    match &change.original_path {
        // show renames as "old_path → new_path"
        Some(original) => format!(
            "{} {} → {}",
            marker(change.status),
            display_path(workdir, original),
            path
        ),
        None => format!("{} {}", marker(change.status), path),
    }
}

/// print the staged, per-group and ungrouped sections
pub fn render_partition(partition: &Partition, workdir: &Path) {
    if !partition.staged.is_empty() {
        status!("Staged Changes ({})", partition.staged.len());
        for change in &partition.staged {
            info!("  {}", change_line(workdir, change));
        }
        info!();
    }

    for group in &partition.groups {
        let header = format!("📁 {} [{}] ({})", group.name, group.id.short(), group.changes.len());
        info!("{}", header.bold());
        if group.changes.is_empty() {
            info!("  {}", "no changed files".dimmed());
        }
        for grouped in &group.changes {
            let line = change_line(workdir, &grouped.change);
            if grouped.is_local {
                info!("  {} {}", "🔒", line.strikethrough());
            } else {
                info!("  {}", line);
            }
        }
        info!();
    }

    status!("Changes ({})", partition.ungrouped.len());
    for change in &partition.ungrouped {
        info!("  {}", change_line(workdir, change));
    }
}

/// display commit description and the files it covers
pub fn display_commit_info(
    commit_description: &str,
    files: &[Change],
    workdir: &Path,
    max_files: usize,
    max_line_length: usize,
) {
    use std::io::{self, Write};

    // print each line of commit description, highlighting chars beyond the limit in red
    let _ = writeln!(io::stdout());
    for line in commit_description.lines() {
        match line.char_indices().nth(max_line_length) {
            Some((split, _)) => {
                let (first_part, rest) = line.split_at(split);
                let _ = writeln!(io::stdout(), "{first_part}{}", rest.red());
            }
            None => {
                let _ = writeln!(io::stdout(), "{line}");
            }
        }
    }
    let _ = writeln!(io::stdout());

    status!("files:");
    for file in files.iter().take(max_files) {
        info!("{}", change_line(workdir, file));
    }
    if files.len() > max_files {
        info!("(+{} more)", files.len() - max_files);
    }
    info!();
}

/// single-key choice between `options`; the first option is the default.
/// returns the lowercased first character of the chosen option
pub fn prompt(options: &[&str]) -> Result<String> {
    use crossterm::{
        event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
        terminal::{disable_raw_mode, enable_raw_mode},
    };
    use std::io::{self, Write};

    debug_assert!(!options.is_empty(), "prompt requires at least one option");

    let first_char = |opt: &str| -> char {
        opt.chars()
            .next()
            .and_then(|c| c.to_lowercase().next())
            .unwrap_or(' ')
    };

    // build prompt string like "[Y]ES/[n]o/[m]aybe"
    let prompt_parts: Vec<String> = options
        .iter()
        .map(|opt| match opt.chars().next() {
            Some(first) => format!("[{first}]{}", &opt[first.len_utf8()..]),
            None => String::new(),
        })
        .collect();
    let valid_chars: Vec<char> = options.iter().map(|opt| first_char(opt)).collect();

    print!("{} ? ", prompt_parts.join("/"));
    let _ = io::stdout().flush();

    enable_raw_mode().context("this command requires an interactive terminal")?;

    loop {
        let Ok(Event::Key(KeyEvent {
            code, modifiers, ..
        })) = event::read()
        else {
            continue;
        };
        match code {
            KeyCode::Esc => {
                disable_raw_mode().ok();
                info!("^C");
                std::process::exit(1);
            }
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                disable_raw_mode().ok();
                info!("^C");
                std::process::exit(1);
            }
            KeyCode::Enter => {
                disable_raw_mode().ok();
                info!(options[0]);
                break Ok(valid_chars[0].to_string());
            }
            KeyCode::Char(c) => {
                let lower = c.to_lowercase().next().unwrap_or(c);
                if let Some(idx) = valid_chars.iter().position(|&ch| ch == lower) {
                    disable_raw_mode().ok();
                    info!(options[idx]);
                    break Ok(lower.to_string());
                }
            }
            _ => {}
        }
    }
}

/// yes/no question defaulting to no
pub fn confirm(question: &str) -> Result<bool> {
    warning!("{}", question);
    Ok(prompt(&["no", "yes"])? == "y")
}

/// edit a single line, pre-filled with `line`
pub fn edit_one_line(line: &str) -> Result<String> {
    use rustyline::DefaultEditor;

    let mut editor = DefaultEditor::new().context("failed to initialise line editor")?;

    if let Ok(edited) = editor.readline_with_initial("? ", (line, "")) {
        Ok(edited.trim().to_string())
    } else {
        info!("^C");
        std::process::exit(1);
    }
}

/// edit text in $EDITOR; an empty result means the user abandoned the edit
pub fn edit_multi_line(text: &str) -> Result<String> {
    use std::env;
    use std::fs;
    use std::io::Write;
    use std::process::Command;
    use tempfile::Builder;

    let editor = env::var("EDITOR").context("EDITOR not set")?;

    let mut temp_file = Builder::new()
        .prefix("COMMIT_EDITMSG")
        .suffix(".tmp")
        .tempfile()
        .context("failed to create temporary file")?;
    temp_file
        .write_all(text.as_bytes())
        .context("failed to write to temporary file")?;
    temp_file
        .flush()
        .context("failed to flush temporary file")?;
    let temp_path = temp_file.path().to_owned();

    // run the editor via shell to properly handle arguments in EDITOR
    let quoted = shlex::try_quote(&temp_path.to_string_lossy())
        .context("temporary file path cannot be quoted for the shell")?
        .into_owned();
    let status = Command::new("sh")
        .arg("-c")
        .arg(format!("{editor} {quoted}"))
        .status()
        .with_context(|| format!("failed to run editor: {editor}"))?;

    if !status.success() {
        bail!("editor exited with {status}");
    }

    // temp_file is cleaned up when it goes out of scope
    let edited = fs::read_to_string(&temp_path).context("failed to read edited message")?;
    Ok(edited.trim().to_string())
}
