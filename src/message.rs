use crate::changeset::Change;
use crate::constants::MAX_LINE_LENGTH;
use std::path::Path;

/// suggest a conventional-commit style message from the staged file names
///
/// a best-effort guess for pre-filling the commit prompt; `None` when nothing is staged.
/// paths are matched relative to `workdir` so the checkout location can't skew the guess
pub fn generate(staged: &[Change], workdir: &Path) -> Option<String> {
    if staged.is_empty() {
        return None;
    }

    let relative: Vec<String> = staged
        .iter()
        .map(|c| {
            Path::new(&c.path)
                .strip_prefix(workdir)
                .map_or_else(|_| c.path.clone(), |p| p.to_string_lossy().to_string())
        })
        .collect();

    let commit_type = commit_type(&relative, staged);
    let description = match staged {
        [only] => format!("update {}", only.file_name()),
        _ => format!("update {} files", staged.len()),
    };

    Some(format!("{commit_type}: {description}"))
}

fn commit_type(paths: &[String], staged: &[Change]) -> &'static str {
    if any_path_contains(paths, &["test", "spec"]) {
        return "test";
    }
    if any_path_contains(paths, &["README", ".md"]) {
        return "docs";
    }
    if any_path_contains(paths, &["config", ".json", ".toml", ".yaml", ".yml"]) {
        return "chore";
    }

    // a lone file can hint at its purpose through its name
    if let [only] = staged {
        let name = only.file_name().to_lowercase();
        if name.contains("fix") || name.contains("bug") {
            return "fix";
        }
        if name.contains("style") || name.contains("css") {
            return "style";
        }
    }

    "feat"
}

fn any_path_contains(paths: &[String], needles: &[&str]) -> bool {
    paths
        .iter()
        .any(|path| needles.iter().any(|needle| path.contains(needle)))
}

/// whether any line exceeds the conventional git line length
pub fn has_long_lines(message: &str) -> bool {
    message
        .lines()
        .any(|line| line.chars().count() > MAX_LINE_LENGTH)
}

#[cfg(test)]
mod tests;
