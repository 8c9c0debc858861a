use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// git-changegroups: organise working tree changes into named groups and stage them together
#[derive(Parser, Debug)]
#[command(
    name = "git-changegroups",
    about,
    long_about = None,
    disable_version_flag = true
)]
pub struct Cli {
    /// run as if started in this directory
    #[arg(short = 'C', value_name = "DIR", global = true)]
    pub directory: Option<PathBuf>,

    /// file the groups are stored in
    #[arg(long, value_name = "FILE", global = true)]
    pub store: Option<PathBuf>,

    /// don't re-render the changes after modifying commands
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// print diagnostics
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// show staged changes, each group's changes and ungrouped changes
    Status,

    /// manage change groups
    #[command(subcommand)]
    Group(GroupCommand),

    /// add files to a group, moving them out of any other group
    Add {
        /// group id or name
        group: String,
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// remove files from whichever group holds them
    Remove {
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// move a file into another group
    Move { path: String, group: String },

    /// mark files as local-only, so group staging skips them
    Local {
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// clear the local-only mark
    Unlocal {
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// stage files, a whole group, or every ungrouped change
    Stage(StageArgs),

    /// unstage files
    Unstage {
        #[arg(required_unless_present = "all", conflicts_with = "all")]
        paths: Vec<String>,
        /// unstage everything
        #[arg(long)]
        all: bool,
    },

    /// discard working tree changes of files or a group
    Discard {
        #[arg(required_unless_present = "group", conflicts_with = "group")]
        paths: Vec<String>,
        /// discard the group's non-local changes
        #[arg(long, short)]
        group: Option<String>,
        /// don't ask for confirmation
        #[arg(long, short)]
        yes: bool,
    },

    /// commit staged changes
    Commit {
        /// commit message; prompts with a suggestion when omitted
        #[arg(long, short)]
        message: Option<String>,
        /// stage this group before committing
        #[arg(long, short)]
        group: Option<String>,
    },

    /// print a suggested commit message for the staged changes
    Message,

    /// show the current branch
    Branch {
        /// list local branches
        #[arg(long, short)]
        list: bool,
    },

    /// switch to another local branch
    Checkout { branch: String },

    /// re-render the changes whenever the repository changes
    Watch,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum GroupCommand {
    /// create a new, empty group
    Create {
        /// prompts for a name when omitted
        name: Option<String>,
    },

    /// delete a group; its files become ungrouped
    Delete {
        group: String,
        /// don't ask for confirmation
        #[arg(long, short)]
        yes: bool,
    },

    /// rename a group
    Rename {
        group: String,
        /// prompts with the current name when omitted
        name: Option<String>,
    },

    /// list groups with their membership
    List,
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
#[group(required = true, multiple = false)]
pub struct StageArgs {
    pub paths: Vec<String>,

    /// stage the group's non-local changes
    #[arg(long, short)]
    pub group: Option<String>,

    /// stage every change that belongs to no group
    #[arg(long, short)]
    pub ungrouped: bool,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests;
