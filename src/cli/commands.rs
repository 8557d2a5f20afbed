use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "tb", about = concat!("taskboard v", env!("CARGO_PKG_VERSION"), " - projects and nested tasks"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Run against a board in a different directory
    #[arg(short = 'C', long = "board-dir", global = true)]
    pub board_dir: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a board in the current directory
    Init(InitArgs),
    /// List projects with task counts and progress
    Projects,
    /// Show a project with its stats and task tree
    Show(ShowArgs),
    /// List a project's tasks as a tree
    Tasks(TasksArgs),
    /// Show task details
    Task(TaskArgs),
    /// Add a task to a project
    Add(AddArgs),
    /// Edit a task
    Edit(EditArgs),
    /// Delete a task and all of its subtasks
    Rm(RmArgs),
    /// List the tasks that can be chosen as a parent
    Parents(ParentsArgs),
    /// Validate store integrity
    Check(CheckArgs),
    /// View the recovery log
    Recovery(RecoveryArgs),
}

// ---------------------------------------------------------------------------
// Init args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct InitArgs {
    /// Board name (default: inferred from directory name)
    #[arg(long)]
    pub name: Option<String>,
    /// Start with no projects instead of the sample data
    #[arg(long)]
    pub empty: bool,
    /// Reinitialize even if taskboard/ already exists (resets the store)
    #[arg(long)]
    pub force: bool,
}

// ---------------------------------------------------------------------------
// Read command args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct ShowArgs {
    /// Project ID
    pub project: String,
}

#[derive(Args)]
pub struct TasksArgs {
    /// Project ID
    pub project: String,
    /// List tasks in stored order without nesting
    #[arg(long)]
    pub flat: bool,
}

#[derive(Args)]
pub struct TaskArgs {
    /// Task ID
    pub id: String,
}

#[derive(Args)]
pub struct ParentsArgs {
    /// Project ID
    pub project: String,
    /// Task being edited; it and its subtasks are left out
    #[arg(long)]
    pub exclude: Option<String>,
}

#[derive(Args)]
pub struct CheckArgs {
    /// Recompute cached task and completed counts
    #[arg(long)]
    pub fix: bool,
}

#[derive(Args)]
pub struct RecoveryArgs {
    /// Maximum number of entries to show (most recent first)
    #[arg(long, default_value = "10")]
    pub limit: usize,
}

// ---------------------------------------------------------------------------
// Write command args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct AddArgs {
    /// Project to add the task to
    pub project: String,
    /// Task title
    pub title: String,
    /// Parent task ID
    #[arg(long)]
    pub parent: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    /// low, medium or high
    #[arg(long)]
    pub priority: Option<String>,
    /// Percent complete (0-100)
    #[arg(long)]
    pub progress: Option<u8>,
    /// Estimate, e.g. `8`, `8h` or `3d` (a bare number is hours)
    #[arg(long)]
    pub estimate: String,
    #[arg(long)]
    pub budget: String,
}

#[derive(Args)]
pub struct EditArgs {
    /// Task ID
    pub id: String,
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    /// not-started, in-progress, blocked or done
    #[arg(long)]
    pub status: Option<String>,
    /// low, medium or high
    #[arg(long)]
    pub priority: Option<String>,
    /// Percent complete (0-100)
    #[arg(long)]
    pub progress: Option<u8>,
    /// Estimate, e.g. `8`, `8h` or `3d` (a bare number is hours)
    #[arg(long)]
    pub estimate: Option<String>,
    #[arg(long)]
    pub budget: Option<String>,
    /// Move under this task
    #[arg(long, conflicts_with = "no_parent")]
    pub parent: Option<String>,
    /// Make this a top-level task
    #[arg(long)]
    pub no_parent: bool,
}

#[derive(Args)]
pub struct RmArgs {
    /// Task ID
    pub id: String,
}
