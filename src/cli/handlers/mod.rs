mod init;
pub use init::cmd_init;

use std::path::{Path, PathBuf};

use crate::cli::commands::*;
use crate::cli::output::*;
use crate::io::board_io::{self, Board, BoardError};
use crate::io::lock::BoardLock;
use crate::io::recovery;
use crate::io::store_io::LoadSource;
use crate::model::project::Project;
use crate::model::task::{Priority, TaskStatus};
use crate::ops::check;
use crate::ops::form::TaskForm;
use crate::ops::repository::Repository;
use crate::ops::stats::project_stats;
use crate::ops::tree::build_forest;

type CmdResult = Result<(), Box<dyn std::error::Error>>;

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn dispatch(cli: Cli) -> CmdResult {
    let json = cli.json;
    let start = start_dir(cli.board_dir.as_deref())?;

    match cli.command {
        Commands::Init(args) => cmd_init(args, &start, json),

        // Read commands
        Commands::Projects => cmd_projects(&start, json),
        Commands::Show(args) => cmd_show(args, &start, json),
        Commands::Tasks(args) => cmd_tasks(args, &start, json),
        Commands::Task(args) => cmd_task(args, &start, json),
        Commands::Parents(args) => cmd_parents(args, &start, json),
        Commands::Recovery(args) => cmd_recovery(args, &start, json),

        // Write commands
        Commands::Add(args) => cmd_add(args, &start, json),
        Commands::Edit(args) => cmd_edit(args, &start, json),
        Commands::Rm(args) => cmd_rm(args, &start, json),

        // Maintenance
        Commands::Check(args) => cmd_check(args, &start, json),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Directory to start board discovery from: `-C` if given, else the cwd
fn start_dir(board_dir: Option<&str>) -> Result<PathBuf, Box<dyn std::error::Error>> {
    match board_dir {
        Some(dir) => Ok(std::fs::canonicalize(dir)
            .map_err(|e| format!("cannot resolve -C path '{}': {}", dir, e))?),
        None => Ok(std::env::current_dir()?),
    }
}

fn find_board(start: &Path) -> Result<Board, BoardError> {
    let root = board_io::discover_board(start)?;
    board_io::load_board(&root)
}

/// Open the board's store, reporting a first-run seed or a migration on stderr.
fn open_repository(board: &Board) -> Result<Repository, Box<dyn std::error::Error>> {
    let (repo, source) = Repository::open(Box::new(board.backend()))?;
    match source {
        LoadSource::Persisted => {}
        LoadSource::Seeded => eprintln!("note: no store found, loaded sample data"),
        LoadSource::Migrated(n) => {
            eprintln!("note: added missing fields to {} task record(s)", n)
        }
    }
    Ok(repo)
}

fn require_project<'a>(repo: &'a Repository, id: &str) -> Result<&'a Project, String> {
    repo.project(id)
        .ok_or_else(|| format!("project not found: {}", id))
}

fn parse_priority(s: &str) -> Result<Priority, String> {
    Priority::parse(s)
        .ok_or_else(|| format!("invalid priority '{}' (use low, medium or high)", s))
}

fn parse_status(s: &str) -> Result<TaskStatus, String> {
    TaskStatus::parse(s).ok_or_else(|| {
        format!(
            "invalid status '{}' (use not-started, in-progress, blocked or done)",
            s
        )
    })
}

fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{}", line);
    }
}

// ---------------------------------------------------------------------------
// Read command handlers
// ---------------------------------------------------------------------------

fn cmd_projects(start: &Path, json: bool) -> CmdResult {
    let board = find_board(start)?;
    let repo = open_repository(&board)?;

    let rows: Vec<ProjectJson> = repo
        .projects()
        .iter()
        .map(|project| ProjectJson {
            project,
            stats: project_stats(repo.tasks(&project.id)),
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else if rows.is_empty() {
        println!("no projects");
    } else {
        for row in &rows {
            println!("{}", format_project_line(row.project, &row.stats));
        }
    }
    Ok(())
}

fn cmd_show(args: ShowArgs, start: &Path, json: bool) -> CmdResult {
    let board = find_board(start)?;
    let repo = open_repository(&board)?;
    let project = require_project(&repo, &args.project)?;
    let tasks = repo.tasks(&project.id);
    let stats = project_stats(tasks.iter().copied());
    let forest = build_forest(tasks);

    if json {
        let detail = ProjectDetailJson {
            project: ProjectJson { project, stats },
            tasks: forest,
        };
        println!("{}", serde_json::to_string_pretty(&detail)?);
        return Ok(());
    }

    print_lines(&format_project_detail(project, &stats));
    println!();
    if forest.is_empty() {
        println!("no tasks");
    } else {
        print_lines(&format_task_tree(&forest));
    }
    Ok(())
}

fn cmd_tasks(args: TasksArgs, start: &Path, json: bool) -> CmdResult {
    let board = find_board(start)?;
    let repo = open_repository(&board)?;
    let project = require_project(&repo, &args.project)?;
    let tasks = repo.tasks(&project.id);

    if args.flat {
        if json {
            println!("{}", serde_json::to_string_pretty(&tasks)?);
        } else {
            for task in &tasks {
                println!("{}", format_task_line(task));
            }
        }
        return Ok(());
    }

    let forest = build_forest(tasks);
    if json {
        println!("{}", serde_json::to_string_pretty(&forest)?);
    } else {
        print_lines(&format_task_tree(&forest));
    }
    Ok(())
}

fn cmd_task(args: TaskArgs, start: &Path, json: bool) -> CmdResult {
    let board = find_board(start)?;
    let repo = open_repository(&board)?;
    let task = repo
        .task(&args.id)
        .ok_or_else(|| format!("task not found: {}", args.id))?;
    let subtasks = repo.child_tasks(&task.id);

    if json {
        let detail = TaskDetailJson {
            task,
            subtasks: subtasks.iter().map(|t| t.id.as_str()).collect(),
        };
        println!("{}", serde_json::to_string_pretty(&detail)?);
    } else {
        let parent = task.parent_id.as_deref().and_then(|p| repo.task(p));
        print_lines(&format_task_detail(task, parent, &subtasks));
    }
    Ok(())
}

fn cmd_parents(args: ParentsArgs, start: &Path, json: bool) -> CmdResult {
    let board = find_board(start)?;
    let repo = open_repository(&board)?;
    let project = require_project(&repo, &args.project)?;
    let parents = repo.available_parents(&project.id, args.exclude.as_deref());

    if json {
        let out = ParentsJson {
            project_id: &project.id,
            parents: &parents,
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else if parents.is_empty() {
        println!("no tasks can be chosen as a parent");
    } else {
        for option in &parents {
            println!("{}", format_parent_option(option));
        }
    }
    Ok(())
}

fn cmd_recovery(args: RecoveryArgs, start: &Path, json: bool) -> CmdResult {
    let board = find_board(start)?;
    let entries = recovery::read_recovery_entries(&board.board_dir, Some(args.limit));

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }
    if entries.is_empty() {
        println!("recovery log is empty");
        return Ok(());
    }
    for (i, entry) in entries.iter().enumerate() {
        if i > 0 {
            println!();
        }
        print_lines(&format_recovery_entry(entry));
        for line in entry.body.lines() {
            println!("    {}", line);
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Write command handlers
// ---------------------------------------------------------------------------

fn cmd_add(args: AddArgs, start: &Path, json: bool) -> CmdResult {
    let board = find_board(start)?;
    let _lock = BoardLock::acquire_default(&board.board_dir)?;
    let mut repo = open_repository(&board)?;
    let project_id = require_project(&repo, &args.project)?.id.clone();

    let mut form = TaskForm::new(board.config.limits);
    form.set_title(&args.title);
    if let Some(description) = &args.description {
        form.set_description(description);
    }
    if let Some(priority) = &args.priority {
        form.set_priority(parse_priority(priority)?);
    }
    if let Some(progress) = args.progress {
        form.set_progress(progress);
    }
    form.set_parent(args.parent);
    form.set_estimate(&args.estimate);
    form.set_budget(&args.budget);

    let parents = repo.available_parents(&project_id, None);
    let valid = form.validate(&parents)?;
    let task = repo.create_task(valid.into_new_task(&project_id))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&CreatedJson { id: &task.id })?);
    } else {
        println!("{}", task.id);
    }
    Ok(())
}

fn cmd_edit(args: EditArgs, start: &Path, json: bool) -> CmdResult {
    let board = find_board(start)?;
    let _lock = BoardLock::acquire_default(&board.board_dir)?;
    let mut repo = open_repository(&board)?;
    let task = repo
        .task(&args.id)
        .ok_or_else(|| format!("task not found: {}", args.id))?
        .clone();

    let mut form = TaskForm::from_task(&task, board.config.limits);
    let mut changed = false;
    if let Some(title) = &args.title {
        form.set_title(title);
        changed = true;
    }
    if let Some(description) = &args.description {
        form.set_description(description);
        changed = true;
    }
    if let Some(priority) = &args.priority {
        form.set_priority(parse_priority(priority)?);
        changed = true;
    }
    // Status first so an explicit --progress has the last word
    if let Some(status) = &args.status {
        form.set_status(parse_status(status)?);
        changed = true;
    }
    if let Some(progress) = args.progress {
        form.set_progress(progress);
        changed = true;
    }
    if let Some(estimate) = &args.estimate {
        form.set_estimate(estimate);
        changed = true;
    }
    if let Some(budget) = &args.budget {
        form.set_budget(budget);
        changed = true;
    }
    if args.no_parent {
        form.set_parent(None);
        changed = true;
    } else if args.parent.is_some() {
        form.set_parent(args.parent);
        changed = true;
    }
    if !changed {
        return Err("nothing to change (see tb edit --help)".into());
    }

    let parents = repo.available_parents(&task.project_id, Some(&task.id));
    let patch = form.validate(&parents)?.into_patch();
    let updated = repo
        .update_task(&task.id, patch)?
        .ok_or_else(|| format!("task not found: {}", task.id))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&updated)?);
    } else {
        println!("{}", format_task_line(&updated));
    }
    Ok(())
}

fn cmd_rm(args: RmArgs, start: &Path, json: bool) -> CmdResult {
    let board = find_board(start)?;
    let _lock = BoardLock::acquire_default(&board.board_dir)?;
    let mut repo = open_repository(&board)?;
    let removed = repo
        .delete_task_counted(&args.id)?
        .ok_or_else(|| format!("task not found: {}", args.id))?;

    if json {
        let out = RemovedJson {
            id: &args.id,
            removed,
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else if removed == 1 {
        println!("removed {}", args.id);
    } else {
        println!("removed {} and {} subtask(s)", args.id, removed - 1);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Maintenance
// ---------------------------------------------------------------------------

fn cmd_check(args: CheckArgs, start: &Path, json: bool) -> CmdResult {
    let board = find_board(start)?;
    let _lock = if args.fix {
        Some(BoardLock::acquire_default(&board.board_dir)?)
    } else {
        None
    };
    let mut repo = open_repository(&board)?;

    let fixed = if args.fix { repo.repair_counts()? } else { 0 };
    let result = check::check_store(repo.data());

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    if fixed > 0 {
        println!("repaired counts on {} project(s)", fixed);
    }
    if !result.errors.is_empty() {
        println!("Errors:");
        for err in &result.errors {
            println!("  {}", format_check_error(err));
        }
    }
    if !result.warnings.is_empty() {
        if !result.errors.is_empty() {
            println!();
        }
        println!("Warnings:");
        for warn in &result.warnings {
            println!("  {}", format_check_warning(warn));
        }
    }
    if result.valid {
        println!("✓ store is valid");
    } else {
        println!("✗ store has errors");
    }
    Ok(())
}
