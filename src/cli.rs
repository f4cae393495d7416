use std::io::{self, BufRead, Write};

use clap::{Args, Parser, Subcommand};
use thiserror::Error;

use crate::api::ApiError;
use crate::draft::{DraftError, TaskDraft, parse_due, parse_estimate};
use crate::manager::{ManagerError, TaskManager};
use crate::models::{CategoryId, CategoryInput, Registration, TagId, Task, TaskId};
use crate::utils::{format_due, today};
use crate::view::{DueFilter, SortKey, SortOrder, SortRequest, StatusFilter, TaskFilter, filter_tasks, format_duration};

#[derive(Parser)]
#[command(name = "tdk")]
#[command(about = "Taskdeck - terminal client for a hosted task list")]
#[command(version)]
pub struct Cli {
    /// Custom config file path
    #[arg(short, long)]
    pub config: Option<String>,

    /// Use development mode (separate config, session and log)
    #[arg(long)]
    pub dev: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Launch interactive TUI (default if no subcommand)
    Tui,
    /// Log in and store the session
    Login {
        username: String,
        /// Prompted on stdin when omitted
        #[arg(long)]
        password: Option<String>,
    },
    /// Forget the stored session
    Logout,
    /// Create an account
    Register(RegisterArgs),
    /// Print tasks, optionally filtered and sorted
    List(ListArgs),
    /// Add a task or sub-task
    Add(AddArgs),
    /// Toggle a task's completion
    Done { id: TaskId },
    /// Delete a task; its sub-tasks are kept unless --with-subtasks
    Delete {
        id: TaskId,
        #[arg(long)]
        with_subtasks: bool,
    },
    /// List tags
    Tags,
    /// List categories
    Categories,
    /// Create a tag
    TagAdd { name: String },
    /// Create a category
    CategoryAdd {
        name: String,
        #[arg(long)]
        description: Option<String>,
        /// Leave this category out of workload totals
        #[arg(long)]
        no_workload: bool,
    },
}

#[derive(Args)]
pub struct RegisterArgs {
    #[arg(long)]
    pub username: String,
    #[arg(long)]
    pub email: String,
    #[arg(long, default_value = "")]
    pub first_name: String,
    #[arg(long, default_value = "")]
    pub last_name: String,
    /// Prompted on stdin when omitted
    #[arg(long)]
    pub password: Option<String>,
}

#[derive(Args)]
pub struct ListArgs {
    /// Server-side sort key
    #[arg(long, value_enum)]
    pub sort: Option<SortKey>,
    #[arg(long, value_enum, default_value_t = SortOrder::Asc)]
    pub order: SortOrder,
    /// Text to find in titles and descriptions (sub-tasks included)
    #[arg(long)]
    pub search: Option<String>,
    #[arg(long = "category")]
    pub categories: Vec<CategoryId>,
    #[arg(long = "tag")]
    pub tags: Vec<TagId>,
    /// Hide tasks without tags
    #[arg(long)]
    pub tagged_only: bool,
    #[arg(long, value_enum, default_value_t = StatusFilter::All)]
    pub status: StatusFilter,
    #[arg(long, value_enum, default_value_t = DueFilter::All)]
    pub due: DueFilter,
}

#[derive(Args)]
pub struct AddArgs {
    pub title: String,
    /// Due date (YYYY-MM-DD)
    #[arg(long)]
    pub due: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    /// Create as a sub-task of this task
    #[arg(long)]
    pub parent: Option<TaskId>,
    #[arg(long)]
    pub category: Option<CategoryId>,
    #[arg(long = "tag")]
    pub tags: Vec<TagId>,
    /// Estimated time as HH:MM or minutes
    #[arg(long)]
    pub estimate: Option<String>,
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Manager(#[from] ManagerError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Draft(#[from] DraftError),
    #[error("Failed to read input: {0}")]
    Io(#[from] io::Error),
    #[error("Passwords do not match")]
    PasswordMismatch,
}

/// Run one non-interactive command
pub async fn run(command: Commands, manager: &mut TaskManager) -> Result<(), CliError> {
    match command {
        Commands::Tui => Ok(()),
        Commands::Login { username, password } => handle_login(manager, &username, password).await,
        Commands::Logout => handle_logout(manager).await,
        Commands::Register(args) => handle_register(manager, args).await,
        Commands::List(args) => handle_list(manager, &args).await,
        Commands::Add(args) => handle_add(manager, args).await,
        Commands::Done { id } => handle_done(manager, id).await,
        Commands::Delete { id, with_subtasks } => handle_delete(manager, id, with_subtasks).await,
        Commands::Tags => handle_tags(manager).await,
        Commands::Categories => handle_categories(manager).await,
        Commands::TagAdd { name } => {
            let tag = manager.create_tag(&name).await?;
            println!("Tag created (ID: {})", tag.id);
            Ok(())
        }
        Commands::CategoryAdd {
            name,
            description,
            no_workload,
        } => {
            let input = CategoryInput {
                name: name.trim().to_string(),
                description,
                as_workload: !no_workload,
            };
            let category = manager.create_category(&input).await?;
            println!("Category created (ID: {})", category.id);
            Ok(())
        }
    }
}

fn prompt(label: &str) -> Result<String, CliError> {
    eprint!("{}: ", label);
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

async fn handle_login(manager: &mut TaskManager, username: &str, password: Option<String>) -> Result<(), CliError> {
    let password = match password {
        Some(p) => p,
        None => prompt("Password")?,
    };
    let session = manager.api_mut().login(username, &password).await?;
    println!("Logged in as {}", session.username);
    Ok(())
}

async fn handle_logout(manager: &mut TaskManager) -> Result<(), CliError> {
    manager.api_mut().logout().await?;
    println!("Logged out");
    Ok(())
}

async fn handle_register(manager: &mut TaskManager, args: RegisterArgs) -> Result<(), CliError> {
    let (password, confirm_password) = match args.password {
        Some(p) => (p.clone(), p),
        None => (prompt("Password")?, prompt("Confirm password")?),
    };
    if password != confirm_password {
        return Err(CliError::PasswordMismatch);
    }
    let registration = Registration {
        email: args.email,
        username: args.username,
        password,
        confirm_password,
        first_name: args.first_name,
        last_name: args.last_name,
    };
    if let Err(err) = manager.api().register(&registration).await {
        for line in err.field_errors() {
            eprintln!("  {}", line);
        }
        return Err(err.into());
    }
    println!("Account created, run `tdk login {}`", registration.username);
    Ok(())
}

impl ListArgs {
    pub fn filter(&self) -> TaskFilter {
        let mut filter = TaskFilter {
            search: self.search.clone().unwrap_or_default(),
            categories: self.categories.clone(),
            tags: self.tags.clone(),
            status: self.status,
            due: self.due,
        };
        if self.tagged_only {
            filter.toggle_tagged_only();
        }
        filter
    }

    pub fn sort(&self) -> Option<SortRequest> {
        self.sort.map(|key| SortRequest::new(key, self.order))
    }
}

/// One line of `tdk list` output
pub fn format_task_line(task: &Task, indent: usize) -> String {
    let mark = if task.completed { "[x]" } else { "[ ]" };
    let mut line = format!("{:indent$}{} {:>4}  {}", "", mark, task.id, task.title, indent = indent);
    let mut details = Vec::new();
    if let Some(due) = &task.due_date {
        details.push(format!("due {}", format_due(due)));
    }
    if let Some(estimate) = task.estimated_time {
        details.push(format_duration(estimate));
    }
    if let Some(category) = &task.category_name {
        details.push(category.clone());
    }
    details.extend(task.tag_names.iter().map(|t| format!("#{}", t)));
    if !details.is_empty() {
        line.push_str(&format!("  ({})", details.join(", ")));
    }
    line
}

async fn handle_list(manager: &mut TaskManager, args: &ListArgs) -> Result<(), CliError> {
    manager.get_tasks(args.sort()).await?;
    let state = manager.state();
    let visible = filter_tasks(state, &args.filter(), today());

    if visible.is_empty() {
        println!("No tasks");
        return Ok(());
    }
    for id in visible {
        let Some(task) = state.task(id) else { continue };
        println!("{}", format_task_line(task, 0));
        for child in state.subtasks_of(id) {
            println!("{}", format_task_line(child, 6));
        }
    }
    println!(
        "{} incomplete, {} complete",
        state.data.incomplete_count, state.data.complete_count
    );
    Ok(())
}

async fn handle_add(manager: &mut TaskManager, args: AddArgs) -> Result<(), CliError> {
    let draft = TaskDraft {
        title: args.title,
        description: args.description,
        due_date: parse_due(args.due.as_deref().unwrap_or(""))?,
        completed: false,
        category: args.category,
        tags: args.tags,
        parent_task: args.parent,
        estimated_time: parse_estimate(args.estimate.as_deref().unwrap_or(""))?,
    };
    draft.validate()?;

    // a sub-task is linked to its parent in the store, so the parent must be loaded
    if draft.parent_task.is_some() {
        manager.reload().await?;
    }
    let id = manager.create_task(&draft).await?;
    println!("Task created (ID: {})", id);
    Ok(())
}

async fn handle_done(manager: &mut TaskManager, id: TaskId) -> Result<(), CliError> {
    manager.reload().await?;
    manager.toggle_completion(id).await?;
    let completed = manager.state().task(id).is_some_and(|t| t.completed);
    println!(
        "Task {} marked {}",
        id,
        if completed { "complete" } else { "incomplete" }
    );
    Ok(())
}

async fn handle_delete(manager: &mut TaskManager, id: TaskId, with_subtasks: bool) -> Result<(), CliError> {
    manager.reload().await?;
    let subtasks = manager.state().task(id).map(|t| t.sub_tasks.len()).unwrap_or(0);
    manager.delete_task(id, with_subtasks).await?;
    match (subtasks, with_subtasks) {
        (0, _) => println!("Task {} deleted", id),
        (n, true) => println!("Task {} deleted with {} sub-task(s)", id, n),
        (n, false) => println!("Task {} deleted, {} sub-task(s) kept as top-level tasks", id, n),
    }
    Ok(())
}

async fn handle_tags(manager: &mut TaskManager) -> Result<(), CliError> {
    manager.get_tags().await?;
    for tag in &manager.organizers().tags {
        println!("{:>4}  {}", tag.id, tag.name);
    }
    Ok(())
}

async fn handle_categories(manager: &mut TaskManager) -> Result<(), CliError> {
    manager.get_categories().await?;
    for category in &manager.organizers().categories {
        let workload = if category.as_workload { "" } else { "  (not counted in workload)" };
        println!("{:>4}  {}{}", category.id, category.name, workload);
    }
    Ok(())
}
