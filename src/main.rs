// Trainboard - training run records
// Main entry point

use anyhow::{anyhow, Context, Result};
use clap::{Args as ClapArgs, Parser};
use std::path::PathBuf;

use trainboard::config::{load_config, Config, CONFIG_ENV};
use trainboard::errors::{self, StoreError};
use trainboard::runs::{
    LaunchRecord, ProcessSupervisor, RouteResolver, RunForm, RunId, RunStatus, SystemSupervisor,
    TrainingRun,
};
use trainboard::store::RunStore;
use tracing_subscriber::prelude::*;

#[derive(Parser, Debug)]
#[command(name = "trainboard")]
#[command(about = "Training run records: hyperparameters, process tracking and log paths", version)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Config file (default: ~/.trainboard/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Base directory for train/train_logs and train/tb_logs
    #[arg(long = "base-dir", global = true)]
    base_dir: Option<PathBuf>,

    /// SQLite database file
    #[arg(long, global = true)]
    database: Option<PathBuf>,
}

#[derive(Parser, Debug)]
enum Command {
    /// Create the database schema and log directories
    Init,
    /// Manage run owners
    User {
        #[command(subcommand)]
        user_command: UserCommand,
    },
    /// Manage training runs
    Run {
        #[command(subcommand)]
        run_command: RunCommand,
    },
}

#[derive(Parser, Debug)]
enum UserCommand {
    /// Add a user
    Add { username: String },
    /// Remove a user together with all of their runs
    Remove { username: String },
    /// Show a user and their runs
    Show { username: String },
}

#[derive(Parser, Debug)]
enum RunCommand {
    /// Submit a new training run
    Create {
        /// Owner username
        #[arg(long)]
        owner: String,
        #[command(flatten)]
        fields: RunFields,
    },
    /// Change the hyperparameters of a run (omitted fields keep their value)
    Edit {
        id: i64,
        #[command(flatten)]
        fields: EditFields,
    },
    /// List runs, newest first
    List {
        #[arg(long)]
        owner: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Show a run with its liveness and log paths
    Show {
        id: i64,
        #[arg(long)]
        json: bool,
    },
    /// Delete a run
    Delete { id: i64 },
    /// Record the processes started for a run (used by the launcher)
    RecordLaunch {
        id: i64,
        /// Training process id
        #[arg(long)]
        pid: u32,
        /// TensorBoard process id
        #[arg(long = "tb-pid", requires = "port")]
        tb_pid: Option<u32>,
        /// Port TensorBoard serves on
        #[arg(long, requires = "tb_pid")]
        port: Option<u16>,
        /// Full command line used to start training
        #[arg(long)]
        command: String,
    },
}

/// Creation attributes as typed on the command line
///
/// Integers are signed so that negative values reach validation.
#[derive(ClapArgs, Debug)]
struct RunFields {
    #[arg(long)]
    title: String,
    #[arg(long = "batch-size", allow_negative_numbers = true)]
    batch_size: i64,
    #[arg(long = "image-size", allow_negative_numbers = true)]
    image_size: i64,
    #[arg(long = "n-validation", allow_negative_numbers = true)]
    n_validation: i64,
    #[arg(long = "n-test", allow_negative_numbers = true)]
    n_test: i64,
    #[arg(long = "learning-rate", allow_negative_numbers = true)]
    learning_rate: f64,
    /// adam or sgd
    #[arg(long)]
    optimizer: String,
    #[arg(long = "group-size", allow_negative_numbers = true)]
    group_size: i64,
    #[arg(long = "filters-root", allow_negative_numbers = true)]
    filters_root: i64,
    /// Enable data augmentation
    #[arg(long)]
    augment: bool,
}

impl From<RunFields> for RunForm {
    fn from(fields: RunFields) -> Self {
        RunForm {
            title: fields.title,
            batch_size: fields.batch_size,
            image_size: fields.image_size,
            n_validation: fields.n_validation,
            n_test: fields.n_test,
            learning_rate: fields.learning_rate,
            optimizer: fields.optimizer,
            group_size: fields.group_size,
            filters_root: fields.filters_root,
            augment: fields.augment,
        }
    }
}

#[derive(ClapArgs, Debug)]
struct EditFields {
    #[arg(long)]
    title: Option<String>,
    #[arg(long = "batch-size", allow_negative_numbers = true)]
    batch_size: Option<i64>,
    #[arg(long = "image-size", allow_negative_numbers = true)]
    image_size: Option<i64>,
    #[arg(long = "n-validation", allow_negative_numbers = true)]
    n_validation: Option<i64>,
    #[arg(long = "n-test", allow_negative_numbers = true)]
    n_test: Option<i64>,
    #[arg(long = "learning-rate", allow_negative_numbers = true)]
    learning_rate: Option<f64>,
    #[arg(long)]
    optimizer: Option<String>,
    #[arg(long = "group-size", allow_negative_numbers = true)]
    group_size: Option<i64>,
    #[arg(long = "filters-root", allow_negative_numbers = true)]
    filters_root: Option<i64>,
    #[arg(long)]
    augment: Option<bool>,
}

impl EditFields {
    fn apply(self, mut form: RunForm) -> RunForm {
        if let Some(title) = self.title {
            form.title = title;
        }
        if let Some(v) = self.batch_size {
            form.batch_size = v;
        }
        if let Some(v) = self.image_size {
            form.image_size = v;
        }
        if let Some(v) = self.n_validation {
            form.n_validation = v;
        }
        if let Some(v) = self.n_test {
            form.n_test = v;
        }
        if let Some(v) = self.learning_rate {
            form.learning_rate = v;
        }
        if let Some(optimizer) = self.optimizer {
            form.optimizer = optimizer;
        }
        if let Some(v) = self.group_size {
            form.group_size = v;
        }
        if let Some(v) = self.filters_root {
            form.filters_root = v;
        }
        if let Some(v) = self.augment {
            form.augment = v;
        }
        form
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_tracing();

    if let Some(path) = &args.config {
        std::env::set_var(CONFIG_ENV, path);
    }
    let mut config = load_config()?;
    if let Some(base_dir) = args.base_dir {
        config.set_base_dir(base_dir);
    }
    if let Some(database) = args.database {
        config.database_path = database;
    }

    match args.command {
        Command::Init => run_init(&config),
        Command::User { user_command } => run_user_command(&config, user_command),
        Command::Run { run_command } => run_run_command(&config, run_command),
    }
}

/// Initialize tracing subscriber
fn init_tracing() {
    let show_debug = std::env::var("TRAINBOARD_DEBUG")
        .map(|v| v == "1" || v.to_lowercase() == "true")
        .unwrap_or(false);

    // Default: INFO level, can be overridden with RUST_LOG env var
    let env_filter = if show_debug {
        tracing_subscriber::EnvFilter::new("debug")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    };

    // Logs go to stderr so stdout stays parseable (--json)
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    // Bridge log crate → tracing (for dependencies using log crate)
    tracing_log::LogTracer::init().ok();
}

fn open_store(config: &Config) -> Result<RunStore> {
    RunStore::open(&config.database_path)
        .map_err(friendly)
        .with_context(|| format!("Failed to open database {}", config.database_path.display()))
}

/// Turn a store error into the user-facing message
fn friendly(error: StoreError) -> anyhow::Error {
    anyhow!(errors::describe_store_error(&error))
}

fn run_init(config: &Config) -> Result<()> {
    open_store(config)?;
    config.layout().ensure_dirs().with_context(|| {
        format!(
            "Failed to create log directories under {}",
            config.base_dir.display()
        )
    })?;

    println!("\x1b[1;32m✓ Initialized\x1b[0m");
    println!("  Database:  {}", config.database_path.display());
    println!("  Train logs: {}", config.layout().train_logs_dir().display());
    println!("  TB logs:    {}", config.layout().tb_logs_dir().display());
    Ok(())
}

fn run_user_command(config: &Config, command: UserCommand) -> Result<()> {
    let store = open_store(config)?;

    match command {
        UserCommand::Add { username } => {
            let user = store.create_user(&username).map_err(friendly)?;
            println!("✓ Added user {} (id {})", user.username, user.id);
        }
        UserCommand::Remove { username } => {
            let runs = store.delete_user(&username).map_err(friendly)?;
            println!("✓ Removed user {} and {} run(s)", username, runs);
        }
        UserCommand::Show { username } => {
            let user = store.require_user(&username).map_err(friendly)?;
            let runs = store.list_runs(Some(user.id)).map_err(friendly)?;
            println!("{} (id {})", user.username, user.id);
            println!(
                "  TB logs: {}",
                config.layout().tensorboard_log_directory(&user.username).display()
            );
            println!("  Runs:    {}", runs.len());
        }
    }
    Ok(())
}

fn run_run_command(config: &Config, command: RunCommand) -> Result<()> {
    let store = open_store(config)?;
    let supervisor = SystemSupervisor::new();
    let routes = config.routes();

    match command {
        RunCommand::Create { owner, fields } => {
            let owner = store.require_user(&owner).map_err(friendly)?;
            let run = store
                .create_run(&owner, &RunForm::from(fields))
                .map_err(friendly)?;
            println!("✓ Created run {} ({})", run.id, run);
            println!("  {}", run.canonical_url(&routes));
        }
        RunCommand::Edit { id, fields } => {
            let id = RunId(id);
            let existing = store.require_run(id).map_err(friendly)?;
            let form = fields.apply(RunForm::from(&existing.params));
            let run = store.update_run(id, &form).map_err(friendly)?;
            println!("✓ Updated run {} ({})", run.id, run);
            println!("  {}", run.canonical_url(&routes));
        }
        RunCommand::List { owner, json } => {
            let owner_id = match owner {
                Some(name) => Some(store.require_user(&name).map_err(friendly)?.id),
                None => None,
            };
            let runs = store.list_runs(owner_id).map_err(friendly)?;

            if json {
                let views: Vec<_> = runs
                    .iter()
                    .map(|run| run_json(run, config, &supervisor, &routes))
                    .collect();
                println!("{}", serde_json::to_string_pretty(&views)?);
            } else if runs.is_empty() {
                println!("No training runs");
            } else {
                for run in &runs {
                    println!(
                        "{:>5}  {:<8}  {:<12}  {}",
                        run.id,
                        run.status(&supervisor).as_str(),
                        run.owner.username,
                        run
                    );
                }
            }
        }
        RunCommand::Show { id, json } => {
            let run = store.require_run(RunId(id)).map_err(friendly)?;
            if json {
                let view = run_json(&run, config, &supervisor, &routes);
                println!("{}", serde_json::to_string_pretty(&view)?);
            } else {
                print_run(&run, config, &supervisor, &routes);
            }
        }
        RunCommand::Delete { id } => {
            store.delete_run(RunId(id)).map_err(friendly)?;
            println!("✓ Deleted run {}", id);
        }
        RunCommand::RecordLaunch {
            id,
            pid,
            tb_pid,
            port,
            command,
        } => {
            let mut launch = LaunchRecord::new(pid, command);
            if let (Some(tb_pid), Some(port)) = (tb_pid, port) {
                launch = launch.with_tensorboard(tb_pid, port);
            }
            let run = store.record_launch(RunId(id), &launch).map_err(friendly)?;
            println!("✓ Run {} launched (PID: {})", run.id, run.process_id());
        }
    }
    Ok(())
}

fn print_run(
    run: &TrainingRun,
    config: &Config,
    supervisor: &dyn ProcessSupervisor,
    routes: &dyn RouteResolver,
) {
    let layout = config.layout();
    let params = &run.params;

    let status = match run.status(supervisor) {
        RunStatus::Pending => "\x1b[1;33mpending\x1b[0m".to_string(),
        RunStatus::Running => format!("\x1b[1;32mrunning\x1b[0m (PID: {})", run.process_id()),
        RunStatus::Exited => format!("\x1b[1;31mexited\x1b[0m (PID: {})", run.process_id()),
    };

    println!("\x1b[1m{}\x1b[0m  (run {})", run, run.id);
    println!("  Owner:         {}", run.owner);
    println!("  Created:       {}", run.created_at.to_rfc3339());
    println!("  Status:        {}", status);
    println!("  Batch size:    {}", params.batch_size);
    println!("  Image size:    {}", params.image_size);
    println!("  Validation:    {}", params.n_validation);
    println!("  Test:          {}", params.n_test);
    println!("  Learning rate: {}", params.learning_rate);
    println!("  Optimizer:     {}", params.optimizer);
    println!("  Group size:    {}", params.group_size);
    println!("  Filters root:  {}", params.filters_root);
    println!("  Augment:       {}", params.augment);
    if let Some(tb_pid) = run.tensorboard_pid {
        let state = if run.is_tensorboard_process_alive(supervisor) {
            "running"
        } else {
            "exited"
        };
        println!("  TensorBoard:   {} (PID: {})", state, tb_pid);
    }
    if let Some(port) = run.port {
        println!("  Port:          {}", port);
    }
    println!("  Command:       {}", run.command);
    println!("  Log file:      {}", run.log_file_path(&layout).display());
    println!("  TB log dir:    {}", run.tensorboard_log_directory(&layout).display());
    println!("  URL:           {}", run.canonical_url(routes));
}

fn run_json(
    run: &TrainingRun,
    config: &Config,
    supervisor: &dyn ProcessSupervisor,
    routes: &dyn RouteResolver,
) -> serde_json::Value {
    let layout = config.layout();
    serde_json::json!({
        "run": run,
        "status": run.status(supervisor),
        "pending": run.is_pending_run(),
        "process_alive": run.is_process_alive(supervisor),
        "tensorboard_alive": run.is_tensorboard_process_alive(supervisor),
        "log_file": run.log_file_path(&layout),
        "tensorboard_log_dir": run.tensorboard_log_directory(&layout),
        "url": run.canonical_url(routes),
    })
}
