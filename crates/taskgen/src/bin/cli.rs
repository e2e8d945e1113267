//! Taskgen CLI - PRD breakdown and task expansion.

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::disallowed_macros)]
#![allow(clippy::uninlined_format_args)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use taskgen::domain::{AIDomain, ConfigDomain, Credentials};
use taskgen::entities::{TaskCollection, TasksConfig};
use taskgen::errors::TasksError;
use taskgen::storage::{FileStorage, Storage};
use taskgen::ui::{self, ProgressReporter, SilentReporter, SpinnerReporter};

#[derive(Parser)]
#[command(name = "taskgen")]
#[command(about = "Turn PRDs into AI-generated development tasks", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Project root directory
    #[arg(long, global = true)]
    project: Option<PathBuf>,

    /// Verbose diagnostics, including raw backend payloads
    #[arg(long, global = true)]
    debug: bool,

    /// Disable the progress spinner
    #[arg(long, global = true)]
    no_progress: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a PRD file and generate tasks
    ParsePrd {
        /// Path to the PRD file
        file: PathBuf,

        /// Number of tasks to generate (defaults to config)
        #[arg(short, long)]
        num_tasks: Option<u32>,

        /// Overwrite an existing task collection
        #[arg(short, long)]
        force: bool,
    },

    /// Expand a task into subtasks using AI
    Expand {
        /// Task ID to expand
        #[arg(short, long)]
        id: u32,

        /// Number of subtasks to generate
        #[arg(short, long)]
        num: Option<u32>,

        /// Research best practices before expanding
        #[arg(short, long)]
        research: bool,

        /// Extra context for the expansion
        #[arg(short, long)]
        prompt: Option<String>,

        /// Replace existing subtasks instead of appending
        #[arg(short, long)]
        force: bool,
    },

    /// Analyze task complexity and write a report
    AnalyzeComplexity {
        /// Minimum score flagged for expansion
        #[arg(short, long)]
        threshold: Option<u8>,

        /// Weigh current best practices in the analysis
        #[arg(short, long)]
        research: bool,
    },
}

fn get_project_path(cli_path: Option<PathBuf>) -> PathBuf {
    cli_path.unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

fn init_tracing(config: &TasksConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.global.log_directive()))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        ui::print_error(&e.to_string());
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), TasksError> {
    let project_path = get_project_path(cli.project);
    let storage = FileStorage::new(&project_path);

    let mut config = ConfigDomain::new(&project_path).load_effective().await?;
    config.global.debug |= cli.debug;
    init_tracing(&config);

    let progress: Arc<dyn ProgressReporter> = if cli.no_progress {
        Arc::new(SilentReporter)
    } else {
        Arc::new(SpinnerReporter)
    };
    let ai_domain = AIDomain::from_config(config, &Credentials::from_env(), progress)?;

    match cli.command {
        Commands::ParsePrd {
            file,
            num_tasks,
            force,
        } => {
            if !force && storage.load_collection().await?.is_some() {
                return Err(TasksError::InvalidArgument {
                    reason: format!(
                        "{} already exists; use --force to overwrite",
                        storage.tasks_file().display()
                    ),
                });
            }

            let prd_content = tokio::fs::read_to_string(&file)
                .await
                .map_err(|e| TasksError::FileReadError {
                    path: file.display().to_string(),
                    reason: e.to_string(),
                })?;

            let num_tasks = num_tasks.unwrap_or(ai_domain.config().global.default_num_tasks);
            ui::print_info(&format!("Parsing PRD: {}", file.display()));

            let (collection, usage) = ai_domain
                .breakdown_prd(&prd_content, &display_path(&file), num_tasks)
                .await?;
            storage.save_collection(&collection).await?;

            ui::print_success(&format!(
                "Generated {} tasks from PRD",
                collection.tasks.len()
            ));
            ui::print_usage(&usage);
            println!("{}", ui::task_table(&collection.tasks));
        }

        Commands::Expand {
            id,
            num,
            research,
            prompt,
            force,
        } => {
            let mut collection = require_collection(&storage).await?;
            let task = collection
                .get_task_mut(id)
                .ok_or(TasksError::TaskNotFound { task_id: id })?;

            if !task.subtasks.is_empty() {
                if force {
                    task.subtasks.clear();
                } else {
                    ui::print_warning(&format!(
                        "Task {} already has {} subtask(s); appending. Use --force to replace.",
                        id,
                        task.subtasks.len()
                    ));
                }
            }
            let task = task.clone();

            let report = storage.load_report().await?;
            let analysis = report.as_ref().and_then(|r| r.get_task_analysis(id));

            let num_subtasks = num
                .or_else(|| analysis.map(|a| a.recommended_subtasks).filter(|n| *n > 0))
                .unwrap_or(ai_domain.config().global.default_subtasks);

            let additional_context = [
                prompt.unwrap_or_default(),
                analysis.map(|a| a.expansion_prompt.clone()).unwrap_or_default(),
            ]
            .into_iter()
            .filter(|s| !s.trim().is_empty())
            .collect::<Vec<_>>()
            .join("\n\n");

            let next_id = task.next_subtask_id();
            let subtasks = if research {
                ai_domain
                    .expand_task_with_research(&task, num_subtasks, next_id, &additional_context)
                    .await?
            } else {
                ai_domain
                    .expand_task(&task, num_subtasks, next_id, &additional_context)
                    .await
            };

            if force {
                storage.save_collection(&collection).await?;
            }
            ui::print_success(&format!(
                "Added {} subtasks to task {}",
                subtasks.len(),
                id
            ));
            println!("{}", ui::subtask_table(&subtasks));
            storage.save_subtasks(id, subtasks).await?;
        }

        Commands::AnalyzeComplexity {
            threshold,
            research,
        } => {
            let collection = require_collection(&storage).await?;

            let (mut report, usage) = if research {
                ai_domain
                    .analyze_complexity_with_research(&collection.tasks)
                    .await?
            } else {
                ai_domain.analyze_complexity(&collection.tasks).await?
            };
            if let Some(threshold) = threshold {
                report.meta.threshold_score = threshold;
            }
            storage.save_report(&report).await?;

            ui::print_success(&format!(
                "Analyzed {} tasks; report written to {}",
                report.complexity_analysis.len(),
                storage.report_file().display()
            ));
            ui::print_usage(&usage);
            println!("{}", ui::complexity_table(&report));

            let flagged: Vec<String> = report
                .tasks_needing_expansion()
                .map(|a| a.task_id.to_string())
                .collect();
            if !flagged.is_empty() {
                ui::print_info(&format!(
                    "Tasks at or above score {}: {}",
                    report.meta.threshold_score,
                    flagged.join(", ")
                ));
            }
        }
    }

    Ok(())
}

async fn require_collection(storage: &FileStorage) -> Result<TaskCollection, TasksError> {
    storage
        .load_collection()
        .await?
        .ok_or_else(|| TasksError::StorageError {
            reason: format!(
                "no tasks found at {}; run `taskgen parse-prd` first",
                storage.tasks_file().display()
            ),
        })
}

fn display_path(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
