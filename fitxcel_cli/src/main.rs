use clap::{Parser, Subcommand};
use fitxcel_core::*;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "fitxcel")]
#[command(about = "Fitness task progression: XP, levels and stats", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Load configuration from this file instead of the default path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// User whose profile to act on
    #[arg(long, global = true, default_value = "local")]
    user: String,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the profile, creating it on first use (default)
    Show,

    /// List tasks and whether they are done
    Tasks,

    /// Complete a task and collect its XP reward
    Complete {
        /// Task id (see `tasks`)
        task_id: TaskId,
    },

    /// Spend one level point on a stat (strength, stamina, agility)
    Upgrade { stat: String },

    /// Grant bonus XP not tied to a task
    Grant {
        #[arg(allow_negative_numbers = true)]
        amount: i64,
    },
}

fn main() -> ExitCode {
    // Initialize logging
    fitxcel_core::logging::init();

    let cli = Cli::parse();
    let json = cli.json;

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if json {
                eprintln!(
                    "{}",
                    serde_json::json!({ "error": e.code(), "message": e.to_string() })
                );
            } else {
                eprintln!("error: {}", e);
            }
            if e.is_client_error() {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    // Determine data directory
    let data_dir = cli
        .data_dir
        .clone()
        .unwrap_or_else(|| config.data.data_dir.clone());
    tracing::debug!("Using data directory {:?}", data_dir);

    let repo = JsonFileRepository::new(data_dir.join("profiles"))
        .with_lock_timeout(config.store.lock_timeout());
    let service = ProfileService::from_config(repo, &config)?;
    let user = UserId::parse(&cli.user)?;

    match cli.command.unwrap_or(Commands::Show) {
        Commands::Show => {
            let profile = service.get_or_create(&user)?;
            print_profile(&service, &profile, cli.json)
        }
        Commands::Tasks => {
            let board = service.task_board(&user)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&board)?);
            } else {
                display_tasks(&board);
            }
            Ok(())
        }
        Commands::Complete { task_id } => {
            let profile = service.grant_task_completion(&user, task_id)?;
            if !cli.json {
                let reward = service
                    .catalog()
                    .definition(task_id)
                    .map(|t| t.xp_reward)
                    .unwrap_or(0);
                println!("✓ Task {} completed! +{} XP", task_id, reward);
            }
            print_profile(&service, &profile, cli.json)
        }
        Commands::Upgrade { stat } => {
            let profile = service.spend_level_point(&user, &stat)?;
            if !cli.json {
                println!("✓ {} increased!", stat);
            }
            print_profile(&service, &profile, cli.json)
        }
        Commands::Grant { amount } => {
            let profile = service.grant_xp(&user, amount)?;
            if !cli.json && amount > 0 {
                println!("✓ +{} XP", amount);
            }
            print_profile(&service, &profile, cli.json)
        }
    }
}

fn print_profile<R: ProfileRepository>(
    service: &ProfileService<R>,
    profile: &Profile,
    json: bool,
) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(profile)?);
        return Ok(());
    }

    let progress = service.progress(profile);
    println!("\n╭─────────────────────────────────────────╮");
    println!("│  {}", profile.user_id);
    println!("╰─────────────────────────────────────────╯");
    println!();
    println!(
        "  Level {}  ({} / {} XP, {} to next)",
        progress.level, progress.experience, progress.threshold, progress.remaining
    );
    println!("  Level points: {}", profile.level_points);
    println!();
    for stat in Stat::ALL {
        println!("  {:<10} {}", stat.as_str(), profile.stats.get(stat));
    }
    println!();
    display_tasks(&service.catalog().task_board(profile));
    Ok(())
}

fn display_tasks(board: &[TaskView]) {
    for task in board {
        let mark = if task.done { "x" } else { " " };
        println!(
            "  [{}] {:>3}  {} (+{} XP)",
            mark, task.id, task.name, task.xp_reward
        );
    }
}
