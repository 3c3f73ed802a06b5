use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use dialer::cli::{dispose, lead, queue, reconcile, schedule, stats};
use dialer::config::Config;
use dialer::source::SourceRegistry;
use dialer::store::LeadStore;

#[derive(Parser)]
#[command(name = "dialer")]
#[command(about = "Outbound-calling coordinator: who to call next, and what happened")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "dialer.yaml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the calling queue for this session
    Queue {
        /// Call this zone instead of the scheduled one (ET, CT, MT, PT)
        #[arg(short, long)]
        zone: Option<String>,

        /// Maximum queued leads to return
        #[arg(short, long)]
        limit: Option<u32>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Record the outcome of a call
    Dispose {
        /// Lead ID or phone number
        lead: String,

        /// no_answer, voicemail, gatekeeper, conversation, demo_booked,
        /// not_interested, wrong_number or callback
        outcome: String,

        /// Free-text note appended to the lead's log
        #[arg(short, long)]
        notes: Option<String>,

        /// Demo time (RFC 3339), for demo_booked
        #[arg(long)]
        demo_date: Option<String>,

        /// Callback time (RFC 3339), for callback
        #[arg(long)]
        callback_at: Option<String>,

        #[arg(long)]
        json: bool,
    },

    /// Merge lead source rows into the store
    Reconcile {
        /// Configured source name (default: every enabled source)
        #[arg(short, long, conflicts_with = "file")]
        source: Option<String>,

        /// Ad-hoc JSON/JSONL file or glob pattern
        #[arg(short, long)]
        file: Option<String>,

        /// sheet (business name required) or import
        #[arg(short, long)]
        mode: Option<String>,

        #[arg(long)]
        json: bool,
    },

    /// Show today's numbers
    Stats {
        #[arg(long)]
        json: bool,
    },

    /// Lead management
    Lead {
        #[command(subcommand)]
        command: LeadCommands,
    },

    /// Show the calling schedule
    Schedule,
}

#[derive(Subcommand)]
enum LeadCommands {
    /// Add a single lead
    Add {
        #[arg(short, long)]
        phone: String,
        #[arg(short, long)]
        business: Option<String>,
        #[arg(short, long)]
        owner: Option<String>,
        #[arg(long)]
        first_name: Option<String>,
        #[arg(short, long)]
        website: Option<String>,
        /// State code or name
        #[arg(short, long)]
        region: Option<String>,
    },
    /// Show a lead with its notes and call history
    Show {
        /// Lead ID or phone number
        lead: String,
        #[arg(long)]
        json: bool,
    },
}

/// Initializes the tracing subscriber; `RUST_LOG` wins over the config level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("dialer={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load config
    let config = Config::load(&cli.config).context("Failed to load config")?;
    init_tracing(&config.logging.level);

    let schedule = config.schedule_table()?;

    // Initialize store
    let db_path = config.database_path();
    let store = LeadStore::open(&db_path, config.busy_timeout())
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;

    match cli.command {
        Commands::Queue { zone, limit, json } => {
            queue::run(&store, &schedule, &config, zone, limit, json)?;
        }
        Commands::Dispose {
            lead,
            outcome,
            notes,
            demo_date,
            callback_at,
            json,
        } => {
            let args = dispose::DisposeArgs {
                lead,
                outcome,
                notes,
                demo_date,
                callback_at,
            };
            dispose::run(&store, schedule.calendar(), args, json)?;
        }
        Commands::Reconcile {
            source,
            file,
            mode,
            json,
        } => {
            let registry = SourceRegistry::new(&config);
            reconcile::run(&store, &registry, &config, source, file, mode, json)?;
        }
        Commands::Stats { json } => {
            stats::run(&store, schedule.calendar(), json)?;
        }
        Commands::Lead { command } => match command {
            LeadCommands::Add {
                phone,
                business,
                owner,
                first_name,
                website,
                region,
            } => {
                let row = dialer::reconcile::SourceRow {
                    phone: Some(phone),
                    business_name: business,
                    owner_name: owner,
                    first_name,
                    website,
                    region,
                    external_ref: None,
                };
                lead::add(&store, &config, row)?;
            }
            LeadCommands::Show { lead: query, json } => {
                lead::show(&store, &query, json)?;
            }
        },
        Commands::Schedule => {
            schedule::run(&schedule);
        }
    }

    Ok(())
}
