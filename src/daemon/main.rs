//! Policy Store CLI
//!
//! Command-line access to a policy rule table: create it, list, import and
//! export rules, and apply single add/remove operations.

use policy_rule_store::telemetry::init_logging;
use policy_rule_store::{
    Backend, Config, PolicyDocument, PolicyModel, PolicyStore, Result, Section,
};

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

/// Policy Store CLI
#[derive(Parser, Debug)]
#[command(name = "policy-store")]
#[command(about = "Manage access-control policy rules in a relational store")]
#[command(version)]
struct Args {
    /// Configuration file path
    #[arg(short, long, env = "CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Database URL
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Database back-end
    #[arg(long, value_parser = parse_backend)]
    backend: Option<Backend>,

    /// Rule table name
    #[arg(long)]
    table: Option<String>,

    /// Log level
    #[arg(long, env = "LOG_LEVEL")]
    log_level: Option<String>,

    /// Enable JSON log format
    #[arg(long, env = "JSON_LOGS")]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the rule table if it does not exist
    Init {
        /// Also create a unique index over whole rules
        #[arg(long)]
        unique: bool,
    },
    /// Print every stored rule
    List {
        /// Print JSON instead of policy file lines
        #[arg(long)]
        json: bool,
    },
    /// Replace every stored rule with the rules in a policy file
    Import {
        /// Policy file path
        file: PathBuf,
    },
    /// Write every stored rule to a policy file
    Export {
        /// Policy file path
        file: PathBuf,
    },
    /// Add one rule
    Add {
        /// Policy type (p, g, g2, ...)
        policy_type: String,
        /// Rule values
        #[arg(required = true)]
        values: Vec<String>,
    },
    /// Remove one rule
    Remove {
        /// Policy type (p, g, g2, ...)
        policy_type: String,
        /// Rule values
        #[arg(required = true)]
        values: Vec<String>,
    },
    /// Remove every rule matching a field filter
    RemoveFiltered {
        /// Policy type (p, g, g2, ...)
        policy_type: String,
        /// Index of the first field the values apply to
        #[arg(allow_negative_numbers = true)]
        field_offset: i32,
        /// Filter values; an empty string matches anything
        values: Vec<String>,
    },
}

fn parse_backend(value: &str) -> std::result::Result<Backend, String> {
    match value.to_lowercase().as_str() {
        "postgres" | "postgresql" => Ok(Backend::Postgres),
        "sqlite" => Ok(Backend::Sqlite),
        "mysql" | "mariadb" => Ok(Backend::MySql),
        other => Err(format!("unsupported backend '{}'", other)),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let mut config = Config::load(args.config.as_ref())?;

    // Apply command line overrides
    if let Some(url) = &args.database_url {
        config.store.url = url.clone();
    }
    if let Some(backend) = args.backend {
        config.store.backend = backend;
    }
    if let Some(table) = &args.table {
        config.store.table_name = table.clone();
    }
    if let Some(level) = &args.log_level {
        config.telemetry.log_level = level.clone();
    }
    if args.json_logs {
        config.telemetry.json_logs = true;
    }
    if let Command::Init { unique: true } = args.command {
        config.store.unique_rules = true;
    }

    init_logging(&config.telemetry)?;
    info!("policy-store v{}", policy_rule_store::VERSION);

    // Validate configuration
    config.validate()?;

    let store = PolicyStore::connect(&config).await?;
    let result = run(&store, args.command).await;
    store.close().await;
    result
}

async fn run(store: &PolicyStore, command: Command) -> Result<()> {
    match command {
        Command::Init { .. } => {
            store.ensure_table().await?;
            info!(table = store.table(), "rule table ready");
        }
        Command::List { json } => {
            let model = load_all(store).await?;
            if json {
                let rules: Vec<_> = model
                    .rules()
                    .map(|(section, policy_type, rule)| {
                        serde_json::json!({
                            "section": section,
                            "policy_type": policy_type,
                            "rule": rule,
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&rules)?);
            } else {
                print!("{}", PolicyDocument::from_model(model).to_text());
            }
        }
        Command::Import { file } => {
            let document = PolicyDocument::from_file(&file)?;
            store.save_policy(document.model()).await?;
            info!("Imported {} rules from {:?}", document.model().len(), file);
        }
        Command::Export { file } => {
            let model = load_all(store).await?;
            let count = model.len();
            PolicyDocument::from_model(model).write_file(&file)?;
            info!("Exported {} rules to {:?}", count, file);
        }
        Command::Add {
            policy_type,
            values,
        } => {
            let section = Section::from_policy_type(&policy_type)?;
            store.add_policy(section, &policy_type, &values).await?;
        }
        Command::Remove {
            policy_type,
            values,
        } => {
            let section = Section::from_policy_type(&policy_type)?;
            store.remove_policy(section, &policy_type, &values).await?;
        }
        Command::RemoveFiltered {
            policy_type,
            field_offset,
            values,
        } => {
            let section = Section::from_policy_type(&policy_type)?;
            store
                .remove_filtered_policy(section, &policy_type, field_offset, &values)
                .await?;
        }
    }

    Ok(())
}

async fn load_all(store: &PolicyStore) -> Result<PolicyModel> {
    let mut model = PolicyModel::new();
    store.load_policy(&mut model).await?;
    Ok(model)
}
