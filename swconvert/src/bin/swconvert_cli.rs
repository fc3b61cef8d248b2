use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::LevelFilter;
use mstorage::config::StorageConfig;
use mstorage::log_store::LogSink;
use mstorage::mapping::MappingStore;
use mstorage::MStorage;
use swconvert::converter::{ConverterRegistry, ConverterServices};
use swconvert::gateway::JsonDumpGateway;
use swconvert::media::CatalogMediaFileService;
use swconvert::profile::ProfileRegistry;
use swconvert::{Connection, MigrationContext, MigrationRunner};

#[derive(Parser, Debug)]
#[command(
    name = "swconvert-cli",
    about = "Convert exported storefront data and inspect mappings and migration logs."
)]
struct Cli {
    /// Directory holding catalog.sqlite and target.sqlite.
    #[arg(short, long, default_value = ".", env = "MIGRATION_BASE_PATH", value_hint = clap::ValueHint::DirPath)]
    base_path: PathBuf,

    /// Minimum log level to display.
    #[arg(long, default_value_t = LogLevelArg::Info, value_enum)]
    log_level: LogLevelArg,

    #[arg(long, default_value = "local", env = "MIGRATION_CONNECTION_ID")]
    connection_id: String,

    /// Connection name; part of every generated custom field name.
    #[arg(long, default_value = "local", env = "MIGRATION_CONNECTION_NAME")]
    connection_name: String,

    /// Source profile (shopware54..shopware57, shopware6major).
    #[arg(long, default_value = "shopware55", env = "MIGRATION_PROFILE")]
    profile: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Convert every entity of a JSON dump.
    Migrate {
        /// Dump file: an object keyed by entity name holding arrays of rows.
        dump: PathBuf,

        /// Run id; a fresh one is generated when omitted.
        #[arg(long)]
        run_id: Option<String>,

        #[arg(long, default_value_t = 250, env = "MIGRATION_PAGE_SIZE")]
        page_size: usize,

        /// Emit JSON instead of text.
        #[arg(long)]
        json: bool,
    },
    /// Print the anomaly log of a run.
    Logs {
        #[arg(long)]
        run_id: String,

        /// Only print counts per log code.
        #[arg(long)]
        summary: bool,
    },
    /// List mappings of one entity type for the connection.
    Mappings { entity: String },
    /// List profiles and the entities they can convert.
    Profiles,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevelArg> for LevelFilter {
    fn from(value: LogLevelArg) -> Self {
        match value {
            LogLevelArg::Error => LevelFilter::Error,
            LogLevelArg::Warn => LevelFilter::Warn,
            LogLevelArg::Info => LevelFilter::Info,
            LogLevelArg::Debug => LevelFilter::Debug,
            LogLevelArg::Trace => LevelFilter::Trace,
        }
    }
}

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let mut logger = env_logger::Builder::from_env(env_logger::Env::default());
    logger.filter_level(LevelFilter::from(cli.log_level));
    let _ = logger.try_init();

    let base_path = if cli.base_path.is_absolute() {
        cli.base_path.clone()
    } else {
        std::env::current_dir()
            .context("failed to resolve current directory")?
            .join(&cli.base_path)
    };

    let storage = MStorage::new(StorageConfig::new(base_path))
        .context("failed to open migration storage")?;
    let services = ConverterServices::new(
        storage.mappings.clone(),
        storage.logs.clone(),
        storage.target.clone(),
        Arc::new(CatalogMediaFileService::new(storage.catalog.clone())),
    );
    let registry = ConverterRegistry::with_defaults(services);

    match cli.command {
        Commands::Migrate {
            dump,
            run_id,
            page_size,
            json,
        } => {
            ProfileRegistry::get_profile(&cli.profile)?;
            let gateway = JsonDumpGateway::from_path(&dump)
                .with_context(|| format!("failed to read dump '{}'", dump.display()))?;
            let run_id = run_id.unwrap_or_else(|| uuid::Uuid::new_v4().simple().to_string());
            let connection = Connection::new(&cli.connection_id, &cli.connection_name, &cli.profile);
            let ctx = MigrationContext::new(connection, run_id, "");

            let report = MigrationRunner::new(&registry)
                .with_catalog(&storage.catalog)
                .with_page_size(page_size)
                .run(&gateway, &ctx)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("run {}", report.run_id);
                println!(
                    "{:<28} {:>8} {:>10} {:>8} {:>7} {:>6}",
                    "ENTITY", "TOTAL", "CONVERTED", "SKIPPED", "FAILED", "MEDIA"
                );
                for (entity, counts) in &report.entities {
                    println!(
                        "{:<28} {:>8} {:>10} {:>8} {:>7} {:>6}",
                        entity, counts.total, counts.converted, counts.skipped, counts.failed, counts.media
                    );
                }
            }
            Ok(())
        }
        Commands::Logs { run_id, summary } => {
            if summary {
                let counts = storage.logs.count_by_code(&run_id)?;
                if counts.is_empty() {
                    println!("No log entries for run '{run_id}'.");
                }
                for (code, count) in counts {
                    println!("{count:>6}  {code}");
                }
                return Ok(());
            }
            for entry in storage.logs.entries(Some(&run_id))? {
                println!(
                    "{:<7} {:<60} {}:{} {}",
                    entry.level.as_str(),
                    entry.code,
                    entry.entity.unwrap_or_default(),
                    entry.source_id.unwrap_or_default(),
                    serde_json::to_string(&entry.parameters)?
                );
            }
            Ok(())
        }
        Commands::Mappings { entity } => {
            let mappings = storage.mappings.list_mappings(&cli.connection_id, &entity)?;
            if mappings.is_empty() {
                bail!("no '{entity}' mappings for connection '{}'", cli.connection_id);
            }
            for mapping in mappings {
                println!(
                    "{:<40} -> {}",
                    mapping.old_identifier,
                    mapping.new_identifier.unwrap_or_else(|| "(unresolved)".to_string())
                );
            }
            Ok(())
        }
        Commands::Profiles => {
            for profile in ProfileRegistry::profiles() {
                println!(
                    "{:<16} {} {} ({:?})",
                    profile.name, profile.source_system, profile.version, profile.family
                );
                for entity in registry.entities_for(profile.name) {
                    println!("    {entity}");
                }
            }
            Ok(())
        }
    }
}
