use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use sql_migrator_config::MigratorConfig;
use sql_migrator_sqlite::{MigrationStatus, Migrator};
use tracing::debug;

const PACKAGE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Output format for `status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum CliOutputFormat {
    Table,
    Json,
    Yaml,
}

#[derive(Debug, Parser)]
#[command(name = "sql-migrator")]
#[command(about = "Versioned SQL schema migrations for SQLite")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct GlobalArgs {
    /// YAML config file (database, sql_folder, schema_file, migrations_dir).
    #[arg(long, global = true, env = "MIGRATOR_CONFIG")]
    config: Option<PathBuf>,
    /// SQLite database file.
    #[arg(long, global = true, env = "MIGRATOR_DB_PATH")]
    db: Option<PathBuf>,
    /// SQL folder containing the schema file and migrations directory (default: ./sql/).
    #[arg(long, global = true, env = "MIGRATOR_SQL_FOLDER_PATH")]
    sql_folder: Option<PathBuf>,
    /// Increase log verbosity (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the tool version.
    Version,
    /// Write the resolved configuration to a YAML file.
    Init(InitArgs),
    /// Validate the SQL folder and database connection.
    Check,
    /// Print the number of migration files.
    CountMigrations,
    /// Build the schema from `schema_up` and create the version table.
    SchemaUp,
    /// Run `schema_down` and drop the version table.
    SchemaDown,
    /// Run schema-down followed by schema-up.
    SchemaReload,
    /// Apply all pending migrations.
    Migrate,
    /// Run a named script from the schema file.
    Run(RunArgs),
    /// Show the current version and pending migrations.
    Status(StatusArgs),
}

#[derive(Debug, Args)]
struct InitArgs {
    /// Config file to write.
    #[arg(default_value = ".migrator.yml")]
    path: PathBuf,
    /// Overwrite an existing file.
    #[arg(long)]
    force: bool,
}

#[derive(Debug, Args)]
struct RunArgs {
    /// Script name as tagged in the schema file (`-- name: <script>`).
    script: String,
    /// Positional parameters bound to ?1, ?2, … as text.
    params: Vec<String>,
    /// Bind parameters even when none are given (single-statement execution).
    #[arg(long)]
    with_params: bool,
}

#[derive(Debug, Args)]
struct StatusArgs {
    /// Output format.
    #[arg(long, default_value = "table")]
    format: CliOutputFormat,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.global.verbose);

    let result = match cli.command {
        Command::Version => {
            println!("Version: {PACKAGE_VERSION}");
            Ok(())
        }
        Command::Init(args) => run_init(&cli.global, args),
        Command::Check => run_check(&cli.global),
        Command::CountMigrations => run_count_migrations(&cli.global),
        Command::SchemaUp => run_schema_up(&cli.global),
        Command::SchemaDown => run_schema_down(&cli.global),
        Command::SchemaReload => run_schema_reload(&cli.global),
        Command::Migrate => run_migrate(&cli.global),
        Command::Run(args) => run_script(&cli.global, args),
        Command::Status(args) => run_status(&cli.global, args),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(verbosity_filter(verbose)));
    // A subscriber may already be installed when embedded; keep the existing one.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn verbosity_filter(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    }
}

// ---------------------------------------------------------------------------
// Setup
// ---------------------------------------------------------------------------

fn load_config(args: &GlobalArgs) -> Result<MigratorConfig, String> {
    let config = match &args.config {
        Some(path) => MigratorConfig::load(path)
            .map_err(|e| format!("Failed to load config '{}': {e}", path.display()))?,
        None => MigratorConfig::default(),
    };
    let config = config
        .with_database(args.db.clone())
        .with_sql_folder(args.sql_folder.clone());
    debug!(?config, "Resolved configuration");
    Ok(config)
}

fn open_migrator(config: &MigratorConfig) -> Result<Migrator, String> {
    let db = config.database_path().map_err(|e| e.to_string())?;
    Migrator::open(db, config.layout())
        .map_err(|e| format!("Failed to initialize migrator: {e}"))
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn run_init(args: &GlobalArgs, init: InitArgs) -> Result<(), String> {
    if init.path.exists() && !init.force {
        return Err(format!(
            "'{}' already exists (use --force to overwrite)",
            init.path.display()
        ));
    }
    let config = load_config(args)?;
    config
        .save(&init.path)
        .map_err(|e| format!("Failed to write config '{}': {e}", init.path.display()))?;
    println!("Wrote configuration to {}", init.path.display());
    Ok(())
}

fn run_check(args: &GlobalArgs) -> Result<(), String> {
    let config = load_config(args)?;
    let migrator = open_migrator(&config)?;
    migrator
        .connection()
        .query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
        .map_err(|e| format!("Failed to query database: {e}"))?;
    let initialised = migrator
        .is_initialised()
        .map_err(|e| format!("Failed to check initialisation: {e}"))?;

    println!("Database connection successful");
    println!("Version: {PACKAGE_VERSION}");
    println!("Database: {}", config.database_path().map_err(|e| e.to_string())?.display());
    println!("SQL Path: {}", config.sql_folder.display());
    println!(
        "Scripts: {}",
        migrator.catalog().names().collect::<Vec<_>>().join(", ")
    );
    println!("Initialised: {}", if initialised { "yes" } else { "no" });

    migrator
        .into_connection()
        .close()
        .map_err(|(_, e)| format!("Failed to close database: {e}"))
}

fn run_count_migrations(args: &GlobalArgs) -> Result<(), String> {
    let config = load_config(args)?;
    let migrator = open_migrator(&config)?;
    let count = migrator
        .count_migrations()
        .map_err(|e| format!("Failed to count migrations: {e}"))?;
    println!("{count}");
    Ok(())
}

fn run_schema_up(args: &GlobalArgs) -> Result<(), String> {
    let config = load_config(args)?;
    let mut migrator = open_migrator(&config)?;
    let version = migrator
        .apply_schema_up()
        .map_err(|e| format!("Schema up failed: {e}"))?;
    println!("Schema up complete. Migration version set to {version}.");
    Ok(())
}

fn run_schema_down(args: &GlobalArgs) -> Result<(), String> {
    let config = load_config(args)?;
    let mut migrator = open_migrator(&config)?;
    migrator
        .apply_schema_down()
        .map_err(|e| format!("Schema down failed: {e}"))?;
    println!("Schema down complete. Migrations table dropped.");
    Ok(())
}

fn run_schema_reload(args: &GlobalArgs) -> Result<(), String> {
    let config = load_config(args)?;
    let mut migrator = open_migrator(&config)?;
    let version = migrator
        .reload_schema()
        .map_err(|e| format!("Schema reload failed: {e}"))?;
    println!("Schema reload complete. Migration version set to {version}.");
    Ok(())
}

fn run_migrate(args: &GlobalArgs) -> Result<(), String> {
    let config = load_config(args)?;
    let mut migrator = open_migrator(&config)?;
    let report = migrator
        .apply_migrations()
        .map_err(|e| format!("Migrate failed: {e}"))?;

    if report.is_empty() {
        println!("No new migrations (version {}).", report.starting_version);
        return Ok(());
    }
    for level in &report.applied {
        println!("Applied migration: {level}");
    }
    println!(
        "Migrated from version {} to {}.",
        report.starting_version,
        report.final_version()
    );
    Ok(())
}

fn run_script(args: &GlobalArgs, run: RunArgs) -> Result<(), String> {
    let config = load_config(args)?;
    let migrator = open_migrator(&config)?;

    if binds_params(&run) {
        let affected = migrator
            .run_script_with_params(&run.script, rusqlite::params_from_iter(run.params.iter()))
            .map_err(|e| format!("Run failed: {e}"))?;
        println!("Script '{}' complete ({affected} row(s) affected).", run.script);
    } else {
        migrator
            .run_script(&run.script)
            .map_err(|e| format!("Run failed: {e}"))?;
        println!("Script '{}' complete.", run.script);
    }
    Ok(())
}

fn run_status(args: &GlobalArgs, status_args: StatusArgs) -> Result<(), String> {
    let config = load_config(args)?;
    let migrator = open_migrator(&config)?;
    let status = migrator
        .status()
        .map_err(|e| format!("Failed to get migration status: {e}"))?;

    let output = match status_args.format {
        CliOutputFormat::Table => format_status_table(&status),
        CliOutputFormat::Json => serde_json::to_string_pretty(&status)
            .map_err(|e| format!("Failed to serialize status: {e}"))?,
        CliOutputFormat::Yaml => serde_yaml::to_string(&status)
            .map_err(|e| format!("Failed to serialize status: {e}"))?,
    };
    println!("{}", output.trim_end());
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn binds_params(run: &RunArgs) -> bool {
    run.with_params || !run.params.is_empty()
}

fn format_status_table(status: &MigrationStatus) -> String {
    let or_none = |value: Option<u64>| value.map_or_else(|| "none".to_string(), |v| v.to_string());
    let pending = if status.pending.is_empty() {
        "none".to_string()
    } else {
        status
            .pending
            .iter()
            .map(u64::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    };

    format!(
        "Migration Status:\n  Initialised: {}\n  Current version: {}\n  Migration files: {}\n  Latest level: {}\n  Pending: {}\n",
        if status.initialised { "yes" } else { "no" },
        or_none(status.current_version),
        status.migration_files,
        or_none(status.latest_level),
        pending,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_args(params: &[&str], with_params: bool) -> RunArgs {
        RunArgs {
            script: "s".to_string(),
            params: params.iter().map(|p| p.to_string()).collect(),
            with_params,
        }
    }

    #[test]
    fn test_verbosity_filter() {
        assert_eq!(verbosity_filter(0), "warn");
        assert_eq!(verbosity_filter(1), "info");
        assert_eq!(verbosity_filter(5), "debug");
    }

    #[test]
    fn test_binds_params() {
        assert!(!binds_params(&run_args(&[], false)));
        assert!(binds_params(&run_args(&[], true)));
        assert!(binds_params(&run_args(&["1"], false)));
    }

    #[test]
    fn test_format_status_table() {
        let status = MigrationStatus {
            initialised: true,
            current_version: Some(2),
            migration_files: 4,
            latest_level: Some(4),
            pending: vec![3, 4],
        };
        let table = format_status_table(&status);
        assert!(table.contains("Initialised: yes"));
        assert!(table.contains("Current version: 2"));
        assert!(table.contains("Pending: 3, 4"));

        let status = MigrationStatus {
            initialised: false,
            current_version: None,
            migration_files: 0,
            latest_level: None,
            pending: Vec::new(),
        };
        let table = format_status_table(&status);
        assert!(table.contains("Current version: none"));
        assert!(table.contains("Pending: none"));
    }

    #[test]
    fn test_cli_parses_init_defaults() {
        let cli = Cli::try_parse_from(["sql-migrator", "init"]).unwrap();
        match cli.command {
            Command::Init(init) => {
                assert_eq!(init.path, PathBuf::from(".migrator.yml"));
                assert!(!init.force);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_parses_run_params() {
        let cli = Cli::try_parse_from(["sql-migrator", "--db", "app.db", "run", "add_user", "1", "ada"])
            .unwrap();
        match cli.command {
            Command::Run(run) => {
                assert_eq!(run.script, "add_user");
                assert_eq!(run.params, vec!["1", "ada"]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
        assert_eq!(cli.global.db, Some(PathBuf::from("app.db")));
    }
}
