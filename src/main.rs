mod cli;

use reelhouse::{
    config,
    reconcile::Reconciler,
    server,
    tools::ToolRegistry,
};
use reelhouse_db::pool::{init_pool, DbPool};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands, ReconcileTarget};
use std::path::Path;

const DB_FILE_NAME: &str = "reelhouse.db";

fn open_catalog(data_dir: &Path) -> Result<DbPool> {
    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("Failed to create data directory: {:?}", data_dir))?;
    let db_path = data_dir.join(DB_FILE_NAME);
    let db_path_str = db_path.to_string_lossy();
    tracing::info!("Initializing database at {}", db_path_str);
    init_pool(&db_path_str).with_context(|| format!("Failed to open catalog at {}", db_path_str))
}

async fn start_server(
    host: Option<String>,
    port: Option<u16>,
    config_path: Option<&Path>,
) -> Result<()> {
    let config_file = config::find_config_path(config_path);
    let mut config = config::load_config_or_default(config_file.as_deref())?;

    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    config::validate_config(&config)?;

    tracing::info!("Starting reelhouse server");
    for kind in reelhouse_common::LibraryKind::ALL {
        match config.library.resolved_root(kind) {
            Some(root) => tracing::info!(%kind, root = ?root, "Library root"),
            None => tracing::info!(%kind, "Library root not configured"),
        }
    }

    let data_dir = config::data_dir(config_file.as_deref());
    let pool = open_catalog(&data_dir)?;

    server::start_server(config, pool, data_dir).await
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "reelhouse=trace,reelhouse_db=debug,reelhouse_matcher=debug,tower_http=debug".to_string()
        } else {
            "reelhouse=debug,reelhouse_db=info,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    match cli.command {
        Commands::Start { host, port } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start_server(host, port, cli.config.as_deref()))
        }
        Commands::Reconcile { target } => reconcile(target, cli.config.as_deref()),
        Commands::CheckTools => check_tools(cli.config.as_deref()),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("reelhouse {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn reconcile(target: ReconcileTarget, config_path: Option<&Path>) -> Result<()> {
    let config_file = config::find_config_path(config_path);
    let config = config::load_config_or_default(config_file.as_deref())?;
    let pool = open_catalog(&config::data_dir(config_file.as_deref()))?;

    let reconciler = Reconciler::with_system_clock(pool, &config);
    let mut failed = 0;

    for kind in target.kinds() {
        if reconciler.root(kind).is_none() {
            println!("{}: no root configured", kind);
            continue;
        }
        match reconciler.force_reconcile(kind) {
            Ok(report) => println!("{}", report),
            Err(e) => {
                failed += 1;
                eprintln!("{}: reconciliation failed: {}", kind, e);
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{} reconciliation pass(es) failed", failed);
    }
    Ok(())
}

fn check_tools(config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    println!("Checking external tools...\n");

    let registry = ToolRegistry::discover(&config.tools);
    let mut all_ok = true;

    for tool in registry.check_all() {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);

        if let Some(ref version) = tool.version {
            print!(" ({})", version);
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        if let Some(source) = tool.source {
            print!(" [{:?}]", source);
        }

        println!();
    }

    println!();
    if all_ok {
        println!("All tools are available!");
    } else {
        println!("Some tools are missing. Matroska files will need an external player.");
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            println!("  Server: {}:{}", config.server.host, config.server.port);
            for kind in reelhouse_common::LibraryKind::ALL {
                match config.library.root(kind) {
                    Some(root) => println!("  {} root: {}", kind, root.display()),
                    None => println!("  {} root: (not configured)", kind),
                }
            }
            println!(
                "  Scan caps: {} dirs, {} files, {}s cooldown",
                config.scan.max_dirs, config.scan.max_files, config.scan.cooldown_secs
            );
            println!(
                "  Transcode: {} concurrent, {}s startup timeout",
                config.transcode.max_concurrent, config.transcode.startup_timeout_secs
            );
        }
        None => {
            println!("No config file specified, using defaults");
            let config = config::Config::default();
            println!("Default config:");
            println!("  Server: {}:{}", config.server.host, config.server.port);
        }
    }

    Ok(())
}
