mod cli;

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use ody_core::config::Config;

fn load_config(path: Option<&Path>) -> Config {
    let mut config = Config::load_or_default(path);
    config.apply_env();
    config
}

async fn start_server(
    host: Option<String>,
    port: Option<u16>,
    config_path: Option<&Path>,
) -> Result<()> {
    let mut config = load_config(config_path);

    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    if let Some(parent) = config.server.db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create data directory {}", parent.display())
            })?;
        }
    }

    tracing::info!("Starting odyssey server");
    tracing::info!(
        "Server will listen on {}:{}",
        config.server.host,
        config.server.port
    );

    ody_server::start(config).await?;
    Ok(())
}

fn classify(text: &str, context: Option<&str>) -> Result<()> {
    let detection = ody_guard::detect(text);
    let verdict = ody_guard::check(text, context);

    println!("Severity:       {}", detection.severity.as_str());
    println!("Weaponized:     {}", detection.is_weaponized);
    if !detection.flagged_terms.is_empty() {
        println!("Flagged terms:  {}", detection.flagged_terms.join(", "));
    }
    println!("Recommendation: {}", detection.recommendation);
    println!();
    println!("Approved:       {}", verdict.approved);
    println!("Action:         {}", serde_json::to_string(&verdict.action)?.trim_matches('"'));
    println!("Reason:         {}", verdict.reason);

    if !verdict.approved {
        std::process::exit(2);
    }
    Ok(())
}

fn quote(size: u64, services: Vec<String>, frequency: String) -> Result<()> {
    let req = ody_pricing::QuoteRequest {
        facility_size: size,
        services,
        frequency,
    };
    let quote = ody_pricing::quote(&req)?;

    println!(
        "{} sq ft, {} (x{})",
        quote.facility_size, quote.frequency_label, quote.multiplier
    );
    for item in &quote.line_items {
        println!(
            "  {:<32} {:>6}/sqft  ${}",
            item.name,
            item.rate,
            ody_pricing::format_dollars(item.amount)
        );
    }
    println!(
        "Monthly fee: ${}",
        ody_pricing::format_dollars(quote.monthly_fee)
    );
    Ok(())
}

fn manifest_hash() -> Result<()> {
    let manifest = ody_raip::Manifest::gateway();
    let value = serde_json::to_value(&manifest)?;
    println!("{}", ody_raip::canonical_json(&value));
    println!("{}", manifest.hash());
    Ok(())
}

fn validate_config(config_path: Option<&Path>) -> Result<()> {
    let config = match config_path {
        Some(path) => {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let mut config = Config::from_json(&contents)?;
            config.apply_env();
            config
        }
        None => load_config(None),
    };

    let warnings = config.validate();
    if warnings.is_empty() {
        println!("Configuration is valid.");
    } else {
        println!("Configuration warnings:");
        for warning in &warnings {
            println!("  - {warning}");
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "odyssey=debug,ody_server=debug,ody_db=debug,tower_http=debug".to_string()
        } else {
            "odyssey=info,ody_server=info,ody_db=info,tower_http=info".to_string()
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
        Commands::Classify { text, context } => classify(&text, context.as_deref()),
        Commands::Quote {
            size,
            services,
            frequency,
        } => quote(size, services, frequency),
        Commands::ManifestHash => manifest_hash(),
        Commands::DropPolicies { table } => {
            print!("{}", ody_db::policies::drop_script(table.as_deref()));
            Ok(())
        }
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("odyssey {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
