mod cli;

use vidforge::{config, server};

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};

async fn start_server(
    host: Option<String>,
    port: Option<u16>,
    config_path: Option<&std::path::Path>,
) -> Result<()> {
    let mut config = config::load_config_or_default(config_path)?;

    // CLI flags win over the config file
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    config::validate_config(&config)?;

    tracing::info!("Starting vidforge server");
    tracing::info!(
        "Server will listen on {}:{}",
        config.server.host,
        config.server.port
    );
    tracing::info!(
        upload_dir = %config.storage.upload_dir.display(),
        output_dir = %config.storage.output_dir.display(),
        max_upload_mb = config.upload.max_upload_mb,
        rate_limit = config.rate_limit.enabled,
        "Storage and limits"
    );

    server::start_server(config).await
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "vidforge=trace,vidforge_av=trace,vidforge_common=debug,tower_http=debug".to_string()
        } else {
            "vidforge=info,vidforge_av=info,tower_http=info".to_string()
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
        Commands::CheckTools => check_tools(cli.config.as_deref()),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("vidforge {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn check_tools(config_path: Option<&std::path::Path>) -> Result<()> {
    println!("Checking external tools...\n");

    let config = config::load_config_or_default(config_path)?;
    let checked = vidforge_av::locate_encoder(config.encoder.program.as_deref()).and_then(|path| {
        let rt = tokio::runtime::Runtime::new()?;
        rt.block_on(vidforge_av::check_encoder(&path))
    });

    match checked {
        Ok(info) => {
            println!("✓ {} ({}) - {}", vidforge_av::FFMPEG, info.version, info.path.display());
            println!();
            println!("Encoder is available!");
            Ok(())
        }
        Err(e) => {
            println!("✗ {}: {}", vidforge_av::FFMPEG, e);
            println!();
            anyhow::bail!("Encoder not usable. Install ffmpeg or set encoder.program in the config.")
        }
    }
}

fn validate_config(path: Option<&std::path::Path>) -> Result<()> {
    match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            print_summary(&config);
        }
        None => {
            println!("No config file specified, using defaults");
            let config = config::Config::default();
            println!("Default config:");
            print_summary(&config);
        }
    }

    Ok(())
}

fn print_summary(config: &config::Config) {
    println!("  Server: {}:{}", config.server.host, config.server.port);
    println!("  Upload dir: {}", config.storage.upload_dir.display());
    println!("  Output dir: {}", config.storage.output_dir.display());
    println!(
        "  Allowed extensions: {}",
        config.upload.allowed_extensions.join(", ")
    );
    println!("  Max upload: {} MB", config.upload.max_upload_mb);
    if config.rate_limit.enabled {
        println!(
            "  Rate limit: {} uploads / {}s",
            config.rate_limit.requests, config.rate_limit.window_secs
        );
    } else {
        println!("  Rate limit: disabled");
    }
    match config.encoder.timeout_secs {
        Some(secs) => println!("  Encoder timeout: {}s", secs),
        None => println!("  Encoder timeout: none"),
    }
    println!("  Max concurrent conversions: {}", config.encoder.max_concurrent);
}
