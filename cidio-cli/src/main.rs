use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

use cidio_engine::{
    AssetRequest, CacheController, DeliveryConfig, FailoverOptions, FileGatewayStore,
    GatewayRegistry, GatewayResolver, ProxyConfig, USER_GATEWAYS_FILE, create_client,
};

mod cli;
mod error;

use cli::{CacheAction, CliArgs, Command, GatewayAction};
use error::AppError;

fn main() {
    if let Err(e) = bootstrap() {
        eprintln!("Error: {e}");
        // Log the full error for debugging
        error!(error = ?e, "Application failed");
        std::process::exit(1);
    }
}

#[tokio::main]
async fn bootstrap() -> Result<(), AppError> {
    // Parse command-line arguments
    let args = CliArgs::parse();

    // Setup logging
    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_ansi(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| AppError::Initialization(e.to_string()))?;

    let mut config_builder = DeliveryConfig::builder();
    if let Some(dir) = &args.cache_dir {
        config_builder = config_builder.with_cache_dir(dir.clone());
    }
    if let Some(endpoint) = &args.config_endpoint {
        config_builder = config_builder.with_config_endpoint(endpoint.clone());
    }
    if !args.hosts.is_empty() {
        config_builder = config_builder.with_external_hosts(args.hosts.clone());
    }
    if let Some(proxy) = &args.proxy {
        config_builder = config_builder.with_proxy(ProxyConfig {
            url: proxy.clone(),
            proxy_type: args.proxy_type,
            auth: None,
        });
    }
    let config = config_builder.build();

    let client = create_client(&config)?;

    let gateways_file = args
        .gateways_file
        .clone()
        .unwrap_or_else(|| PathBuf::from(USER_GATEWAYS_FILE));
    let store = FileGatewayStore::new(gateways_file);
    let mut registry = GatewayRegistry::new(
        Box::new(store),
        client.clone(),
        config.config_endpoint.clone(),
    );

    match args.command {
        Command::Gateway { action } => match action {
            GatewayAction::Add { url } => {
                registry.add_gateway(&url)?;
                info!(gateway = url.as_str(), "Gateway added");
            }
            GatewayAction::Remove { url } => {
                if registry.remove_gateway(&url) {
                    info!(gateway = url.as_str(), "Gateway removed");
                } else {
                    info!(gateway = url.as_str(), "Gateway was not registered");
                }
            }
            GatewayAction::List { all } => {
                let gateways = if all {
                    registry.all_gateways().await
                } else {
                    registry.user_gateways().to_vec()
                };
                if gateways.is_empty() {
                    println!("no gateways registered");
                }
                for (index, gateway) in gateways.iter().enumerate() {
                    println!("{index:3}  {gateway}");
                }
            }
            GatewayAction::Clear => {
                registry.clear_user_gateways();
                info!("User gateways cleared");
            }
        },
        Command::Resolve { cid, timeout_ms } => {
            let resolver = GatewayResolver::new(client);
            let options = FailoverOptions {
                timeout: Duration::from_millis(timeout_ms),
                on_attempt: Some(Box::new(|gateway, index, total| {
                    info!(gateway, attempt = index + 1, total, "Probing gateway");
                })),
            };

            let resolved = resolver
                .resolve_with_failover(&registry, &cid, &options)
                .await?;
            info!(gateway = resolved.gateway.as_str(), "Resolved via gateway");
            println!("{}", resolved.url);
        }
        Command::Fetch { url, output } => {
            let handle = CacheController::spawn_with_client(config, client).await?;

            let response = handle.fetch(AssetRequest::get(&url)).await?;
            info!(
                status = %response.status,
                bytes = response.body.len(),
                from_cache = response.from_cache,
                "Fetch completed"
            );

            if let Some(path) = output {
                std::fs::write(&path, &response.body)?;
                info!(path = %path.display(), "Body written");
            }

            handle.shutdown();
        }
        Command::Cache { action } => {
            let handle = CacheController::spawn_with_client(config, client).await?;

            match action {
                CacheAction::List => {
                    let entries = handle.list_cache().await?;
                    if entries.is_empty() {
                        println!("cache is empty");
                    }
                    for entry in entries {
                        println!("{:>12}  {:<6}  {}", entry.size, format!("{:?}", entry.kind), entry.url);
                    }
                }
                CacheAction::Stats => {
                    let stats = handle.cache_stats().await?;
                    println!(
                        "cache: {} ({} entries, {} bytes)",
                        stats.cache_name, stats.entry_count, stats.total_size
                    );
                    for (host, host_stats) in &stats.hosts {
                        println!(
                            "  {host}: {} entries, {} bytes",
                            host_stats.count, host_stats.size
                        );
                    }
                }
                CacheAction::Delete { url } => {
                    handle.delete_cache_item(&url).await?;
                    info!(url = url.as_str(), "Cache entry deleted");
                }
                CacheAction::Clear => {
                    handle.clear_cache().await?;
                    info!("Cache cleared");
                }
                CacheAction::Audit => {
                    handle.check_cache_size().await?;
                    // The audit runs inside the worker; give it a moment
                    // before reporting the post-audit totals
                    tokio::time::sleep(Duration::from_millis(200)).await;
                    let stats = handle.cache_stats().await?;
                    println!(
                        "cache: {} ({} entries, {} bytes)",
                        stats.cache_name, stats.entry_count, stats.total_size
                    );
                }
                CacheAction::Status => {
                    let status = handle.worker_status().await?;
                    println!("cidio worker v{}", status.version);
                    println!("cache: {}", status.cache_name);
                    println!("hosts: {}", status.external_hosts.join(", "));
                    println!("extensions: {}", status.cacheable_extensions.join(", "));
                }
            }

            handle.shutdown();
        }
    }

    Ok(())
}
