mod bootstrap;
mod server;

use clap::Parser;
use sentry_dns_application::ports::BlocklistControl;
use sentry_dns_application::use_cases::{GetQueryStatsUseCase, ReloadBlocklistUseCase};
use sentry_dns_api::AppState;
use sentry_dns_domain::CliOverrides;
use sentry_dns_infrastructure::dns::cache::{start_cache_sweeper, start_clock_ticker};
use sentry_dns_infrastructure::dns::query_logger::AsyncQueryLogger;
use sentry_dns_infrastructure::dns::{
    BlocklistManager, DnsCache, DnsHandler, DnsHandlerConfig, ForwardingEvaluator,
    LocalRecordsStore, PolicyEngine, UpstreamForwarder,
};
use sentry_dns_infrastructure::repositories::SqliteQueryLogStorage;
use sentry_dns_infrastructure::AtomicMetricsSink;
use sentry_dns_jobs::{BlocklistSyncJob, JobRunner, QueryLogRetentionJob};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::bootstrap::assemble;

#[derive(Parser)]
#[command(name = "sentry-dns")]
#[command(version)]
#[command(about = "A filtering DNS forwarder with caching, policy rules, and conditional forwarding")]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// DNS server port, overrides config
    #[arg(short = 'd', long)]
    dns_port: Option<u16>,

    /// Web API port, overrides config
    #[arg(short = 'w', long)]
    web_port: Option<u16>,

    /// Bind address, overrides config
    #[arg(short = 'b', long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let overrides = CliOverrides {
        dns_port: cli.dns_port,
        web_port: cli.web_port,
        bind_address: cli.bind,
    };
    let config = bootstrap::load_config(cli.config.as_deref(), overrides)?;
    bootstrap::init_logging(&config);

    info!("Sentry DNS starting up");

    let database_url = format!("sqlite://{}", config.database.path);
    let (write_pool, read_pool) = bootstrap::init_database(&database_url, &config.database).await?;
    let storage: Arc<dyn sentry_dns_application::ports::QueryLogStorage> =
        Arc::new(SqliteQueryLogStorage::new(write_pool, read_pool));

    let metrics = Arc::new(AtomicMetricsSink::new());

    let policy_rules = assemble::build_policy_rules(&config.policy)?;
    let policy_engine = Arc::new(PolicyEngine::new(policy_rules));

    let local_records = assemble::build_local_records(&config.local_records)?;
    let local_records_store = Arc::new(LocalRecordsStore::new(local_records)?);

    let forwarding_rules = assemble::build_forwarding_rules(&config.forwarding)?;
    let forwarding_eval = Arc::new(ForwardingEvaluator::new(forwarding_rules));

    let upstreams = sentry_dns_domain::Upstream::parse_list(&config.dns.upstreams)?;
    let forwarder = Arc::new(UpstreamForwarder::new(
        upstreams,
        Duration::from_secs(config.dns.timeout_secs),
        config.dns.retries,
    ));

    let initial_snapshot = assemble::build_initial_blocklist_snapshot(&config.blocking);
    let blocklist_manager = Arc::new(
        BlocklistManager::new(initial_snapshot)
            .with_reload_sources(
                config.blocking.sources.clone(),
                config.blocking.custom_blocked.clone(),
                config.blocking.whitelist.clone(),
                config.blocking.reject_empty_update,
            )
            .with_metrics(metrics.clone()),
    );

    let cache = Arc::new(DnsCache::new(config.cache.clone()));

    let killswitch = sentry_dns_domain::KillSwitch::new(
        config.killswitch.blocklist_enabled,
        config.killswitch.policy_enabled,
    );

    let shutdown = CancellationToken::new();

    start_clock_ticker(shutdown.clone());
    start_cache_sweeper(cache.clone(), shutdown.clone());

    let (logger, logger_handle) = AsyncQueryLogger::start(
        storage.clone(),
        config.database.query_log_buffer_size,
        config.database.query_log_batch_size,
        Duration::from_millis(config.database.query_log_flush_interval_ms),
        shutdown.clone(),
        metrics.clone(),
    );
    let logger = Arc::new(logger);

    let handler = DnsHandler::new(
        DnsHandlerConfig {
            local_record_ttl_secs: config.dns.local_record_ttl_secs,
            negative_ttl_secs: config.cache.negative_ttl_secs,
            default_timeout: Duration::from_secs(config.dns.timeout_secs),
            retries: config.dns.retries,
            killswitch,
        },
        policy_engine,
        local_records_store,
        cache.clone(),
        blocklist_manager.clone(),
        forwarding_eval,
        forwarder,
        logger,
        metrics.clone(),
    );

    let dns_bind = format!("{}:{}", config.server.bind_address, config.server.dns_port);
    let dns_task = tokio::spawn(server::start_dns_server(dns_bind, handler));

    let app_state = AppState {
        get_stats: Arc::new(GetQueryStatsUseCase::new(storage.clone())),
        reload_blocklist: Arc::new(ReloadBlocklistUseCase::new(
            blocklist_manager.clone() as Arc<dyn BlocklistControl>
        )),
    };
    let web_bind = format!("{}:{}", config.server.bind_address, config.server.web_port);
    let web_task = tokio::spawn(server::start_web_server(web_bind, app_state));

    let job_runner = JobRunner::new()
        .with_blocklist_sync(
            BlocklistSyncJob::new(blocklist_manager.clone() as Arc<dyn BlocklistControl>)
                .with_cancellation(shutdown.clone()),
        )
        .with_query_log_retention(
            QueryLogRetentionJob::new(storage.clone(), config.database.retention_days)
                .with_interval(config.database.retention_sweep_interval_secs)
                .with_cancellation(shutdown.clone()),
        );
    job_runner.start().await;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received, winding down");
        }
        result = dns_task => {
            match result {
                Ok(Err(e)) => tracing::error!(error = %e, "DNS server exited with an error"),
                Err(e) => tracing::error!(error = %e, "DNS server task panicked"),
                Ok(Ok(())) => tracing::warn!("DNS server exited unexpectedly"),
            }
        }
        result = web_task => {
            match result {
                Ok(Err(e)) => tracing::error!(error = %e, "Web API server exited with an error"),
                Err(e) => tracing::error!(error = %e, "Web API server task panicked"),
                Ok(Ok(())) => tracing::warn!("Web API server exited unexpectedly"),
            }
        }
    }

    shutdown.cancel();

    let grace = Duration::from_secs(config.server.shutdown_grace_period_secs);
    let _ = tokio::time::timeout(grace, logger_handle).await;
    storage.close().await;

    info!("Shutdown complete");
    Ok(())
}
