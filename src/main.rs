use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};

use notification_batch::api::{
    AlertSettingClient, AlertSettingService, NotificationClient, NotificationService,
};
use notification_batch::batch::encb::EncbJob;
use notification_batch::batch::runner;
use notification_batch::batch::spending_alert::SpendingAlertJob;
use notification_batch::config::{self, BatchConfig, Config};
use notification_batch::logging::{self, ApiTrace};
use notification_batch::routes;
use notification_batch::scheduler::{Scheduler, TimeOfDay};
use notification_batch::transport::{FtpTransport, Transport};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Directory holding per-environment YAML config files
    #[arg(long, default_value = "config")]
    config_dir: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let cfg = config::load(&args.config_dir).with_context(|| {
        format!(
            "failed to load configuration profile '{}' from {}",
            config::active_profile(),
            args.config_dir.display()
        )
    })?;
    cfg.ensure_dirs()?;

    let _log_guard = logging::init(&cfg.log_path)?;
    info!(environment = %cfg.environment, "starting batch notification dispatcher");

    let trace = ApiTrace::new(Path::new(&cfg.log_path), &cfg.api_log_prefix);
    let prefs: Arc<dyn AlertSettingService> = Arc::new(AlertSettingClient::new(
        cfg.api_endpoints.get_alert_setting.clone(),
        cfg.api_endpoints.timeout,
        trace.clone(),
    ));
    let notifier: Arc<dyn NotificationService> = Arc::new(NotificationClient::new(
        cfg.api_endpoints.send_notification.clone(),
        cfg.api_endpoints.timeout,
        trace,
    ));
    let transport: Arc<dyn Transport> = Arc::new(FtpTransport);

    let scheduler = build_scheduler(&cfg, transport, prefs, notifier)?;
    let handle = scheduler.start();

    serve_http().await?;

    shutdown_signal().await;
    info!("shutting down");
    handle.stop().await;
    info!("stopped");
    Ok(())
}

/// Register the four daily jobs: a send batch and a result hook per kind.
fn build_scheduler(
    cfg: &Config,
    transport: Arc<dyn Transport>,
    prefs: Arc<dyn AlertSettingService>,
    notifier: Arc<dyn NotificationService>,
) -> Result<Scheduler> {
    let mut scheduler = Scheduler::new();

    {
        let batch_cfg = Arc::new(cfg.spending_alert.clone());
        let transport = transport.clone();
        let notifier = notifier.clone();
        scheduler.daily(
            "spending-alert send",
            send_time(&cfg.spending_alert)?,
            move || {
                let batch_cfg = batch_cfg.clone();
                let transport = transport.clone();
                let job = SpendingAlertJob::new(prefs.clone());
                let notifier = notifier.clone();
                async move {
                    runner::run_send_batch(&batch_cfg, transport.as_ref(), &job, notifier.as_ref())
                        .await;
                }
            },
        );
    }

    scheduler.daily(
        "spending-alert result",
        result_time(&cfg.spending_alert)?,
        || runner::run_result_batch("spending-alert"),
    );

    {
        let batch_cfg = Arc::new(cfg.e_ncb.clone());
        scheduler.daily("e-ncb send", send_time(&cfg.e_ncb)?, move || {
            let batch_cfg = batch_cfg.clone();
            let transport = transport.clone();
            let notifier = notifier.clone();
            async move {
                runner::run_send_batch(
                    &batch_cfg,
                    transport.as_ref(),
                    &EncbJob::new(),
                    notifier.as_ref(),
                )
                .await;
            }
        });
    }

    scheduler.daily("e-ncb result", result_time(&cfg.e_ncb)?, || {
        runner::run_result_batch("e-ncb")
    });

    Ok(scheduler)
}

fn send_time(batch: &BatchConfig) -> Result<TimeOfDay> {
    batch
        .schedule
        .send_time
        .parse()
        .context("invalid send_time")
}

fn result_time(batch: &BatchConfig) -> Result<TimeOfDay> {
    batch
        .schedule
        .result_time
        .parse()
        .context("invalid result_time")
}

/// Bind the liveness endpoint on `PORT` (default 8080) and serve it in the
/// background.
async fn serve_http() -> Result<()> {
    let port = std::env::var("PORT").unwrap_or_else(|_| "8080".to_string());
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .with_context(|| format!("failed to bind HTTP listener on port {port}"))?;
    info!(port = %port, "http server listening");
    tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, routes::router()).await {
            error!(error = %err, "http server error");
        }
    });
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "failed to install interrupt handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to install terminate handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
