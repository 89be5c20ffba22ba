//! The `qdepth` exporter binary
use std::net::{Ipv4Addr, SocketAddr};

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::*;
use tracing_subscriber::EnvFilter;

use qdepth::{
    bridge,
    config::{Cli, Command, ServeArgs, TargetArgs},
    server, CommandRunner, Error, Metrics, PodExecutor, Poller,
};
use qdepth_core::{command, OverrideStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    // in-cluster service account first, then kubeconfig
    let client = kube::Client::try_default().await.map_err(Error::Kube)?;
    let executor = PodExecutor::new(client);

    match cli.command {
        None => serve(executor, &cli.target, ServeArgs::from_env()).await,
        Some(Command::Serve(args)) => serve(executor, &cli.target, args).await,
        Some(Command::Put { local, remote }) => {
            let file = tokio::fs::File::open(&local)
                .await
                .with_context(|| format!("failed to open {}", local.display()))?;
            let target = cli.target.target(command::put_file(&remote));
            let done = bridge::upload(&executor, &target, file).await?;
            if !done.output.stderr.is_empty() {
                warn!(stderr = %String::from_utf8_lossy(&done.output.stderr), "remote stderr");
            }
            // exec streams end with stdin, so the remote exit status is never seen here
            info!(
                bytes = done.bytes,
                %remote,
                "sent {} (remote exit status unknown for uploads)",
                local.display()
            );
            Ok(())
        }
        Some(Command::Get { remote, local }) => {
            let mut file = tokio::fs::File::create(&local)
                .await
                .with_context(|| format!("failed to create {}", local.display()))?;
            let target = cli.target.target(command::cat_file(&remote));
            let done = bridge::download(&executor, &target, &mut file).await?;
            if !done.output.stderr.is_empty() {
                warn!(stderr = %String::from_utf8_lossy(&done.output.stderr), "remote stderr");
            }
            info!(bytes = done.bytes, %remote, "downloaded to {}", local.display());
            Ok(())
        }
    }
}

async fn serve(executor: PodExecutor, target: &TargetArgs, args: ServeArgs) -> anyhow::Result<()> {
    info!(mq = ?target, options = ?args, "starting exporter");
    let metrics = Metrics::new()?;
    let overrides = OverrideStore::new();
    let runner = CommandRunner::new(executor, &args.query(target), args.exec_timeout());
    let poller = Poller::new(runner, metrics.queue_depth.clone(), overrides.clone(), args.interval());

    let shutdown = CancellationToken::new();
    let polling = tokio::spawn(poller.run(shutdown.clone()));
    tokio::spawn(cancel_on_signal(shutdown.clone()));

    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, args.port));
    let served = server::serve(addr, server::router(metrics, overrides), shutdown.clone()).await;
    shutdown.cancel();
    polling.await.context("poller task failed")?;
    served?;
    Ok(())
}

// local development sends ctrl_c, kubernetes sends SIGTERM
async fn cancel_on_signal(shutdown: CancellationToken) {
    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "unable to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let interrupt = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => warn!("Intercepted ctrl_c signal"),
            Err(err) => {
                warn!(error = %err, "unable to listen for ctrl_c");
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = interrupt => {},
        _ = terminate => warn!("Intercepted SIGTERM"),
    }
    shutdown.cancel();
}
