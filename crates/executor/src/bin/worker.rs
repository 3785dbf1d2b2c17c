use clap::Parser;
use dotenvy::dotenv;
use tracing::{info, warn};

use aggregator::AggregationService;
use common::actors::ActorType;
use common::logger;
use executor::actors::Supervisor;
use executor::config::WorkerArgs;
use executor::shutdown::shutdown_signal;
use storage::DataManager;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    logger::setup_logger();
    let args = WorkerArgs::parse();

    let data =
        DataManager::connect(&args.storage.pool_settings(), args.storage.op_timeout()).await?;
    match data.backlog().await {
        Ok(pending) => info!("{} trades waiting in the queue", pending),
        Err(e) => warn!("Could not read queue backlog: {}", e),
    }

    let mut supervisor = Supervisor::new(args.supervisor_settings());

    let data_for_worker = data.clone();
    let worker_settings = args.worker_settings();
    supervisor.register_actor(
        ActorType::Aggregator,
        Box::new(move || {
            Box::new(AggregationService::new(
                data_for_worker.clone(),
                worker_settings,
            ))
        }),
    );

    let shutdown = supervisor.shutdown_token();
    tokio::spawn(async move {
        shutdown_signal().await;
        shutdown.cancel();
    });

    supervisor.start().await;

    data.close().await;
    info!("Worker exited properly");
    Ok(())
}
