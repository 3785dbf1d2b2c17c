use std::sync::Arc;

use clap::Parser;
use dotenvy::dotenv;
use tracing::info;

use common::logger;
use executor::config::ServerArgs;
use executor::shutdown::shutdown_signal;
use gateway::{ApiServer, AppState, ClientThrottle, IngestionGateway};
use storage::DataManager;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    logger::setup_logger();
    let args = ServerArgs::parse();

    let data =
        DataManager::connect(&args.storage.pool_settings(), args.storage.op_timeout()).await?;

    let state = Arc::new(AppState::new(
        IngestionGateway::new(data.clone()),
        ClientThrottle::new(args.throttle_interval()),
    ));
    let server = ApiServer::new(state, args.request_timeout());

    server.serve(&args.listen_addr(), shutdown_signal()).await?;

    data.close().await;
    info!("Server exited properly");
    Ok(())
}
