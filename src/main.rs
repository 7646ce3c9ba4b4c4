mod bootstrap;
mod cli;
mod config;
mod db;
mod drop;
mod estimate;
mod model;
mod parser;
mod planner;
mod sql;
mod state;
mod stats;
mod util;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cli::run().await
}
