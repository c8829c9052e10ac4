mod adapters;
mod cli;
mod core;
mod error;
mod logging;

use clap::Parser;

use crate::{
    cli::Args,
    error::{AppError, AppResult},
};

fn main() -> AppResult<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();
    logging::init(&args.log_level);

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| AppError::Internal(e.to_string()))?;
    rt.block_on(adapters::http::run(args))
}
