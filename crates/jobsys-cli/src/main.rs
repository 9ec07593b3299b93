//! jobsys - run a job client from the command line

mod cli;
mod commands;
mod jobs;
mod logging;
mod settings;
mod workers;

use clap::Parser;

#[tokio::main]
async fn main() {
    // A missing .env file is not an error
    let _ = dotenvy::dotenv();

    let cli = cli::Cli::parse();
    logging::init(cli.log_format());

    match cli.execute().await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("error: {:#}", e);
            std::process::exit(2);
        }
    }
}
