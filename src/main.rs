use clap::Parser;

#[tokio::main]
async fn main() {
    debtplan::logging::init_logging();

    let cli = debtplan::api::Cli::parse();
    if let Err(e) = debtplan::api::run(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
