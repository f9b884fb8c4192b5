//! `injagent` binary entry point.

#[tokio::main]
async fn main() {
    if let Err(err) = injagent::cli::run().await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
