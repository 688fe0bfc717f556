// sqlgate - plain english questions, read-only sql answers

use sqlgate::cli;

#[tokio::main]
async fn main() -> miette::Result<std::process::ExitCode> {
    cli::run().await
}
