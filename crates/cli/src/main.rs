use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    bookline_cli::run().await
}
