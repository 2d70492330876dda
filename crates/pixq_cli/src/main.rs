use std::process;

#[tokio::main]
async fn main() {
    let code = pixq_cli::run().await;
    process::exit(code);
}
