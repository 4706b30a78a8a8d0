use typeinstance_backends::cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if it exists (optional - won't fail if missing)
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Warning: Error loading .env file: {}", e);
        }
    }

    cli::run_cli().await
}
