#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = invigil::run().await {
        eprintln!("invigil fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
