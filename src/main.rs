#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = assessments_rust::run().await {
        eprintln!("assessments-rust fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
