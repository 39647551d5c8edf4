#[tokio::main]
async fn main() -> anyhow::Result<()> {
    feedbackatm::bootstrapper::run().await
}
