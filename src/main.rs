#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cognito_social::app::run().await
}
