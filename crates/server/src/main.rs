#[tokio::main]
async fn main() -> anyhow::Result<()> {
    flightscan_server::start().await
}
