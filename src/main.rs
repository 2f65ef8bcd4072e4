use terraform_provider_sendgrid::{init_logging, serve, ProviderError, SendGridProvider};

#[tokio::main]
async fn main() -> Result<(), ProviderError> {
    init_logging();
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting SendGrid provider");
    serve(SendGridProvider::new()).await
}
