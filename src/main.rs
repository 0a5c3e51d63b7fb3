use anyhow::Context;

use waitlist::configuration::get_configuration;
use waitlist::startup::Application;
use waitlist::telemetry::{get_subscriber, initialize_subscriber};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = get_subscriber("waitlist".into(), "info".into(), std::io::stdout);
    initialize_subscriber(subscriber)?;

    let configuration = get_configuration().context("Failed to read configuration")?;

    let application = match Application::build(configuration).await {
        Ok(application) => application,
        Err(error) => {
            tracing::error!(error.cause_chain = ?error, "Failed to start the waitlist server");
            return Err(error.into());
        }
    };
    tracing::info!(port = application.port(), "Server running");

    application
        .run_until_stopped()
        .await
        .context("Server terminated unexpectedly")
}
