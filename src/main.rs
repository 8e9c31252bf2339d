use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};
use warp::Filter;

use recipe_api::{
    actions::users::create_superuser,
    config::{Cli, Command},
    routes,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let state = cli.config.state().await?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            let app = routes(state).with(warp::log("recipe_api"));

            let (address, server) = warp::serve(app)
                .try_bind_with_graceful_shutdown(cli.config.bind_address, async {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        log::error!("Failed to listen for shutdown signal: {e}");
                    }
                })?;

            log::info!("Listening on {address}");
            server.await;
            log::info!("Server shut down");
        }
        Command::CreateSuperuser {
            email,
            password,
            name,
        } => {
            let user = create_superuser(&email, &password, &name, state.store.as_ref()).await?;
            log::info!("Superuser {} created", user.email);
        }
    }

    Ok(())
}
