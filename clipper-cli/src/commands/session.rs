use std::{path::Path, sync::Arc};

use anyhow::{Context, Result, bail};
use clap::Subcommand;
use client::{
    ClipperClient, Collaborators, CookieSessionStore, SessionManager, SessionState,
    telemetry::{TracingAnalytics, TracingErrorTelemetry},
};
use shared::config::ClientConfig;
use tracing::debug;

#[derive(Subcommand, Debug)]
pub enum SessionCommand {
    /// Show who the stored session belongs to
    Status,
    /// Print the URL that starts the Twitch sign-in flow
    Login {
        /// Opaque value echoed back by the OAuth callback
        #[arg(long)]
        state: Option<String>,
    },
    /// Re-fetch the current user, rotating cookies if needed
    Refresh,
    /// End the session on the backend and remove stored cookies
    Logout {
        /// Page the logout was triggered from, recorded with the analytics event
        #[arg(long)]
        page: Option<String>,
    },
}

/// Run a session subcommand against the configured backend.
///
/// # Errors
/// Returns an error when the cookie file cannot be read or written, or the
/// OAuth flow cannot be started.
pub async fn run(config: &ClientConfig, command: SessionCommand) -> Result<()> {
    let session_path = config.resolved_session_path();
    let store = CookieSessionStore::load(&config.api_base_url, &session_path)
        .context("failed to load stored session")?;

    let oauth_state = match &command {
        SessionCommand::Login { state } => state.clone(),
        _ => None,
    };
    let client = ClipperClient::from_config(config, store.jar())
        .context("failed to build HTTP client")?
        .with_oauth_state(oauth_state);

    let manager = SessionManager::new(
        Collaborators {
            session: Arc::new(client.clone()),
            storage: Arc::new(store.clone()),
            error_telemetry: Arc::new(TracingErrorTelemetry::new()),
            analytics: Arc::new(TracingAnalytics),
        },
        config.test_login.clone(),
    );
    manager.attach(client.unauthorized_hook());

    match command {
        SessionCommand::Status => {
            manager.bootstrap().await;
            print_session(&manager.state(), store.path());
        }
        SessionCommand::Login { .. } => {
            let Some(url) = manager.login().await else {
                bail!("could not start the Twitch sign-in flow");
            };
            println!("Open this URL in a browser to sign in with Twitch:");
            println!("{url}");
        }
        SessionCommand::Refresh => {
            manager.bootstrap().await;
            manager.refresh().await;
            print_session(&manager.state(), store.path());
        }
        SessionCommand::Logout { page } => {
            manager.bootstrap().await;
            manager.logout(page.as_deref()).await;
            println!("Logged out");
        }
    }

    if !manager.detach(client.unauthorized_hook()) {
        debug!("unauthorized handler was already replaced");
    }
    store
        .persist()
        .with_context(|| format!("failed to save session cookies to {}", session_path.display()))?;
    debug!(path = %session_path.display(), "session cookies synced");
    Ok(())
}

fn print_session(state: &SessionState, cookie_path: &Path) {
    match state.current_user() {
        Some(user) => {
            println!("Logged in as {} (@{})", user.display_label(), user.username);
            println!("role: {}", user.role);
            println!("account type: {}", user.account_type);
            if user.is_premium {
                println!(
                    "premium: {}",
                    user.premium_tier.as_deref().unwrap_or("active")
                );
            }
            println!("member since: {}", user.created_at);
            println!("cookies stored at {}", cookie_path.display());
        }
        None => println!("Not logged in"),
    }
}
