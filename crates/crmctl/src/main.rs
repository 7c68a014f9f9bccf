use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use crm_console::navigation::{header, sidebar};
use crm_console::permissions::can_perform_action;
use crm_console::preferences::{PreferencesStore, Theme};
use crm_console::resources::{FetchState, ResourceKind, ResourceView};
use crm_console::result_ext::ResultExt;
use crm_console::{
    ConsoleClient, ConsoleConfig, GuardDecision, RoleViewSwitch, RouteTable, SessionStore,
};

fn init_tracing() {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}

#[derive(Parser)]
#[command(name = "crmctl")]
#[command(version, about = "CRM Console command line client", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Backend API base URL (overrides config)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Preferences file holding the token and theme (overrides config)
    #[arg(long, global = true)]
    preferences: Option<PathBuf>,

    /// Preview the staff view before running the command (admins only;
    /// not valid with login or theme)
    #[arg(long, global = true)]
    as_staff: bool,
}

impl Cli {
    /// Reject flag combinations that would be silently ignored.
    fn check_flags(&self) -> Result<()> {
        let session_less = matches!(self.command, Commands::Login { .. } | Commands::Theme { .. });
        if self.as_staff && session_less {
            anyhow::bail!("--as-staff cannot be used with login or theme");
        }
        Ok(())
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and store the session token
    Login {
        #[arg(long)]
        email: String,
        /// Password (falls back to CRM_PASSWORD)
        #[arg(long, env = "CRM_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Sign out and forget the stored token
    Logout,
    /// Show the signed-in user and header info
    Whoami,
    /// Evaluate the route guard for a path
    Check {
        #[arg(value_name = "PATH")]
        path: String,
    },
    /// Show the sidebar for the current user
    Nav,
    /// List a resource (leads, campaigns, calls, integrations, roles)
    List { resource: ResourceKind },
    /// Show one record
    Get { resource: ResourceKind, id: i64 },
    /// Create a record from a JSON payload
    Create {
        resource: ResourceKind,
        #[arg(long, value_name = "JSON")]
        data: String,
    },
    /// Delete a record
    Delete { resource: ResourceKind, id: i64 },
    /// Update a record's status
    Status {
        resource: ResourceKind,
        id: i64,
        status: String,
    },
    /// Show the AI lead tier distribution
    Insights,
    /// Show or set the theme preference
    Theme { theme: Option<Theme> },
}

struct App {
    client: ConsoleClient,
    session: SessionStore,
    routes: RouteTable,
}

impl App {
    fn token(&self) -> Result<String> {
        self.session
            .token()
            .filter(|_| self.session.is_authenticated())
            .context("Not signed in. Run 'crmctl login' first.")
    }

    /// Local permission check before a mutating call.
    fn authorize(&self, action: &str, resource: ResourceKind) -> Result<()> {
        let user = self.session.user();
        if !can_perform_action(user.as_ref(), action, resource.key()) {
            anyhow::bail!("Permission denied: {}.{}", resource.key(), action);
        }
        Ok(())
    }

    /// Route an API error through the session so a 401 signs out.
    fn api<T>(&self, result: crm_console::Result<T>) -> Result<T> {
        result.map_err(|e| {
            self.session.handle_auth_error(&e);
            anyhow::Error::new(e)
        })
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    cli.check_flags()?;

    let mut config = ConsoleConfig::load().log("load configuration")?;
    if let Some(url) = cli.api_url {
        config.api.base_url = url;
    }
    if let Some(path) = cli.preferences {
        config.storage.preferences_path = Some(path);
    }

    let prefs = PreferencesStore::open(config.storage.preferences_path.as_deref())?;
    tracing::debug!("Preferences: {}", prefs.path().display());

    if let Commands::Theme { theme } = cli.command {
        match theme {
            Some(theme) => prefs.set_theme(theme)?,
            None => {
                let theme = serde_json::to_value(prefs.theme()?)?;
                println!("{}", theme.as_str().unwrap_or_default());
            }
        }
        return Ok(());
    }

    let app = App {
        client: ConsoleClient::from_config(&config.api),
        session: SessionStore::new(Arc::new(prefs)),
        routes: RouteTable::from_config(&config.navigation),
    };

    if let Commands::Login { email, password } = &cli.command {
        let user = app
            .session
            .login(&app.client, email, password)
            .await
            .context("Login failed")?;
        println!("Signed in as {} ({})", user.email, header(&user).role_label);
        return Ok(());
    }

    app.session.validate_on_startup(&app.client).await;

    if cli.as_staff {
        RoleViewSwitch::new(&app.session)
            .enter_staff_view()
            .context("Cannot preview the staff view")?;
    }

    match cli.command {
        Commands::Login { .. } | Commands::Theme { .. } => {}
        Commands::Logout => {
            app.session.logout(&app.client).await;
            println!("Signed out");
        }
        Commands::Whoami => {
            let user = app.session.user().context("Not signed in")?;
            print_json(&serde_json::json!({
                "header": header(&user),
                "user": user,
            }))?;
        }
        Commands::Check { path } => {
            let decision = app.routes.navigate(&path, &app.session.snapshot());
            print_json(&decision)?;
            if let GuardDecision::Redirect(_) = decision {
                std::process::exit(2);
            }
        }
        Commands::Nav => {
            let user = app.session.user();
            print_json(&sidebar(user.as_ref()))?;
        }
        Commands::List { resource } => {
            let token = app.token()?;
            let mut view = ResourceView::new(resource);
            if let Some(err) = view.load(&app.client, &token).await {
                app.session.handle_auth_error(&err);
                return Err(err).context("Session expired, sign in again");
            }
            match view.state() {
                FetchState::Loaded(items) => print_json(items)?,
                FetchState::Failed(msg) => anyhow::bail!("Could not load {}: {}", resource, msg),
                _ => {}
            }
        }
        Commands::Get { resource, id } => {
            let token = app.token()?;
            let record = app.api(app.client.get(&token, resource, id).await)?;
            print_json(&record)?;
        }
        Commands::Create { resource, data } => {
            let token = app.token()?;
            app.authorize("create", resource)?;
            let payload: serde_json::Value =
                serde_json::from_str(&data).context("--data is not valid JSON")?;
            let record = app.api(app.client.create(&token, resource, &payload).await)?;
            print_json(&record)?;
        }
        Commands::Delete { resource, id } => {
            let token = app.token()?;
            app.authorize("delete", resource)?;
            app.api(app.client.delete(&token, resource, id).await)?;
            println!("Deleted {} {}", resource.singular(), id);
        }
        Commands::Status {
            resource,
            id,
            status,
        } => {
            let token = app.token()?;
            app.authorize("edit", resource)?;
            let record = app.api(
                app.client
                    .update_status(&token, resource, id, &status)
                    .await,
            )?;
            print_json(&record)?;
        }
        Commands::Insights => {
            let token = app.token()?;
            let dist = app.api(app.client.lead_distribution(&token).await)?;
            for (label, count) in dist.distribution.rows() {
                println!("{:<8} {:>6}", label, count);
            }
            println!("{:<8} {:>6}", "Total", dist.distribution.total());
            match dist.average_score {
                Some(score) => println!("Average score: {:.1}", score),
                None => println!("Average score: n/a"),
            }
            if let Some(updated) = dist.updated_at_utc() {
                println!("Updated: {}", updated.format("%Y-%m-%d %H:%M UTC"));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_staff_rejected_for_login_and_theme() {
        let cli = Cli::try_parse_from(["crmctl", "--as-staff", "theme", "dark"]).unwrap();
        assert!(cli.check_flags().is_err());

        let cli = Cli::try_parse_from([
            "crmctl", "login", "--email", "a@b.c", "--password", "x", "--as-staff",
        ])
        .unwrap();
        assert!(cli.check_flags().is_err());

        let cli = Cli::try_parse_from(["crmctl", "--as-staff", "nav"]).unwrap();
        assert!(cli.check_flags().is_ok());

        let cli = Cli::try_parse_from(["crmctl", "list", "leads"]).unwrap();
        assert!(cli.check_flags().is_ok());
    }
}
