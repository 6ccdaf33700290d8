//! CLI commands

use anyhow::{Context, Result, bail};
use clap::{Subcommand, ValueEnum};
use gather_core::{SessionStatus, UserId};
use gather_http::GatherClient;
use gather_http::types::{GatheringQuery, GatheringRole, GatheringSort};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

#[derive(Subcommand)]
pub enum Commands {
    /// Log in with email and password
    Login {
        #[arg(long)]
        email: String,

        #[arg(long, env = "GATHER_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Log out and forget the stored token
    Logout,

    /// Show whether a session is active
    Status,

    /// Reissue the access token now
    Refresh,

    /// Keep the session fresh and print state changes until interrupted
    Watch,

    /// Browse and manage gatherings
    Gatherings {
        #[command(subcommand)]
        command: GatheringCommands,
    },

    /// Show a user profile (yours when no id is given)
    Profile { user_id: Option<UserId> },

    /// List reviews of a user
    Reviews {
        user_id: UserId,

        /// Continue after this cursor
        #[arg(long)]
        cursor: Option<String>,
    },

    /// List gathering categories
    Categories,
}

#[derive(Subcommand)]
pub enum GatheringCommands {
    /// List gatherings
    List {
        #[arg(long, value_enum)]
        sort: Option<SortArg>,

        #[arg(long)]
        category: Option<String>,

        #[arg(long)]
        page: Option<u32>,

        #[arg(long)]
        size: Option<u32>,
    },

    /// Show one gathering
    Show { id: i64 },

    /// Join a gathering
    Join { id: i64 },

    /// Leave a gathering
    Leave { id: i64 },

    /// Delete a gathering you host
    Delete { id: i64 },

    /// Gatherings you host or joined
    Mine {
        #[arg(long, value_enum, default_value = "guest")]
        role: RoleArg,

        #[arg(long, default_value = "1")]
        page: u32,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum SortArg {
    Latest,
    Popular,
}

impl From<SortArg> for GatheringSort {
    fn from(sort: SortArg) -> Self {
        match sort {
            SortArg::Latest => Self::Latest,
            SortArg::Popular => Self::Popular,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum RoleArg {
    Host,
    Guest,
}

impl From<RoleArg> for GatheringRole {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::Host => Self::Host,
            RoleArg::Guest => Self::Guest,
        }
    }
}

impl Commands {
    pub async fn execute(self, client: GatherClient) -> Result<()> {
        restore(&client).await;

        match self {
            Self::Login { email, password } => {
                let user_id = client.login(email, password).await?;
                match user_id {
                    Some(id) => println!("Logged in as user {id}"),
                    None => println!("Logged in"),
                }
                Ok(())
            }
            Self::Logout => {
                client.logout().await;
                println!("Logged out");
                Ok(())
            }
            Self::Status => {
                print_status(&client);
                Ok(())
            }
            Self::Refresh => {
                if client.session().reissue(false).await {
                    println!("Access token reissued");
                    Ok(())
                } else {
                    bail!("token reissue failed")
                }
            }
            Self::Watch => watch(client).await,
            Self::Gatherings { command } => command.execute(&client).await,
            Self::Profile { user_id } => {
                let profile = match user_id {
                    Some(id) => client.profile(id).await?,
                    None => client.my_profile().await?,
                };
                print_json(&profile)
            }
            Self::Reviews { user_id, cursor } => {
                let page = client.reviews(user_id, cursor.as_deref()).await?;
                print_json(&page)
            }
            Self::Categories => {
                for category in client.categories_or_default().await {
                    println!("{category}");
                }
                Ok(())
            }
        }
    }
}

impl GatheringCommands {
    pub async fn execute(self, client: &GatherClient) -> Result<()> {
        match self {
            Self::List {
                sort,
                category,
                page,
                size,
            } => {
                let query = GatheringQuery {
                    page,
                    size,
                    sort: sort.map(Into::into),
                    category,
                };
                print_json(&client.list_gatherings(&query).await?)
            }
            Self::Show { id } => print_json(&client.gathering(id).await?),
            Self::Join { id } => {
                client.join_gathering(id).await?;
                println!("Joined gathering {id}");
                Ok(())
            }
            Self::Leave { id } => {
                client.leave_gathering(id).await?;
                println!("Left gathering {id}");
                Ok(())
            }
            Self::Delete { id } => {
                client.delete_gathering(id).await?;
                println!("Deleted gathering {id}");
                Ok(())
            }
            Self::Mine { role, page } => {
                print_json(&client.my_gatherings(role.into(), page).await?)
            }
        }
    }
}

/// Restore the stored session and wait for its background check
async fn restore(client: &GatherClient) {
    let restoration = client.session().restore().await;
    debug!(status = %restoration.status, "Session restored");

    if let Some(handle) = restoration.background_reissue {
        match handle.await {
            Ok(reissued) => debug!(reissued, "Background token check finished"),
            Err(e) => debug!("Background token check aborted: {}", e),
        }
    }
}

async fn watch(client: GatherClient) -> Result<()> {
    let shutdown = CancellationToken::new();
    let scheduler = client.session().spawn_refresh_scheduler(shutdown.clone());
    let mut rx = client.session().subscribe();

    print_status(&client);
    info!("Watching session, press Ctrl-C to stop");

    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal.context("listening for Ctrl-C")?;
                break;
            }
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = *rx.borrow_and_update();
                println!("Session is now {}", snapshot.status());
            }
        }
    }

    shutdown.cancel();
    scheduler.await.context("refresh scheduler panicked")?;
    Ok(())
}

fn print_status(client: &GatherClient) {
    let session = client.session();
    match (session.status(), session.user_id()) {
        (SessionStatus::Authenticated, Some(id)) => {
            println!("Authenticated as user {id}");
        }
        (status, _) => println!("{status}"),
    }
    if let Some(issued_at) = session.store().issued_at() {
        println!("Token issued at {issued_at}");
        if session.is_near_expiry() {
            println!("Token is near expiry");
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
