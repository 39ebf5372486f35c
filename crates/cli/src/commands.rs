//! CLI commands

use anyhow::{Result, bail};
use canteen_core::ClientConfig;
use canteen_http::client::orders::OrderFilter;
use canteen_http::notifications::{ConnectionState, NotificationClient};
use canteen_http::types::{ListParams, LoginRequest, Notification, OrderStatus, RegisterRequest};
use canteen_http::CanteenClient;
use clap::{Subcommand, ValueEnum};
use std::collections::HashSet;
use tracing::{debug, info};

use crate::config;

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in and store the session
    Login {
        #[arg(long)]
        email: String,

        #[arg(long, env = "CANTEEN_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Create an account and store the session
    Register {
        #[arg(long)]
        name: String,

        #[arg(long)]
        surname: String,

        #[arg(long)]
        patronymic: Option<String>,

        #[arg(long)]
        email: String,

        #[arg(long, env = "CANTEEN_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Sign out and forget the stored session
    Logout,

    /// Show the signed-in account
    Whoami,

    /// Notification commands
    Notifications {
        #[command(subcommand)]
        command: NotificationCommands,
    },

    /// List dishes
    Dishes {
        /// Filter by name
        #[arg(long)]
        search: Option<String>,

        #[arg(long)]
        page: Option<u32>,

        #[arg(long)]
        limit: Option<u32>,
    },

    /// List menus
    Menus,

    /// List orders
    Orders {
        #[arg(long)]
        status: Option<StatusArg>,

        #[arg(long)]
        page: Option<u32>,
    },

    /// Show the current subscription
    Subscription,
}

#[derive(Subcommand)]
pub enum NotificationCommands {
    /// Print current notifications
    List,

    /// Print notifications as they arrive until interrupted
    Watch,

    /// Mark one notification as read
    Read { id: i64 },

    /// Mark every notification as read
    ReadAll,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum StatusArg {
    Paid,
    Served,
    Cancelled,
}

impl From<StatusArg> for OrderStatus {
    fn from(status: StatusArg) -> Self {
        match status {
            StatusArg::Paid => Self::Paid,
            StatusArg::Served => Self::Served,
            StatusArg::Cancelled => Self::Cancelled,
        }
    }
}

impl Commands {
    pub const fn is_long_running(&self) -> bool {
        matches!(
            self,
            Self::Notifications {
                command: NotificationCommands::Watch
            }
        )
    }

    pub async fn execute(self, config: ClientConfig) -> Result<()> {
        let client = CanteenClient::from_config(&config, config::token_store(&config))?;
        debug!(base_url = client.base_url(), "Client ready");

        match self {
            Self::Login { email, password } => {
                client.login(&LoginRequest { email, password }).await?;
                println!("Signed in.");
                Ok(())
            }
            Self::Register {
                name,
                surname,
                patronymic,
                email,
                password,
            } => {
                let details = RegisterRequest {
                    name,
                    surname,
                    patronymic,
                    email,
                    password,
                };
                client.register(&details).await?;
                println!("Account created and signed in.");
                Ok(())
            }
            Self::Logout => {
                client.logout().await;
                println!("Signed out.");
                Ok(())
            }
            Self::Whoami => whoami(&client).await,
            Self::Notifications { command } => command.execute(client, &config).await,
            Self::Dishes {
                search,
                page,
                limit,
            } => {
                let params = ListParams {
                    page,
                    limit,
                    search,
                };
                let dishes = client.list_dishes(&params).await?;
                for dish in &dishes.items {
                    println!("#{:<5} {:<40} {:>8.2}", dish.id, dish.name, dish.price);
                }
                println!("page {}/{} ({} total)", dishes.page, dishes.pages, dishes.total);
                Ok(())
            }
            Self::Menus => {
                for menu in client.list_menus().await? {
                    println!("#{:<5} {}", menu.id, menu.name);
                }
                Ok(())
            }
            Self::Orders { status, page } => {
                require_session(&client)?;
                let params = ListParams {
                    page,
                    ..ListParams::default()
                };
                let filter = OrderFilter {
                    status: status.map(OrderStatus::from),
                    ..OrderFilter::default()
                };
                let orders = client.list_orders(&params, &filter).await?;
                for order in &orders.items {
                    println!(
                        "#{:<5} {:<10} ordered {}",
                        order.id,
                        order.status.as_str(),
                        order.ordered_at
                    );
                }
                println!("page {}/{} ({} total)", orders.page, orders.pages, orders.total);
                Ok(())
            }
            Self::Subscription => {
                require_session(&client)?;
                let subscription = client.my_subscription().await?;
                let state = if subscription.is_active {
                    "active"
                } else {
                    "inactive"
                };
                println!(
                    "{state}: {} of {} days remaining (started {})",
                    subscription.days_remaining,
                    subscription.subscription_days,
                    subscription.subscription_start
                );
                Ok(())
            }
        }
    }
}

impl NotificationCommands {
    pub async fn execute(self, client: CanteenClient, config: &ClientConfig) -> Result<()> {
        require_session(&client)?;

        match self {
            Self::List => {
                let unread = client.unread_notification_count().await?;
                let notifications = client.list_notifications().await?;
                for notification in &notifications {
                    print_notification(notification);
                }
                println!("{unread} unread");
                Ok(())
            }
            Self::Read { id } => {
                client.mark_notification_read(id).await?;
                println!("Notification {id} marked as read.");
                Ok(())
            }
            Self::ReadAll => {
                client.mark_all_notifications_read().await?;
                println!("All notifications marked as read.");
                Ok(())
            }
            Self::Watch => watch(client, config).await,
        }
    }
}

fn require_session(client: &CanteenClient) -> Result<()> {
    if !client.session().is_authenticated() {
        bail!("not signed in, run `canteen login` first");
    }
    Ok(())
}

async fn whoami(client: &CanteenClient) -> Result<()> {
    require_session(client)?;
    let user = client.current_user().await?;

    let mut name = format!("{} {}", user.name, user.surname);
    if let Some(patronymic) = &user.patronymic {
        name.push(' ');
        name.push_str(patronymic);
    }
    println!("{name} (#{}, {:?})", user.id, user.role);
    if let Some(email) = &user.email {
        println!("email: {email}");
    }
    if user.is_banned == Some(true) {
        println!("account is banned");
    }
    if !user.allergies.is_empty() {
        let allergies: Vec<&str> = user.allergies.iter().map(|a| a.name.as_str()).collect();
        println!("allergies: {}", allergies.join(", "));
    }
    Ok(())
}

fn print_notification(notification: &Notification) {
    let marker = if notification.read { ' ' } else { '*' };
    println!(
        "{marker} #{:<5} {} {}: {}",
        notification.id,
        notification.created_at.format("%Y-%m-%d %H:%M"),
        notification.title,
        notification.body
    );
}

async fn watch(client: CanteenClient, config: &ClientConfig) -> Result<()> {
    let notifications = NotificationClient::from_config(client.clone(), config)?;
    notifications.start(client.session().is_authenticated()).await;

    let mut feed = notifications.subscribe();
    let mut state = notifications.watch_connection();

    let current = feed.borrow_and_update().clone();
    let mut seen: HashSet<i64> = current.iter().map(|n| n.id).collect();
    for notification in current.iter().rev() {
        print_notification(notification);
    }
    println!("{} unread, watching for new notifications", current.unread_count());

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
            changed = feed.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = feed.borrow_and_update().clone();
                let fresh: Vec<&Notification> = current.iter().filter(|n| seen.insert(n.id)).collect();
                for notification in fresh.into_iter().rev() {
                    print_notification(notification);
                }
            }
            changed = state.changed() => {
                if changed.is_err() {
                    break;
                }
                let connection = *state.borrow_and_update();
                debug!(?connection, "Connection state changed");
                if connection == ConnectionState::Disconnected {
                    println!("Notification channel closed.");
                    break;
                }
            }
        }
    }

    notifications.stop().await;
    Ok(())
}
