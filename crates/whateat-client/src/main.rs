//! `whateat`: smoke harness for the client core against a live backend.

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing::info;
use whateat_client::{init_tracing, AuthState, ClientConfig, WhatEatClient};
use whateat_shared::MealType;

#[derive(Parser, Debug)]
#[command(name = "whateat")]
#[command(about = "Inspect the whatEat session, suggestions and saved recipes")]
struct Cli {
    /// API root, e.g. `http://localhost:3000/api/v1` (overrides WHATEAT_API_BASE_URL)
    #[arg(long)]
    api_base_url: Option<String>,

    /// Directory holding the secret database (overrides WHATEAT_DATA_DIR)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Command {
    /// Show the restored session
    Status,
    /// List today's suggestions by meal
    Suggestions,
    /// List saved recipes up to the given page
    Saved {
        #[arg(default_value_t = 1)]
        page: u32,
    },
    /// End the session locally and on the backend
    SignOut,
}

impl Cli {
    fn config(&self) -> ClientConfig {
        let mut config = ClientConfig::from_env();
        if let Some(url) = &self.api_base_url {
            config.api_base_url = url.clone();
        }
        if let Some(dir) = &self.data_dir {
            config.data_dir = Some(dir.clone());
        }
        config
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = cli.config();
    info!(base_url = %config.api_base_url, "Starting whatEat client");
    let client = WhatEatClient::open(config).context("failed to open client")?;

    let state = client.auth.check_existing_credentials().await;

    match cli.command.unwrap_or(Command::Status) {
        Command::Status => {
            let snapshot = client.auth.snapshot();
            println!("state: {:?}", snapshot.state);
            if let Some(name) = snapshot.user_display_name {
                println!("name:  {}", name);
            }
            if let Some(email) = snapshot.user_email {
                println!("email: {}", email);
            }
        }
        Command::Suggestions => {
            require_session(state)?;
            client.home.load_daily_suggestions_if_needed().await?;
            let home = client.home.snapshot();
            for meal in MealType::ALL {
                let bucket = home.suggestions(meal);
                if bucket.is_empty() {
                    continue;
                }
                println!("{}", meal.display_name());
                for suggestion in bucket {
                    println!(
                        "  {:<40} {}",
                        suggestion.recipe.name, suggestion.recipe.prep_time
                    );
                }
            }
        }
        Command::Saved { page } => {
            require_session(state)?;
            let limit = client.config.page_limit;
            client.saved.load_saved_recipes(1, limit, true).await?;
            while client.saved.snapshot().current_page < page && client.saved.can_load_more() {
                client.saved.load_more_saved_recipes().await?;
            }
            let saved = client.saved.snapshot();
            for item in &saved.saved_recipes {
                println!("{:<38} {}", item.id, item.recipe.name);
            }
            println!(
                "{} recipes, page {}{}",
                saved.saved_recipes.len(),
                saved.current_page,
                if saved.can_load_more() { ", more available" } else { "" }
            );
        }
        Command::SignOut => {
            client.auth.sign_out().await?;
            println!("signed out");
        }
    }

    Ok(())
}

fn require_session(state: AuthState) -> anyhow::Result<()> {
    if state != AuthState::Authenticated {
        bail!("not signed in");
    }
    Ok(())
}
