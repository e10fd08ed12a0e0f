//! JOYNER client core entry point.
//!
//! Loads every store once and logs a summary, or follows one negotiation:
//!
//! ```text
//! joyner                         # load stores, print summary
//! joyner --negotiate <session>   # stream a negotiation transcript
//! ```

use clap::Parser;
use joyner::debug;
use joyner::AppContext;
use std::process::ExitCode;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "joyner")]
#[command(about = "JOYNER client core: load stores or follow a negotiation", long_about = None)]
struct Cli {
    /// Stream the negotiation of this A2A session instead of loading stores
    #[arg(long, value_name = "SESSION_ID")]
    negotiate: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    debug::init();

    let cli = Cli::parse();

    let context = match AppContext::bootstrap().await {
        Ok(context) => context,
        Err(e) => {
            error!(error = %e, "Failed to start");
            eprintln!("Failed to start: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match cli.negotiate {
        None => {
            summary(&context).await;
            ExitCode::SUCCESS
        }
        Some(session_id) => {
            let result = context
                .follow_negotiation(&session_id, |message, _| {
                    let turn = message.turn();
                    println!(
                        "{:<10} {}",
                        message.kind(),
                        turn.message.as_deref().unwrap_or_default()
                    );
                })
                .await;
            match result {
                Ok(log) => {
                    println!("status: {:?}", log.status());
                    if let Some(slot) = log.latest_proposal() {
                        println!("proposal: {} - {}", slot.start, slot.end);
                    }
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    eprintln!("Negotiation failed: {}", e);
                    ExitCode::FAILURE
                }
            }
        }
    }
}

async fn summary(context: &AppContext) {
    if context.session.token().await.is_none() {
        println!("Not logged in. Complete the OAuth flow in the app first.");
        return;
    }

    context.stores.fetch_all(false).await;

    let home = context.stores.home.get_snapshot();
    let friends = context.stores.friends.get_snapshot();
    let a2a = context.stores.a2a.get_snapshot();
    let badge = context.stores.badge.get_snapshot();

    let name = home.user.as_ref().map(|u| u.display_name()).unwrap_or("unknown user");
    println!("{}", name);
    println!(
        "calendar: {}",
        if home.calendar.linked { "linked" } else { "not linked" }
    );
    println!("events: {}", home.events.len());
    println!(
        "friends: {} ({} pending requests)",
        friends.friends.len(),
        friends.friend_requests.len()
    );
    println!(
        "negotiations: {} open, {} awaiting you",
        a2a.open_sessions().count(),
        a2a.pending_requests.len()
    );
    println!("unread: {}", badge.unread_count);

    info!(
        friends = friends.friends.len(),
        sessions = a2a.sessions.len(),
        unread = badge.unread_count,
        "Summary loaded"
    );
}
