//! Console host: plays checkers in a terminal through the same registry a chat
//! plugin would use.
//!
//! Each input line is `<user>[^<reply_to>] <text>`. Text starting with `!` is a
//! button payload (`2 !accept`, `1 !cell:5:0`); `state` prints the board as
//! JSON; anything else is a chat command (`1 .checkers 2`).

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use checkers::logging::init_tracing;
use checkers::{
    Action, ChatId, CommandContext, GameConfig, GameRegistry, HostError, IdentityResolver,
    JsonSettingsStore, MessageRef, MessagingSurface, Participant, UserId, UserRef, View,
};

/// Play checkers in the terminal
#[derive(Parser, Debug)]
#[command(name = "checkers-console")]
#[command(about = "Terminal host for the checkers engine", long_about = None)]
struct Args {
    /// JSON file holding the persisted defaults
    #[arg(long, env = "CHECKERS_SETTINGS", default_value = "checkers.json")]
    settings: PathBuf,

    /// Chat id every line is sent to
    #[arg(long, default_value_t = 1)]
    chat: ChatId,

    /// Clock tick in milliseconds
    #[arg(long, env = "CHECKERS_TICK_MS", default_value_t = 100)]
    tick_ms: u64,

    /// Known user as ID:NAME (repeatable)
    #[arg(long = "player", value_parser = parse_player)]
    players: Vec<Participant>,

    /// Start new invitations with this clock, in minutes
    #[arg(long)]
    clock_minutes: Option<u64>,
}

fn parse_player(raw: &str) -> Result<Participant, String> {
    let (id, name) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected ID:NAME, got {raw:?}"))?;
    let id = id
        .trim()
        .parse::<UserId>()
        .map_err(|e| format!("bad user id {id:?}: {e}"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("empty name for user {id}"));
    }
    Ok(Participant::new(id, name))
}

/// Prints every post and edit to stdout.
#[derive(Default)]
struct ConsoleSurface {
    next_id: AtomicU64,
}

impl ConsoleSurface {
    fn print(&self, message: &MessageRef, view: &View) {
        println!("--- [chat {} / message {}] ---", message.chat, message.message_id);
        println!("{}", view.text);
        for row in &view.buttons {
            let labels: Vec<&str> = row.iter().map(|b| b.label.as_str()).collect();
            println!("{}", labels.join(" "));
        }
    }
}

#[async_trait]
impl MessagingSurface for ConsoleSurface {
    async fn post(&self, chat: ChatId, view: &View) -> Result<MessageRef, HostError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let message = MessageRef {
            chat,
            message_id: id.to_string(),
        };
        self.print(&message, view);
        Ok(message)
    }

    async fn edit(&self, message: &MessageRef, view: &View) -> Result<(), HostError> {
        self.print(message, view);
        Ok(())
    }
}

/// Resolves users from the `--player` list.
struct ConsoleIdentity {
    players: Vec<Participant>,
}

#[async_trait]
impl IdentityResolver for ConsoleIdentity {
    async fn resolve(&self, user: &UserRef) -> Result<Participant, HostError> {
        let found = match user {
            UserRef::Id(id) => self.players.iter().find(|p| p.id == *id),
            UserRef::Handle(handle) => self
                .players
                .iter()
                .find(|p| p.name.eq_ignore_ascii_case(handle)),
        };
        found
            .cloned()
            .ok_or_else(|| HostError::UserNotFound(format!("{user:?}")))
    }
}

/// Splits `<user>[^<reply_to>] <text>`.
fn parse_line(line: &str) -> Result<(UserId, Option<UserId>, &str)> {
    let (who, text) = line
        .split_once(char::is_whitespace)
        .context("expected `<user> <text>`")?;
    let (sender, reply_to) = match who.split_once('^') {
        Some((sender, reply)) => (sender, Some(reply.parse().context("bad reply user id")?)),
        None => (who, None),
    };
    let sender = sender.parse().context("bad user id")?;
    let text = text.trim();
    if text.is_empty() {
        bail!("empty text");
    }
    Ok((sender, reply_to, text))
}

fn minutes(m: u64) -> std::time::Duration {
    std::time::Duration::from_secs(m.saturating_mul(60))
}

async fn dispatch(registry: &GameRegistry, chat: ChatId, line: &str) -> Result<()> {
    let (sender, reply_to, text) = parse_line(line)?;

    if text == "state" {
        match registry.snapshot(chat).await {
            Some(state) => println!("{}", serde_json::to_string_pretty(&state)?),
            None => println!("no board"),
        }
        return Ok(());
    }

    let notice = if let Some(payload) = text.strip_prefix('!') {
        let action: Action = payload.parse()?;
        registry.handle_action(chat, sender, action).await
    } else {
        let ctx = CommandContext {
            chat,
            sender,
            text: text.to_string(),
            reply_to,
        };
        registry.handle_command(&ctx).await
    };
    if let Some(notice) = notice {
        println!("> {notice}");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing("info")?;

    let config = GameConfig::new()
        .with_tick_interval(std::time::Duration::from_millis(args.tick_ms.max(1)))
        .with_default_time_control(args.clock_minutes.map(minutes));
    let registry = GameRegistry::new(
        Arc::new(ConsoleSurface::default()),
        Arc::new(ConsoleIdentity {
            players: args.players.clone(),
        }),
        Arc::new(JsonSettingsStore::new(&args.settings)),
        config,
    );
    info!(chat = args.chat, settings = %args.settings.display(), "console host ready");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if matches!(line, "quit" | "exit") {
            break;
        }
        if let Err(e) = dispatch(&registry, args.chat, line).await {
            eprintln!("error: {e:#}");
        }
    }

    if registry.contains(args.chat).await {
        registry.expire(args.chat).await;
    }
    Ok(())
}
