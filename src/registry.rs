//! Matches by chat.
//!
//! The registry turns chat commands and button presses into session calls.
//! Every match sits behind its own async mutex, so events of one match are
//! applied one at a time while other chats proceed independently. After each
//! change the session view is pushed to the messaging surface before the lock
//! is released, and finished matches are released and dropped.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock, watch};
use tracing::{debug, info, warn};

use crate::commands::{Action, Command, Opponent};
use crate::config::GameConfig;
use crate::error::{CommandError, HostError, SessionError};
use crate::host::{
    ChatId, IdentityResolver, MessageRef, MessagingSurface, Participant, SettingsStore, UserId,
    UserRef,
};
use crate::session::{GameSession, Invitee, MatchOptions};
use crate::settings::Settings;
use crate::types::{Color, GameState};

/// A chat command as received from the host.
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub chat: ChatId,
    pub sender: UserId,
    pub text: String,
    /// Sender of the message the command replies to.
    pub reply_to: Option<UserId>,
}

struct MatchState {
    session: GameSession,
    message: Option<MessageRef>,
}

struct Match {
    state: Mutex<MatchState>,
}

struct Inner {
    matches: RwLock<HashMap<ChatId, Arc<Match>>>,
    surface: Arc<dyn MessagingSurface>,
    identity: Arc<dyn IdentityResolver>,
    settings: Arc<dyn SettingsStore>,
    config: GameConfig,
}

/// Cheap to clone; clones share the same matches.
#[derive(Clone)]
pub struct GameRegistry {
    inner: Arc<Inner>,
}

impl GameRegistry {
    pub fn new(
        surface: Arc<dyn MessagingSurface>,
        identity: Arc<dyn IdentityResolver>,
        settings: Arc<dyn SettingsStore>,
        config: GameConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                matches: RwLock::new(HashMap::new()),
                surface,
                identity,
                settings,
                config,
            }),
        }
    }

    pub fn config(&self) -> &GameConfig {
        &self.inner.config
    }

    /// Handles a chat command. Returns a short notice for the sender, if any.
    /// Text that is not one of our commands yields `None`.
    pub async fn handle_command(&self, ctx: &CommandContext) -> Option<String> {
        let command = match Command::parse(&ctx.text, ctx.reply_to) {
            Ok(command) => command,
            Err(CommandError::Empty | CommandError::UnknownCommand(_)) => return None,
            Err(e) => return Some(e.to_string()),
        };
        debug!(chat = ctx.chat, actor = ctx.sender, ?command, "command received");

        let result = match command {
            Command::Challenge(opponent) => self.challenge(ctx, opponent).await,
            Command::Stop => self.stop(ctx.chat, ctx.sender).await,
            Command::Resign => self.resign(ctx.chat, ctx.sender).await,
            Command::Captures(value) => Ok(Some(self.captures(value))),
        };
        result.unwrap_or_else(|e| Some(e.to_string()))
    }

    /// Handles a button press. Returns the notice to show the presser when the
    /// press was refused.
    pub async fn handle_action(
        &self,
        chat: ChatId,
        actor: UserId,
        action: Action,
    ) -> Option<String> {
        let Some(entry) = self.get(chat).await else {
            return Some(SessionError::NoGame.to_string());
        };
        let mut state = entry.state.lock().await;
        debug!(chat, actor, %action, "action received");

        let result = match action {
            Action::Accept | Action::Decline => {
                let participant = self.participant(actor).await;
                state
                    .session
                    .respond(&participant, action == Action::Accept, &mut rand::rng())
            }
            Action::Settings => state.session.open_settings(actor),
            Action::Colors => state.session.open_color_menu(actor),
            Action::SetColor(color) => state.session.set_host_color(actor, color),
            Action::ToggleCaptures => state.session.toggle_mandatory_captures(actor).map(drop),
            Action::CycleClock => state.session.cycle_time_control(actor).map(drop),
            Action::Back => state.session.back(actor),
            Action::Resign => state.session.resign(actor).map(drop),
            Action::Cell(pos) => state.session.click(actor, pos).map(drop),
        };
        if let Err(e) = result {
            debug!(chat, actor, error = %e, "action refused");
            return Some(e.to_string());
        }

        if action == Action::Accept
            && let Some(clock) = state.session.clock()
        {
            self.watch_clock(chat, &entry, clock.expired());
        }
        self.publish(chat, &entry, &mut state).await;
        None
    }

    /// Ends the chat's match because its message went stale.
    pub async fn expire(&self, chat: ChatId) {
        let Some(entry) = self.get(chat).await else {
            return;
        };
        let mut state = entry.state.lock().await;
        state.session.expire();
        self.publish(chat, &entry, &mut state).await;
    }

    /// Board snapshot of the chat's running match.
    pub async fn snapshot(&self, chat: ChatId) -> Option<GameState> {
        let entry = self.get(chat).await?;
        let state = entry.state.lock().await;
        state.session.board().map(|board| board.to_game_state())
    }

    pub async fn contains(&self, chat: ChatId) -> bool {
        self.inner.matches.read().await.contains_key(&chat)
    }

    pub async fn len(&self) -> usize {
        self.inner.matches.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn challenge(
        &self,
        ctx: &CommandContext,
        opponent: Opponent,
    ) -> Result<Option<String>, SessionError> {
        if self.contains(ctx.chat).await {
            return Err(SessionError::AlreadyRunning);
        }

        let host = self.participant(ctx.sender).await;
        let invitee = match opponent {
            Opponent::Anyone => Invitee::Anyone,
            Opponent::User(user) => Invitee::Named(self.resolve_opponent(&user).await?),
        };
        let options = MatchOptions {
            host_color: None,
            mandatory_captures: self.load_settings().mandatory_captures,
            time_control: self.inner.config.default_time_control,
        };
        let session = GameSession::invite(host, invitee, options, self.inner.config.clone())?;
        let view = session.view();

        let entry = Arc::new(Match {
            state: Mutex::new(MatchState {
                session,
                message: None,
            }),
        });
        let mut state = entry.state.lock().await;
        {
            let mut matches = self.inner.matches.write().await;
            if matches.contains_key(&ctx.chat) {
                return Err(SessionError::AlreadyRunning);
            }
            matches.insert(ctx.chat, Arc::clone(&entry));
        }

        match self.inner.surface.post(ctx.chat, &view).await {
            Ok(message) => {
                info!(chat = ctx.chat, host = ctx.sender, "invitation posted");
                state.message = Some(message);
            }
            Err(e) => {
                warn!(chat = ctx.chat, error = %e, "failed to post invitation");
                state.session.expire();
                self.teardown(ctx.chat, &entry, &mut state).await;
            }
        }
        Ok(None)
    }

    async fn stop(&self, chat: ChatId, actor: UserId) -> Result<Option<String>, SessionError> {
        let entry = self.get(chat).await.ok_or(SessionError::NoGame)?;
        let mut state = entry.state.lock().await;
        state.session.abort(actor)?;
        self.publish(chat, &entry, &mut state).await;
        Ok(Some("The game was stopped".to_string()))
    }

    async fn resign(&self, chat: ChatId, actor: UserId) -> Result<Option<String>, SessionError> {
        let entry = self.get(chat).await.ok_or(SessionError::NoGame)?;
        let mut state = entry.state.lock().await;
        state.session.resign(actor)?;
        self.publish(chat, &entry, &mut state).await;
        Ok(None)
    }

    /// Shows or stores the default capture rule for new matches.
    fn captures(&self, value: Option<bool>) -> String {
        let Some(mandatory) = value else {
            let current = self.load_settings().mandatory_captures;
            return format!(
                "Mandatory captures are {} by default",
                if current { "on" } else { "off" }
            );
        };

        let settings = Settings {
            mandatory_captures: mandatory,
        };
        match self.inner.settings.save(&settings) {
            Ok(()) => {
                info!(mandatory, "default capture rule changed");
                format!(
                    "Mandatory captures are now {} by default",
                    if mandatory { "on" } else { "off" }
                )
            }
            Err(e) => {
                warn!(error = %e, "failed to save settings");
                "Could not save the settings".to_string()
            }
        }
    }

    async fn on_timeout(&self, chat: ChatId, entry: &Arc<Match>, loser: Color) {
        let mut state = entry.state.lock().await;
        if state.session.timeout(loser).is_err() {
            return;
        }
        info!(chat, %loser, "clock ran out");
        self.publish(chat, entry, &mut state).await;
    }

    /// Waits for the match clock to run out, then finishes the match. The
    /// task ends on its own once the clock is dropped.
    fn watch_clock(
        &self,
        chat: ChatId,
        entry: &Arc<Match>,
        mut expired: watch::Receiver<Option<Color>>,
    ) {
        let registry = self.clone();
        let entry = Arc::clone(entry);
        tokio::spawn(async move {
            let loser = loop {
                let current = *expired.borrow_and_update();
                if let Some(color) = current {
                    break color;
                }
                if expired.changed().await.is_err() {
                    return;
                }
            };
            registry.on_timeout(chat, &entry, loser).await;
        });
    }

    /// Renders the session and tears the match down when it is over.
    async fn publish(&self, chat: ChatId, entry: &Arc<Match>, state: &mut MatchState) {
        self.render(chat, state).await;
        if state.session.is_finished() {
            self.teardown(chat, entry, state).await;
        }
    }

    async fn render(&self, chat: ChatId, state: &mut MatchState) {
        let Some(message) = &state.message else {
            return;
        };
        match self.inner.surface.edit(message, &state.session.view()).await {
            Ok(()) => {}
            Err(HostError::MessageGone) => {
                warn!(chat, "game message is gone, expiring match");
                state.message = None;
                state.session.expire();
            }
            Err(e) => warn!(chat, error = %e, "failed to update game message"),
        }
    }

    /// Releases the session and drops the entry if it is still the chat's
    /// current match.
    async fn teardown(&self, chat: ChatId, entry: &Arc<Match>, state: &mut MatchState) {
        state.session.release().await;

        let mut matches = self.inner.matches.write().await;
        if matches
            .get(&chat)
            .is_some_and(|current| Arc::ptr_eq(current, entry))
        {
            matches.remove(&chat);
            info!(chat, reason = ?state.session.finish_reason(), "match removed");
        }
    }

    async fn get(&self, chat: ChatId) -> Option<Arc<Match>> {
        self.inner.matches.read().await.get(&chat).cloned()
    }

    fn load_settings(&self) -> Settings {
        self.inner.settings.load().unwrap_or_else(|e| {
            warn!(error = %e, "failed to load settings, using defaults");
            Settings::default()
        })
    }

    /// Resolves a user by id, falling back to the configured name.
    async fn participant(&self, id: UserId) -> Participant {
        match self.inner.identity.resolve(&UserRef::Id(id)).await {
            Ok(participant) => participant,
            Err(e) => {
                warn!(user = id, error = %e, "identity lookup failed");
                Participant::new(id, self.inner.config.fallback_name.clone())
            }
        }
    }

    async fn resolve_opponent(&self, user: &UserRef) -> Result<Participant, SessionError> {
        match user {
            UserRef::Id(id) => Ok(self.participant(*id).await),
            UserRef::Handle(_) => self.inner.identity.resolve(user).await.map_err(|e| {
                debug!(?user, error = %e, "opponent not found");
                SessionError::UnknownOpponent
            }),
        }
    }
}
