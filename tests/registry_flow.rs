use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use checkers::{
    Action, ChatId, Color, CommandContext, GameConfig, GameRegistry, HostError, IdentityResolver,
    MemorySettingsStore, MessageRef, MessagingSurface, Participant, SessionError, Settings,
    SettingsStore, UserId, UserRef, View,
};

const CHAT: ChatId = -100;
const ALICE: UserId = 1;
const BOB: UserId = 2;
const CAROL: UserId = 3;

#[derive(Default)]
struct RecordingSurface {
    views: Mutex<Vec<View>>,
    gone: AtomicBool,
}

impl RecordingSurface {
    fn last(&self) -> View {
        self.views.lock().unwrap().last().cloned().unwrap_or_default()
    }

    fn count(&self) -> usize {
        self.views.lock().unwrap().len()
    }
}

#[async_trait]
impl MessagingSurface for RecordingSurface {
    async fn post(&self, chat: ChatId, view: &View) -> Result<MessageRef, HostError> {
        let mut views = self.views.lock().unwrap();
        views.push(view.clone());
        Ok(MessageRef {
            chat,
            message_id: views.len().to_string(),
        })
    }

    async fn edit(&self, _message: &MessageRef, view: &View) -> Result<(), HostError> {
        if self.gone.load(Ordering::SeqCst) {
            return Err(HostError::MessageGone);
        }
        self.views.lock().unwrap().push(view.clone());
        Ok(())
    }
}

struct Directory(Vec<Participant>);

#[async_trait]
impl IdentityResolver for Directory {
    async fn resolve(&self, user: &UserRef) -> Result<Participant, HostError> {
        let found = match user {
            UserRef::Id(id) => self.0.iter().find(|p| p.id == *id),
            UserRef::Handle(handle) => self.0.iter().find(|p| p.name.eq_ignore_ascii_case(handle)),
        };
        found
            .cloned()
            .ok_or_else(|| HostError::UserNotFound(format!("{user:?}")))
    }
}

struct Harness {
    registry: GameRegistry,
    surface: Arc<RecordingSurface>,
    settings: Arc<MemorySettingsStore>,
}

impl Harness {
    fn new(config: GameConfig) -> Self {
        let surface = Arc::new(RecordingSurface::default());
        let settings = Arc::new(MemorySettingsStore::default());
        let directory = Directory(vec![
            Participant::new(ALICE, "Alice"),
            Participant::new(BOB, "Bob"),
            Participant::new(CAROL, "Carol"),
        ]);
        let registry = GameRegistry::new(
            surface.clone(),
            Arc::new(directory),
            settings.clone(),
            config,
        );
        Self {
            registry,
            surface,
            settings,
        }
    }

    async fn command(&self, sender: UserId, text: &str) -> Option<String> {
        self.command_reply(sender, text, None).await
    }

    async fn command_reply(
        &self,
        sender: UserId,
        text: &str,
        reply_to: Option<UserId>,
    ) -> Option<String> {
        let ctx = CommandContext {
            chat: CHAT,
            sender,
            text: text.to_string(),
            reply_to,
        };
        self.registry.handle_command(&ctx).await
    }

    async fn press(&self, actor: UserId, payload: &str) -> Option<String> {
        let action: Action = payload.parse().unwrap();
        self.registry.handle_action(CHAT, actor, action).await
    }

    /// Alice invites Bob, takes white, Bob accepts.
    async fn start_match(&self) {
        assert_eq!(self.command(ALICE, ".checkers @bob").await, None);
        assert_eq!(self.press(ALICE, "settings").await, None);
        assert_eq!(self.press(ALICE, "colors").await, None);
        assert_eq!(self.press(ALICE, "color:white").await, None);
        assert_eq!(self.press(BOB, "accept").await, None);
    }
}

#[tokio::test]
async fn invitation_to_first_move() {
    let h = Harness::new(GameConfig::default());

    assert_eq!(h.command_reply(ALICE, ".checkers", Some(BOB)).await, None);
    assert!(h.registry.contains(CHAT).await);
    assert!(h.surface.last().text.starts_with("Bob, Alice invites you"));

    assert_eq!(
        h.press(BOB, "settings").await,
        Some(SessionError::NotHost.to_string())
    );
    h.press(ALICE, "settings").await;
    h.press(ALICE, "colors").await;
    h.press(ALICE, "color:white").await;
    assert_eq!(
        h.press(CAROL, "accept").await,
        Some(SessionError::NotInvited.to_string())
    );
    assert_eq!(h.press(BOB, "accept").await, None);

    let view = h.surface.last();
    assert!(view.text.contains("⚪ Alice vs ⚫ Bob"));
    assert!(view.text.contains("White to move (Alice)"));

    assert_eq!(
        h.press(BOB, "cell:2:1").await,
        Some(SessionError::NotYourTurn.to_string())
    );
    assert_eq!(h.press(ALICE, "cell:5:0").await, None);
    assert_eq!(h.press(ALICE, "cell:4:1").await, None);

    let state = h.registry.snapshot(CHAT).await.unwrap();
    assert_eq!(state.current_player, Color::Black);
    assert_eq!(state.cells[4 * 8 + 1], 1);
    assert_eq!(state.cells[5 * 8], 0);
    assert!(h.surface.last().text.contains("Black to move (Bob)"));
}

#[tokio::test]
async fn second_challenge_in_chat_is_refused() {
    let h = Harness::new(GameConfig::default());

    h.command(ALICE, ".checkers 2").await;
    let notice = h.command(CAROL, ".checkers 1").await;

    assert_eq!(notice, Some(SessionError::AlreadyRunning.to_string()));
    assert_eq!(h.registry.len().await, 1);
}

#[tokio::test]
async fn bad_challenges_leave_no_match() {
    let h = Harness::new(GameConfig::default());

    assert_eq!(
        h.command(ALICE, ".checkers @nobody").await,
        Some(SessionError::UnknownOpponent.to_string())
    );
    assert_eq!(
        h.command(ALICE, ".checkers 1").await,
        Some(SessionError::SelfPlay.to_string())
    );
    assert_eq!(
        h.command(ALICE, ".checkers").await,
        Some("You did not say who to play with".to_string())
    );
    assert_eq!(h.command(ALICE, "hello there").await, None);
    assert!(h.registry.is_empty().await);
}

#[tokio::test]
async fn unknown_user_id_falls_back_to_generic_name() {
    let h = Harness::new(GameConfig::default());

    h.command(ALICE, ".checkers 99").await;

    assert!(h.surface.last().text.starts_with("Player, Alice invites you"));
}

#[tokio::test]
async fn open_invitation_binds_whoever_accepts() {
    let h = Harness::new(GameConfig::default());

    h.command(ALICE, ".checkers any").await;
    assert!(h.surface.last().text.starts_with("Anyone, Alice"));
    assert_eq!(
        h.press(ALICE, "accept").await,
        Some(SessionError::OwnInvitation.to_string())
    );

    h.press(CAROL, "accept").await;

    let text = h.surface.last().text;
    assert!(text.contains("Alice"));
    assert!(text.contains("Carol"));
    assert!(h.registry.snapshot(CHAT).await.is_some());
}

#[tokio::test]
async fn decline_tears_match_down() {
    let h = Harness::new(GameConfig::default());

    h.command(ALICE, ".checkers 2").await;
    h.press(BOB, "decline").await;

    assert!(!h.registry.contains(CHAT).await);
    assert!(h.surface.last().text.contains("declined"));
    assert_eq!(
        h.press(BOB, "accept").await,
        Some(SessionError::NoGame.to_string())
    );
}

#[tokio::test]
async fn stopgame_needs_a_participant() {
    let h = Harness::new(GameConfig::default());
    h.start_match().await;

    assert_eq!(
        h.command(CAROL, ".stopgame").await,
        Some(SessionError::NotParticipant.to_string())
    );
    assert_eq!(
        h.command(BOB, ".stopgame").await,
        Some("The game was stopped".to_string())
    );
    assert!(h.registry.is_empty().await);
    assert_eq!(
        h.command(BOB, ".stopgame").await,
        Some(SessionError::NoGame.to_string())
    );
}

#[tokio::test]
async fn resign_button_ends_match() {
    let h = Harness::new(GameConfig::default());
    h.start_match().await;

    assert_eq!(h.press(BOB, "resign").await, None);

    let view = h.surface.last();
    assert!(view.buttons.is_empty());
    assert!(view.text.contains("Black resigned. White (Alice) wins"));
    assert!(h.registry.snapshot(CHAT).await.is_none());
}

#[tokio::test]
async fn capture_default_is_persisted_for_new_matches() {
    let h = Harness::new(GameConfig::default());

    assert_eq!(
        h.command(ALICE, ".captures off").await,
        Some("Mandatory captures are now off by default".to_string())
    );
    assert_eq!(
        h.settings.load().unwrap(),
        Settings {
            mandatory_captures: false
        }
    );

    h.command(ALICE, ".checkers 2").await;
    assert!(h.surface.last().text.contains("Mandatory captures: off"));

    h.press(ALICE, "settings").await;
    h.press(ALICE, "captures").await;
    assert!(h.surface.last().text.contains("Mandatory captures: on"));
    assert!(!h.settings.load().unwrap().mandatory_captures);
}

#[tokio::test]
async fn vanished_message_expires_match() {
    let h = Harness::new(GameConfig::default());
    h.start_match().await;
    let before = h.surface.count();

    h.surface.gone.store(true, Ordering::SeqCst);
    h.press(ALICE, "cell:5:0").await;

    assert!(!h.registry.contains(CHAT).await);
    assert_eq!(h.surface.count(), before);
}

#[tokio::test]
async fn expire_is_idempotent() {
    let h = Harness::new(GameConfig::default());
    h.command(ALICE, ".checkers 2").await;

    h.registry.expire(CHAT).await;
    h.registry.expire(CHAT).await;

    assert!(h.registry.is_empty().await);
    assert!(h.surface.last().text.contains("expired"));
}

#[tokio::test(start_paused = true)]
async fn flag_fall_finishes_timed_match() {
    let config = GameConfig::new().with_default_time_control(Some(Duration::from_secs(2)));
    let h = Harness::new(config);
    h.start_match().await;
    assert!(h.surface.last().text.contains("⏱ White 0:02 · Black 0:02"));

    for _ in 0..50 {
        if !h.registry.contains(CHAT).await {
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    assert!(!h.registry.contains(CHAT).await);
    let view = h.surface.last();
    assert!(view.text.contains("White ran out of time. Black (Bob) wins"));
    assert!(view.buttons.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_presses_apply_one_move() {
    let h = Harness::new(GameConfig::default());
    h.start_match().await;
    assert_eq!(h.press(ALICE, "cell:5:0").await, None);

    let target: Action = "cell:4:1".parse().unwrap();
    let presses: Vec<_> = (0..2)
        .map(|_| {
            let registry = h.registry.clone();
            tokio::spawn(async move { registry.handle_action(CHAT, ALICE, target).await })
        })
        .collect();
    let mut notices = Vec::new();
    for press in presses {
        notices.push(press.await.unwrap());
    }

    assert_eq!(notices.iter().filter(|n| n.is_none()).count(), 1);
    assert!(notices.contains(&Some(SessionError::NotYourTurn.to_string())));

    let state = h.registry.snapshot(CHAT).await.unwrap();
    assert_eq!(state.current_player, Color::Black);
    assert_eq!(state.cells[4 * 8 + 1], 1);
    assert_eq!(state.cells[5 * 8], 0);
    assert_eq!(state.white_count, 12);
}
