//! Checkers for chat hosts: a rules engine, match sessions with optional
//! clocks, and a registry that drives them from chat events.

pub mod board;
pub mod clock;
pub mod commands;
pub mod config;
pub mod error;
pub mod host;
pub mod logging;
pub mod movegen;
pub mod registry;
pub mod render;
pub mod session;
pub mod settings;
pub mod types;

pub use board::Board;
pub use clock::Clock;
pub use commands::{Action, Command, Opponent};
pub use config::GameConfig;
pub use error::{BoardError, CommandError, HostError, SessionError, SettingsError};
pub use host::{
    ChatId, IdentityResolver, MessageRef, MessagingSurface, Participant, SettingsStore, UserId,
    UserRef,
};
pub use registry::{CommandContext, GameRegistry};
pub use render::{Button, View};
pub use session::{ClickOutcome, FinishReason, GameSession, Invitee, MatchOptions, Phase};
pub use settings::{JsonSettingsStore, MemorySettingsStore, Settings};
pub use types::{Color, GameOver, GameState, Move, Piece, PieceKind, Position, Square, Target};
