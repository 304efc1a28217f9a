use std::path::PathBuf;

use thiserror::Error;

use crate::types::{Move, Position};

/// Errors raised by the rules engine.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BoardError {
    #[error("position {0} is off the board")]
    OffBoard(Position),

    #[error("illegal move {} -> {}", .0.from, .0.to)]
    IllegalMove(Move),
}

/// Errors of a game session. The messages double as the short notice shown
/// to whoever triggered the event.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("A game is already running in this chat. Finish it or reset it with .stopgame")]
    AlreadyRunning,

    #[error("There is no game here")]
    NoGame,

    #[error("The game is not running")]
    NotActive,

    #[error("The game has already started")]
    AlreadyStarted,

    #[error("I cannot find that user")]
    UnknownOpponent,

    #[error("Solo checkers? Sorry, no.")]
    SelfPlay,

    #[error("Let the other person answer!")]
    OwnInvitation,

    #[error("This invitation is not for you!")]
    NotInvited,

    #[error("Only the host can change the settings")]
    NotHost,

    #[error("This game is not yours!")]
    NotParticipant,

    #[error("It is your opponent's turn!")]
    NotYourTurn,

    #[error("There is no piece of yours here")]
    NotYourPiece,

    #[error("You must continue capturing with the same piece!")]
    MustContinueCapture,

    #[error("This piece has no legal moves (captures are mandatory)")]
    NoLegalMoves,

    #[error("Invalid move")]
    InvalidTarget,

    #[error(transparent)]
    Board(#[from] BoardError),
}

/// Errors parsing commands and callback payloads.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("empty command")]
    Empty,

    #[error("You did not say who to play with")]
    MissingOpponent,

    #[error("unknown command: {0}")]
    UnknownCommand(String),

    #[error("unknown action: {0}")]
    UnknownAction(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// Failures of host collaborators. These never abort a game.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("user not found: {0}")]
    UserNotFound(String),

    #[error("message is gone")]
    MessageGone,

    #[error("messaging error: {0}")]
    Messaging(String),
}

/// Errors of the settings store.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid settings json: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SessionError>;
