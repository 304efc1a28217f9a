//! Textual commands and inline-button payloads.

use std::fmt;
use std::str::FromStr;

use crate::error::CommandError;
use crate::host::{UserId, UserRef};
use crate::types::{Color, Position};

/// Who a challenge goes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Opponent {
    /// The first person to press "accept" becomes the opponent.
    Anyone,
    User(UserRef),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `checkers [@handle|id|any]`, or `checkers` as a reply.
    Challenge(Opponent),
    /// `stopgame`: hard reset of the chat's match.
    Stop,
    /// `resign`
    Resign,
    /// `captures [on|off]`: shows or stores the default capture rule.
    Captures(Option<bool>),
}

impl Command {
    /// Parses a command line. A leading `.` or `/` is optional. `reply_to` is
    /// the sender of the replied-to message, which names the opponent when no
    /// argument does.
    pub fn parse(text: &str, reply_to: Option<UserId>) -> Result<Self, CommandError> {
        let text = text.trim();
        let text = text
            .strip_prefix('.')
            .or_else(|| text.strip_prefix('/'))
            .unwrap_or(text);

        let mut parts = text.split_whitespace();
        let name = parts.next().ok_or(CommandError::Empty)?.to_lowercase();
        let arg = parts.next();

        match name.as_str() {
            "checkers" => {
                let opponent = match (arg, reply_to) {
                    (Some(arg), _) => parse_opponent(arg)?,
                    (None, Some(id)) => Opponent::User(UserRef::Id(id)),
                    (None, None) => return Err(CommandError::MissingOpponent),
                };
                Ok(Self::Challenge(opponent))
            }
            "stopgame" => Ok(Self::Stop),
            "resign" => Ok(Self::Resign),
            "captures" => match arg.map(str::to_lowercase).as_deref() {
                None => Ok(Self::Captures(None)),
                Some("on") => Ok(Self::Captures(Some(true))),
                Some("off") => Ok(Self::Captures(Some(false))),
                Some(other) => Err(CommandError::InvalidArgument(other.to_string())),
            },
            _ => Err(CommandError::UnknownCommand(name)),
        }
    }
}

fn parse_opponent(arg: &str) -> Result<Opponent, CommandError> {
    if arg.eq_ignore_ascii_case("any") || arg.eq_ignore_ascii_case("anyone") {
        return Ok(Opponent::Anyone);
    }
    if let Ok(id) = arg.parse::<UserId>() {
        return Ok(Opponent::User(UserRef::Id(id)));
    }

    let handle = arg.trim_start_matches('@');
    if handle.is_empty() {
        return Err(CommandError::InvalidArgument(arg.to_string()));
    }
    Ok(Opponent::User(UserRef::Handle(handle.to_string())))
}

/// Payload of an inline button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Accept,
    Decline,
    Settings,
    Colors,
    /// `None` picks a random color at acceptance.
    SetColor(Option<Color>),
    ToggleCaptures,
    CycleClock,
    Back,
    Resign,
    Cell(Position),
}

impl Action {
    pub fn encode(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Accept => write!(f, "accept"),
            Self::Decline => write!(f, "decline"),
            Self::Settings => write!(f, "settings"),
            Self::Colors => write!(f, "colors"),
            Self::SetColor(Some(color)) => write!(f, "color:{color}"),
            Self::SetColor(None) => write!(f, "color:random"),
            Self::ToggleCaptures => write!(f, "captures"),
            Self::CycleClock => write!(f, "clock"),
            Self::Back => write!(f, "back"),
            Self::Resign => write!(f, "resign"),
            Self::Cell(pos) => write!(f, "cell:{}:{}", pos.row, pos.col),
        }
    }
}

impl FromStr for Action {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unknown = || CommandError::UnknownAction(s.to_string());
        let mut parts = s.trim().split(':');

        let action = match parts.next().ok_or_else(unknown)? {
            "accept" => Self::Accept,
            "decline" => Self::Decline,
            "settings" => Self::Settings,
            "colors" => Self::Colors,
            "captures" => Self::ToggleCaptures,
            "clock" => Self::CycleClock,
            "back" => Self::Back,
            "resign" => Self::Resign,
            "color" => match parts.next() {
                Some("white") => Self::SetColor(Some(Color::White)),
                Some("black") => Self::SetColor(Some(Color::Black)),
                Some("random") => Self::SetColor(None),
                _ => return Err(unknown()),
            },
            "cell" => {
                let mut coord = || {
                    parts
                        .next()
                        .and_then(|v| v.parse::<u8>().ok())
                        .ok_or_else(unknown)
                };
                let row = coord()?;
                let col = coord()?;
                Self::Cell(Position::new(row, col))
            }
            _ => return Err(unknown()),
        };

        if parts.next().is_some() {
            return Err(unknown());
        }
        Ok(action)
    }
}
