//! Message text and inline keyboards for every session phase.

use std::fmt::Write as _;
use std::time::Duration;

use crate::commands::Action;
use crate::session::{FinishReason, GameSession, Invitee, Menu, Phase};
use crate::types::{BOARD_SIZE, Color, Position, RenderGrid, RenderToken, WinCause};

/// One inline button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub action: Action,
}

impl Button {
    pub fn new(label: impl Into<String>, action: Action) -> Self {
        Self {
            label: label.into(),
            action,
        }
    }
}

/// A rendered message: text plus rows of buttons.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct View {
    pub text: String,
    pub buttons: Vec<Vec<Button>>,
}

impl View {
    /// Payloads of every button, row by row.
    pub fn actions(&self) -> impl Iterator<Item = Action> + '_ {
        self.buttons.iter().flatten().map(|b| b.action)
    }
}

pub fn token_label(token: RenderToken) -> &'static str {
    match token {
        RenderToken::EmptyDark => "▪️",
        RenderToken::EmptyLight => "▫️",
        RenderToken::WhiteMan => "⚪",
        RenderToken::BlackMan => "⚫",
        RenderToken::WhiteKing => "👑⚪",
        RenderToken::BlackKing => "👑⚫",
        RenderToken::Selected => "🔘",
        RenderToken::MoveTarget => "🟢",
        RenderToken::CaptureTarget => "🔴",
    }
}

/// The grid as plain text, one line per row.
pub fn grid_text(grid: &RenderGrid) -> String {
    grid.iter()
        .map(|row| row.iter().map(|t| token_label(*t)).collect::<String>())
        .collect::<Vec<_>>()
        .join("\n")
}

fn color_name(color: Color) -> &'static str {
    match color {
        Color::White => "White",
        Color::Black => "Black",
    }
}

fn on_off(value: bool) -> &'static str {
    if value { "on" } else { "off" }
}

/// `m:ss`
fn format_clock(secs: u64) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}

fn time_control_label(control: Option<Duration>) -> String {
    match control {
        None => "off".to_string(),
        Some(d) if d.as_secs() % 60 == 0 => format!("{} min", d.as_secs() / 60),
        Some(d) => format!("{} s", d.as_secs()),
    }
}

pub fn session_view(session: &GameSession) -> View {
    match session.phase() {
        Phase::Inviting => invitation_view(session),
        Phase::Configuring(Menu::Settings) => settings_view(session),
        Phase::Configuring(Menu::Colors) => colors_view(session),
        Phase::Active => board_view(session),
        Phase::Finished(reason) => finished_view(session, reason),
    }
}

fn settings_summary(session: &GameSession) -> String {
    let options = session.options();
    let host_color = options.host_color.map_or("random", color_name);
    format!(
        "Host color: {host_color}\nMandatory captures: {}\nClock: {}",
        on_off(options.mandatory_captures),
        time_control_label(options.time_control),
    )
}

fn invitation_view(session: &GameSession) -> View {
    let addressee = match session.invitee() {
        Invitee::Named(p) => p.name.as_str(),
        Invitee::Anyone => "Anyone",
    };
    View {
        text: format!(
            "{addressee}, {} invites you to a game of checkers. Accept?\n\n{}",
            session.host().name,
            settings_summary(session)
        ),
        buttons: vec![
            vec![
                Button::new("Accept", Action::Accept),
                Button::new("Decline", Action::Decline),
            ],
            vec![Button::new("Settings", Action::Settings)],
        ],
    }
}

fn settings_view(session: &GameSession) -> View {
    let options = session.options();
    View {
        text: format!("Match settings\n\n{}", settings_summary(session)),
        buttons: vec![
            vec![Button::new(
                format!(
                    "Host color: {}",
                    options.host_color.map_or("random", color_name)
                ),
                Action::Colors,
            )],
            vec![Button::new(
                format!("Mandatory captures: {}", on_off(options.mandatory_captures)),
                Action::ToggleCaptures,
            )],
            vec![Button::new(
                format!("Clock: {}", time_control_label(options.time_control)),
                Action::CycleClock,
            )],
            vec![Button::new("Back", Action::Back)],
        ],
    }
}

fn colors_view(session: &GameSession) -> View {
    let current = session.options().host_color;
    let mark = |choice: Option<Color>, label: &str| {
        if current == choice {
            format!("✅ {label}")
        } else {
            label.to_string()
        }
    };
    View {
        text: "Choose the host's color".to_string(),
        buttons: vec![
            vec![
                Button::new(
                    mark(Some(Color::White), "White"),
                    Action::SetColor(Some(Color::White)),
                ),
                Button::new(
                    mark(Some(Color::Black), "Black"),
                    Action::SetColor(Some(Color::Black)),
                ),
            ],
            vec![Button::new(mark(None, "Random"), Action::SetColor(None))],
            vec![Button::new("Back to settings", Action::Back)],
        ],
    }
}

fn session_grid(session: &GameSession) -> Option<RenderGrid> {
    let board = session.board()?;
    Some(match session.selection() {
        Some(selection) => board.render_grid(Some(selection.from), &selection.targets),
        None => board.render_grid(None, &[]),
    })
}

fn players_line(session: &GameSession) -> String {
    match session.seats() {
        Some(seats) => format!("⚪ {} vs ⚫ {}", seats.white.name, seats.black.name),
        None => String::new(),
    }
}

fn board_view(session: &GameSession) -> View {
    let (Some(board), Some(seats), Some(grid)) =
        (session.board(), session.seats(), session_grid(session))
    else {
        return View::default();
    };

    let to_move = board.current_player();
    let mut text = players_line(session);
    let _ = write!(
        text,
        "\n➡️ {} to move ({})",
        color_name(to_move),
        seats.player(to_move).name
    );
    if board.forced_continuation().is_some() {
        text.push_str("\n❗️ Capture must continue!");
    }
    if let Some(clock) = session.clock() {
        let _ = write!(
            text,
            "\n⏱ White {} · Black {}",
            format_clock(clock.remaining(Color::White)),
            format_clock(clock.remaining(Color::Black))
        );
    }

    let mut buttons: Vec<Vec<Button>> = grid
        .iter()
        .enumerate()
        .map(|(row, cells)| {
            cells
                .iter()
                .enumerate()
                .map(|(col, token)| {
                    Button::new(
                        token_label(*token),
                        Action::Cell(Position::new(row as u8, col as u8)),
                    )
                })
                .collect()
        })
        .collect();
    debug_assert_eq!(buttons.len(), BOARD_SIZE as usize);
    buttons.push(vec![Button::new("🏳️ Resign", Action::Resign)]);

    View { text, buttons }
}

fn result_line(session: &GameSession, reason: FinishReason) -> String {
    let winner_name = |color: Color| {
        session
            .seats()
            .map(|s| s.player(color).name.clone())
            .unwrap_or_default()
    };
    match reason {
        FinishReason::Win(over) => {
            let how = match over.cause {
                WinCause::Elimination => "captured every piece",
                WinCause::NoMoves => "left the opponent without moves",
            };
            format!(
                "🏆 {} ({}) wins: {how}",
                color_name(over.winner),
                winner_name(over.winner)
            )
        }
        FinishReason::Surrender { winner } => format!(
            "🏳️ {} resigned. {} ({}) wins",
            color_name(winner.opponent()),
            color_name(winner),
            winner_name(winner)
        ),
        FinishReason::Timeout { loser } => format!(
            "⏱ {} ran out of time. {} ({}) wins",
            color_name(loser),
            color_name(loser.opponent()),
            winner_name(loser.opponent())
        ),
        FinishReason::Aborted => "The game was stopped".to_string(),
        FinishReason::Declined => "The invitation was declined".to_string(),
        FinishReason::Expired => "The game has expired".to_string(),
    }
}

fn finished_view(session: &GameSession, reason: FinishReason) -> View {
    let mut text = players_line(session);
    if !text.is_empty() {
        text.push('\n');
    }
    text.push_str(&result_line(session, reason));
    if let Some(grid) = session_grid(session) {
        text.push_str("\n\n");
        text.push_str(&grid_text(&grid));
    }
    View {
        text,
        buttons: Vec::new(),
    }
}
