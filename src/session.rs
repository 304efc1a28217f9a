//! One checkers match: invitation, configuration, play and the end of it.
//!
//! A session is a plain state machine driven through `&mut self`. Callers
//! serialize events per session (see [`crate::registry`]) and render
//! [`GameSession::view`] after every successful call.

use std::time::Duration;

use rand::Rng;
use tracing::{debug, info};

use crate::board::Board;
use crate::clock::Clock;
use crate::config::GameConfig;
use crate::error::{Result, SessionError};
use crate::host::{Participant, UserId};
use crate::render::{self, View};
use crate::types::{Color, GameOver, Move, Position, Square, Target};

/// Who the invitation is addressed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invitee {
    Named(Participant),
    /// Open challenge; the first responder other than the host is bound as
    /// the opponent.
    Anyone,
}

/// Options the host may change while the invitation is open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchOptions {
    /// `None` draws the host's color at acceptance.
    pub host_color: Option<Color>,
    pub mandatory_captures: bool,
    pub time_control: Option<Duration>,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            host_color: None,
            mandatory_captures: true,
            time_control: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Menu {
    Settings,
    Colors,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    Win(GameOver),
    Surrender { winner: Color },
    Timeout { loser: Color },
    Aborted,
    Declined,
    Expired,
}

impl FinishReason {
    pub fn winner(&self) -> Option<Color> {
        match self {
            Self::Win(over) => Some(over.winner),
            Self::Surrender { winner } => Some(*winner),
            Self::Timeout { loser } => Some(loser.opponent()),
            Self::Aborted | Self::Declined | Self::Expired => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Inviting,
    Configuring(Menu),
    Active,
    Finished(FinishReason),
}

/// Players seated after acceptance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seats {
    pub white: Participant,
    pub black: Participant,
}

impl Seats {
    pub fn player(&self, color: Color) -> &Participant {
        match color {
            Color::White => &self.white,
            Color::Black => &self.black,
        }
    }

    pub fn color_of(&self, user: UserId) -> Option<Color> {
        if self.white.id == user {
            Some(Color::White)
        } else if self.black.id == user {
            Some(Color::Black)
        } else {
            None
        }
    }
}

/// The selected piece and where it may go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub from: Position,
    pub targets: Vec<Target>,
}

/// What a board click did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickOutcome {
    Selected,
    Deselected,
    Moved,
    CaptureContinues,
    Finished(FinishReason),
}

#[derive(Debug)]
pub struct GameSession {
    host: Participant,
    invitee: Invitee,
    options: MatchOptions,
    config: GameConfig,
    phase: Phase,
    seats: Option<Seats>,
    board: Option<Board>,
    clock: Option<Clock>,
    selection: Option<Selection>,
}

impl GameSession {
    /// Opens an invitation from `host`.
    pub fn invite(
        host: Participant,
        invitee: Invitee,
        options: MatchOptions,
        config: GameConfig,
    ) -> Result<Self> {
        if let Invitee::Named(opponent) = &invitee
            && opponent.id == host.id
        {
            return Err(SessionError::SelfPlay);
        }

        info!(host = host.id, ?invitee, "checkers invitation opened");
        Ok(Self {
            host,
            invitee,
            options,
            config,
            phase: Phase::Inviting,
            seats: None,
            board: None,
            clock: None,
            selection: None,
        })
    }

    pub fn host(&self) -> &Participant {
        &self.host
    }

    pub fn invitee(&self) -> &Invitee {
        &self.invitee
    }

    pub fn options(&self) -> &MatchOptions {
        &self.options
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn seats(&self) -> Option<&Seats> {
        self.seats.as_ref()
    }

    pub fn board(&self) -> Option<&Board> {
        self.board.as_ref()
    }

    pub fn clock(&self) -> Option<&Clock> {
        self.clock.as_ref()
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.phase, Phase::Finished(_))
    }

    pub fn finish_reason(&self) -> Option<FinishReason> {
        match self.phase {
            Phase::Finished(reason) => Some(reason),
            _ => None,
        }
    }

    /// Host, named invitee, or a seated player.
    pub fn is_participant(&self, user: UserId) -> bool {
        if self.host.id == user {
            return true;
        }
        if let Invitee::Named(opponent) = &self.invitee
            && opponent.id == user
        {
            return true;
        }
        self.seats
            .as_ref()
            .is_some_and(|seats| seats.color_of(user).is_some())
    }

    pub fn view(&self) -> View {
        render::session_view(self)
    }

    pub fn open_settings(&mut self, actor: UserId) -> Result<()> {
        self.ensure_host_configuring(actor)?;
        self.phase = Phase::Configuring(Menu::Settings);
        Ok(())
    }

    pub fn open_color_menu(&mut self, actor: UserId) -> Result<()> {
        self.ensure_host_configuring(actor)?;
        self.phase = Phase::Configuring(Menu::Colors);
        Ok(())
    }

    /// Stores the host's color preference and stays on the color menu.
    pub fn set_host_color(&mut self, actor: UserId, color: Option<Color>) -> Result<()> {
        self.ensure_host_configuring(actor)?;
        self.options.host_color = color;
        self.phase = Phase::Configuring(Menu::Colors);
        Ok(())
    }

    /// Flips the capture rule of this match and returns the new value.
    pub fn toggle_mandatory_captures(&mut self, actor: UserId) -> Result<bool> {
        self.ensure_host_configuring(actor)?;
        self.options.mandatory_captures = !self.options.mandatory_captures;
        self.phase = Phase::Configuring(Menu::Settings);
        Ok(self.options.mandatory_captures)
    }

    /// Advances the time control through off and the configured choices.
    pub fn cycle_time_control(&mut self, actor: UserId) -> Result<Option<Duration>> {
        self.ensure_host_configuring(actor)?;
        self.options.time_control = self.config.next_time_control(self.options.time_control);
        self.phase = Phase::Configuring(Menu::Settings);
        Ok(self.options.time_control)
    }

    /// Color menu goes back to settings, settings back to the invitation.
    pub fn back(&mut self, actor: UserId) -> Result<()> {
        self.ensure_host_configuring(actor)?;
        self.phase = match self.phase {
            Phase::Configuring(Menu::Colors) => Phase::Configuring(Menu::Settings),
            _ => Phase::Inviting,
        };
        Ok(())
    }

    /// Answers the invitation. Accepting seats both players, builds the board
    /// and starts the clock of a timed match; declining ends the session.
    ///
    /// A timed match spawns the clock loop, so accepting one must happen
    /// inside a tokio runtime.
    pub fn respond<R: Rng>(
        &mut self,
        actor: &Participant,
        accept: bool,
        rng: &mut R,
    ) -> Result<()> {
        match self.phase {
            Phase::Inviting | Phase::Configuring(_) => {}
            Phase::Active => return Err(SessionError::AlreadyStarted),
            Phase::Finished(_) => return Err(SessionError::NotActive),
        }
        if actor.id == self.host.id {
            return Err(SessionError::OwnInvitation);
        }

        let opponent = match &self.invitee {
            Invitee::Named(opponent) if opponent.id == actor.id => opponent.clone(),
            Invitee::Named(_) => return Err(SessionError::NotInvited),
            Invitee::Anyone if accept => actor.clone(),
            Invitee::Anyone => return Err(SessionError::NotInvited),
        };

        if !accept {
            info!(host = self.host.id, opponent = opponent.id, "invitation declined");
            self.finish(FinishReason::Declined);
            return Ok(());
        }

        let host_color = self.options.host_color.unwrap_or_else(|| {
            if rng.random_bool(0.5) {
                Color::White
            } else {
                Color::Black
            }
        });
        let seats = match host_color {
            Color::White => Seats {
                white: self.host.clone(),
                black: opponent.clone(),
            },
            Color::Black => Seats {
                white: opponent.clone(),
                black: self.host.clone(),
            },
        };

        let board = Board::new().with_mandatory_captures(self.options.mandatory_captures);
        self.clock = self.options.time_control.map(|initial| {
            let mut clock = Clock::with_tick(initial, self.config.tick_interval);
            clock.switch_turn(board.current_player());
            clock.start();
            clock
        });

        info!(
            white = seats.white.id,
            black = seats.black.id,
            timed = self.clock.is_some(),
            "checkers match started"
        );

        self.invitee = Invitee::Named(opponent);
        self.seats = Some(seats);
        self.board = Some(board);
        self.selection = None;
        self.phase = Phase::Active;
        Ok(())
    }

    /// Handles a press on board cell `pos`.
    pub fn click(&mut self, actor: UserId, pos: Position) -> Result<ClickOutcome> {
        if self.phase != Phase::Active {
            return Err(SessionError::NotActive);
        }
        if let Some(loser) = self.clock.as_ref().and_then(Clock::flagged) {
            let reason = FinishReason::Timeout { loser };
            self.finish(reason);
            return Ok(ClickOutcome::Finished(reason));
        }
        let (Some(board), Some(seats)) = (self.board.as_ref(), self.seats.as_ref()) else {
            return Err(SessionError::NotActive);
        };
        let Some(color) = seats.color_of(actor) else {
            return Err(SessionError::NotParticipant);
        };
        if color != board.current_player() {
            return Err(SessionError::NotYourTurn);
        }
        let clicked_own = matches!(board.square(pos), Square::Occupied(p) if p.color == color);

        let Some(selection) = self.selection.as_ref() else {
            return self.select(pos);
        };

        if selection.from == pos {
            debug!(actor, %pos, "selection cleared");
            self.selection = None;
            return Ok(ClickOutcome::Deselected);
        }

        if let Some(target) = selection.targets.iter().find(|t| t.to == pos) {
            let mv = Move::new(selection.from, target.to, target.is_capture);
            return self.play(mv);
        }

        if clicked_own {
            self.select(pos)
        } else {
            Err(SessionError::InvalidTarget)
        }
    }

    /// A seated player gives up; the opponent wins.
    pub fn resign(&mut self, actor: UserId) -> Result<FinishReason> {
        if self.phase != Phase::Active {
            return Err(SessionError::NotActive);
        }
        let color = self
            .seats
            .as_ref()
            .and_then(|seats| seats.color_of(actor))
            .ok_or(SessionError::NotParticipant)?;

        let reason = FinishReason::Surrender {
            winner: color.opponent(),
        };
        self.finish(reason);
        Ok(reason)
    }

    /// Participant-initiated hard stop. Stopping a finished session is a no-op.
    pub fn abort(&mut self, actor: UserId) -> Result<()> {
        if !self.is_participant(actor) {
            return Err(SessionError::NotParticipant);
        }
        if !self.is_finished() {
            self.finish(FinishReason::Aborted);
        }
        Ok(())
    }

    /// The host reports that the game message went stale.
    pub fn expire(&mut self) {
        if !self.is_finished() {
            self.finish(FinishReason::Expired);
        }
    }

    /// Turns a flag fall into a result.
    pub fn timeout(&mut self, loser: Color) -> Result<FinishReason> {
        if self.phase != Phase::Active {
            return Err(SessionError::NotActive);
        }
        let reason = FinishReason::Timeout { loser };
        self.finish(reason);
        Ok(reason)
    }

    /// Stops and joins the clock and drops the board. Idempotent.
    pub async fn release(&mut self) {
        if let Some(mut clock) = self.clock.take() {
            clock.stop().await;
        }
        self.board = None;
        self.selection = None;
    }

    fn select(&mut self, pos: Position) -> Result<ClickOutcome> {
        let board = self.board.as_ref().ok_or(SessionError::NotActive)?;
        match board.square(pos) {
            Square::Occupied(piece) if piece.color == board.current_player() => {}
            _ => return Err(SessionError::NotYourPiece),
        }
        if board.forced_continuation().is_some_and(|forced| forced != pos) {
            return Err(SessionError::MustContinueCapture);
        }

        let targets = board.selectable_moves(pos);
        if targets.is_empty() {
            return Err(SessionError::NoLegalMoves);
        }

        debug!(%pos, targets = targets.len(), "piece selected");
        self.selection = Some(Selection { from: pos, targets });
        Ok(ClickOutcome::Selected)
    }

    fn play(&mut self, mv: Move) -> Result<ClickOutcome> {
        let board = self.board.as_mut().ok_or(SessionError::NotActive)?;
        let again = board.try_apply(mv)?;
        debug!(from = %mv.from, to = %mv.to, capture = mv.is_capture, again, "move applied");

        self.selection = again.then(|| Selection {
            from: mv.to,
            targets: board.selectable_moves(mv.to),
        });
        let over = board.is_over();
        let to_move = board.current_player();

        if let Some(over) = over {
            let reason = FinishReason::Win(over);
            self.finish(reason);
            return Ok(ClickOutcome::Finished(reason));
        }

        if again {
            return Ok(ClickOutcome::CaptureContinues);
        }
        if let Some(clock) = &self.clock {
            clock.switch_turn(to_move);
        }
        Ok(ClickOutcome::Moved)
    }

    fn finish(&mut self, reason: FinishReason) {
        info!(host = self.host.id, ?reason, "checkers session finished");
        self.phase = Phase::Finished(reason);
        self.selection = None;
        if let Some(clock) = &self.clock {
            clock.pause();
        }
    }

    fn ensure_host_configuring(&self, actor: UserId) -> Result<()> {
        match self.phase {
            Phase::Inviting | Phase::Configuring(_) => {}
            Phase::Active => return Err(SessionError::AlreadyStarted),
            Phase::Finished(_) => return Err(SessionError::NotActive),
        }
        if actor != self.host.id {
            return Err(SessionError::NotHost);
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn set_board_for_test(&mut self, board: Board) {
        self.board = Some(board);
        self.selection = None;
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::types::WinCause;

    const HOST: UserId = 1;
    const GUEST: UserId = 2;
    const STRANGER: UserId = 3;

    fn host() -> Participant {
        Participant::new(HOST, "Host")
    }

    fn guest() -> Participant {
        Participant::new(GUEST, "Guest")
    }

    fn stranger() -> Participant {
        Participant::new(STRANGER, "Stranger")
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    fn pos(row: u8, col: u8) -> Position {
        Position::new(row, col)
    }

    fn invitation(options: MatchOptions) -> GameSession {
        GameSession::invite(
            host(),
            Invitee::Named(guest()),
            options,
            GameConfig::default(),
        )
        .unwrap()
    }

    /// Host plays white, guest black.
    fn started() -> GameSession {
        let mut session = invitation(MatchOptions {
            host_color: Some(Color::White),
            ..MatchOptions::default()
        });
        session.respond(&guest(), true, &mut rng()).unwrap();
        session
    }

    #[test]
    fn inviting_yourself_is_refused() {
        let err = GameSession::invite(
            host(),
            Invitee::Named(host()),
            MatchOptions::default(),
            GameConfig::default(),
        )
        .unwrap_err();

        assert_eq!(err, SessionError::SelfPlay);
    }

    #[test]
    fn only_host_configures() {
        let mut session = invitation(MatchOptions::default());

        assert_eq!(session.open_settings(GUEST), Err(SessionError::NotHost));
        session.open_settings(HOST).unwrap();
        assert_eq!(session.phase(), Phase::Configuring(Menu::Settings));

        assert_eq!(session.toggle_mandatory_captures(HOST), Ok(false));
        assert_eq!(
            session.cycle_time_control(HOST),
            Ok(Some(Duration::from_secs(180)))
        );

        session.open_color_menu(HOST).unwrap();
        session.set_host_color(HOST, Some(Color::Black)).unwrap();
        assert_eq!(session.phase(), Phase::Configuring(Menu::Colors));
        assert_eq!(session.options().host_color, Some(Color::Black));

        session.back(HOST).unwrap();
        assert_eq!(session.phase(), Phase::Configuring(Menu::Settings));
        session.back(HOST).unwrap();
        assert_eq!(session.phase(), Phase::Inviting);
    }

    #[test]
    fn invitation_answers_are_guarded() {
        let mut session = invitation(MatchOptions::default());

        assert_eq!(
            session.respond(&host(), true, &mut rng()),
            Err(SessionError::OwnInvitation)
        );
        assert_eq!(
            session.respond(&stranger(), true, &mut rng()),
            Err(SessionError::NotInvited)
        );
        assert_eq!(session.phase(), Phase::Inviting);
    }

    #[test]
    fn declining_finishes_session() {
        let mut session = invitation(MatchOptions::default());

        session.respond(&guest(), false, &mut rng()).unwrap();

        assert_eq!(session.finish_reason(), Some(FinishReason::Declined));
        assert!(session.board().is_none());
    }

    #[test]
    fn accepting_seats_players_by_preference() {
        let mut session = invitation(MatchOptions {
            host_color: Some(Color::Black),
            mandatory_captures: false,
            time_control: None,
        });

        session.respond(&guest(), true, &mut rng()).unwrap();

        let seats = session.seats().unwrap();
        assert_eq!(seats.white, guest());
        assert_eq!(seats.black, host());
        assert_eq!(session.phase(), Phase::Active);
        assert!(!session.board().unwrap().mandatory_captures());
        assert!(session.clock().is_none());
        assert_eq!(
            session.open_settings(HOST),
            Err(SessionError::AlreadyStarted)
        );
    }

    #[test]
    fn random_color_seats_both_players() {
        let mut session = invitation(MatchOptions::default());

        session.respond(&guest(), true, &mut rng()).unwrap();

        let seats = session.seats().unwrap();
        assert_ne!(seats.white.id, seats.black.id);
        assert!(seats.color_of(HOST).is_some());
        assert!(seats.color_of(GUEST).is_some());
    }

    #[test]
    fn open_invitation_binds_first_responder() {
        let mut session = GameSession::invite(
            host(),
            Invitee::Anyone,
            MatchOptions {
                host_color: Some(Color::White),
                ..MatchOptions::default()
            },
            GameConfig::default(),
        )
        .unwrap();

        assert_eq!(
            session.respond(&stranger(), false, &mut rng()),
            Err(SessionError::NotInvited)
        );
        session.respond(&stranger(), true, &mut rng()).unwrap();

        assert_eq!(session.seats().unwrap().black, stranger());
        assert_eq!(session.invitee(), &Invitee::Named(stranger()));
        assert!(session.is_participant(STRANGER));
        assert!(!session.is_participant(GUEST));
    }

    #[test]
    fn clicks_are_checked_for_seat_and_turn() {
        let mut session = started();

        assert_eq!(
            session.click(STRANGER, pos(5, 0)),
            Err(SessionError::NotParticipant)
        );
        assert_eq!(
            session.click(GUEST, pos(2, 1)),
            Err(SessionError::NotYourTurn)
        );
        assert_eq!(
            session.click(HOST, pos(2, 1)),
            Err(SessionError::NotYourPiece)
        );
        assert_eq!(
            session.click(HOST, pos(6, 1)),
            Err(SessionError::NoLegalMoves)
        );
    }

    #[test]
    fn select_deselect_and_move() {
        let mut session = started();

        assert_eq!(session.click(HOST, pos(5, 0)), Ok(ClickOutcome::Selected));
        assert_eq!(session.selection().unwrap().targets.len(), 1);

        assert_eq!(session.click(HOST, pos(5, 0)), Ok(ClickOutcome::Deselected));
        assert!(session.selection().is_none());

        session.click(HOST, pos(5, 0)).unwrap();
        assert_eq!(
            session.click(HOST, pos(4, 3)),
            Err(SessionError::InvalidTarget)
        );
        assert_eq!(session.click(HOST, pos(5, 2)), Ok(ClickOutcome::Selected));
        assert_eq!(session.selection().unwrap().from, pos(5, 2));

        assert_eq!(session.click(HOST, pos(4, 3)), Ok(ClickOutcome::Moved));
        assert!(session.selection().is_none());
        assert_eq!(session.board().unwrap().current_player(), Color::Black);
        assert_eq!(
            session.click(HOST, pos(4, 3)),
            Err(SessionError::NotYourTurn)
        );
    }

    #[test]
    fn failed_reselection_keeps_current_selection() {
        let mut session = started();

        session.click(HOST, pos(5, 0)).unwrap();
        assert_eq!(
            session.click(HOST, pos(6, 1)),
            Err(SessionError::NoLegalMoves)
        );
        assert_eq!(session.selection().unwrap().from, pos(5, 0));
    }

    #[test]
    fn multi_jump_keeps_piece_selected_until_done() {
        let mut session = started();
        session.set_board_for_test(Board::from_diagram(
            [
                ".b......",
                "........",
                ".....b..",
                "........",
                "...b....",
                "..w.....",
                ".......w",
                "........",
            ],
            Color::White,
        ));

        session.click(HOST, pos(5, 2)).unwrap();
        assert_eq!(
            session.click(HOST, pos(3, 4)),
            Ok(ClickOutcome::CaptureContinues)
        );
        let selection = session.selection().unwrap();
        assert_eq!(selection.from, pos(3, 4));
        assert!(selection.targets.iter().all(|t| t.is_capture));

        session.click(HOST, pos(3, 4)).unwrap();
        assert_eq!(
            session.click(HOST, pos(6, 7)),
            Err(SessionError::MustContinueCapture)
        );

        session.click(HOST, pos(3, 4)).unwrap();
        assert_eq!(session.click(HOST, pos(1, 6)), Ok(ClickOutcome::Moved));
        assert_eq!(session.board().unwrap().current_player(), Color::Black);
    }

    #[test]
    fn capturing_last_piece_wins() {
        let mut session = started();
        session.set_board_for_test(Board::from_diagram(
            [
                "........",
                "........",
                "........",
                "........",
                "...b....",
                "..w.....",
                "........",
                "........",
            ],
            Color::White,
        ));

        session.click(HOST, pos(5, 2)).unwrap();
        let outcome = session.click(HOST, pos(3, 4)).unwrap();

        let expected = FinishReason::Win(GameOver {
            winner: Color::White,
            cause: WinCause::Elimination,
        });
        assert_eq!(outcome, ClickOutcome::Finished(expected));
        assert_eq!(session.finish_reason(), Some(expected));
        assert_eq!(
            session.click(GUEST, pos(0, 1)),
            Err(SessionError::NotActive)
        );
    }

    #[test]
    fn resign_credits_opponent() {
        let mut session = started();

        assert_eq!(
            session.resign(STRANGER),
            Err(SessionError::NotParticipant)
        );
        let reason = session.resign(GUEST).unwrap();

        assert_eq!(
            reason,
            FinishReason::Surrender {
                winner: Color::White
            }
        );
        assert_eq!(reason.winner(), Some(Color::White));
        assert_eq!(session.resign(HOST), Err(SessionError::NotActive));
    }

    #[test]
    fn abort_and_expire_are_idempotent() {
        let mut session = started();

        assert_eq!(session.abort(STRANGER), Err(SessionError::NotParticipant));
        session.abort(GUEST).unwrap();
        session.abort(HOST).unwrap();
        session.expire();

        assert_eq!(session.finish_reason(), Some(FinishReason::Aborted));
    }

    #[test]
    fn timeout_only_applies_to_running_match() {
        let mut invited = invitation(MatchOptions::default());
        assert_eq!(invited.timeout(Color::White), Err(SessionError::NotActive));

        let mut session = started();
        let reason = session.timeout(Color::White).unwrap();
        assert_eq!(reason.winner(), Some(Color::Black));
    }

    #[tokio::test(start_paused = true)]
    async fn timed_match_runs_clock_for_side_to_move() {
        let mut session = invitation(MatchOptions {
            host_color: Some(Color::White),
            time_control: Some(Duration::from_secs(60)),
            ..MatchOptions::default()
        });
        session.respond(&guest(), true, &mut rng()).unwrap();

        let clock = session.clock().unwrap();
        assert!(clock.is_started());
        assert_eq!(clock.running(), Some(Color::White));

        tokio::time::sleep(Duration::from_secs(4)).await;
        session.click(HOST, pos(5, 0)).unwrap();
        session.click(HOST, pos(4, 1)).unwrap();

        let clock = session.clock().unwrap();
        assert_eq!(clock.running(), Some(Color::Black));
        assert_eq!(clock.remaining(Color::White), 56);
        assert_eq!(clock.remaining(Color::Black), 60);

        session.resign(GUEST).unwrap();
        assert_eq!(session.clock().unwrap().running(), None);

        session.release().await;
        session.release().await;
        assert!(session.clock().is_none());
        assert!(session.board().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn moves_after_flag_fall_end_the_match() {
        let mut session = invitation(MatchOptions {
            host_color: Some(Color::White),
            time_control: Some(Duration::from_secs(2)),
            ..MatchOptions::default()
        });
        session.respond(&guest(), true, &mut rng()).unwrap();

        tokio::time::sleep(Duration::from_secs(3)).await;
        let outcome = session.click(HOST, pos(5, 0)).unwrap();

        let expected = FinishReason::Timeout {
            loser: Color::White,
        };
        assert_eq!(outcome, ClickOutcome::Finished(expected));
        assert_eq!(session.finish_reason(), Some(expected));
        assert_eq!(session.board().unwrap().current_player(), Color::White);
        assert_eq!(session.clock().unwrap().running(), None);
        assert_eq!(
            session.click(HOST, pos(4, 1)),
            Err(SessionError::NotActive)
        );

        session.release().await;
    }
}
