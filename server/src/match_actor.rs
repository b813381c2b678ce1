//! One task per match.
//!
//! The actor owns the [`Pong`] state outright. Player input and termination
//! requests arrive on a channel, ticks come from an interval, and every
//! outgoing message goes to a single broadcast channel. Nothing else ever
//! touches the match, so no locking is needed.

use crate::ai::{AiOpponent, AiStrategy, PLANNING_PERIOD_S};
use crate::client_manager::is_ai_identifier;
use crate::game::{GameStatus, Pong};
use log::{debug, info, warn};
use pong_shared::{ServerMessage, UserInput};
use tokio::sync::mpsc;
use tokio::time::{interval, Duration, MissedTickBehavior};

#[derive(Debug, Clone, PartialEq)]
pub enum MatchMessage {
    /// Input with its seat already set from the sending connection.
    Input(UserInput),
    /// Ends the match at once.
    Terminate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchOutcome {
    pub scores: Vec<i64>,
    pub results: Vec<u32>,
}

pub struct MatchActor {
    game: Pong,
    reference_table: Vec<String>,
    ais: Vec<AiOpponent>,
    rx: mpsc::UnboundedReceiver<MatchMessage>,
    out: mpsc::UnboundedSender<ServerMessage>,
    tick_duration: Duration,
}

impl MatchActor {
    /// Every seat whose reference table entry is an AI identifier gets an
    /// [`AiOpponent`].
    pub fn new(
        game: Pong,
        reference_table: Vec<String>,
        rx: mpsc::UnboundedReceiver<MatchMessage>,
        out: mpsc::UnboundedSender<ServerMessage>,
    ) -> Self {
        let ais = reference_table
            .iter()
            .enumerate()
            .filter(|(_, id)| is_ai_identifier(id))
            .map(|(seat, _)| AiOpponent::new(seat))
            .collect();
        let tick_duration = Duration::from_secs_f64(1.0 / game.tick_rate);

        Self {
            game,
            reference_table,
            ais,
            rx,
            out,
            tick_duration,
        }
    }

    /// Runs ticks on a different wall-clock period than the match tick rate.
    /// Simulation time is unaffected.
    pub fn with_tick_duration(mut self, tick_duration: Duration) -> Self {
        self.tick_duration = tick_duration;
        self
    }

    pub fn with_ai_strategy(mut self, strategy: AiStrategy) -> Self {
        self.ais = self.ais.into_iter().map(|ai| ai.with_strategy(strategy)).collect();
        self
    }

    pub fn ai_seats(&self) -> Vec<usize> {
        self.ais.iter().map(|ai| ai.player_id).collect()
    }

    /// Plays the match to the end and reports the final standings.
    pub async fn run(mut self) -> MatchOutcome {
        self.game.start_game();
        self.publish(ServerMessage::GameStarted {
            reference_table: self.reference_table.clone(),
        });

        let mut ticker = interval(self.tick_duration);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        while self.game.status == GameStatus::Running {
            tokio::select! {
                message = self.rx.recv() => match message {
                    Some(MatchMessage::Input(input)) => {
                        if let Err(e) = self.game.handle_input(input) {
                            warn!("Rejected input: {}", e);
                        }
                    }
                    Some(MatchMessage::Terminate) | None => {
                        info!("Match terminated at tick {}", self.game.tick);
                        self.game.finish();
                    }
                },
                _ = ticker.tick() => self.step(),
            }
        }

        let outcome = MatchOutcome {
            scores: self.game.scores.clone(),
            results: self.game.results(),
        };
        self.publish(ServerMessage::GameFinished {
            scores: outcome.scores.clone(),
            results: outcome.results.clone(),
        });
        outcome
    }

    fn step(&mut self) {
        let plan_every = ((PLANNING_PERIOD_S * self.game.tick_rate).round() as u64).max(1);
        if self.game.tick % plan_every == 0 {
            for ai in &mut self.ais {
                ai.plan(&self.game);
            }
        }
        for ai in &mut self.ais {
            for input in ai.due_inputs(self.game.tick) {
                if let Err(e) = self.game.handle_input(input) {
                    warn!("Rejected AI input: {}", e);
                }
            }
        }

        self.game.update();
        if self.game.tick % 600 == 0 {
            debug!("Tick {}: scores {:?}", self.game.tick, self.game.scores);
        }

        self.publish(ServerMessage::GameState {
            data: self.game.state_snapshot(),
            reference_table: self.reference_table.clone(),
        });
    }

    fn publish(&self, message: ServerMessage) {
        if self.out.send(message).is_err() {
            debug!("No listener for match messages");
        }
    }
}
