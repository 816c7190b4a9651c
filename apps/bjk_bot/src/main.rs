//! Blindjack
//!
//! Mental Poker (1979) blackjack using ElGamal masking over BLS12-381.
//! Designed by the Sonia Code & Gemini AI (2026)
//!
//! Copyright (c) 2026 Sonia Code; See LICENSE file for license details.

use std::{fmt, path::PathBuf};

use bjk_ec::card_codec::card_label;
use bjk_game::{
    backend::{CommandBackend, OpeningBackend, ShuffleProofBackend},
    config::SessionConfig,
    error::ProtocolError,
    messages::{Message, PlayerAction},
    session::{Session, SessionEffect, SessionEvent, SessionStep},
    session_state::Role,
};
use clap::{Parser, ValueEnum};
use itertools::Itertools;
use rand::{SeedableRng, rngs::StdRng};
use tokio::{
    sync::mpsc,
    task::{JoinHandle, block_in_place},
    time::timeout,
};

const CHANNEL_CAPACITY: usize = 64;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum BackendKind {
    /// In-process opening proofs (not zero-knowledge)
    Opening,
    /// External prover executable
    Command,
}

#[derive(Parser, Debug)]
#[command(
    name = "bjk_bot",
    about = "Plays mental-poker blackjack between a dealer bot and a player bot"
)]
struct Cli {
    /// Number of tables played concurrently
    #[arg(long, default_value_t = 1)]
    tables: usize,

    /// The player stands once its total reaches this value
    #[arg(long, default_value_t = 17)]
    stand_on: u32,

    /// Session configuration as JSON
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = BackendKind::Opening)]
    backend: BackendKind,

    /// Prover executable for `--backend command`
    #[arg(long, env = "BJK_PROVER")]
    prover: Option<PathBuf>,

    /// Scratch directory for prover documents
    #[arg(long, default_value = "prover")]
    prover_dir: PathBuf,

    /// Replaces the default `prove` subcommand; repeat for several arguments
    #[arg(long = "prove-arg")]
    prove_args: Vec<String>,

    /// Replaces the default `verify` subcommand; repeat for several arguments
    #[arg(long = "verify-arg")]
    verify_args: Vec<String>,
}

pub struct BlackjackCards(Vec<usize>);

#[cfg(not(feature = "fancy_cards"))]
impl fmt::Display for BlackjackCards {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.iter().map(|c| card_label(*c)).join(", "))
    }
}

#[cfg(feature = "fancy_cards")]
#[rustfmt::skip]
impl fmt::Display for BlackjackCards {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cards = self.0
            .iter()
            .map(|c| {
                let card_str = card_label(*c);
                match card_str.as_str() {
                    // Spades
                    "As" => "🂡", "Ks" => "🂮", "Qs" => "🂭", "Js" => "🂫", "Ts" => "🂪",
                    "9s" => "🂩", "8s" => "🂨", "7s" => "🂧", "6s" => "🂦",
                    "5s" => "🂥", "4s" => "🂤", "3s" => "🂣", "2s" => "🂢",
                    // Hearts
                    "Ah" => "🂱", "Kh" => "🂾", "Qh" => "🂽", "Jh" => "🂻", "Th" => "🂺",
                    "9h" => "🂹", "8h" => "🂸", "7h" => "🂷", "6h" => "🂶",
                    "5h" => "🂵", "4h" => "🂴", "3h" => "🂳", "2h" => "🂲",
                    // Diamonds
                    "Ad" => "🃁", "Kd" => "🃎", "Qd" => "🃍", "Jd" => "🃋", "Td" => "🃊",
                    "9d" => "🃉", "8d" => "🃈", "7d" => "🃇", "6d" => "🃆",
                    "5d" => "🃅", "4d" => "🃄", "3d" => "🃃", "2d" => "🃂",
                    // Clubs
                    "Ac" => "🃑", "Kc" => "🃞", "Qc" => "🃝", "Jc" => "🃛", "Tc" => "🃚",
                    "9c" => "🃙", "8c" => "🃘", "7c" => "🃗", "6c" => "🃖",
                    "5c" => "🃕", "4c" => "🃔", "3c" => "🃓", "2c" => "🃒",
                    _ => "🂠",
                }
            })
            .join(" ");
        f.write_str(&cards)
    }
}

type DynBackend = Box<dyn ShuffleProofBackend + Send>;

fn make_backend(cli: &Cli, table: usize, role: Role) -> Result<DynBackend, ProtocolError> {
    match cli.backend {
        BackendKind::Opening => Ok(Box::new(OpeningBackend)),
        BackendKind::Command => {
            let Some(prover) = &cli.prover else {
                return Err(ProtocolError::ProofBackendError(
                    "--backend command needs --prover".into(),
                ));
            };
            let work_dir = cli.prover_dir.join(format!("table{}_{}", table, role));
            let mut backend = CommandBackend::new(prover, work_dir);
            if !cli.prove_args.is_empty() {
                backend = backend.with_prove_args(cli.prove_args.clone());
            }
            if !cli.verify_args.is_empty() {
                backend = backend.with_verify_args(cli.verify_args.clone());
            }
            Ok(Box::new(backend))
        }
    }
}

/// One seat at one table: owns its session and talks to the other seat over channels.
pub struct BlackjackBot<B: ShuffleProofBackend> {
    table: usize,
    session: Session<B>,
    stand_on: u32,
    player_cards: Vec<usize>,
    result: Option<bool>,
}

impl<B: ShuffleProofBackend> BlackjackBot<B> {
    pub fn new(
        table: usize,
        role: Role,
        config: SessionConfig,
        backend: B,
        stand_on: u32,
    ) -> Result<Self, ProtocolError> {
        let session = Session::new(role, config, backend, StdRng::from_entropy())?;
        Ok(Self {
            table,
            session,
            stand_on,
            player_cards: vec![],
            result: None,
        })
    }

    fn show(&mut self, effect: SessionEffect) {
        let role = self.session.role();
        match effect {
            SessionEffect::KeysFrozen => {
                tracing::debug!(table = self.table, %role, "Keys exchanged");
            }
            SessionEffect::DeckAccepted { deck_hash } => {
                tracing::info!(table = self.table, %role, "Deck accepted: {}", &deck_hash[..16]);
            }
            SessionEffect::CardDealt { index } => {
                tracing::debug!(table = self.table, %role, "Card {} dealt to player", index);
            }
            SessionEffect::CardRevealed {
                index, plaintext, ..
            } => {
                if self.session.table().dealer_card() == Some(index) {
                    tracing::info!(
                        table = self.table,
                        %role,
                        "Dealer card: {}",
                        BlackjackCards(vec![plaintext])
                    );
                } else {
                    self.player_cards.push(plaintext);
                    tracing::info!(
                        table = self.table,
                        %role,
                        "Player cards: {} ({})",
                        BlackjackCards(self.player_cards.clone()),
                        self.session.table().player_total()
                    );
                }
            }
            SessionEffect::Finished { player_won } => {
                self.result = Some(player_won);
                tracing::info!(
                    table = self.table,
                    %role,
                    "{}",
                    if player_won { "Player wins" } else { "Dealer wins" }
                );
            }
        }
    }

    /// Shows what happened and, when it is the player's decision, makes it.
    fn act(&mut self, step: SessionStep) -> Result<Vec<Message>, ProtocolError> {
        let mut outbound = step.outbound;
        for effect in step.effects {
            self.show(effect);
        }

        if self.session.can_act() {
            let action = if self.session.table().player_total() < self.stand_on {
                PlayerAction::Hit
            } else {
                PlayerAction::Stand
            };
            outbound.extend(self.session.act(action)?.outbound);
        }
        Ok(outbound)
    }

    async fn send(tx: &mpsc::Sender<String>, messages: Vec<Message>) -> Result<(), ProtocolError> {
        for message in messages {
            tx.send(message.to_json()?)
                .await
                .map_err(|_| ProtocolError::NetworkDisconnect)?;
        }
        Ok(())
    }

    /// Plays until the session ends. Returns the result the session reached.
    pub async fn run(
        mut self,
        tx: mpsc::Sender<String>,
        mut rx: mpsc::Receiver<String>,
    ) -> Result<Option<bool>, ProtocolError> {
        let step = self.session.start()?;
        let outbound = self.act(step)?;
        Self::send(&tx, outbound).await?;

        let wait = self.session.config().message_timeout();
        while !self.session.is_terminal() {
            let event = match timeout(wait, rx.recv()).await {
                Err(_) => SessionEvent::TimedOut,
                Ok(None) => SessionEvent::Disconnected,
                Ok(Some(data)) => SessionEvent::decode(&data),
            };

            let step = block_in_place(|| self.session.step(event))?;
            let outbound = block_in_place(|| self.act(step))?;
            Self::send(&tx, outbound).await?;
        }

        Ok(self.result)
    }
}

fn spawn_table(
    cli: &Cli,
    config: &SessionConfig,
    table: usize,
) -> Result<Vec<(usize, Role, JoinHandle<Result<Option<bool>, ProtocolError>>)>, ProtocolError> {
    let (to_player, from_dealer) = mpsc::channel(CHANNEL_CAPACITY);
    let (to_dealer, from_player) = mpsc::channel(CHANNEL_CAPACITY);

    let dealer = BlackjackBot::new(
        table,
        Role::Dealer,
        config.clone(),
        make_backend(cli, table, Role::Dealer)?,
        cli.stand_on,
    )?;
    let player = BlackjackBot::new(
        table,
        Role::Player,
        config.clone(),
        make_backend(cli, table, Role::Player)?,
        cli.stand_on,
    )?;

    Ok(vec![
        (table, Role::Dealer, tokio::spawn(dealer.run(to_player, from_player))),
        (table, Role::Player, tokio::spawn(player.run(to_dealer, from_dealer))),
    ])
}

async fn run(cli: Cli) -> Result<(), ProtocolError> {
    let config = match &cli.config {
        Some(path) => SessionConfig::from_json_file(path)?,
        None => SessionConfig::default(),
    };

    let mut handles = Vec::with_capacity(cli.tables * 2);
    for table in 1..=cli.tables {
        handles.extend(spawn_table(&cli, &config, table)?);
    }

    let mut player_wins = 0;
    let mut dealer_wins = 0;
    let mut aborted = 0;
    for (table, role, handle) in handles {
        match handle.await {
            Ok(Ok(result)) => {
                if role == Role::Dealer {
                    match result {
                        Some(true) => player_wins += 1,
                        Some(false) => dealer_wins += 1,
                        None => aborted += 1,
                    }
                }
            }
            Ok(Err(err)) => {
                tracing::error!(table, %role, "Error: {}", err);
                if role == Role::Dealer {
                    aborted += 1;
                }
            }
            Err(err) => {
                tracing::error!(table, %role, "Task failed: {}", err);
                if role == Role::Dealer {
                    aborted += 1;
                }
            }
        }
    }

    tracing::info!(
        "Tables: {}, player wins: {}, dealer wins: {}, aborted: {}",
        cli.tables,
        player_wins,
        dealer_wins,
        aborted
    );
    Ok(())
}

fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    if cfg!(feature = "pure_output") {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false) // Removes "bjk_bot:"
            .with_level(false) // Removes "INFO"
            .without_time() // Removes the timestamp
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
pub async fn main() {
    init_logging();

    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        tracing::error!("Error: {}", err);
    }
}
