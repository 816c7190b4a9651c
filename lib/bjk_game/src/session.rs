//! Blindjack
//!
//! Mental Poker (1979) blackjack using ElGamal masking over BLS12-381.
//! Designed by the Sonia Code & Gemini AI (2026)
//!
//! Copyright (c) 2026 Sonia Code; See LICENSE file for license details.

//! One participant's view of a two-party blackjack session.
//!
//! The session never touches the network. The driver feeds it inbound messages,
//! disconnects and timeouts as [`SessionEvent`]s and delivers the returned outbound
//! messages in order. Any failure while handling an event aborts the session.

use bjk_ec::{
    card_codec::{CardCodec, blackjack_rank},
    group::Group,
    keys::KeyPair,
    sigma::{self, DleqStatement, SigmaProof, SigmaProofHex},
    types::PublicKey,
    util::{decode_point, encode_point},
};
use rand::rngs::StdRng;
use tracing::{debug, info, warn};

use crate::{
    aggregate::KeyRegistry,
    backend::ShuffleProofBackend,
    config::SessionConfig,
    deck::{Card, Deck, verify_masking},
    error::ProtocolError,
    messages::{DeckHandOff, DeclareKey, Message, PlayerAction, UnmaskCard},
    session_state::{
        DEALER_SEAT, NUM_SEATS, Outcome, PLAYER_SEAT, Role, SessionPhase, SessionState,
    },
    table::{TableState, player_wins},
};

#[derive(Clone, Debug, PartialEq)]
pub enum SessionEvent {
    Inbound(Message),
    /// Inbound data that did not parse as a message.
    Malformed(String),
    Disconnected,
    TimedOut,
}

impl SessionEvent {
    /// Parses one wire message. Undecodable data still reaches the session, which aborts.
    pub fn decode(data: &str) -> Self {
        match Message::from_json(data) {
            Ok(message) => SessionEvent::Inbound(message),
            Err(err) => SessionEvent::Malformed(err.to_string()),
        }
    }
}

/// Things the driver may want to show or act upon.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionEffect {
    KeysFrozen,
    DeckAccepted { deck_hash: String },
    CardDealt { index: usize },
    CardRevealed {
        index: usize,
        plaintext: usize,
        rank: u8,
    },
    Finished { player_won: bool },
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SessionStep {
    pub outbound: Vec<Message>,
    pub effects: Vec<SessionEffect>,
}

impl SessionStep {
    fn send(&mut self, message: Message) {
        self.outbound.push(message);
    }

    fn effect(&mut self, effect: SessionEffect) {
        self.effects.push(effect);
    }
}

pub struct Session<B: ShuffleProofBackend> {
    role: Role,
    config: SessionConfig,
    group: Group,
    codec: CardCodec,
    backend: B,
    rng: StdRng,
    keys: KeyPair,
    registry: KeyRegistry,
    /// Current deck; the player has none until the dealer's hand-off.
    deck: Option<Deck>,
    /// What the next incoming hand-off must have been masked from.
    reference: Vec<Card>,
    state: SessionState,
    table: TableState,
    /// The player's last action the dealer has not answered yet.
    pending_action: Option<PlayerAction>,
}

impl<B: ShuffleProofBackend> Session<B> {
    /// Samples a fresh key pair from `rng` and registers it in this role's seat.
    pub fn new(
        role: Role,
        config: SessionConfig,
        backend: B,
        mut rng: StdRng,
    ) -> Result<Self, ProtocolError> {
        let group = Group::default();
        let codec = CardCodec::new(&group);
        let keys = KeyPair::generate(&group, &mut rng);

        let mut registry = KeyRegistry::new(NUM_SEATS);
        registry.declare(&group, role.seat(), *keys.public())?;

        let fresh = Deck::new(&group, &codec)?;
        let reference = fresh.cards().to_vec();
        let deck = match role {
            Role::Dealer => Some(fresh),
            Role::Player => None,
        };

        Ok(Self {
            role,
            config,
            group,
            codec,
            backend,
            rng,
            keys,
            registry,
            deck,
            reference,
            state: SessionState::new(),
            table: TableState::new(),
            pending_action: None,
        })
    }

    pub const fn role(&self) -> Role {
        self.role
    }

    pub const fn phase(&self) -> SessionPhase {
        self.state.to_enum()
    }

    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub const fn public_key(&self) -> &PublicKey {
        self.keys.public()
    }

    pub fn public_keys(&self) -> Vec<PublicKey> {
        self.registry.public_keys()
    }

    pub const fn deck(&self) -> Option<&Deck> {
        self.deck.as_ref()
    }

    pub const fn table(&self) -> &TableState {
        &self.table
    }

    pub const fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Whether the player may hit or stand now.
    pub fn can_act(&self) -> bool {
        self.role == Role::Player
            && self.phase() == SessionPhase::Dealing
            && self.pending_action.is_none()
            && !self.table.player_cards().is_empty()
            && self.table.all_player_cards_revealed()
            && !self.table.is_player_bust()
            && self.table.dealer_rank().is_none()
    }

    /// Opens the session. Only the dealer has something to say.
    pub fn start(&mut self) -> Result<SessionStep, ProtocolError> {
        if self.state.is_terminal() {
            return Err(ProtocolError::SessionClosed);
        }
        let mut step = SessionStep::default();
        if self.role == Role::Dealer {
            info!(role = %self.role, "session open");
            step.send(Message::Connected);
        }
        Ok(step)
    }

    pub fn step(&mut self, event: SessionEvent) -> Result<SessionStep, ProtocolError> {
        if self.state.is_terminal() {
            return Err(ProtocolError::SessionClosed);
        }

        let result = match event {
            SessionEvent::Inbound(message) => self.handle_message(message),
            SessionEvent::Malformed(reason) => Err(ProtocolError::MalformedMessage(reason)),
            SessionEvent::Disconnected => Err(ProtocolError::NetworkDisconnect),
            SessionEvent::TimedOut => Err(ProtocolError::Timeout),
        };

        match result {
            Ok(step) => Ok(step),
            Err(err) => {
                self.abort(&err);
                Err(err)
            }
        }
    }

    /// Local decision of the player. Misuse is reported and leaves the session intact.
    pub fn act(&mut self, action: PlayerAction) -> Result<SessionStep, ProtocolError> {
        if self.state.is_terminal() {
            return Err(ProtocolError::SessionClosed);
        }
        if !self.can_act() {
            return Err(ProtocolError::OutOfTurn(format!(
                "{} cannot {:?} in phase {}",
                self.role,
                action,
                self.phase()
            )));
        }

        self.pending_action = Some(action);
        info!(
            role = %self.role,
            action = ?action,
            total = self.table.player_total(),
            "player action"
        );

        let mut step = SessionStep::default();
        step.send(Message::PlayerAction(action));
        Ok(step)
    }

    fn abort(&mut self, err: &ProtocolError) {
        warn!(role = %self.role, phase = %self.phase(), error = %err, "session aborted");
        self.deck = None;
        self.reference.clear();
        self.state.finish(Outcome::Aborted);
    }

    fn finish(&mut self, player_won: bool, step: &mut SessionStep) {
        let outcome = if player_won {
            Outcome::PlayerWon
        } else {
            Outcome::PlayerLost
        };
        info!(role = %self.role, outcome = ?outcome, "session finished");
        self.state.finish(outcome);
        step.effect(SessionEffect::Finished { player_won });
    }

    fn unexpected(&self, message: &Message) -> ProtocolError {
        ProtocolError::UnexpectedMessage {
            phase: self.phase().to_string(),
            message: message.event_name().into(),
        }
    }

    fn handle_message(&mut self, message: Message) -> Result<SessionStep, ProtocolError> {
        debug!(
            role = %self.role,
            phase = %self.phase(),
            event = message.event_name(),
            "inbound"
        );

        let mut step = SessionStep::default();

        match (self.role, self.phase(), message) {
            (Role::Player, SessionPhase::KeyExchange, Message::Connected) => {
                self.declare_key(&mut step);
            }
            (Role::Dealer, SessionPhase::KeyExchange, Message::PlayerDeclarePk(declared)) => {
                self.accept_key(&declared, &mut step)?;
                self.declare_key(&mut step);
                self.take_turn(&mut step)?;
                self.state.begin_mask_shuffle(PLAYER_SEAT);
            }
            (Role::Player, SessionPhase::KeyExchange, Message::DealerDeclarePk(declared)) => {
                self.accept_key(&declared, &mut step)?;
                self.state.begin_mask_shuffle(DEALER_SEAT);
            }
            (
                Role::Player,
                SessionPhase::MaskShuffle { turn: DEALER_SEAT },
                Message::DealerMask | Message::DealerShuffle,
            )
            | (
                Role::Dealer,
                SessionPhase::MaskShuffle { turn: PLAYER_SEAT },
                Message::PlayerMask | Message::PlayerShuffle,
            ) => {}
            (
                Role::Player,
                SessionPhase::MaskShuffle { turn: DEALER_SEAT },
                Message::SendDeck(hand_off),
            ) => {
                self.accept_deck(&hand_off, &mut step)?;
                self.take_turn(&mut step)?;
                self.state.set_ready();
            }
            (
                Role::Dealer,
                SessionPhase::MaskShuffle { turn: PLAYER_SEAT },
                Message::SendDeck(hand_off),
            ) => {
                self.accept_deck(&hand_off, &mut step)?;
                self.state.set_ready();
                info!(role = %self.role, "game start");
                step.send(Message::GameStart);
                self.table.draw_dealer()?;
                self.deal_player_card(&mut step)?;
            }
            (Role::Player, SessionPhase::Ready, Message::GameStart) => {
                self.table.draw_dealer()?;
                self.state.set_dealing();
            }
            (Role::Player, SessionPhase::Dealing, Message::DealCardPlayer([index]))
                if self.table.player_cards().is_empty()
                    || self.pending_action == Some(PlayerAction::Hit) =>
            {
                self.table.accept_player_card(index)?;
                self.pending_action = None;
                step.effect(SessionEffect::CardDealt { index });
                let share = self.unmask_share(index)?;
                step.send(Message::PlayerUnmaskCard(share));
                self.state.set_reveal(index);
            }
            (Role::Player, SessionPhase::Dealing, Message::RevealDealerCard([index]))
                if self.pending_action == Some(PlayerAction::Stand) =>
            {
                if self.table.dealer_card() != Some(index) {
                    return Err(ProtocolError::MalformedMessage(format!(
                        "card {} is not the dealer's card",
                        index
                    )));
                }
                self.pending_action = None;
                let share = self.unmask_share(index)?;
                step.send(Message::PlayerUnmaskCard(share));
                self.state.set_reveal(index);
            }
            (Role::Player, SessionPhase::Reveal { index }, Message::DealerUnmaskCard(share)) => {
                self.reveal(index, &share, &mut step)?;
                self.state.set_dealing();
            }
            (Role::Player, SessionPhase::Dealing, Message::GameResult(result))
                if self.table.dealer_rank().is_some() || self.table.is_player_bust() =>
            {
                let announced = match result {
                    0 => false,
                    1 => true,
                    other => {
                        return Err(ProtocolError::MalformedMessage(format!(
                            "result must be 0 or 1, got {}",
                            other
                        )));
                    }
                };
                let player_won = match self.table.dealer_rank() {
                    Some(rank) => player_wins(self.table.player_total(), rank),
                    None => false,
                };
                if announced != player_won {
                    return Err(ProtocolError::ProofVerificationFailed(format!(
                        "announced result {} contradicts the revealed cards",
                        result
                    )));
                }
                self.finish(player_won, &mut step);
            }
            (Role::Dealer, SessionPhase::Dealing, Message::PlayerAction(PlayerAction::Hit)) => {
                self.deal_player_card(&mut step)?;
            }
            (Role::Dealer, SessionPhase::Dealing, Message::PlayerAction(PlayerAction::Stand)) => {
                let index = self.table.dealer_card().ok_or_else(|| {
                    ProtocolError::OutOfTurn("dealer holds no card".into())
                })?;
                info!(role = %self.role, index, "revealing dealer card");
                step.send(Message::RevealDealerCard([index]));
                let share = self.unmask_share(index)?;
                step.send(Message::DealerUnmaskCard(share));
                self.state.set_reveal(index);
            }
            (Role::Dealer, SessionPhase::Reveal { index }, Message::PlayerUnmaskCard(share)) => {
                let rank = self.reveal(index, &share, &mut step)?;
                if self.table.dealer_card() == Some(index) {
                    let player_won = player_wins(self.table.player_total(), rank);
                    step.send(Message::GameResult(player_won as u8));
                    self.finish(player_won, &mut step);
                } else if self.table.is_player_bust() {
                    step.send(Message::GameResult(0));
                    self.finish(false, &mut step);
                } else {
                    self.state.set_dealing();
                }
            }
            (_, _, message) => return Err(self.unexpected(&message)),
        }

        Ok(step)
    }

    fn declare_key(&mut self, step: &mut SessionStep) {
        let pk = *self.keys.public();
        let statement = DleqStatement::key_ownership(&self.group, pk);
        let proof = sigma::prove(&self.group, &statement, self.keys.secret(), &mut self.rng);
        let declared = DeclareKey {
            public_key: encode_point(&pk),
            proof: Some(SigmaProofHex::from(&proof)),
        };
        step.send(match self.role {
            Role::Dealer => Message::DealerDeclarePk(declared),
            Role::Player => Message::PlayerDeclarePk(declared),
        });
    }

    fn accept_key(
        &mut self,
        declared: &DeclareKey,
        step: &mut SessionStep,
    ) -> Result<(), ProtocolError> {
        let counterpart = self.role.counterpart();
        let pk = decode_point(&declared.public_key)?;

        match &declared.proof {
            Some(proof) => {
                let proof = SigmaProof::try_from(proof)?;
                let statement = DleqStatement::key_ownership(&self.group, pk);
                if !sigma::verify(&self.group, &statement, &proof) {
                    return Err(ProtocolError::ProofVerificationFailed(format!(
                        "{} key ownership",
                        counterpart
                    )));
                }
            }
            None if self.config.require_key_proofs => {
                return Err(ProtocolError::ProofVerificationFailed(format!(
                    "{} declared a key without proof",
                    counterpart
                )));
            }
            None => {}
        }

        if self.registry.declare(&self.group, counterpart.seat(), pk)?.is_some() {
            info!(role = %self.role, "aggregate key frozen");
            step.effect(SessionEffect::KeysFrozen);
        }
        Ok(())
    }

    /// Mask, shuffle, prove and hand the deck over.
    fn take_turn(&mut self, step: &mut SessionStep) -> Result<(), ProtocolError> {
        let key = self.registry.aggregate()?;
        let Some(deck) = self.deck.as_mut() else {
            return Err(ProtocolError::OutOfTurn("no deck to shuffle".into()));
        };

        let (mask_event, shuffle_event) = match self.role {
            Role::Dealer => (Message::DealerMask, Message::DealerShuffle),
            Role::Player => (Message::PlayerMask, Message::PlayerShuffle),
        };

        step.send(mask_event);
        let mask_proofs = deck.mask_with_proofs(&self.group, &key, &mut self.rng);
        debug!(role = %self.role, cards = mask_proofs.len(), "deck masked");

        step.send(shuffle_event);
        let witness = deck.shuffle(&mut self.rng).clone();
        witness.validate()?;
        let proof = self.backend.generate_proof(&witness)?;

        let mut wire = deck.to_wire(&self.registry.public_keys());
        if !self.config.disclose_permutation {
            wire.witness_data = wire.witness_data.redacted();
        }
        self.reference = deck.cards().to_vec();

        info!(
            role = %self.role,
            deck_hash = %hex::encode(deck.hash()),
            "sending deck"
        );
        step.send(Message::SendDeck(Box::new(DeckHandOff {
            deck: wire,
            proof,
            mask_proofs: Some(mask_proofs.iter().map(SigmaProofHex::from).collect()),
        })));
        Ok(())
    }

    fn accept_deck(
        &mut self,
        hand_off: &DeckHandOff,
        step: &mut SessionStep,
    ) -> Result<(), ProtocolError> {
        let deck = self.verify_hand_off(hand_off)?;
        let deck_hash = hex::encode(deck.hash());
        info!(role = %self.role, deck_hash = %deck_hash, "deck accepted");
        step.effect(SessionEffect::DeckAccepted { deck_hash });
        self.deck = Some(deck);
        Ok(())
    }

    /// Each check is fatal, in this order: points decode, shape, key set, cards match
    /// the witness, masking proofs, shuffle proof.
    fn verify_hand_off(&self, hand_off: &DeckHandOff) -> Result<Deck, ProtocolError> {
        let (deck, public_keys) = Deck::from_wire(&hand_off.deck, &self.group, &self.codec)?;

        let witness = deck.witness();
        witness.validate_shape()?;
        if !witness.permutation.is_empty() {
            witness.validate()?;
        }

        self.registry.ensure_matches(&self.group, &public_keys)?;

        let received: Vec<String> = deck.cards().iter().map(Card::fingerprint).collect();
        if received != witness.shuffled_deck {
            return Err(ProtocolError::ProofVerificationFailed(
                "cards differ from the witness".into(),
            ));
        }

        match &hand_off.mask_proofs {
            Some(proofs) => {
                let proofs = proofs
                    .iter()
                    .map(SigmaProof::try_from)
                    .collect::<Result<Vec<_>, _>>()?;
                let masked = witness
                    .original_deck
                    .iter()
                    .map(|card| Card::from_fingerprint(card))
                    .collect::<Result<Vec<_>, _>>()?;
                let key = self.registry.aggregate()?;
                verify_masking(&self.group, &key, &self.reference, &masked, &proofs)?;
            }
            None if self.config.require_mask_proofs => {
                return Err(ProtocolError::ProofVerificationFailed(
                    "deck arrived without masking proofs".into(),
                ));
            }
            None => {}
        }

        if !self.backend.verify_proof(&hand_off.proof, &witness.public_inputs())? {
            return Err(ProtocolError::ProofVerificationFailed(
                "shuffle proof rejected".into(),
            ));
        }

        Ok(deck)
    }

    /// This participant's unmask share of `index`, with its binding proof.
    fn unmask_share(&mut self, index: usize) -> Result<UnmaskCard, ProtocolError> {
        let Some(deck) = self.deck.as_ref() else {
            return Err(ProtocolError::OutOfTurn("no deck".into()));
        };
        let card = deck.card(index)?;
        let share = card.partial_decrypt(&self.group, self.keys.secret());
        let statement = card.share_statement(&self.group, self.keys.public(), &share);
        let proof = sigma::prove(&self.group, &statement, self.keys.secret(), &mut self.rng);
        debug!(role = %self.role, index, "unmask share");
        Ok(UnmaskCard {
            card_index: index,
            unmask_key: encode_point(&share),
            proof: Some(SigmaProofHex::from(&proof)),
        })
    }

    /// Combines the counterpart's share with our own and decodes the card.
    fn reveal(
        &mut self,
        index: usize,
        share: &UnmaskCard,
        step: &mut SessionStep,
    ) -> Result<u8, ProtocolError> {
        if share.card_index != index {
            return Err(ProtocolError::MalformedMessage(format!(
                "share for card {} while revealing card {}",
                share.card_index, index
            )));
        }
        let Some(deck) = self.deck.as_ref() else {
            return Err(ProtocolError::OutOfTurn("no deck".into()));
        };
        let card = deck.card(index)?;
        let theirs = decode_point(&share.unmask_key)?;

        let counterpart_pk = self
            .registry
            .key(self.role.counterpart().seat())
            .ok_or(ProtocolError::MissingPublicKeys)?;

        match &share.proof {
            Some(proof) => {
                let proof = SigmaProof::try_from(proof)?;
                let statement = card.share_statement(&self.group, &counterpart_pk, &theirs);
                if !sigma::verify(&self.group, &statement, &proof) {
                    return Err(ProtocolError::ProofVerificationFailed(format!(
                        "unmask share of card {}",
                        index
                    )));
                }
            }
            None if self.config.require_share_proofs => {
                return Err(ProtocolError::ProofVerificationFailed(format!(
                    "unmask share of card {} arrived without proof",
                    index
                )));
            }
            None => {}
        }

        let own = card.partial_decrypt(&self.group, self.keys.secret());
        let plaintext = card.unmask(&self.group, &self.codec, &[own, theirs])?;
        let rank = blackjack_rank(plaintext);
        self.table.record_rank(index, rank);

        info!(role = %self.role, index, plaintext, rank, "card revealed");
        step.effect(SessionEffect::CardRevealed {
            index,
            plaintext,
            rank,
        });
        Ok(rank)
    }

    fn deal_player_card(&mut self, step: &mut SessionStep) -> Result<(), ProtocolError> {
        let index = self.table.draw_player()?;
        info!(role = %self.role, index, "dealing card to player");
        step.effect(SessionEffect::CardDealt { index });
        step.send(Message::DealCardPlayer([index]));
        let share = self.unmask_share(index)?;
        step.send(Message::DealerUnmaskCard(share));
        self.state.set_reveal(index);
        Ok(())
    }
}
