use std::collections::VecDeque;

use bjk_ec::{
    card_codec::{CardCodec, DECK_SIZE},
    group::Group,
    keys::KeyPair,
    util::encode_point,
};
use itertools::Itertools;
use rand::{SeedableRng, rngs::StdRng};
use serde_json::json;

use crate::{
    aggregate::{KeyRegistry, register},
    backend::{CommandBackend, OpeningBackend, ShuffleProofBackend},
    config::SessionConfig,
    deck::{Card, Deck, verify_masking},
    error::ProtocolError,
    messages::{DeckHandOff, DeckWire, DeclareKey, Message, PlayerAction, UnmaskCard},
    session::{Session, SessionEffect, SessionEvent},
    session_state::{Outcome, Role, SessionPhase},
    shuffle::WitnessRecord,
    table::{TableState, player_wins},
};

fn rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

fn setup(num_keys: usize, seed: u64) -> (Group, CardCodec, Vec<KeyPair>, StdRng) {
    let group = Group::default();
    let codec = CardCodec::new(&group);
    let mut rng = rng(seed);
    let keys = (0..num_keys)
        .map(|_| KeyPair::generate(&group, &mut rng))
        .collect();
    (group, codec, keys, rng)
}

fn public_keys(keys: &[KeyPair]) -> Vec<bjk_ec::types::PublicKey> {
    keys.iter().map(|k| *k.public()).collect()
}

#[test]
fn test_unmask_with_all_shares() {
    for k in 1..=4 {
        let (group, codec, keys, mut rng) = setup(k, 100 + k as u64);
        let key = register(&group, &public_keys(&keys)).unwrap();

        let mut deck = Deck::new(&group, &codec).unwrap();
        for _ in 0..k {
            deck.mask(&group, &key, &mut rng);
        }

        for index in 0..DECK_SIZE {
            let shares = keys
                .iter()
                .map(|kp| deck.partial_decrypt(index, &group, kp.secret()).unwrap())
                .collect_vec();
            assert_eq!(
                deck.unmask(index, &group, &codec, &shares).unwrap(),
                index + 1,
                "k={} index={}",
                k,
                index
            );
        }
    }
}

#[test]
fn test_unmask_with_missing_share_fails() {
    let (group, codec, keys, mut rng) = setup(2, 7);
    let key = register(&group, &public_keys(&keys)).unwrap();

    let mut deck = Deck::new(&group, &codec).unwrap();
    deck.mask(&group, &key, &mut rng);

    let share = deck.partial_decrypt(3, &group, keys[0].secret()).unwrap();
    assert_eq!(
        deck.unmask(3, &group, &codec, &[share]),
        Err(ProtocolError::UnknownCardEncoding)
    );
    assert!(deck.card(DECK_SIZE).is_err());
}

#[test]
fn test_register_requires_keys() {
    let group = Group::default();
    assert_eq!(register(&group, &[]), Err(ProtocolError::MissingPublicKeys));
}

#[test]
fn test_key_registry_freezes() {
    let (group, _, keys, _) = setup(3, 11);
    let mut registry = KeyRegistry::new(2);

    assert!(!registry.is_frozen());
    assert_eq!(registry.aggregate(), Err(ProtocolError::MissingPublicKeys));
    assert_eq!(registry.declare(&group, 1, *keys[1].public()), Ok(None));

    let frozen = registry
        .declare(&group, 0, *keys[0].public())
        .unwrap()
        .unwrap();
    assert!(registry.is_frozen());
    assert!(group.equals(
        frozen.point(),
        &group.add(keys[0].public(), keys[1].public())
    ));

    // redeclaring the same key is harmless
    assert_eq!(registry.declare(&group, 0, *keys[0].public()), Ok(None));
    assert_eq!(
        registry.declare(&group, 0, *keys[2].public()),
        Err(ProtocolError::AggregateKeyMismatch)
    );
    assert!(registry.declare(&group, 2, *keys[2].public()).is_err());

    let ordered = public_keys(&keys[..2]);
    assert!(registry.ensure_matches(&group, &ordered).is_ok());
    let reversed = ordered.iter().rev().copied().collect_vec();
    assert_eq!(
        registry.ensure_matches(&group, &reversed),
        Err(ProtocolError::AggregateKeyMismatch)
    );
    assert_eq!(
        registry.ensure_matches(&group, &ordered[..1]),
        Err(ProtocolError::AggregateKeyMismatch)
    );
}

#[test]
fn test_key_registry_rejects_identity() {
    let group = Group::default();
    let mut registry = KeyRegistry::new(2);
    assert!(matches!(
        registry.declare(&group, 0, group.identity()),
        Err(ProtocolError::MalformedPoint(_))
    ));
}

#[test]
fn test_shuffle_witness() {
    let (group, codec, keys, mut rng) = setup(2, 21);
    let key = register(&group, &public_keys(&keys)).unwrap();

    let mut deck = Deck::new(&group, &codec).unwrap();
    assert_eq!(deck.witness().permutation, (0..DECK_SIZE).collect_vec());

    deck.mask(&group, &key, &mut rng);
    let before = deck.cards().iter().map(Card::fingerprint).collect_vec();
    let witness = deck.shuffle(&mut rng).clone();

    assert!(witness.validate().is_ok());
    assert_eq!(witness.original_deck, before);
    assert_eq!(
        witness.permutation.iter().copied().sorted().collect_vec(),
        (0..DECK_SIZE).collect_vec()
    );
    for (after, &from) in witness.permutation.iter().enumerate() {
        assert_eq!(witness.shuffled_deck[after], witness.original_deck[from]);
        assert_eq!(deck.cards()[after].fingerprint(), witness.shuffled_deck[after]);
    }

    // a second shuffle starts from the state the first one left
    deck.mask(&group, &key, &mut rng);
    let before = deck.cards().iter().map(Card::fingerprint).collect_vec();
    let second = deck.shuffle(&mut rng).clone();
    assert!(second.validate().is_ok());
    assert_eq!(second.original_deck, before);
    assert_ne!(second.original_deck, witness.shuffled_deck);
}

#[test]
fn test_witness_validate_rejections() {
    let (group, codec, _, mut rng) = setup(0, 31);
    let mut deck = Deck::new(&group, &codec).unwrap();
    let witness = deck.shuffle(&mut rng).clone();
    assert!(witness.validate().is_ok());

    let mut repeated = witness.clone();
    repeated.permutation[1] = repeated.permutation[0];
    assert!(matches!(
        repeated.validate(),
        Err(ProtocolError::InvalidPermutationWitness(_))
    ));

    let mut out_of_bounds = witness.clone();
    out_of_bounds.permutation[0] = DECK_SIZE;
    assert!(matches!(
        out_of_bounds.validate(),
        Err(ProtocolError::InvalidPermutationWitness(_))
    ));

    let mut short = witness.clone();
    short.shuffled_deck.pop();
    assert!(short.validate_shape().is_err());
    assert!(short.validate().is_err());

    let mut swapped = witness.clone();
    swapped.shuffled_deck.swap(0, 1);
    assert!(matches!(
        swapped.validate(),
        Err(ProtocolError::InvalidPermutationWitness(_))
    ));

    let redacted = witness.redacted();
    assert!(redacted.permutation.is_empty());
    assert!(redacted.validate_shape().is_ok());
    assert!(redacted.validate().is_err());
    assert_eq!(redacted.public_inputs(), witness.public_inputs());

    assert!(WitnessRecord::default().validate_shape().is_err());
}

#[test]
fn test_masking_proofs() {
    let (group, codec, keys, mut rng) = setup(3, 41);
    let key = register(&group, &public_keys(&keys[..2])).unwrap();
    let other_key = register(&group, &public_keys(&keys[1..])).unwrap();

    let fresh = Deck::new(&group, &codec).unwrap();
    let mut deck = fresh.clone();
    let proofs = deck.mask_with_proofs(&group, &key, &mut rng);
    assert_eq!(proofs.len(), DECK_SIZE);

    assert!(verify_masking(&group, &key, fresh.cards(), deck.cards(), &proofs).is_ok());

    let mut reordered = deck.cards().to_vec();
    reordered.swap(0, 1);
    assert!(matches!(
        verify_masking(&group, &key, fresh.cards(), &reordered, &proofs),
        Err(ProtocolError::ProofVerificationFailed(_))
    ));

    assert!(verify_masking(&group, &other_key, fresh.cards(), deck.cards(), &proofs).is_err());
    assert!(verify_masking(&group, &key, fresh.cards(), deck.cards(), &proofs[1..]).is_err());

    // a card replaced by a fresh encryption of another plaintext
    let mut substituted = deck.cards().to_vec();
    let r = group.random_scalar(&mut rng);
    substituted[5] = Card::fresh(&group, &codec, 40).unwrap().mask(&group, &key, &r);
    assert!(verify_masking(&group, &key, fresh.cards(), &substituted, &proofs).is_err());
}

#[test]
fn test_card_fingerprint() {
    let (group, codec, keys, mut rng) = setup(1, 51);
    let key = register(&group, &public_keys(&keys)).unwrap();
    let r = group.random_scalar(&mut rng);
    let card = Card::fresh(&group, &codec, 12).unwrap().mask(&group, &key, &r);

    let fingerprint = card.fingerprint();
    assert_eq!(fingerprint.len(), 384);
    assert_eq!(Card::from_fingerprint(&fingerprint).unwrap(), card);
    assert!(Card::from_fingerprint(&fingerprint[2..]).is_err());
    assert!(Card::from_fingerprint(&fingerprint.to_uppercase()).is_err());

    // unmasked cards carry the identity, encoded as zeros
    let fresh = Card::fresh(&group, &codec, 1).unwrap();
    assert!(fresh.fingerprint().starts_with(&"0".repeat(192)));
    assert_eq!(Card::from_fingerprint(&fresh.fingerprint()).unwrap(), fresh);
}

#[test]
fn test_deck_wire_round_trip() {
    let (group, codec, keys, mut rng) = setup(2, 61);
    let pks = public_keys(&keys);
    let key = register(&group, &pks).unwrap();

    let mut deck = Deck::new(&group, &codec).unwrap();
    deck.mask(&group, &key, &mut rng);
    deck.shuffle(&mut rng);

    let wire = deck.to_wire(&pks);
    let data = serde_json::to_string(&wire).unwrap();
    let back: DeckWire = serde_json::from_str(&data).unwrap();
    assert_eq!(back, wire);

    let (restored, restored_keys) = Deck::from_wire(&back, &group, &codec).unwrap();
    assert_eq!(restored.cards(), deck.cards());
    assert_eq!(restored.original_cards(), deck.original_cards());
    assert_eq!(restored.witness(), deck.witness());
    assert_eq!(restored.hash(), deck.hash());
    assert_eq!(
        restored_keys.iter().map(encode_point).collect_vec(),
        wire.public_keys
    );

    let mut truncated = wire.clone();
    truncated.cards.pop();
    assert!(matches!(
        Deck::from_wire(&truncated, &group, &codec),
        Err(ProtocolError::InvalidPermutationWitness(_))
    ));

    let mut broken = wire;
    broken.cards[0].a.x = "zz".repeat(48);
    assert!(matches!(
        Deck::from_wire(&broken, &group, &codec),
        Err(ProtocolError::MalformedPoint(_))
    ));
}

#[test]
fn test_opening_backend() {
    let (group, codec, keys, mut rng) = setup(1, 71);
    let key = register(&group, &public_keys(&keys)).unwrap();

    let mut deck = Deck::new(&group, &codec).unwrap();
    deck.mask(&group, &key, &mut rng);
    let witness = deck.shuffle(&mut rng).clone();

    let backend = OpeningBackend;
    let proof = backend.generate_proof(&witness).unwrap();
    assert_eq!(proof.proof["scheme"], "opening-v1");
    assert!(backend.verify_proof(&proof, &witness.public_inputs()).unwrap());

    let mut other_inputs = witness.public_inputs();
    other_inputs.shuffled_deck.swap(0, 1);
    assert!(!backend.verify_proof(&proof, &other_inputs).unwrap());

    let mut wrong_permutation = proof.clone();
    let mut permutation = witness.permutation.clone();
    permutation.swap(0, 1);
    wrong_permutation.proof["permutation"] = json!(permutation);
    assert!(!backend.verify_proof(&wrong_permutation, &witness.public_inputs()).unwrap());

    let mut wrong_scheme = proof;
    wrong_scheme.proof["scheme"] = json!("groth16");
    assert!(!backend.verify_proof(&wrong_scheme, &witness.public_inputs()).unwrap());

    let boxed: Box<dyn ShuffleProofBackend> = Box::new(OpeningBackend);
    assert!(boxed.generate_proof(&witness).is_ok());
}

#[test]
fn test_command_backend_reports_missing_prover() {
    let dir = std::env::temp_dir().join(format!("bjk_prover_{}", std::process::id()));
    let backend = CommandBackend::new("bjk-no-such-prover", &dir);
    let witness = WitnessRecord::default();
    assert!(matches!(
        backend.generate_proof(&witness),
        Err(ProtocolError::ProofBackendError(_))
    ));
    let _ = std::fs::remove_dir_all(&dir);
}

#[cfg(unix)]
#[test]
fn test_command_backend_uses_exit_status() {
    let dir = std::env::temp_dir().join(format!("bjk_verifier_{}", std::process::id()));
    let (group, codec, _, mut rng) = setup(0, 81);
    let mut deck = Deck::new(&group, &codec).unwrap();
    let witness = deck.shuffle(&mut rng).clone();
    let proof = OpeningBackend.generate_proof(&witness).unwrap();

    let accepting = CommandBackend::new("true", &dir).with_verify_args(vec![]);
    assert!(accepting.verify_proof(&proof, &witness.public_inputs()).unwrap());
    assert!(dir.join("public_inputs.json").exists());

    let rejecting = CommandBackend::new("false", &dir).with_verify_args(vec![]);
    assert!(!rejecting.verify_proof(&proof, &witness.public_inputs()).unwrap());

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_table_dealing_order() {
    let mut table = TableState::new();
    assert_eq!(table.draw_dealer(), Ok(0));
    assert!(table.accept_player_card(2).is_err());
    assert!(table.accept_player_card(1).is_ok());
    assert_eq!(table.draw_player(), Ok(2));
    assert_eq!(table.player_cards(), &[1, 2]);
    assert!(!table.all_player_cards_revealed());

    table.record_rank(1, 10);
    table.record_rank(2, 11);
    table.record_rank(0, 5);
    assert!(table.all_player_cards_revealed());
    assert_eq!(table.player_total(), 21);
    assert_eq!(table.dealer_rank(), Some(5));
    assert!(!table.is_player_bust());

    for _ in 3..DECK_SIZE {
        table.draw_player().unwrap();
    }
    assert_eq!(table.draw_player(), Err(ProtocolError::DeckExhausted));
}

#[test]
fn test_player_wins_rule() {
    assert!(player_wins(10, 11));
    assert!(player_wins(19, 2));
    assert!(!player_wins(19, 3));
    assert!(!player_wins(22, 0));
}

#[test]
fn test_session_config() {
    let config = SessionConfig::default();
    assert_eq!(config.message_timeout().as_millis(), 30_000);
    assert!(config.require_key_proofs && config.require_share_proofs && config.require_mask_proofs);
    assert!(!config.disclose_permutation);

    let partial: SessionConfig =
        serde_json::from_str(r#"{"disclose_permutation": true, "message_timeout_ms": 5}"#)
            .unwrap();
    assert!(partial.disclose_permutation);
    assert_eq!(partial.message_timeout_ms, 5);
    assert!(partial.require_mask_proofs);
}

#[test]
fn test_message_json_shapes() {
    let group = Group::default();
    let point = encode_point(&group.generator());

    assert_eq!(
        serde_json::to_value(&Message::Connected).unwrap(),
        json!({"event": "connected"})
    );
    assert_eq!(
        serde_json::to_value(&Message::DealCardPlayer([1])).unwrap(),
        json!({"event": "deal-card-player", "data": [1]})
    );
    assert_eq!(
        serde_json::to_value(&Message::RevealDealerCard([0])).unwrap(),
        json!({"event": "reveal-dealer-card", "data": [0]})
    );
    assert_eq!(
        serde_json::to_value(&Message::PlayerAction(PlayerAction::Hit)).unwrap(),
        json!({"event": "player-action", "data": {"type": "hit"}})
    );
    assert_eq!(
        serde_json::to_value(&Message::GameResult(1)).unwrap(),
        json!({"event": "result", "data": 1})
    );
    assert_eq!(
        serde_json::to_value(&Message::PlayerDeclarePk(DeclareKey {
            public_key: point.clone(),
            proof: None,
        }))
        .unwrap(),
        json!({"event": "player-declare-PK", "data": {"publicKey": {"x": point.x, "y": point.y}}})
    );
    assert_eq!(
        serde_json::to_value(&Message::DealerUnmaskCard(UnmaskCard {
            card_index: 4,
            unmask_key: point.clone(),
            proof: None,
        }))
        .unwrap(),
        json!({
            "event": "dealer-unmask-card",
            "data": {"cardIndex": 4, "unmaskKey": {"x": point.x, "y": point.y}}
        })
    );

    for message in [
        Message::DealerMask,
        Message::DealerShuffle,
        Message::PlayerMask,
        Message::PlayerShuffle,
        Message::GameStart,
    ] {
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["event"], message.event_name());
        assert_eq!(Message::from_json(&message.to_json().unwrap()).unwrap(), message);
    }

    assert_eq!(
        Message::from_json(r#"{"event":"player-action","data":{"type":"stand"}}"#).unwrap(),
        Message::PlayerAction(PlayerAction::Stand)
    );
    assert!(matches!(
        Message::from_json(r#"{"event":"fold"}"#),
        Err(ProtocolError::MalformedMessage(_))
    ));
}

#[derive(Default)]
struct Transcript {
    hand_offs: Vec<DeckHandOff>,
    dealer_effects: Vec<SessionEffect>,
    player_effects: Vec<SessionEffect>,
}

fn new_sessions(config: SessionConfig, seed: u64) -> (Session<OpeningBackend>, Session<OpeningBackend>) {
    let dealer = Session::new(Role::Dealer, config.clone(), OpeningBackend, rng(seed)).unwrap();
    let player = Session::new(Role::Player, config, OpeningBackend, rng(seed + 1)).unwrap();
    (dealer, player)
}

/// Delivers every message through its JSON form until both sides go quiet. The player
/// hits while its total is below `stand_on`. `tamper` sees each message before delivery.
fn play(
    dealer: &mut Session<OpeningBackend>,
    player: &mut Session<OpeningBackend>,
    stand_on: u32,
    mut tamper: impl FnMut(&mut Message),
) -> Result<Transcript, ProtocolError> {
    let mut transcript = Transcript::default();
    let mut queue: VecDeque<(Role, Message)> = dealer
        .start()?
        .outbound
        .into_iter()
        .map(|m| (Role::Player, m))
        .collect();

    while let Some((to, message)) = queue.pop_front() {
        let mut message = Message::from_json(&message.to_json()?)?;
        tamper(&mut message);
        if let Message::SendDeck(hand_off) = &message {
            transcript.hand_offs.push((**hand_off).clone());
        }

        let session = match to {
            Role::Dealer => &mut *dealer,
            Role::Player => &mut *player,
        };
        let step = session.step(SessionEvent::Inbound(message))?;
        match to {
            Role::Dealer => transcript.dealer_effects.extend(step.effects),
            Role::Player => transcript.player_effects.extend(step.effects),
        }
        queue.extend(step.outbound.into_iter().map(|m| (to.counterpart(), m)));

        if player.can_act() {
            let action = if player.table().player_total() < stand_on {
                PlayerAction::Hit
            } else {
                PlayerAction::Stand
            };
            let step = player.act(action)?;
            queue.extend(step.outbound.into_iter().map(|m| (Role::Dealer, m)));
        }
    }

    Ok(transcript)
}

fn revealed(effects: &[SessionEffect]) -> Vec<(usize, usize, u8)> {
    effects
        .iter()
        .filter_map(|e| match e {
            SessionEffect::CardRevealed {
                index,
                plaintext,
                rank,
            } => Some((*index, *plaintext, *rank)),
            _ => None,
        })
        .collect()
}

fn finished(effects: &[SessionEffect]) -> Option<bool> {
    effects.iter().find_map(|e| match e {
        SessionEffect::Finished { player_won } => Some(*player_won),
        _ => None,
    })
}

#[test]
fn test_end_to_end_reveals_composed_permutation() {
    let config = SessionConfig {
        disclose_permutation: true,
        ..SessionConfig::default()
    };
    let (mut dealer, mut player) = new_sessions(config, 1000);

    let transcript = play(&mut dealer, &mut player, 17, |_| {}).unwrap();

    assert_eq!(transcript.hand_offs.len(), 2);
    let perm_dealer = &transcript.hand_offs[0].deck.witness_data.permutation;
    let perm_player = &transcript.hand_offs[1].deck.witness_data.permutation;
    assert_eq!(perm_dealer.len(), DECK_SIZE);
    assert_eq!(perm_player.len(), DECK_SIZE);

    let player_view = revealed(&transcript.player_effects);
    let dealer_view = revealed(&transcript.dealer_effects);
    assert!(!player_view.is_empty());
    assert_eq!(player_view[0].0, 1);
    assert_eq!(player_view[0].1, perm_dealer[perm_player[1]] + 1);
    assert_eq!(player_view, dealer_view);

    for (index, plaintext, _) in &player_view {
        assert_eq!(*plaintext, perm_dealer[perm_player[*index]] + 1);
    }
    assert!(player_view.iter().map(|(index, _, _)| index).all_unique());

    assert!(transcript.player_effects.contains(&SessionEffect::KeysFrozen));
    assert!(transcript.dealer_effects.contains(&SessionEffect::KeysFrozen));

    let dealer_result = finished(&transcript.dealer_effects).unwrap();
    assert_eq!(finished(&transcript.player_effects), Some(dealer_result));
    assert!(dealer.is_terminal() && player.is_terminal());
    assert_eq!(
        dealer.phase(),
        SessionPhase::Terminal(if dealer_result {
            Outcome::PlayerWon
        } else {
            Outcome::PlayerLost
        })
    );

    let player_total = player.table().player_total();
    match player.table().dealer_rank() {
        Some(dealer_rank) => assert_eq!(dealer_result, player_wins(player_total, dealer_rank)),
        None => {
            assert!(player.table().is_player_bust());
            assert!(!dealer_result);
        }
    }

    assert!(matches!(
        player.step(SessionEvent::Inbound(Message::GameStart)),
        Err(ProtocolError::SessionClosed)
    ));
}

#[test]
fn test_end_to_end_hides_permutation_by_default() {
    let (mut dealer, mut player) = new_sessions(SessionConfig::default(), 2000);
    let transcript = play(&mut dealer, &mut player, 17, |_| {}).unwrap();

    assert_eq!(transcript.hand_offs.len(), 2);
    for hand_off in &transcript.hand_offs {
        assert!(hand_off.deck.witness_data.permutation.is_empty());
        assert_eq!(hand_off.mask_proofs.as_ref().map(Vec::len), Some(DECK_SIZE));
        assert_eq!(hand_off.deck.public_keys.len(), 2);
    }
    assert!(finished(&transcript.dealer_effects).is_some());
    assert_eq!(
        finished(&transcript.dealer_effects),
        finished(&transcript.player_effects)
    );
}

#[test]
fn test_hitting_past_21_loses() {
    let (mut dealer, mut player) = new_sessions(SessionConfig::default(), 3000);
    let transcript = play(&mut dealer, &mut player, 22, |_| {}).unwrap();

    assert!(player.table().is_player_bust());
    assert_eq!(player.table().dealer_rank(), None);
    assert_eq!(finished(&transcript.player_effects), Some(false));
    assert_eq!(dealer.phase(), SessionPhase::Terminal(Outcome::PlayerLost));
}

#[test]
fn test_hand_off_json_shape() {
    let (mut dealer, mut player) = new_sessions(SessionConfig::default(), 4000);
    let mut seen = None;
    play(&mut dealer, &mut player, 0, |message| {
        if seen.is_none() && matches!(message, Message::SendDeck(_)) {
            seen = Some(serde_json::to_value(&*message).unwrap());
        }
    })
    .unwrap();

    let value = seen.unwrap();
    assert_eq!(value["event"], "send-deck");
    let data = &value["data"];
    for field in ["public_keys", "witness_data", "cards", "proof", "mask_proofs"] {
        assert!(data.get(field).is_some(), "missing {}", field);
    }
    assert_eq!(data["cards"].as_array().unwrap().len(), DECK_SIZE);
    assert!(data["cards"][0]["A"]["x"].is_string());
    assert!(data["proof"]["public_signals"].is_array());
    assert_eq!(
        data["witness_data"]["original_deck"][0].as_str().unwrap().len(),
        384
    );
}

/// Runs a game whose first `send-deck` is altered by `tamper`.
fn play_with_first_hand_off(
    seed: u64,
    config: SessionConfig,
    mut tamper: impl FnMut(&mut DeckHandOff),
) -> (Result<Transcript, ProtocolError>, Session<OpeningBackend>) {
    let (mut dealer, mut player) = new_sessions(config, seed);
    let mut done = false;
    let result = play(&mut dealer, &mut player, 17, |message| {
        if let Message::SendDeck(hand_off) = message {
            if !done {
                tamper(hand_off);
                done = true;
            }
        }
    });
    (result, player)
}

#[test]
fn test_swapped_cards_abort() {
    let (result, player) =
        play_with_first_hand_off(5000, SessionConfig::default(), |h| h.deck.cards.swap(0, 1));
    assert!(matches!(
        result,
        Err(ProtocolError::ProofVerificationFailed(_))
    ));
    assert_eq!(player.phase(), SessionPhase::Terminal(Outcome::Aborted));
    assert!(player.deck().is_none());
}

#[test]
fn test_consistently_swapped_cards_fail_shuffle_proof() {
    // cards and the witness agree, but the shuffle proof was made for the other order
    let (result, _) = play_with_first_hand_off(5100, SessionConfig::default(), |h| {
        h.deck.cards.swap(0, 1);
        h.deck.witness_data.shuffled_deck.swap(0, 1);
    });
    assert!(matches!(
        result,
        Err(ProtocolError::ProofVerificationFailed(_))
    ));
}

#[test]
fn test_wrong_key_list_aborts() {
    let (result, _) = play_with_first_hand_off(5200, SessionConfig::default(), |h| {
        h.deck.public_keys.reverse()
    });
    assert_eq!(result.err(), Some(ProtocolError::AggregateKeyMismatch));
}

#[test]
fn test_bad_shuffle_proof_aborts() {
    let (result, _) = play_with_first_hand_off(5300, SessionConfig::default(), |h| {
        h.proof.public_signals = json!(["00"])
    });
    assert!(matches!(
        result,
        Err(ProtocolError::ProofVerificationFailed(_))
    ));
}

#[test]
fn test_missing_mask_proofs() {
    let (result, _) =
        play_with_first_hand_off(5400, SessionConfig::default(), |h| h.mask_proofs = None);
    assert!(matches!(
        result,
        Err(ProtocolError::ProofVerificationFailed(_))
    ));

    let lenient = SessionConfig {
        require_mask_proofs: false,
        ..SessionConfig::default()
    };
    let (result, _) = play_with_first_hand_off(5400, lenient, |h| h.mask_proofs = None);
    assert!(result.is_ok());
}

#[test]
fn test_missing_key_proof_aborts() {
    let (mut dealer, mut player) = new_sessions(SessionConfig::default(), 6000);
    let result = play(&mut dealer, &mut player, 17, |message| {
        if let Message::PlayerDeclarePk(declared) = message {
            declared.proof = None;
        }
    });
    assert!(matches!(
        result,
        Err(ProtocolError::ProofVerificationFailed(_))
    ));
    assert_eq!(dealer.phase(), SessionPhase::Terminal(Outcome::Aborted));
}

#[test]
fn test_forged_share_aborts() {
    let group = Group::default();
    let (mut dealer, mut player) = new_sessions(SessionConfig::default(), 7000);
    let result = play(&mut dealer, &mut player, 17, |message| {
        if let Message::DealerUnmaskCard(share) = message {
            share.unmask_key = encode_point(&group.generator());
        }
    });
    assert!(matches!(
        result,
        Err(ProtocolError::ProofVerificationFailed(_))
    ));
    assert_eq!(player.phase(), SessionPhase::Terminal(Outcome::Aborted));
}

#[test]
fn test_unproven_forged_share_fails_to_decode() {
    let group = Group::default();
    let config = SessionConfig {
        require_share_proofs: false,
        ..SessionConfig::default()
    };
    let (mut dealer, mut player) = new_sessions(config, 7100);
    let result = play(&mut dealer, &mut player, 17, |message| {
        if let Message::DealerUnmaskCard(share) = message {
            share.unmask_key = encode_point(&group.generator());
            share.proof = None;
        }
    });
    assert_eq!(result.err(), Some(ProtocolError::UnknownCardEncoding));
}

#[test]
fn test_disconnect_and_timeout_abort() {
    let (mut dealer, mut player) = new_sessions(SessionConfig::default(), 8000);
    dealer.start().unwrap();

    assert_eq!(
        dealer.step(SessionEvent::Disconnected).err(),
        Some(ProtocolError::NetworkDisconnect)
    );
    assert_eq!(dealer.phase(), SessionPhase::Terminal(Outcome::Aborted));
    assert!(dealer.deck().is_none());
    assert_eq!(
        dealer.step(SessionEvent::TimedOut).err(),
        Some(ProtocolError::SessionClosed)
    );
    assert_eq!(dealer.start().err(), Some(ProtocolError::SessionClosed));

    assert_eq!(
        player.step(SessionEvent::TimedOut).err(),
        Some(ProtocolError::Timeout)
    );
    assert!(player.is_terminal());
}

#[test]
fn test_unexpected_message_aborts() {
    let (_, mut player) = new_sessions(SessionConfig::default(), 9000);
    assert!(matches!(
        player.step(SessionEvent::Inbound(Message::GameStart)),
        Err(ProtocolError::UnexpectedMessage { .. })
    ));
    assert_eq!(player.phase(), SessionPhase::Terminal(Outcome::Aborted));
}

/// Delivers messages until both sides go quiet, without taking any player decision.
fn deliver(
    dealer: &mut Session<OpeningBackend>,
    player: &mut Session<OpeningBackend>,
    mut queue: VecDeque<(Role, Message)>,
) -> Result<(), ProtocolError> {
    while let Some((to, message)) = queue.pop_front() {
        let session = match to {
            Role::Dealer => &mut *dealer,
            Role::Player => &mut *player,
        };
        let step = session.step(SessionEvent::Inbound(message))?;
        queue.extend(step.outbound.into_iter().map(|m| (to.counterpart(), m)));
    }
    Ok(())
}

/// Both sessions dealt in, the player holding one revealed card and about to decide.
fn sessions_awaiting_action(seed: u64) -> (Session<OpeningBackend>, Session<OpeningBackend>) {
    let (mut dealer, mut player) = new_sessions(SessionConfig::default(), seed);
    let queue = dealer
        .start()
        .unwrap()
        .outbound
        .into_iter()
        .map(|m| (Role::Player, m))
        .collect();
    deliver(&mut dealer, &mut player, queue).unwrap();
    assert!(player.can_act());
    assert_eq!(player.table().player_cards(), &[1]);
    (dealer, player)
}

fn assert_aborted_unexpected(player: &mut Session<OpeningBackend>, message: Message) {
    assert!(matches!(
        player.step(SessionEvent::Inbound(message)),
        Err(ProtocolError::UnexpectedMessage { .. })
    ));
    assert_eq!(player.phase(), SessionPhase::Terminal(Outcome::Aborted));
    assert!(player.deck().is_none());
}

#[test]
fn test_unrequested_deal_aborts() {
    let (_, mut player) = sessions_awaiting_action(9300);
    assert_aborted_unexpected(&mut player, Message::DealCardPlayer([2]));
    assert_eq!(player.table().player_cards(), &[1]);
}

#[test]
fn test_deal_after_stand_aborts() {
    let (_, mut player) = sessions_awaiting_action(9310);
    player.act(PlayerAction::Stand).unwrap();
    assert_aborted_unexpected(&mut player, Message::DealCardPlayer([2]));
}

#[test]
fn test_hit_is_answered_by_one_deal() {
    let (mut dealer, mut player) = sessions_awaiting_action(9320);
    let hit = player.act(PlayerAction::Hit).unwrap().outbound;
    let queue = hit.into_iter().map(|m| (Role::Dealer, m)).collect();
    deliver(&mut dealer, &mut player, queue).unwrap();
    assert_eq!(player.table().player_cards(), &[1, 2]);

    if !player.is_terminal() {
        assert!(player.can_act());
        assert_aborted_unexpected(&mut player, Message::DealCardPlayer([3]));
    }
}

#[test]
fn test_dealer_reveal_before_stand_aborts() {
    let (_, mut player) = sessions_awaiting_action(9330);
    assert_aborted_unexpected(&mut player, Message::RevealDealerCard([0]));

    let (_, mut player) = sessions_awaiting_action(9340);
    player.act(PlayerAction::Hit).unwrap();
    assert_aborted_unexpected(&mut player, Message::RevealDealerCard([0]));
}

#[test]
fn test_premature_result_aborts() {
    let (_, mut player) = sessions_awaiting_action(9350);
    assert_aborted_unexpected(&mut player, Message::GameResult(0));

    let (_, mut player) = sessions_awaiting_action(9360);
    player.act(PlayerAction::Stand).unwrap();
    assert_aborted_unexpected(&mut player, Message::GameResult(1));
}

#[test]
fn test_forged_result_aborts() {
    for (seed, stand_on) in [(9400, 17), (9410, 30)] {
        let (mut dealer, mut player) = new_sessions(SessionConfig::default(), seed);
        let result = play(&mut dealer, &mut player, stand_on, |message| {
            if let Message::GameResult(r) = message {
                *r = 1 - *r;
            }
        });
        assert!(matches!(
            result,
            Err(ProtocolError::ProofVerificationFailed(_))
        ));
        assert_eq!(player.phase(), SessionPhase::Terminal(Outcome::Aborted));
    }
}

#[test]
fn test_undecodable_data_aborts() {
    let (_, mut player) = sessions_awaiting_action(9500);
    let event = SessionEvent::decode(r#"{"event":"deal-card-player","data":"two"}"#);
    assert!(matches!(event, SessionEvent::Malformed(_)));
    assert!(matches!(
        player.step(event),
        Err(ProtocolError::MalformedMessage(_))
    ));
    assert_eq!(player.phase(), SessionPhase::Terminal(Outcome::Aborted));

    assert_eq!(
        SessionEvent::decode(&Message::GameStart.to_json().unwrap()),
        SessionEvent::Inbound(Message::GameStart)
    );
}

#[test]
fn test_act_out_of_turn_keeps_session() {
    let (mut dealer, mut player) = new_sessions(SessionConfig::default(), 9100);
    assert!(matches!(
        player.act(PlayerAction::Hit),
        Err(ProtocolError::OutOfTurn(_))
    ));
    assert_eq!(player.phase(), SessionPhase::KeyExchange);

    assert!(matches!(
        dealer.act(PlayerAction::Stand),
        Err(ProtocolError::OutOfTurn(_))
    ));
    assert_eq!(dealer.phase(), SessionPhase::KeyExchange);

    // the session still plays out afterwards
    let transcript = play(&mut dealer, &mut player, 17, |_| {}).unwrap();
    assert!(finished(&transcript.player_effects).is_some());
}

#[test]
fn test_session_keys_are_frozen_in_seat_order() {
    let (mut dealer, mut player) = new_sessions(SessionConfig::default(), 9200);
    play(&mut dealer, &mut player, 17, |_| {}).unwrap();

    let group = Group::default();
    let dealer_keys = dealer.public_keys();
    let player_keys = player.public_keys();
    assert_eq!(dealer_keys.len(), 2);
    assert!(group.equals(&dealer_keys[0], dealer.public_key()));
    assert!(group.equals(&dealer_keys[1], player.public_key()));
    assert!(
        dealer_keys
            .iter()
            .zip(&player_keys)
            .all(|(a, b)| group.equals(a, b))
    );
}
