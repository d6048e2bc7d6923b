// Copyright © cabo 2024-present
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//   https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The Cabo game engine: a pure step function driven by typed messages.
//! [step] handles exactly one [EngineMessage] and never recurses; [process]
//! is the entry point the room loop actually calls, draining the follow-up
//! messages a single step can enqueue (e.g. an implicit `NEXT_TURN` after a
//! resolved stack) until none remain.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use data::actions::message::{EngineMessage, PlayerIntent, SystemIntent};
use data::core::primitives::{PlayerId, TimerId};
use data::events::event::{EventKind, GameEvent};
use data::game_states::game_state::{GameState, KingViewState, SpecialAction};
use data::game_states::phase::{GamePhase, SpecialActionKind};
use data::game_states::timers::ArmedTimer;
use data::game_states::visibility::Slot;
use rand::Rng;
use tracing::instrument;
use utils::outcome::Value;
use utils::verify;

use crate::legality;
use crate::mutations::{self, SPECIAL_ACTION_TIMEOUT_SECS};
use crate::queries;

/// Everything produced by handling one message: events to append to the
/// room's stream, in order; any follow-up messages to feed straight back
/// through [step]; and whether the orchestrator should write a new
/// checkpoint.
#[derive(Debug, Default)]
pub struct StepResult {
    pub events: Vec<GameEvent>,
    pub follow_ups: Vec<EngineMessage>,
    pub checkpoint_requested: bool,
}

impl StepResult {
    fn with_event(kind: EventKind, now: DateTime<Utc>) -> Self {
        let mut result = Self::default();
        result.events.push(GameEvent::new(kind, now));
        result
    }
}

/// Runs `message` and every follow-up message it enqueues, to completion.
/// This is the function the room loop calls; [step] alone only ever
/// processes one message.
#[instrument(skip(game), level = "debug")]
pub fn process(game: &mut GameState, message: EngineMessage, now: DateTime<Utc>) -> Value<StepResult> {
    let mut result = step(game, message, now)?;
    let mut pending: VecDeque<EngineMessage> = result.follow_ups.drain(..).collect();

    while let Some(next) = pending.pop_front() {
        match step(game, next, now) {
            Ok(mut step_result) => {
                result.events.append(&mut step_result.events);
                result.checkpoint_requested |= step_result.checkpoint_requested;
                pending.extend(step_result.follow_ups.drain(..));
            }
            Err(utils::outcome::StopCondition::Rejected(_)) => {
                // A follow-up the Engine itself enqueued was rejected; this
                // can only happen for a logic error in this module, so we
                // simply drop it rather than failing the whole batch.
            }
            Err(error @ utils::outcome::StopCondition::Error(_)) => return Err(error),
        }
    }

    Ok(result)
}

/// Handles exactly one message against `game`, returning the events and
/// follow-ups it produced. Validation failures are rejections, not errors:
/// state and event log are left completely unchanged.
#[instrument(skip(game), level = "debug")]
pub fn step(game: &mut GameState, message: EngineMessage, now: DateTime<Utc>) -> Value<StepResult> {
    match message {
        EngineMessage::Player { player, intent } => handle_player_intent(game, player, intent, now),
        EngineMessage::System(intent) => handle_system_intent(game, intent, now),
    }
}

fn handle_player_intent(
    game: &mut GameState,
    player: PlayerId,
    intent: PlayerIntent,
    now: DateTime<Utc>,
) -> Value<StepResult> {
    match intent {
        PlayerIntent::DrawCard => draw_card(game, player, now),
        PlayerIntent::PlayDrawnCard => play_drawn_card(game, player, now),
        PlayerIntent::ReplaceAndPlay { hand_index } => replace_and_play(game, player, hand_index, now),
        PlayerIntent::CallStack => call_stack(game, player, now),
        PlayerIntent::ExecuteStack { card_index, target } => {
            execute_stack(game, player, card_index, target, now)
        }
        PlayerIntent::CallCabo => call_cabo(game, player, now),
        PlayerIntent::ViewOwnCard { card_index } => view_own_card(game, player, card_index, now),
        PlayerIntent::ViewOpponentCard { target, card_index } => {
            view_opponent_card(game, player, target, card_index, now)
        }
        PlayerIntent::SwapCards { own_index, target, target_index } => {
            swap_cards(game, player, own_index, target, target_index, now)
        }
        PlayerIntent::KingViewCard { target, card_index } => {
            king_view_card(game, player, target, card_index, now)
        }
        PlayerIntent::KingSwapCards { own_index, target, target_index } => {
            king_swap_cards(game, player, own_index, target, target_index, now)
        }
        PlayerIntent::KingSkipSwap => king_skip_swap(game, player, now),
    }
}

fn handle_system_intent(game: &mut GameState, intent: SystemIntent, now: DateTime<Utc>) -> Value<StepResult> {
    match intent {
        SystemIntent::SetupTimeout { timer } => setup_timeout(game, timer, now),
        SystemIntent::StackTimeout { timer } => stack_timeout(game, timer, now),
        SystemIntent::SpecialActionTimeout { timer } => special_action_timeout(game, timer, now),
        SystemIntent::TurnTransitionTimeout { timer } => turn_transition_timeout(game, timer, now),
        SystemIntent::NextTurn => next_turn(game, now),
        SystemIntent::EndGame => end_game(game, now),
    }
}

// ---------------------------------------------------------------------
// Draw / play
// ---------------------------------------------------------------------

fn draw_card(game: &mut GameState, player: PlayerId, now: DateTime<Utc>) -> Value<StepResult> {
    verify!(game.phase == GamePhase::Playing, "draw_card outside the playing phase");
    verify!(queries::is_current_player(game, player), "draw_card by a player who is not on turn");
    verify!(game.drawn_card.is_none(), "duplicate draw in the same turn");
    verify!(!game.deck.is_empty(), "draw_card with an empty deck");

    let card = game.deck.draw().expect("checked non-empty above");
    game.drawn_card = Some(card);
    Ok(StepResult::with_event(EventKind::CardDrawn { player }, now))
}

fn play_drawn_card(game: &mut GameState, player: PlayerId, now: DateTime<Utc>) -> Value<StepResult> {
    verify!(game.phase == GamePhase::Playing, "play_drawn_card outside the playing phase");
    verify!(queries::is_current_player(game, player), "play_drawn_card by a player who is not on turn");
    verify!(game.drawn_card.is_some(), "play_drawn_card without a drawn card");

    let card = game.drawn_card.take().expect("checked above");
    game.discard_pile.push(card);

    let mut result = StepResult::with_event(EventKind::CardPlayed { player, card }, now);
    resolve_played_card(game, player, card, now, &mut result);
    Ok(result)
}

fn replace_and_play(
    game: &mut GameState,
    player: PlayerId,
    hand_index: usize,
    now: DateTime<Utc>,
) -> Value<StepResult> {
    verify!(game.phase == GamePhase::Playing, "replace_and_play outside the playing phase");
    verify!(queries::is_current_player(game, player), "replace_and_play by a player who is not on turn");
    verify!(game.drawn_card.is_some(), "replace_and_play without a drawn card");

    let drawn = game.drawn_card.take().expect("checked above");
    let hand_len = game.player(player).expect("current player exists").hand.len();
    verify!(hand_index < hand_len, "replace_and_play with an out-of-range hand index {}", hand_index);

    let hand = &mut game.player_mut(player).expect("current player exists").hand;
    let displaced = std::mem::replace(&mut hand[hand_index], drawn);
    game.discard_pile.push(displaced);
    game.visibility.reveal(player, Slot::new(player, hand_index));

    let mut result =
        StepResult::with_event(EventKind::CardReplacedAndPlayed { player, hand_index, card: displaced }, now);
    resolve_played_card(game, player, displaced, now, &mut result);
    Ok(result)
}

/// Shared tail of `play_drawn_card` and `replace_and_play`: the just-played
/// card either opens a special-action/King sequence or sends the game
/// straight to turn transition (or stack resolution, if someone has
/// already called stack).
fn resolve_played_card(
    game: &mut GameState,
    player: PlayerId,
    card: data::cards::card::Card,
    now: DateTime<Utc>,
    result: &mut StepResult,
) {
    use data::cards::card::Rank;

    if !card.is_special() {
        mutations::enter_stack_or_turn_transition(game, now);
        return;
    }

    game.timers.special_action =
        Some(ArmedTimer::arm(now, chrono::Duration::seconds(SPECIAL_ACTION_TIMEOUT_SECS)));

    match card.rank {
        Rank::Seven | Rank::Eight => {
            game.special_action = Some(SpecialAction { player, kind: SpecialActionKind::ViewOwn });
            game.phase = GamePhase::WaitingForSpecialAction;
        }
        Rank::Nine | Rank::Ten => {
            game.special_action = Some(SpecialAction { player, kind: SpecialActionKind::ViewOpponent });
            game.phase = GamePhase::WaitingForSpecialAction;
        }
        Rank::Jack | Rank::Queen => {
            game.special_action = Some(SpecialAction { player, kind: SpecialActionKind::SwapOpponent });
            game.phase = GamePhase::WaitingForSpecialAction;
        }
        Rank::King => {
            game.phase = GamePhase::KingViewPhase;
        }
        _ => unreachable!("non-special ranks were handled above"),
    }
    result.events.push(GameEvent::new(EventKind::GamePhaseChanged { phase: format!("{:?}", game.phase) }, now));
}

// ---------------------------------------------------------------------
// Special actions (7/8/9/10/J/Q)
// ---------------------------------------------------------------------

fn view_own_card(game: &mut GameState, player: PlayerId, card_index: usize, now: DateTime<Utc>) -> Value<StepResult> {
    verify!(game.phase == GamePhase::WaitingForSpecialAction, "view_own_card outside its phase");
    let action = game.special_action.clone();
    verify!(
        matches!(action, Some(SpecialAction { player: p, kind: SpecialActionKind::ViewOwn }) if p == player),
        "view_own_card by the wrong player or for the wrong special action"
    );
    let hand_len = game.player(player).map(|p| p.hand.len()).unwrap_or(0);
    verify!(card_index < hand_len, "view_own_card with an out-of-range hand index {}", card_index);

    let card = game.player(player).expect("checked above").hand[card_index];
    game.visibility.reveal(player, Slot::new(player, card_index));

    let mut result =
        StepResult::with_event(EventKind::CardViewed { viewer: player, owner: player, index: card_index, card }, now);
    mutations::clear_special_action(game);
    mutations::enter_stack_or_turn_transition(game, now);
    Ok(result)
}

fn view_opponent_card(
    game: &mut GameState,
    player: PlayerId,
    target: PlayerId,
    card_index: usize,
    now: DateTime<Utc>,
) -> Value<StepResult> {
    verify!(game.phase == GamePhase::WaitingForSpecialAction, "view_opponent_card outside its phase");
    let action = game.special_action.clone();
    verify!(
        matches!(action, Some(SpecialAction { player: p, kind: SpecialActionKind::ViewOpponent }) if p == player),
        "view_opponent_card by the wrong player or for the wrong special action"
    );
    verify!(legality::is_valid_opponent_target(game, player, target), "view_opponent_card with an invalid target");
    let hand_len = game.player(target).map(|p| p.hand.len()).unwrap_or(0);
    verify!(card_index < hand_len, "view_opponent_card with an out-of-range hand index {}", card_index);

    let card = game.player(target).expect("checked above").hand[card_index];
    game.visibility.reveal(player, Slot::new(target, card_index));

    let mut result = StepResult::with_event(
        EventKind::OpponentCardViewed { viewer: player, owner: target, index: card_index, card },
        now,
    );
    mutations::clear_special_action(game);
    mutations::enter_stack_or_turn_transition(game, now);
    Ok(result)
}

fn swap_cards(
    game: &mut GameState,
    player: PlayerId,
    own_index: usize,
    target: PlayerId,
    target_index: usize,
    now: DateTime<Utc>,
) -> Value<StepResult> {
    verify!(game.phase == GamePhase::WaitingForSpecialAction, "swap_cards outside its phase");
    let action = game.special_action.clone();
    verify!(
        matches!(action, Some(SpecialAction { player: p, kind: SpecialActionKind::SwapOpponent }) if p == player),
        "swap_cards by the wrong player or for the wrong special action"
    );
    verify!(legality::is_valid_opponent_target(game, player, target), "swap_cards with an invalid target");
    let own_len = game.player(player).map(|p| p.hand.len()).unwrap_or(0);
    let target_len = game.player(target).map(|p| p.hand.len()).unwrap_or(0);
    verify!(own_index < own_len, "swap_cards with an out-of-range own index {}", own_index);
    verify!(target_index < target_len, "swap_cards with an out-of-range target index {}", target_index);

    mutations::swap_hand_slots(game, player, own_index, target, target_index);

    let mut result =
        StepResult::with_event(EventKind::CardsSwapped { initiator: player, own_index, target, target_index }, now);
    mutations::clear_special_action(game);
    mutations::enter_stack_or_turn_transition(game, now);
    Ok(result)
}

fn special_action_timeout(game: &mut GameState, timer: TimerId, now: DateTime<Utc>) -> Value<StepResult> {
    verify!(game.timers.is_current_special_action(timer), "stale special_action_timeout");
    let player = game.current_player_id();

    let mut result = StepResult::with_event(EventKind::SpecialActionTimeout { player }, now);
    mutations::clear_special_action(game);
    mutations::enter_stack_or_turn_transition(game, now);
    Ok(result)
}

// ---------------------------------------------------------------------
// King (view then swap)
// ---------------------------------------------------------------------

fn king_view_card(
    game: &mut GameState,
    player: PlayerId,
    target: PlayerId,
    card_index: usize,
    now: DateTime<Utc>,
) -> Value<StepResult> {
    verify!(game.phase == GamePhase::KingViewPhase, "king_view_card outside its phase");
    verify!(queries::is_current_player(game, player), "king_view_card by a player who is not on turn");
    let hand_len = game.player(target).map(|p| p.hand.len()).unwrap_or(0);
    verify!(game.player(target).is_some(), "king_view_card with an unknown target");
    verify!(card_index < hand_len, "king_view_card with an out-of-range index {}", card_index);

    let card = game.player(target).expect("checked above").hand[card_index];
    game.visibility.reveal(player, Slot::new(target, card_index));
    game.king_view = Some(KingViewState { card, target, index: card_index });
    game.phase = GamePhase::KingSwapPhase;

    Ok(StepResult::with_event(
        EventKind::KingCardViewed { viewer: player, owner: target, index: card_index, card },
        now,
    ))
}

fn king_swap_cards(
    game: &mut GameState,
    player: PlayerId,
    own_index: usize,
    target: PlayerId,
    target_index: usize,
    now: DateTime<Utc>,
) -> Value<StepResult> {
    verify!(game.phase == GamePhase::KingSwapPhase, "king_swap_cards outside its phase");
    verify!(queries::is_current_player(game, player), "king_swap_cards by a player who is not on turn");
    verify!(
        game.king_view.is_some_and(|view| view.target == target && view.index == target_index),
        "king_swap_cards does not match the card that was viewed"
    );
    let own_len = game.player(player).map(|p| p.hand.len()).unwrap_or(0);
    verify!(own_index < own_len, "king_swap_cards with an out-of-range own index {}", own_index);

    mutations::swap_hand_slots(game, player, own_index, target, target_index);

    let mut result = StepResult::with_event(
        EventKind::KingCardsSwapped { initiator: player, own_index, target, target_index },
        now,
    );
    mutations::clear_special_action(game);
    mutations::enter_stack_or_turn_transition(game, now);
    Ok(result)
}

fn king_skip_swap(game: &mut GameState, player: PlayerId, now: DateTime<Utc>) -> Value<StepResult> {
    verify!(game.phase == GamePhase::KingSwapPhase, "king_skip_swap outside its phase");
    verify!(queries::is_current_player(game, player), "king_skip_swap by a player who is not on turn");

    let mut result = StepResult::with_event(EventKind::KingSwapSkipped { player }, now);
    mutations::clear_special_action(game);
    mutations::enter_stack_or_turn_transition(game, now);
    Ok(result)
}

// ---------------------------------------------------------------------
// Stack
// ---------------------------------------------------------------------

fn call_stack(game: &mut GameState, player: PlayerId, now: DateTime<Utc>) -> Value<StepResult> {
    verify!(legality::can_call_stack(game), "call_stack with no played card or stack already claimed");

    game.stack_caller = Some(player);
    if matches!(game.phase, GamePhase::Playing | GamePhase::TurnTransition) {
        game.timers.turn_transition = None;
        game.phase = GamePhase::StackCalled;
        game.timers.stack =
            Some(ArmedTimer::arm(now, chrono::Duration::seconds(mutations::STACK_TIMEOUT_SECS)));
    }
    // Otherwise we are mid special-action/King sequence: just record the
    // caller. `enter_stack_or_turn_transition` picks it up once that
    // sequence resolves.

    Ok(StepResult::with_event(EventKind::StackCalled { caller: player }, now))
}

fn execute_stack(
    game: &mut GameState,
    player: PlayerId,
    card_index: usize,
    target: Option<PlayerId>,
    now: DateTime<Utc>,
) -> Value<StepResult> {
    verify!(game.phase == GamePhase::StackCalled, "execute_stack outside the stack phase");
    verify!(legality::is_stack_caller(game, player), "execute_stack by a player other than the stack caller");
    if let Some(target) = target {
        verify!(legality::is_valid_opponent_target(game, player, target), "execute_stack with an invalid target");
    }
    let hand_len = game.player(player).map(|p| p.hand.len()).unwrap_or(0);
    verify!(card_index < hand_len, "execute_stack with an out-of-range hand index {}", card_index);

    let played_rank = game.played_card().expect("call_stack requires a played card").rank;
    let chosen = game.player(player).expect("checked above").hand[card_index];

    let mut result = if chosen.rank == played_rank {
        game.player_mut(player).expect("checked above").hand.remove(card_index);
        let self_stack = target.is_none();
        match target {
            Some(target_id) => {
                game.player_mut(target_id).expect("checked above").hand.push(chosen);
            }
            None => game.discard_pile.push(chosen),
        }
        StepResult::with_event(
            EventKind::StackSuccess { caller: player, self_stack, card: chosen, target },
            now,
        )
    } else {
        let penalty_card = game.deck.draw();
        if let Some(card) = penalty_card {
            game.player_mut(player).expect("checked above").hand.push(card);
        }
        StepResult::with_event(EventKind::StackFailed { caller: player, penalty_card }, now)
    };

    game.stack_caller = None;
    game.timers.stack = None;
    game.phase = GamePhase::Playing;
    result.follow_ups.push(EngineMessage::system(SystemIntent::NextTurn));
    Ok(result)
}

fn stack_timeout(game: &mut GameState, timer: TimerId, now: DateTime<Utc>) -> Value<StepResult> {
    verify!(game.timers.is_current_stack(timer), "stale stack_timeout");
    let caller = game.stack_caller.expect("stack phase always has a caller");

    let penalty_card = game.deck.draw();
    if let Some(card) = penalty_card {
        game.player_mut(caller).expect("stack caller exists").hand.push(card);
    }

    let mut result = StepResult::with_event(EventKind::StackTimeout { caller, penalty_card }, now);
    game.stack_caller = None;
    game.timers.stack = None;
    game.phase = GamePhase::Playing;
    result.follow_ups.push(EngineMessage::system(SystemIntent::NextTurn));
    Ok(result)
}

// ---------------------------------------------------------------------
// Cabo endgame
// ---------------------------------------------------------------------

fn call_cabo(game: &mut GameState, player: PlayerId, now: DateTime<Utc>) -> Value<StepResult> {
    verify!(game.phase == GamePhase::Playing, "call_cabo outside the playing phase");
    verify!(queries::is_current_player(game, player), "call_cabo by a player who is not on turn");
    verify!(game.drawn_card.is_none(), "call_cabo after already drawing this turn");
    verify!(game.end_caller.is_none(), "call_cabo after Cabo was already called");

    game.end_caller = Some(player);
    game.final_round_started = true;
    game.player_mut(player).expect("current player exists").called_cabo = true;

    let mut result = StepResult::with_event(EventKind::CaboCalled { player }, now);
    result.checkpoint_requested = true;
    result.follow_ups.push(EngineMessage::system(SystemIntent::NextTurn));
    Ok(result)
}

fn next_turn(game: &mut GameState, now: DateTime<Utc>) -> Value<StepResult> {
    let next_index = game.next_seat(game.current_player_index);
    let next_player = game.players[next_index].id;

    let mut result = StepResult::default();
    result.checkpoint_requested = true;

    if game.end_caller == Some(next_player) {
        result.follow_ups.push(EngineMessage::system(SystemIntent::EndGame));
        return Ok(result);
    }

    game.current_player_index = next_index;
    game.drawn_card = None;
    game.phase = GamePhase::Playing;
    result.events.push(GameEvent::new(EventKind::TurnChanged { player: next_player }, now));
    Ok(result)
}

fn end_game(game: &mut GameState, now: DateTime<Utc>) -> Value<StepResult> {
    let mut scores: Vec<(PlayerId, i32)> =
        game.players.iter().map(|p| (p.id, data::cards::card::score_hand(&p.hand))).collect();
    scores.sort_by_key(|(_, score)| *score);

    let winner = scores.first().map(|(id, _)| *id).expect("a game always has at least one player");
    game.winner = Some(winner);
    game.phase = GamePhase::Ended;

    let mut result =
        StepResult::with_event(EventKind::GameEnded { final_scores: scores, winner }, now);
    result.checkpoint_requested = true;
    Ok(result)
}

// ---------------------------------------------------------------------
// Turn/setup timers
// ---------------------------------------------------------------------

fn setup_timeout(game: &mut GameState, timer: TimerId, now: DateTime<Utc>) -> Value<StepResult> {
    verify!(game.timers.is_current_setup(timer), "stale setup_timeout");
    verify!(game.phase == GamePhase::Setup, "setup_timeout outside the setup phase");

    game.visibility.clear_all();
    game.timers.setup = None;
    let starting_index = game.rng.gen_range(0..game.players.len());
    game.current_player_index = starting_index;
    game.phase = GamePhase::Playing;
    let starting_player = game.players[starting_index].id;

    let mut result = StepResult::with_event(EventKind::GameStarted { starting_player }, now);
    result.checkpoint_requested = true;
    Ok(result)
}

fn turn_transition_timeout(
    game: &mut GameState,
    timer: TimerId,
    now: DateTime<Utc>,
) -> Value<StepResult> {
    verify!(game.timers.is_current_turn_transition(timer), "stale turn_transition_timeout");

    game.visibility.clear_all();
    game.timers.turn_transition = None;

    let mut result = StepResult::default();
    result.follow_ups.push(EngineMessage::system(SystemIntent::NextTurn));
    Ok(result)
}
