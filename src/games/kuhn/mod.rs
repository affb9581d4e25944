//! Kuhn Poker as an explicit game tree.
//!
//! Kuhn Poker is a simplified poker game used to validate CFR implementations
//! because it has a known, mathematically proven Nash equilibrium.
//!
//! ## Game Rules
//!
//! - 3 cards: Jack (0), Queen (1), King (2)
//! - 2 players, each antes 1 chip
//! - Each player receives 1 card
//! - Player 1 acts first: Pass or Bet (1 chip)
//! - Player 2 responds based on P1's action
//! - Higher card wins at showdown
//!
//! ## Game Tree
//!
//! ```text
//! Deal (6 outcomes, 1/6 each)
//! └── P1
//!     ├── Pass
//!     │   └── P2
//!     │       ├── Pass → Showdown (pot = 2)
//!     │       └── Bet
//!     │           └── P1
//!     │               ├── Pass → P2 wins (pot = 3)
//!     │               └── Bet → Showdown (pot = 4)
//!     └── Bet
//!         └── P2
//!             ├── Pass → P1 wins (pot = 3)
//!             └── Bet → Showdown (pot = 4)
//! ```
//!
//! ## Information Sets
//!
//! Every decision offers `[Pass, Bet]` in that order. A player's information
//! set is their card, offset by 3 for their second kind of decision:
//!
//! | player | history | information set |
//! |--------|---------|-----------------|
//! | 1      | (none)  | card            |
//! | 1      | `pb`    | 3 + card        |
//! | 2      | `p`     | card            |
//! | 2      | `b`     | 3 + card        |
//!
//! ## Known Nash Equilibrium
//!
//! - **Player 1 with Jack**: Bet with probability α ∈ [0, 1/3]
//! - **Player 1 with Queen**: Always Pass
//! - **Player 1 with King**: Bet with probability 3α
//! - **Player 2 facing Bet with Jack**: Always Fold
//! - **Player 2 facing Bet with Queen**: Call with probability 1/3
//! - **Player 2 facing Bet with King**: Always Call
//!
//! **Expected Value**: Player 1 EV = -1/18 ≈ -0.0556

use crate::cfr::error::ConfigurationError;
use crate::tree::{GameTree, NodeId, Player, TreeBuilder};

/// Player one's value at equilibrium.
pub const GAME_VALUE: f64 = -1.0 / 18.0;

/// Card dealt to (player one, player two) for each nature outcome, in
/// outcome order.
pub const DEALS: [[u8; 2]; 6] = [[0, 1], [0, 2], [1, 0], [1, 2], [2, 0], [2, 1]];

/// Histories after which the hand is over.
const TERMINAL: [&str; 5] = ["pp", "pbp", "pbb", "bp", "bb"];

/// Get card name for display.
pub fn card_name(card: u8) -> &'static str {
    match card {
        0 => "Jack",
        1 => "Queen",
        2 => "King",
        _ => "Unknown",
    }
}

fn card_letter(card: u8) -> char {
    match card {
        0 => 'J',
        1 => 'Q',
        2 => 'K',
        _ => '?',
    }
}

/// Whether the betting round has ended after `history`.
pub fn is_terminal(history: &str) -> bool {
    TERMINAL.contains(&history)
}

/// Who acts after a non-terminal `history`.
pub fn acting_player(history: &str) -> Player {
    match history {
        "p" | "b" => Player::Two,
        _ => Player::One,
    }
}

/// Information set of the player acting after `history` holding `card`.
pub fn info_set(history: &str, card: u8) -> usize {
    match history {
        "" | "p" => card as usize,
        _ => 3 + card as usize,
    }
}

/// Payoff to player one at a terminal `history`.
pub fn payoff(history: &str, cards: [u8; 2]) -> f64 {
    let one_wins = cards[0] > cards[1];
    match history {
        // Showdown after both pass: pot is 2 (1+1 ante)
        "pp" => {
            if one_wins {
                1.0
            } else {
                -1.0
            }
        }
        // Player 2 folded to a bet
        "bp" => 1.0,
        // Player 1 folded to a bet
        "pbp" => -1.0,
        // Showdown after bet-call: pot is 4 (2+2)
        "bb" | "pbb" => {
            if one_wins {
                2.0
            } else {
                -2.0
            }
        }
        _ => 0.0,
    }
}

fn betting(builder: &mut TreeBuilder, cards: [u8; 2], history: &mut String) -> NodeId {
    if is_terminal(history) {
        return builder.leaf(payoff(history, cards));
    }

    let player = acting_player(history);
    let card = match player {
        Player::One => cards[0],
        Player::Two => cards[1],
    };
    let id = info_set(history, card);

    history.push('p');
    let pass = betting(builder, cards, history);
    history.pop();
    history.push('b');
    let bet = betting(builder, cards, history);
    history.pop();

    builder.decision(player, id, [("Pass", pass), ("Bet", bet)])
}

/// Build the full Kuhn Poker tree: a dealing nature node over [`DEALS`]
/// followed by one betting round per deal.
pub fn kuhn_poker() -> Result<GameTree, ConfigurationError> {
    let mut builder = TreeBuilder::with_capacity(55);
    let mut outcomes = Vec::with_capacity(DEALS.len());
    for cards in DEALS {
        let round = betting(&mut builder, cards, &mut String::new());
        let name: String = cards.iter().map(|&c| card_letter(c)).collect();
        outcomes.push((name, 1.0 / DEALS.len() as f64, round));
    }
    let root = builder.nature(outcomes);
    builder.build(root)
}
