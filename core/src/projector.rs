//! Inventory Projector.
//!
//! Pure function from a box's ticket list to the caller-visible view. Ranks of
//! undrawn tickets are never disclosed, so callers cannot inspect prize
//! positions before drawing.

use crate::types::{BoxId, Rank, TicketBox};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Caller-visible state of a single ticket.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketView {
    /// Ticket position (caller-facing id)
    pub position: u32,
    /// Rank, disclosed only once the ticket is taken
    pub rank: Option<Rank>,
    /// Whether the ticket has been claimed
    pub taken: bool,
}

/// Remaining count for one rank.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrizeInfo {
    /// Rank name
    pub rank: Rank,
    /// Untaken tickets carrying this rank
    pub remaining: u32,
    /// Quantity fixed at box creation
    pub total_quantity: u32,
}

/// Caller-visible state of a box.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoxView {
    /// Box identifier
    pub box_id: BoxId,
    /// Tickets ordered by position
    pub tickets: Vec<TicketView>,
    /// Per-rank remaining counts, in distribution order
    pub prize_info: Vec<PrizeInfo>,
}

impl BoxView {
    /// Total untaken tickets across all ranks.
    #[must_use]
    pub fn remaining(&self) -> u32 {
        self.prize_info.iter().map(|p| p.remaining).sum()
    }
}

/// Project a box into its caller-visible view.
#[must_use]
pub fn project_box_view(ticket_box: &TicketBox) -> BoxView {
    let mut tickets: Vec<TicketView> = ticket_box
        .tickets
        .iter()
        .map(|ticket| TicketView {
            position: ticket.position,
            rank: ticket.taken.then(|| ticket.rank.clone()),
            taken: ticket.taken,
        })
        .collect();
    tickets.sort_by_key(|t| t.position);

    let mut remaining: HashMap<&Rank, u32> = HashMap::new();
    for ticket in ticket_box.tickets.iter().filter(|t| !t.taken) {
        *remaining.entry(&ticket.rank).or_insert(0) += 1;
    }

    let prize_info = ticket_box
        .summary
        .distribution
        .tiers()
        .iter()
        .map(|tier| PrizeInfo {
            rank: tier.rank.clone(),
            remaining: remaining.get(&tier.rank).copied().unwrap_or(0),
            total_quantity: tier.total_quantity,
        })
        .collect();

    BoxView {
        box_id: ticket_box.id(),
        tickets,
        prize_info,
    }
}
