//! Domain types for the draw box.
//!
//! A [`TicketBox`] is one generation of the ticket pool: a fixed
//! [`PrizeDistribution`] and the shuffled tickets created from it. Ticket
//! composition never changes after creation; only the claim fields of a
//! [`Ticket`] and the [`BoxStatus`] of a box are ever mutated.

use crate::error::{DrawBoxError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Upper bound on the number of tickets a single box may hold.
pub const MAX_TICKETS_PER_BOX: u32 = 100_000;

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for a box
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BoxId(Uuid);

impl BoxId {
    /// Creates a new random `BoxId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `BoxId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for BoxId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BoxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for BoxId {
    type Err = DrawBoxError;

    fn from_str(s: &str) -> Result<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| DrawBoxError::InvalidRequest(format!("Invalid box id '{s}': {e}")))
    }
}

/// Opaque identity of an authenticated caller.
///
/// Resolved by the external auth collaborator; the engine never inspects it
/// beyond requiring it to be non-blank.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClaimantId(String);

impl ClaimantId {
    /// Create a claimant id.
    ///
    /// # Errors
    ///
    /// Returns [`DrawBoxError::InvalidRequest`] if the id is blank.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(DrawBoxError::InvalidRequest(
                "Claimant id must not be blank".to_string(),
            ));
        }
        Ok(Self(id))
    }

    /// Borrow the raw id.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ClaimantId {
    type Error = DrawBoxError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<ClaimantId> for String {
    fn from(id: ClaimantId) -> Self {
        id.0
    }
}

impl fmt::Display for ClaimantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Prize distribution
// ============================================================================

/// A prize tier name (e.g. `"A"` for the top prize).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rank(String);

impl Rank {
    /// Create a rank.
    ///
    /// # Errors
    ///
    /// Returns [`DrawBoxError::InvalidDistribution`] if the name is blank.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(DrawBoxError::InvalidDistribution(
                "Rank name must not be blank".to_string(),
            ));
        }
        Ok(Self(name))
    }

    /// Borrow the rank name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Rank {
    type Error = DrawBoxError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Rank> for String {
    fn from(rank: Rank) -> Self {
        rank.0
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unvalidated prize tier, as received from configuration or an admin request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierRequest {
    /// Rank name
    pub rank: String,
    /// Number of tickets carrying this rank (must not be negative)
    pub total_quantity: i64,
}

impl TierRequest {
    /// Convenience constructor.
    #[must_use]
    pub fn new(rank: impl Into<String>, total_quantity: i64) -> Self {
        Self {
            rank: rank.into(),
            total_quantity,
        }
    }
}

/// A validated prize tier.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrizeTier {
    /// Rank name
    pub rank: Rank,
    /// Number of tickets carrying this rank
    pub total_quantity: u32,
}

/// Ordered, validated list of prize tiers fixed at box creation.
///
/// Tier order is the deterministic pre-shuffle order (best prizes first by
/// convention). Deserialization runs the same validation as
/// [`PrizeDistribution::new`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<TierRequest>", into = "Vec<TierRequest>")]
pub struct PrizeDistribution {
    tiers: Vec<PrizeTier>,
}

impl PrizeDistribution {
    /// Validate a list of tiers.
    ///
    /// # Errors
    ///
    /// Returns [`DrawBoxError::InvalidDistribution`] if the list is empty, a
    /// quantity is negative, a rank is blank or repeated, or the total number
    /// of tickets is zero or exceeds [`MAX_TICKETS_PER_BOX`].
    pub fn new(tiers: Vec<TierRequest>) -> Result<Self> {
        if tiers.is_empty() {
            return Err(DrawBoxError::InvalidDistribution(
                "Distribution must contain at least one rank".to_string(),
            ));
        }

        let mut seen = HashSet::with_capacity(tiers.len());
        let mut validated = Vec::with_capacity(tiers.len());
        let mut total: u64 = 0;

        for tier in tiers {
            let rank = Rank::new(tier.rank)?;

            if tier.total_quantity < 0 {
                return Err(DrawBoxError::InvalidDistribution(format!(
                    "Rank '{rank}' has negative quantity {}",
                    tier.total_quantity
                )));
            }

            let Ok(total_quantity) = u32::try_from(tier.total_quantity) else {
                return Err(DrawBoxError::InvalidDistribution(format!(
                    "Rank '{rank}' quantity {} is too large",
                    tier.total_quantity
                )));
            };

            if !seen.insert(rank.clone()) {
                return Err(DrawBoxError::InvalidDistribution(format!(
                    "Rank '{rank}' appears more than once"
                )));
            }

            total += u64::from(total_quantity);
            validated.push(PrizeTier {
                rank,
                total_quantity,
            });
        }

        if total == 0 {
            return Err(DrawBoxError::InvalidDistribution(
                "Distribution must contain at least one ticket".to_string(),
            ));
        }

        if total > u64::from(MAX_TICKETS_PER_BOX) {
            return Err(DrawBoxError::InvalidDistribution(format!(
                "Distribution has {total} tickets, maximum is {MAX_TICKETS_PER_BOX}"
            )));
        }

        Ok(Self { tiers: validated })
    }

    /// Parse the compact `"A:2,B:3"` form used in configuration.
    ///
    /// # Errors
    ///
    /// Returns [`DrawBoxError::InvalidDistribution`] on malformed input or
    /// any violation listed in [`PrizeDistribution::new`].
    pub fn parse(input: &str) -> Result<Self> {
        let mut tiers = Vec::new();

        for entry in input.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let Some((rank, quantity)) = entry.split_once(':') else {
                return Err(DrawBoxError::InvalidDistribution(format!(
                    "Expected RANK:QUANTITY, got '{entry}'"
                )));
            };

            let total_quantity = quantity.trim().parse::<i64>().map_err(|e| {
                DrawBoxError::InvalidDistribution(format!(
                    "Invalid quantity '{}' for rank '{}': {e}",
                    quantity.trim(),
                    rank.trim()
                ))
            })?;

            tiers.push(TierRequest::new(rank, total_quantity));
        }

        Self::new(tiers)
    }

    /// Tiers in distribution order.
    #[must_use]
    pub fn tiers(&self) -> &[PrizeTier] {
        &self.tiers
    }

    /// Total number of tickets (`Σ total_quantity`).
    #[must_use]
    pub fn total_tickets(&self) -> u32 {
        // Bounded by MAX_TICKETS_PER_BOX at construction.
        self.tiers.iter().map(|t| t.total_quantity).sum()
    }

    /// Quantity configured for a rank, if the rank is part of the distribution.
    #[must_use]
    pub fn quantity_of(&self, rank: &Rank) -> Option<u32> {
        self.tiers
            .iter()
            .find(|t| &t.rank == rank)
            .map(|t| t.total_quantity)
    }
}

impl TryFrom<Vec<TierRequest>> for PrizeDistribution {
    type Error = DrawBoxError;

    fn try_from(tiers: Vec<TierRequest>) -> Result<Self> {
        Self::new(tiers)
    }
}

impl From<PrizeDistribution> for Vec<TierRequest> {
    fn from(distribution: PrizeDistribution) -> Self {
        distribution
            .tiers
            .into_iter()
            .map(|t| TierRequest::new(t.rank, i64::from(t.total_quantity)))
            .collect()
    }
}

impl fmt::Display for PrizeDistribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, tier) in self.tiers.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}:{}", tier.rank, tier.total_quantity)?;
        }
        Ok(())
    }
}

// ============================================================================
// Boxes and tickets
// ============================================================================

/// Lifecycle status of a box. `Inactive` is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoxStatus {
    /// Servable (unless exhausted)
    Active,
    /// Retained as history only
    Inactive,
}

impl BoxStatus {
    /// Storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }
}

impl FromStr for BoxStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            other => Err(format!("Unknown box status '{other}'")),
        }
    }
}

impl fmt::Display for BoxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Box metadata without its tickets.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoxSummary {
    /// Box identifier
    pub id: BoxId,
    /// Current status
    pub status: BoxStatus,
    /// Distribution the tickets were generated from
    pub distribution: PrizeDistribution,
    /// Number of tickets in the box (`distribution.total_tickets()`)
    pub ticket_count: u32,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

impl BoxSummary {
    /// Whether the box is flagged active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == BoxStatus::Active
    }
}

/// One drawable ticket.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    /// Caller-facing ticket id, stable for the box's lifetime
    pub position: u32,
    /// Prize tier, fixed at shuffle time
    pub rank: Rank,
    /// Whether the ticket has been claimed
    pub taken: bool,
    /// Claimant, present iff `taken`
    pub claimed_by: Option<ClaimantId>,
    /// Claim time, present iff `taken`
    pub claimed_at: Option<DateTime<Utc>>,
}

impl Ticket {
    /// An unclaimed ticket.
    #[must_use]
    pub const fn available(position: u32, rank: Rank) -> Self {
        Self {
            position,
            rank,
            taken: false,
            claimed_by: None,
            claimed_at: None,
        }
    }
}

/// A box together with its full ticket list, ordered by position.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketBox {
    /// Box metadata
    pub summary: BoxSummary,
    /// Tickets ordered by position
    pub tickets: Vec<Ticket>,
}

impl TicketBox {
    /// Box identifier.
    #[must_use]
    pub const fn id(&self) -> BoxId {
        self.summary.id
    }

    /// Number of unclaimed tickets.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.tickets.iter().filter(|t| !t.taken).count()
    }

    /// Whether every ticket has been claimed.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.tickets.iter().all(|t| t.taken)
    }

    /// Look up a ticket by position.
    #[must_use]
    pub fn ticket(&self, position: u32) -> Option<&Ticket> {
        self.tickets.iter().find(|t| t.position == position)
    }
}

/// Shuffle Generator output: a rank bound to its permanent position.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketSlot {
    /// Position assigned after shuffling
    pub position: u32,
    /// Rank at that position
    pub rank: Rank,
}

/// Everything a store needs to persist a new box.
///
/// Only [`crate::ShuffleGenerator::build_box`] can construct one, so every
/// persisted ticket set comes from the shuffle of its own distribution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewBox {
    id: BoxId,
    distribution: PrizeDistribution,
    slots: Vec<TicketSlot>,
    created_at: DateTime<Utc>,
}

impl NewBox {
    pub(crate) const fn new(
        id: BoxId,
        distribution: PrizeDistribution,
        slots: Vec<TicketSlot>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            distribution,
            slots,
            created_at,
        }
    }

    /// Box identifier.
    #[must_use]
    pub const fn id(&self) -> BoxId {
        self.id
    }

    /// Distribution the slots were generated from.
    #[must_use]
    pub const fn distribution(&self) -> &PrizeDistribution {
        &self.distribution
    }

    /// Shuffled slots, ordered by position.
    #[must_use]
    pub fn slots(&self) -> &[TicketSlot] {
        &self.slots
    }

    /// Creation time.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Summary of the box as it looks right after insertion.
    #[must_use]
    pub fn summary(&self) -> BoxSummary {
        BoxSummary {
            id: self.id,
            status: BoxStatus::Active,
            distribution: self.distribution.clone(),
            ticket_count: self.distribution.total_tickets(),
            created_at: self.created_at,
        }
    }
}

// ============================================================================
// Draws
// ============================================================================

/// A non-empty, de-duplicated set of positions to claim.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DrawRequest {
    positions: BTreeSet<u32>,
}

impl DrawRequest {
    /// Build a request from positions. Duplicates collapse.
    ///
    /// # Errors
    ///
    /// Returns [`DrawBoxError::InvalidRequest`] if no positions are given.
    pub fn new(positions: impl IntoIterator<Item = u32>) -> Result<Self> {
        let positions: BTreeSet<u32> = positions.into_iter().collect();
        if positions.is_empty() {
            return Err(DrawBoxError::InvalidRequest(
                "At least one position must be requested".to_string(),
            ));
        }
        Ok(Self { positions })
    }

    /// Positions in ascending order.
    pub fn positions(&self) -> impl Iterator<Item = u32> + '_ {
        self.positions.iter().copied()
    }

    /// Number of distinct positions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Always `false`; a request is never empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Highest requested position.
    #[must_use]
    pub fn max_position(&self) -> u32 {
        self.positions.last().copied().unwrap_or_default()
    }
}

/// A ticket successfully claimed by a draw.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimedTicket {
    /// Position of the claimed ticket
    pub position: u32,
    /// Its (now disclosed) rank
    pub rank: Rank,
}

/// Outcome of the atomic conditional claim.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// Every requested ticket was claimed and the unit of work committed.
    Committed(Vec<ClaimedTicket>),
    /// At least one ticket was not free; the unit of work was rolled back.
    /// Carries the positions that were not free.
    Rejected(Vec<u32>),
}
