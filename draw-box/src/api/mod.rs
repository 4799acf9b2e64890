//! API endpoints for the draw box.
//!
//! - Box state: the current box with ranks of undrawn tickets hidden
//! - Draws: atomic all-or-nothing ticket claims
//! - Admin: resetting the box with a new prize distribution

pub mod admin;
pub mod box_state;
pub mod draws;

pub use admin::reset_box;
pub use box_state::get_box_state;
pub use draws::draw_tickets;
