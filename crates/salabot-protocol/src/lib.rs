//! Transport contract for salabot.
//!
//! The chat transport delivers discrete user interactions as [`Action`]
//! values, each on behalf of a resolved [`Actor`]; the engine answers
//! with an [`Outcome`] the transport renders. The engine never talks to
//! the chat platform directly.

mod types;

pub use types::{
    Action, Actor, ErrorCode, ExportRow, MonthYear, Outcome, PageDirection,
};
