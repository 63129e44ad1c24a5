pub mod auth;
pub mod candidate;
pub mod election;
pub mod tally;
pub mod vote;
pub mod voter;
