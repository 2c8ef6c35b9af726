pub mod booking;
pub mod classifier;
pub mod directory;
pub mod ledger;
pub mod patterns;
pub mod priority;
pub mod slots;
