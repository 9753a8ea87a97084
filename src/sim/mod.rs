pub mod event;
pub mod ledger;
pub mod session;
pub mod world;
