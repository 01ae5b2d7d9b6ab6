pub mod history;
pub mod snapshots;
