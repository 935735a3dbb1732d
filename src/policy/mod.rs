pub mod pressure;
pub mod reclaim;
