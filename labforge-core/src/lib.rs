pub mod analysis;
pub mod equilibrium;
pub mod error;
pub mod logger;
pub mod simulation;
