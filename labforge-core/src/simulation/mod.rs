pub mod builder;
pub mod engine;
pub mod guided;
pub mod history;
pub mod reveal;
pub mod state;
pub mod vessel;
