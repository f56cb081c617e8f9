pub mod command;
pub mod experiment;
pub mod file_formats;
pub mod reagent;
pub mod step;
