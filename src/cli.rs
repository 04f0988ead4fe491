pub mod args;
pub mod run;

pub use args::{Args, Command, ImageCommand};
pub use run::run;
