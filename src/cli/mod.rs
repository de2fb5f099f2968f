pub mod run;
pub mod specials;

pub use run::run;
