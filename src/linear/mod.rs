pub mod bayes;

pub use bayes::*;
