mod bot;
mod card_abstraction;
mod card_utils;
mod config;
mod error;
mod evaluator;
mod nodes;
mod trainer;
mod trainer_utils;


pub use bot::*;
pub use card_abstraction::*;
pub use card_utils::*;
pub use config::*;
pub use error::*;
pub use evaluator::*;
pub use nodes::*;
pub use trainer::*;
pub use trainer_utils::*;
