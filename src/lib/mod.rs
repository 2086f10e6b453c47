use std::error::Error;

pub mod assembler;
pub mod bytes;
pub mod crypto;
pub mod planner;
pub mod tap;
pub mod transmit;
pub mod utils;

mod rng;


pub type DynResult<T> = Result<T, Box<dyn Error + Sync + Send>>;
