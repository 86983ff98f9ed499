pub mod lockstep_store;
pub mod utils;
