pub mod account;
pub mod market;
pub mod securities;
pub mod system;
