pub mod helpers;
pub mod setup;
