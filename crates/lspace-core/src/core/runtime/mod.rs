pub mod effects;
pub mod locate;
pub mod process;
