pub mod builder;
pub mod closure;
pub mod commands;
pub mod complete;
pub mod eject;
pub mod resolve;
pub mod settings;
pub mod tools;
pub mod workspace;

#[cfg(test)]
pub(crate) mod testkit;
