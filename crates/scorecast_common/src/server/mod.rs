pub mod args;
pub mod runtime;
