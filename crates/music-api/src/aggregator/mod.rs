mod client;
pub(crate) mod parser;

pub use client::*;
pub use parser::ParseError;
