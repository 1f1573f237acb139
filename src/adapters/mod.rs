pub mod defs;
pub mod dot;
pub mod fs;
