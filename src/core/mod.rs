// Core modules implementing the directory wire dialect and error modeling.
pub mod error;
pub mod wire;
