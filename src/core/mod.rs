// Core modules implementing library resolution, the harness, and error modeling.
pub mod error;
pub mod harness;
pub mod library;
