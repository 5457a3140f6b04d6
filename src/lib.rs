//! Schema compiler: reads a JSON-Schema-style description expressed as YAML
//! and emits C++ source text for a standalone validator class.
//!
//! Pipeline: parse the schema document into a marked node tree ([`node`]),
//! pre-materialise every `$ref` target as a standalone validator function,
//! then walk the schema tree emitting checks into a header/implementation
//! pair of sinks ([`compile`]). Problems accumulate in an ordered
//! diagnostics channel ([`diag`]); nothing below the CLI touches the
//! filesystem.

pub mod cli;
pub mod compile;
pub mod diag;
pub mod emit;
pub mod node;
pub mod resolve;
pub mod types;
