//! Scene descriptors handed over by the scenario layer, plus the JSON scenario manifest used by
//! the CLI.

pub mod manifest;
pub mod model;
