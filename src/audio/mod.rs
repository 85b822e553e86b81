//! Narration decoding and the additive mixdown into one render-length track.

pub mod decode;
pub mod mix;
