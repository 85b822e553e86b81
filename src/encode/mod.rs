//! Encoders consume composited frames in timeline order and produce one output blob.

/// `ffmpeg`-based encoder (system `ffmpeg`, container written to stdout).
pub mod ffmpeg;
/// Encoder trait, configuration, and the in-memory encoder.
pub mod encoder;
