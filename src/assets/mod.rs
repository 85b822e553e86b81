//! Asset preloading: scene image bytes become premultiplied rasters before rendering starts.

pub mod decode;
pub mod preload;
