//! Raster grid definitions and buffers

mod geotransform;
mod grid;
mod stack;

pub use geotransform::GeoTransform;
pub use grid::GridSpec;
pub use stack::VariableStack;
