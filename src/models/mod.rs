pub mod detection;
pub mod matrix;
pub mod point;
pub mod result_set;

pub use detection::{BoundingBox, DetectedCode};
pub use matrix::BitMatrix;
pub use point::{Point, Quad};
pub use result_set::ResultSet;
