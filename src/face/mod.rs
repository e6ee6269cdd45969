pub mod comparison;
pub mod error;
pub mod fake;
pub mod rekognition;
#[cfg(test)]
mod tests;

pub use comparison::{Comparison, FaceComparison, ImageRef};
pub use error::ComparisonError;
pub use fake::FakeFaceComparison;
pub use rekognition::RekognitionComparison;
