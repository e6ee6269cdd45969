pub mod codec;
pub mod error;
#[cfg(test)]
mod tests;

pub use codec::{reference_image_key, ImageRole, ObjectKey, IMAGE_EXTENSION, REFERENCE_MARKER};
pub use error::KeyError;
