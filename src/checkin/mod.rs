pub mod desk;
pub mod error;

#[cfg(test)]
mod tests;

pub use desk::{
    initial_face_state, upload_key, CheckInDesk, CheckInReceipt, CheckInRequest, UploadTarget,
};
pub use error::CheckInError;
