pub mod error;
pub mod fake;
#[allow(clippy::module_inception)]
pub mod queue;
pub mod sqs;
#[cfg(test)]
mod tests;

pub use error::QueueError;
pub use fake::FakeQueue;
pub use queue::{Queue, QueueMessage};
pub use sqs::SqsQueue;
