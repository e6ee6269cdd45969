pub mod consumer;
pub mod envelope;
pub mod router;


pub use consumer::{next_backoff, BatchReport, Consumer, ConsumerSettings, Disposition};
pub use envelope::{decode_object_key, parse_envelope, Envelope, EnvelopeError, UploadEvent};
pub use router::{DropReason, ImageRouter, RecordOutcome, RouteError};
