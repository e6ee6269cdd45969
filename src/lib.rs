pub mod aws;
pub mod checkin;
pub mod config;
pub mod db;
pub mod face;
pub mod key;
pub mod logging;
pub mod pipeline;
pub mod queue;
pub mod s3;
#[cfg(test)]
mod test_utils;
