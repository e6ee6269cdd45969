use crate::face::comparison::{Comparison, FaceComparison, ImageRef};
use crate::face::error::ComparisonError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct FakeState {
    default: Option<Comparison>,
    outcomes: HashMap<String, Comparison>,
    throttled_calls: usize,
    delay: Option<Duration>,
    calls: Vec<(ImageRef, ImageRef)>,
}

/// `FakeFaceComparison` is a programmable in-memory FaceComparison for testing.
///
/// Outcomes are keyed by candidate object key; unknown keys use the default
/// outcome, which starts as `Match`.
#[derive(Clone, Default)]
pub struct FakeFaceComparison {
    state: Arc<Mutex<FakeState>>,
}

impl FakeFaceComparison {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fake_set_default(&self, outcome: Comparison) {
        self.state.lock().unwrap().default = Some(outcome);
    }

    pub fn fake_set_outcome(&self, candidate_key: &str, outcome: Comparison) {
        self.state
            .lock()
            .unwrap()
            .outcomes
            .insert(candidate_key.to_string(), outcome);
    }

    /// The next `count` comparisons fail with a throttling error
    pub fn fake_throttle_next(&self, count: usize) {
        self.state.lock().unwrap().throttled_calls = count;
    }

    pub fn fake_set_delay(&self, delay: Option<Duration>) {
        self.state.lock().unwrap().delay = delay;
    }

    /// Every (reference, candidate) pair compared so far, throttled calls included
    pub fn fake_calls(&self) -> Vec<(ImageRef, ImageRef)> {
        self.state.lock().unwrap().calls.clone()
    }
}

#[async_trait]
impl FaceComparison for FakeFaceComparison {
    async fn compare(
        &self,
        reference: &ImageRef,
        candidate: &ImageRef,
    ) -> Result<Comparison, ComparisonError> {
        let delay = {
            let mut state = self.state.lock().unwrap();
            state.calls.push((reference.clone(), candidate.clone()));
            state.delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock().unwrap();
        if state.throttled_calls > 0 {
            state.throttled_calls -= 1;
            return Err(ComparisonError::Throttled(
                "Simulated ThrottlingException".to_string(),
            ));
        }

        Ok(state
            .outcomes
            .get(&candidate.key)
            .copied()
            .or(state.default)
            .unwrap_or(Comparison::Match))
    }
}
