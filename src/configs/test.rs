use serde::{
    Deserialize,
    Serialize,
};

/// The configuration struct for an evaluation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestConfig {
    // The total number of episodes.
    max_episodes: usize,
}
impl Default for TestConfig {
    fn default() -> Self {
        Self { max_episodes: 30 }
    }
}
impl TestConfig {
    pub fn new(max_episodes: usize) -> Self {
        Self { max_episodes }
    }

    pub fn max_episodes(&self) -> usize {
        self.max_episodes
    }
}
