use serde::{
    Deserialize,
    Serialize,
};

/// The configuration struct for a training run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    // The total number of episodes.
    max_episodes: usize,
    // Number of random actions to take at very beginning of training.
    initial_random_actions: usize,
}
impl TrainConfig {
    pub fn new(
        max_episodes: usize,
        initial_random_actions: usize,
    ) -> Self {
        Self {
            max_episodes,
            initial_random_actions,
        }
    }

    pub fn cruise() -> Self {
        Self {
            max_episodes: 100,
            initial_random_actions: 500,
        }
    }

    pub fn pendulum() -> Self {
        Self {
            max_episodes: 100,
            initial_random_actions: 1000,
        }
    }

    pub fn max_episodes(&self) -> usize {
        self.max_episodes
    }
    pub fn initial_random_actions(&self) -> usize {
        self.initial_random_actions
    }
}
