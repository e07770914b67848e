use serde::{
    Deserialize,
    Serialize,
};

/// The configuration struct for the [`DDPG`](crate::agents::DDPG) agent.
///
/// The Ornstein-Uhlenbeck parameters and the action bounds are given per
/// action dimension, so all five of those Vecs must have exactly as many
/// entries as the action space has dimensions.
///
/// # Example
/// ```
/// use ddpg_rl::configs::DDPG_Config;
///
/// let config = DDPG_Config::cruise();
/// assert_eq!(config.training_batch_size, 64);
/// assert_eq!(config.action_low, vec![0.0]);
/// assert_eq!(config.action_high, vec![1.0]);
/// ```
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DDPG_Config {
    // The learning rates for the Actor and Critic networks
    pub actor_learning_rate: f64,
    pub critic_learning_rate: f64,
    // The impact of the q value of the next state on the current state's q value.
    pub gamma: f64,
    // The weight for updating the target networks.
    pub tau: f64,
    // The number of neurons in the hidden layers of the Actor and Critic networks.
    pub hidden_1_size: usize,
    pub hidden_2_size: usize,
    // The capacity of the replay buffer used for sampling training data.
    pub replay_buffer_capacity: usize,
    // The number of transitions to collect before optimization starts.
    pub pre_fill_threshold: usize,
    // The training batch size for each training iteration.
    pub training_batch_size: usize,
    // Ornstein-Uhlenbeck process parameters, one entry per action dimension.
    pub ou_mu: Vec<f64>,
    pub ou_theta: Vec<f64>,
    pub ou_sigma: Vec<f64>,
    // Action bounds, one entry per action dimension.
    pub action_low: Vec<f64>,
    pub action_high: Vec<f64>,
}
impl DDPG_Config {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        actor_learning_rate: f64,
        critic_learning_rate: f64,
        gamma: f64,
        tau: f64,
        hidden_1_size: usize,
        hidden_2_size: usize,
        replay_buffer_capacity: usize,
        pre_fill_threshold: usize,
        training_batch_size: usize,
        ou_mu: Vec<f64>,
        ou_theta: Vec<f64>,
        ou_sigma: Vec<f64>,
        action_low: Vec<f64>,
        action_high: Vec<f64>,
    ) -> Self {
        Self {
            actor_learning_rate,
            critic_learning_rate,
            gamma,
            tau,
            hidden_1_size,
            hidden_2_size,
            replay_buffer_capacity,
            pre_fill_threshold,
            training_batch_size,
            ou_mu,
            ou_theta,
            ou_sigma,
            action_low,
            action_high,
        }
    }

    pub fn cruise() -> Self {
        Self {
            actor_learning_rate: 1e-3,
            critic_learning_rate: 1e-3,
            gamma: 0.9,
            tau: 0.005,
            hidden_1_size: 64,
            hidden_2_size: 64,
            replay_buffer_capacity: 10_000,
            pre_fill_threshold: 500,
            training_batch_size: 64,
            ou_mu: vec![0.0],
            ou_theta: vec![0.15],
            ou_sigma: vec![0.2],
            action_low: vec![0.0],
            action_high: vec![1.0],
        }
    }

    pub fn pendulum() -> Self {
        Self {
            actor_learning_rate: 1e-4,
            critic_learning_rate: 1e-3,
            gamma: 0.99,
            tau: 0.005,
            hidden_1_size: 400,
            hidden_2_size: 300,
            replay_buffer_capacity: 100_000,
            pre_fill_threshold: 1_000,
            training_batch_size: 100,
            ou_mu: vec![0.0],
            ou_theta: vec![0.15],
            ou_sigma: vec![0.2],
            action_low: vec![-2.0],
            action_high: vec![2.0],
        }
    }
}
