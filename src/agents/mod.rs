mod ddpg;

pub use ddpg::DDPG;

use {
    crate::{
        components::ReplayBuffer,
        error::DdpgError,
    },
    candle_core::{
        Device,
        Tensor,
    },
    std::{
        fmt::Display,
        path::Path,
    },
};

/// The execution mode of an agent is either training or testing.
///
/// In training mode the agent adds exploration noise to its actions, in
/// testing mode it acts deterministically.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum RunMode {
    Train,
    Test,
}

impl Display for RunMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunMode::Train => write!(f, "Train"),
            RunMode::Test => write!(f, "Test"),
        }
    }
}

/// The losses observed during one optimization step.
#[derive(Clone, Copy, Debug)]
pub struct TrainStats {
    pub critic_loss: f64,
    pub actor_loss: f64,
}

pub trait Algorithm {
    type Config;

    fn config(&self) -> &Self::Config;
    fn from_config(
        device: &Device,
        config: &Self::Config,
        size_state: usize,
        size_action: usize,
    ) -> Result<Box<Self>, DdpgError>;

    fn actions(
        &mut self,
        state: &Tensor,
        mode: RunMode,
    ) -> Result<Tensor, DdpgError>;

    /// Run one optimization step.
    ///
    /// Returns `Ok(None)` while the agent is still collecting experience and
    /// has nothing to learn from yet.
    fn train(&mut self) -> Result<Option<TrainStats>, DdpgError>;

    /// Reset any per-episode state, called at the start of each episode.
    fn reset_episode(&mut self) -> Result<(), DdpgError>;
}

pub trait OffPolicyAlgorithm: Algorithm {
    fn remember(
        &mut self,
        state: &Tensor,
        action: &Tensor,
        reward: &Tensor,
        next_state: &Tensor,
        terminated: &Tensor,
        truncated: &Tensor,
    );

    fn replay_buffer(&self) -> &ReplayBuffer;
}

pub trait SaveableAlgorithm: Algorithm {
    fn save<P: AsRef<Path> + ?Sized>(
        &self,
        path: &P,
        name: &str,
    ) -> Result<(), DdpgError>;

    fn load<P: AsRef<Path> + ?Sized>(
        &mut self,
        path: &P,
        name: &str,
    ) -> Result<(), DdpgError>;
}
