mod experiment;
mod run;

pub use experiment::run_experiment_off_policy;
pub use run::loop_off_policy;

use crate::{
    agents::{
        Algorithm,
        RunMode,
    },
    configs::{
        TestConfig,
        TrainConfig,
    },
    envs::Environment,
};

/// Either a ready-made environment or the config to build one from.
///
/// Experiments repeat runs on identical environments, so they usually take
/// the config variant and construct a fresh environment per run.
pub enum ParamEnv<Env: Environment> {
    AsEnvironment(Env),
    AsConfig(Env::Config),
}

/// Either a ready-made algorithm or the config to build one from.
pub enum ParamAlg<Alg: Algorithm> {
    AsAlgorithm(Alg),
    AsConfig(Alg::Config),
}

/// Whether a run trains the algorithm or only evaluates it.
#[derive(Clone, Debug)]
pub enum ParamRunMode {
    Train(TrainConfig),
    Test(TestConfig),
}

impl ParamRunMode {
    pub fn run_mode(&self) -> RunMode {
        match self {
            ParamRunMode::Train(_) => RunMode::Train,
            ParamRunMode::Test(_) => RunMode::Test,
        }
    }

    pub fn max_episodes(&self) -> usize {
        match self {
            ParamRunMode::Train(config) => config.max_episodes(),
            ParamRunMode::Test(config) => config.max_episodes(),
        }
    }

    /// Evaluation runs never act randomly, only training runs warm up.
    pub fn initial_random_actions(&self) -> usize {
        match self {
            ParamRunMode::Train(config) => config.initial_random_actions(),
            ParamRunMode::Test(_) => 0,
        }
    }
}
