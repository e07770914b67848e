use {
    crate::{
        agents::{
            Algorithm,
            OffPolicyAlgorithm,
            SaveableAlgorithm,
        },
        configs::{
            TestConfig,
            TrainConfig,
        },
        engines::{
            run_experiment_off_policy,
            ParamAlg,
            ParamEnv,
            ParamRunMode,
        },
        envs::{
            Environment,
            Sampleable,
            TensorConvertible,
        },
        util::read_config,
    },
    anyhow::{
        anyhow,
        Result,
    },
    candle_core::Device,
    clap::{
        Parser,
        ValueEnum,
    },
    serde::{
        de::DeserializeOwned,
        Serialize,
    },
    std::{
        path::Path,
        sync::atomic::AtomicBool,
    },
    tracing::Level,
};


#[derive(ValueEnum, Debug, Clone)]
pub enum Env {
    Cruise,
    Pendulum,
}
impl Env {
    pub fn name(&self) -> &str {
        match self {
            Env::Cruise => "cruise",
            Env::Pendulum => "pendulum",
        }
    }

    pub fn train_config(&self) -> TrainConfig {
        match self {
            Env::Cruise => TrainConfig::cruise(),
            Env::Pendulum => TrainConfig::pendulum(),
        }
    }
}

#[derive(ValueEnum, Debug, Clone)]
pub enum Loglevel {
    Error, // put these only during active debugging and then downgrade later
    Warn,  // main events in the program
    Info,  // all the little details
    None,  // don't log anything
}
impl Loglevel {
    pub fn level(&self) -> Option<Level> {
        match self {
            Loglevel::Error => Some(Level::ERROR),
            Loglevel::Warn => Some(Level::WARN),
            Loglevel::Info => Some(Level::INFO),
            Loglevel::None => None,
        }
    }
}

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Setup logging
    #[arg(long, value_enum, default_value_t=Loglevel::None)]
    pub log: Loglevel,

    /// The environment to run.
    #[arg(long, value_enum)]
    pub env: Env,

    /// Name of the data directory, defaults to the environment name.
    #[arg(long)]
    pub name: Option<String>,

    /// The number of repeated, identical runs to perform.
    #[arg(long, default_value_t = 10)]
    pub reps: usize,

    /// Evaluate the model instead of training it.
    #[arg(long)]
    pub test: bool,

    /// Directory to load model weights from.
    #[arg(long)]
    pub load_path: Option<String>,

    /// Name of the model weights to load.
    #[arg(long)]
    pub load_name: Option<String>,
}

/// This translates the command line arguments into an experiment, which
/// simplifies the main function down to picking configs per environment.
///
/// When weights are loaded from a previous experiment, the algorithm config
/// is read from that experiment's directory instead of the given preset, so
/// the network architecture always matches the stored weights.
pub fn run_from_args<Alg, Env, Obs, Act>(
    args: &Args,
    env_config: Env::Config,
    alg_preset: Alg::Config,
    stop: &AtomicBool,
    device: &Device,
) -> Result<()>
where
    Alg: Algorithm + OffPolicyAlgorithm + SaveableAlgorithm,
    Alg::Config: Clone + Serialize + DeserializeOwned,
    Env: Environment<Action = Act, Observation = Obs>,
    Env::Config: Clone + Serialize,
    Obs: Clone + TensorConvertible,
    Act: Clone + TensorConvertible + Sampleable,
{
    let name = args
        .name
        .clone()
        .unwrap_or_else(|| args.env.name().to_owned());

    let alg_config: Alg::Config = match &args.load_path {
        Some(path) => read_config(Path::new(path).join("config_algorithm.ron"))?,
        None => alg_preset,
    };

    let run_mode = if args.test {
        ParamRunMode::Test(TestConfig::default())
    } else {
        ParamRunMode::Train(args.env.train_config())
    };

    let load_model = match (&args.load_path, &args.load_name) {
        (Some(path), Some(model)) => Some((path.clone(), model.clone())),
        (None, None) => None,
        _ => {
            return Err(anyhow!(
                "the --load-path and --load-name arguments only work together"
            ))
        }
    };

    run_experiment_off_policy::<Alg, Env, Obs, Act>(
        &name,
        args.reps,
        ParamEnv::AsConfig(env_config),
        ParamAlg::AsConfig(alg_config),
        run_mode,
        load_model,
        stop,
        device,
    )
}
