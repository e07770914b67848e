use {
    super::{
        run::loop_off_policy,
        ParamAlg,
        ParamEnv,
        ParamRunMode,
    },
    crate::{
        agents::{
            Algorithm,
            OffPolicyAlgorithm,
            SaveableAlgorithm,
        },
        envs::{
            Environment,
            Sampleable,
            TensorConvertible,
        },
        util::write_config,
    },
    anyhow::{
        anyhow,
        Result,
    },
    candle_core::Device,
    polars::prelude::{
        DataFrame,
        NamedFrom,
        ParquetWriter,
        Series,
    },
    serde::Serialize,
    std::{
        fs::{
            create_dir_all,
            File,
        },
        path::Path,
        sync::atomic::AtomicBool,
    },
    tracing::warn,
};

/// Run an experiment with an off-policy algorithm.
///
/// Every repetition constructs a fresh environment and algorithm from the
/// given configs, runs them with [`loop_off_policy`], and writes the per
/// episode returns and success flags to a parquet file. Training runs also
/// save the final model weights of every repetition, so a promising run can
/// be reloaded later with the `load_model` argument.
///
/// The experiment refuses to reuse a directory that already contains config
/// files, to avoid silently overwriting collected data.
///
/// # Arguments
///
/// * `path` - The path to the directory where the collected data will be stored.
/// * `n_repetitions` - The number of repeated, identical runs to perform.
/// * `init_env` - The environment to run on, or the configuration to build it from.
/// * `init_alg` - The algorithm to run, or the configuration to build it from.
/// * `run_mode` - Whether to train or to evaluate, and for how many episodes.
/// * `load_model` - Optionally, a directory and model name to load weights from.
/// * `stop` - External request to wind down the experiment early.
/// * `device` - The device to run the experiment on.
#[allow(clippy::too_many_arguments)]
pub fn run_experiment_off_policy<Alg, Env, Obs, Act>(
    path: &dyn AsRef<Path>,
    n_repetitions: usize,
    init_env: ParamEnv<Env>,
    init_alg: ParamAlg<Alg>,
    run_mode: ParamRunMode,
    load_model: Option<(String, String)>,
    stop: &AtomicBool,
    device: &Device,
) -> Result<()>
where
    Env: Environment<Action = Act, Observation = Obs>,
    Env::Config: Clone + Serialize,
    Alg: Algorithm + OffPolicyAlgorithm + SaveableAlgorithm,
    Alg::Config: Clone + Serialize,
    Obs: Clone + TensorConvertible,
    Act: Clone + TensorConvertible + Sampleable,
{
    let path = Path::new("data/").join(path);

    let alg_config_exists = path.join("config_algorithm.ron").try_exists()?;
    let env_config_exists = path.join("config_environment.ron").try_exists()?;
    if alg_config_exists || env_config_exists {
        Err(anyhow!(concat!(
            "Config files already exist in this directory!\n",
            "I am assuming I would be overwriting existing data!",
        )))?
    }

    let alg_config = match &init_alg {
        ParamAlg::AsAlgorithm(alg) => alg.config().clone(),
        ParamAlg::AsConfig(config) => config.clone(),
    };
    let env_config = match &init_env {
        ParamEnv::AsEnvironment(env) => env.config().clone(),
        ParamEnv::AsConfig(config) => config.clone(),
    };

    create_dir_all(path.as_path())?;
    write_config(&alg_config, path.join("config_algorithm.ron"))?;
    write_config(&env_config, path.join("config_environment.ron"))?;
    match &run_mode {
        ParamRunMode::Train(config) => write_config(config, path.join("config_training.ron"))?,
        ParamRunMode::Test(config) => write_config(config, path.join("config_testing.ron"))?,
    }

    for n in 0..n_repetitions {
        warn!("Collecting data, run {n}/{n_repetitions}");

        // Create the Agent and the Environment

        let mut env = *Env::new(env_config.clone())?;
        let mut alg = *Alg::from_config(
            device,
            &alg_config,
            env.observation_space().iter().product::<usize>(),
            env.action_space().iter().product::<usize>(),
        )?;

        // Maybe load model weights

        if let Some((model_path, model_name)) = load_model.clone() {
            warn!("Loading model weights from {model_path} with name {model_name}");
            alg.load(Path::new(&model_path), &model_name)?;
        }

        // Run the Agent on the Environment

        let (mc_returns, successes) = loop_off_policy(
            &mut env,
            &mut alg,
            run_mode.clone(),
            stop,
            device,
        )?;

        // Training runs keep their weights around for later reuse; this also
        // runs after an early stop, which always lands on a step boundary.

        if let ParamRunMode::Train(_) = &run_mode {
            alg.save(&path, &format!("run_{n}"))?;
        }

        // Write collected data to file

        let mut df = DataFrame::new(vec![
            Series::new(
                &format!("run_{n}_total_rewards"),
                &mc_returns,
            ),
            Series::new(
                &format!("run_{n}_successes"),
                &successes,
            ),
        ])?;

        ParquetWriter::new(
            File::create(path.join(format!("run_{n}_data.parquet")))?
        ).finish(&mut df)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{
            agents::DDPG,
            configs::{
                DDPG_Config,
                TestConfig,
            },
            envs::{
                CruiseEnv,
                CruiseEnvConfig,
            },
        },
        tempdir::TempDir,
    };

    #[test]
    fn experiment_writes_configs_and_data() {
        let device = Device::Cpu;
        let stop = AtomicBool::new(false);
        // an absolute path sidesteps the data/ prefix
        let dir = TempDir::new("cruise-experiment").unwrap();
        let path = dir.path().join("cruise");

        run_experiment_off_policy::<DDPG, CruiseEnv, _, _>(
            &path,
            2,
            ParamEnv::AsConfig(CruiseEnvConfig::new(0.5, 4, 42)),
            ParamAlg::AsConfig(DDPG_Config::cruise()),
            ParamRunMode::Test(TestConfig::new(2)),
            None,
            &stop,
            &device,
        )
        .unwrap();

        for file in [
            "config_algorithm.ron",
            "config_environment.ron",
            "config_testing.ron",
            "run_0_data.parquet",
            "run_1_data.parquet",
        ] {
            assert!(path.join(file).is_file(), "missing {file}");
        }

        // a second experiment must refuse to overwrite the collected data
        assert!(run_experiment_off_policy::<DDPG, CruiseEnv, _, _>(
            &path,
            1,
            ParamEnv::AsConfig(CruiseEnvConfig::new(0.5, 4, 42)),
            ParamAlg::AsConfig(DDPG_Config::cruise()),
            ParamRunMode::Test(TestConfig::new(2)),
            None,
            &stop,
            &device,
        )
        .is_err());
    }
}
