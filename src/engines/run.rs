use {
    super::ParamRunMode,
    crate::{
        agents::{
            Algorithm,
            OffPolicyAlgorithm,
        },
        envs::{
            Environment,
            Sampleable,
            TensorConvertible,
        },
    },
    anyhow::Result,
    candle_core::{
        Device,
        Tensor,
    },
    rand::Rng,
    std::sync::atomic::{
        AtomicBool,
        Ordering,
    },
    tracing::warn,
};


/// Run a single off-policy run on an environment, either training the
/// algorithm or evaluating it.
///
/// In training mode the algorithm takes one optimization step per environment
/// step, once its replay buffer has collected enough transitions. The `stop`
/// flag is checked at every step boundary, so raising it never interrupts an
/// update that is already underway.
///
/// Returns the undiscounted total reward and the success flag of every
/// completed episode.
///
/// # Arguments
///
/// * `env` - The environment to run on.
/// * `alg` - The agent to run with.
/// * `mode` - Whether to train or to evaluate, and for how many episodes.
/// * `stop` - External request to wind down the run early.
/// * `device` - The device to run on.
pub fn loop_off_policy<Alg, Env, Obs, Act>(
    env: &mut Env,
    alg: &mut Alg,
    mode: ParamRunMode,
    stop: &AtomicBool,
    device: &Device,
) -> Result<(Vec<f64>, Vec<bool>)>
where
    Env: Environment<Action = Act, Observation = Obs>,
    Alg: Algorithm + OffPolicyAlgorithm,
    Obs: Clone + TensorConvertible,
    Act: Clone + TensorConvertible + Sampleable,
{
    warn!("action space: {:?}", env.action_space());
    warn!("observation space: {:?}", env.observation_space());

    let mut steps_taken = 0;
    let mut mc_returns = Vec::new();
    let mut successes = Vec::new();
    let mut rng = rand::thread_rng();

    'episodes: for episode in 0..mode.max_episodes() {
        let mut total_reward = 0.0;
        env.reset(rng.gen::<u64>())?;
        alg.reset_episode()?;

        loop {
            if stop.load(Ordering::Relaxed) {
                warn!("stop requested, winding down after {episode} completed episodes");
                break 'episodes;
            }

            let state = &<Obs>::to_tensor(env.current_observation(), device)?;

            // select an action, or randomly sample one
            let action = &if steps_taken < mode.initial_random_actions() {
                <Act>::to_tensor(<Act>::sample(&mut rng, &env.action_domain()), device)?
            } else {
                alg.actions(state, mode.run_mode())?
            };

            let step = env.step(<Act>::from_tensor(action.clone()))?;
            total_reward += step.reward;
            steps_taken += 1;

            alg.remember(
                state,
                action,
                &Tensor::new(vec![step.reward], device)?,
                &<Obs>::to_tensor(step.observation, device)?,
                &Tensor::new(vec![step.terminated as u8 as f64], device)?,
                &Tensor::new(vec![step.truncated as u8 as f64], device)?,
            );

            if let ParamRunMode::Train(_) = &mode {
                alg.train()?;
            }

            if step.terminated || step.truncated {
                successes.push(step.terminated);
                break;
            }
        }

        warn!("episode {episode} with total reward of {total_reward}");
        mc_returns.push(total_reward);
    }
    Ok((mc_returns, successes))
}
