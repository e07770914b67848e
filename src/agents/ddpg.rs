use {
    super::{
        Algorithm,
        OffPolicyAlgorithm,
        RunMode,
        SaveableAlgorithm,
        TrainStats,
    },
    crate::{
        components::{
            OuNoise,
            ReplayBuffer,
        },
        configs::DDPG_Config,
        error::DdpgError,
    },
    candle_core::{
        DType,
        Device,
        Error,
        Module,
        Tensor,
        Var,
    },
    candle_nn::{
        func,
        linear,
        sequential::seq,
        Activation,
        AdamW,
        Optimizer,
        ParamsAdamW,
        Sequential,
        VarBuilder,
        VarMap,
    },
    std::path::Path,
    tracing::info,
};

/// Move the target parameters towards the online parameters by factor tau.
fn track(
    varmap: &mut VarMap,
    vb: &VarBuilder,
    target_prefix: &str,
    network_prefix: &str,
    dims: &[(usize, usize)],
    tau: f64,
) -> Result<(), DdpgError> {
    for (i, &(in_dim, out_dim)) in dims.iter().enumerate() {
        let target_w = vb.get((out_dim, in_dim), &format!("{target_prefix}-fc{i}.weight"))?;
        let network_w = vb.get((out_dim, in_dim), &format!("{network_prefix}-fc{i}.weight"))?;
        varmap.set_one(
            format!("{target_prefix}-fc{i}.weight"),
            ((tau * network_w)? + ((1.0 - tau) * target_w)?)?,
        )?;

        let target_b = vb.get(out_dim, &format!("{target_prefix}-fc{i}.bias"))?;
        let network_b = vb.get(out_dim, &format!("{network_prefix}-fc{i}.bias"))?;
        varmap.set_one(
            format!("{target_prefix}-fc{i}.bias"),
            ((tau * network_b)? + ((1.0 - tau) * target_b)?)?,
        )?;
    }
    Ok(())
}

/// Compute the bootstrap target `r + gamma * (1 - terminated) * next_q`,
/// detached so the critic regresses onto fixed values.
///
/// Terminal transitions bootstrap nothing: their target is the raw reward,
/// whatever the target critic thinks of the successor state.
fn bellman_target(
    rewards: &Tensor,
    terminateds: &Tensor,
    gamma: f64,
    next_q: &Tensor,
) -> Result<Tensor, DdpgError> {
    let continuation = ((1.0 - terminateds)? * next_q)?;
    Ok(((rewards + (gamma * continuation)?)?).detach())
}

struct Actor<'a> {
    varmap: VarMap,
    vb: VarBuilder<'a>,
    network: Sequential,
    target_network: Sequential,
    dims: Vec<(usize, usize)>,
}

impl Actor<'_> {
    fn new(
        device: &Device,
        dtype: DType,
        dims: &[(usize, usize)],
        action_low: &[f64],
        action_high: &[f64],
    ) -> Result<Self, DdpgError> {
        let mut varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, dtype, device);

        // The output head squashes with tanh and then maps (-1, 1) onto the
        // per-dimension action bounds, so the actor keeps its bounded-output
        // contract by construction.
        let scale: Vec<f64> = action_low
            .iter()
            .zip(action_high)
            .map(|(low, high)| (high - low) / 2.0)
            .collect();
        let mid: Vec<f64> = action_low
            .iter()
            .zip(action_high)
            .map(|(low, high)| (high + low) / 2.0)
            .collect();
        let scale = Tensor::from_slice(&scale, scale.len(), device)?;
        let mid = Tensor::from_slice(&mid, mid.len(), device)?;

        let make_network = |prefix: &str| {
            let scale = scale.clone();
            let mid = mid.clone();
            let seq = seq()
                .add(linear(
                    dims[0].0,
                    dims[0].1,
                    vb.pp(format!("{prefix}-fc0")),
                )?)
                .add(Activation::Relu)
                .add(linear(
                    dims[1].0,
                    dims[1].1,
                    vb.pp(format!("{prefix}-fc1")),
                )?)
                .add(Activation::Relu)
                .add(linear(
                    dims[2].0,
                    dims[2].1,
                    vb.pp(format!("{prefix}-fc2")),
                )?)
                .add(func(move |xs| {
                    xs.tanh()?.broadcast_mul(&scale)?.broadcast_add(&mid)
                }));
            Ok::<Sequential, Error>(seq)
        };

        let network = make_network("actor")?;
        let target_network = make_network("target-actor")?;

        // this sets the two networks to be equal to each other using tau = 1.0
        track(&mut varmap, &vb, "target-actor", "actor", dims, 1.0)?;

        Ok(Self {
            varmap,
            vb,
            network,
            target_network,
            dims: dims.to_vec(),
        })
    }

    fn forward(
        &self,
        state: &Tensor,
    ) -> Result<Tensor, DdpgError> {
        Ok(self.network.forward(state)?)
    }

    fn target_forward(
        &self,
        state: &Tensor,
    ) -> Result<Tensor, DdpgError> {
        Ok(self.target_network.forward(state)?)
    }

    fn track(
        &mut self,
        tau: f64,
    ) -> Result<(), DdpgError> {
        track(
            &mut self.varmap,
            &self.vb,
            "target-actor",
            "actor",
            &self.dims,
            tau,
        )
    }
}

struct Critic<'a> {
    varmap: VarMap,
    vb: VarBuilder<'a>,
    network: Sequential,
    target_network: Sequential,
    dims: Vec<(usize, usize)>,
}

impl Critic<'_> {
    fn new(
        device: &Device,
        dtype: DType,
        dims: &[(usize, usize)],
    ) -> Result<Self, DdpgError> {
        let mut varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, dtype, device);

        let make_network = |prefix: &str| {
            let seq = seq()
                .add(linear(
                    dims[0].0,
                    dims[0].1,
                    vb.pp(format!("{prefix}-fc0")),
                )?)
                .add(Activation::Relu)
                .add(linear(
                    dims[1].0,
                    dims[1].1,
                    vb.pp(format!("{prefix}-fc1")),
                )?)
                .add(Activation::Relu)
                .add(linear(
                    dims[2].0,
                    dims[2].1,
                    vb.pp(format!("{prefix}-fc2")),
                )?);
            Ok::<Sequential, Error>(seq)
        };

        let network = make_network("critic")?;
        let target_network = make_network("target-critic")?;

        // this sets the two networks to be equal to each other using tau = 1.0
        track(&mut varmap, &vb, "target-critic", "critic", dims, 1.0)?;

        Ok(Self {
            varmap,
            vb,
            network,
            target_network,
            dims: dims.to_vec(),
        })
    }

    fn forward(
        &self,
        state: &Tensor,
        action: &Tensor,
    ) -> Result<Tensor, DdpgError> {
        let xs = Tensor::cat(&[action, state], 1)?;
        Ok(self.network.forward(&xs)?)
    }

    fn target_forward(
        &self,
        state: &Tensor,
        action: &Tensor,
    ) -> Result<Tensor, DdpgError> {
        let xs = Tensor::cat(&[action, state], 1)?;
        Ok(self.target_network.forward(&xs)?)
    }

    fn track(
        &mut self,
        tau: f64,
    ) -> Result<(), DdpgError> {
        track(
            &mut self.varmap,
            &self.vb,
            "target-critic",
            "critic",
            &self.dims,
            tau,
        )
    }
}

/// A Deep Deterministic Policy Gradient agent.
///
/// The actor maps states to bounded actions, the critic estimates the value
/// of (state, action) pairs, and both carry a slowly-tracking target copy
/// that stabilizes the bootstrapped critic targets.
#[allow(clippy::upper_case_acronyms)]
pub struct DDPG<'a> {
    config: DDPG_Config,
    actor: Actor<'a>,
    actor_optim: AdamW,
    critic: Critic<'a>,
    critic_optim: AdamW,
    gamma: f64,
    tau: f64,
    replay_buffer: ReplayBuffer,
    pre_fill_threshold: usize,
    batch_size: usize,
    ou_noise: OuNoise,
    action_low: Tensor,
    action_high: Tensor,
}

impl DDPG<'_> {
    /// Evaluate the online critic for a single (state, action) pair.
    pub fn critic_forward_item(
        &self,
        state: &Tensor,
        action: &Tensor,
    ) -> Result<Tensor, DdpgError> {
        Ok(self
            .critic
            .forward(
                &state.detach().unsqueeze(0)?,
                &action.detach().unsqueeze(0)?,
            )?
            .squeeze(0)?)
    }
}

impl Algorithm for DDPG<'_> {
    type Config = DDPG_Config;

    fn config(&self) -> &DDPG_Config {
        &self.config
    }

    fn from_config(
        device: &Device,
        config: &DDPG_Config,
        size_state: usize,
        size_action: usize,
    ) -> Result<Box<Self>, DdpgError> {
        for (name, len) in [
            ("action_low", config.action_low.len()),
            ("action_high", config.action_high.len()),
        ] {
            if len != size_action {
                return Err(DdpgError::DimensionMismatch(format!(
                    "{name} has length {len} \
                     but the action space has {size_action} dimensions"
                )));
            }
        }
        for (low, high) in config.action_low.iter().zip(&config.action_high) {
            if low >= high {
                return Err(DdpgError::Config(format!(
                    "action bounds must satisfy low < high, got [{low}, {high}]"
                )));
            }
        }
        if config.training_batch_size == 0 {
            return Err(DdpgError::Config(
                "training_batch_size must be at least 1".into(),
            ));
        }
        if config.replay_buffer_capacity < config.training_batch_size {
            return Err(DdpgError::Config(format!(
                "replay_buffer_capacity ({}) cannot hold a full training batch ({})",
                config.replay_buffer_capacity, config.training_batch_size,
            )));
        }
        for (name, value) in [("gamma", config.gamma), ("tau", config.tau)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(DdpgError::Config(format!(
                    "{name} must be in the range [0.0, 1.0], got {value}"
                )));
            }
        }

        let ou_noise = OuNoise::new(
            &config.ou_mu,
            &config.ou_theta,
            &config.ou_sigma,
            size_action,
            device,
        )?;

        let filter_by_prefix = |varmap: &VarMap, prefix: &str| {
            varmap
                .data()
                .lock()
                .unwrap()
                .iter()
                .filter_map(|(name, var)| name.starts_with(prefix).then_some(var.clone()))
                .collect::<Vec<Var>>()
        };

        let actor = Actor::new(
            device,
            DType::F64,
            &[
                (size_state, config.hidden_1_size),
                (config.hidden_1_size, config.hidden_2_size),
                (config.hidden_2_size, size_action),
            ],
            &config.action_low,
            &config.action_high,
        )?;
        let actor_optim = AdamW::new(
            filter_by_prefix(&actor.varmap, "actor"),
            ParamsAdamW {
                lr: config.actor_learning_rate,
                ..Default::default()
            },
        )?;

        let critic = Critic::new(
            device,
            DType::F64,
            &[
                (size_state + size_action, config.hidden_1_size),
                (config.hidden_1_size, config.hidden_2_size),
                (config.hidden_2_size, 1),
            ],
        )?;
        let critic_optim = AdamW::new(
            filter_by_prefix(&critic.varmap, "critic"),
            ParamsAdamW {
                lr: config.critic_learning_rate,
                ..Default::default()
            },
        )?;

        Ok(Box::new(Self {
            actor,
            actor_optim,
            critic,
            critic_optim,
            gamma: config.gamma,
            tau: config.tau,
            replay_buffer: ReplayBuffer::new(config.replay_buffer_capacity),
            pre_fill_threshold: config.pre_fill_threshold,
            batch_size: config.training_batch_size,
            ou_noise,
            action_low: Tensor::from_slice(&config.action_low, size_action, device)?,
            action_high: Tensor::from_slice(&config.action_high, size_action, device)?,
            config: config.clone(),
        }))
    }

    fn actions(
        &mut self,
        state: &Tensor,
        mode: RunMode,
    ) -> Result<Tensor, DdpgError> {
        // Candle assumes a batch dimension, so when we don't have one we need
        // to pretend we do by un- and resqueezing the state tensor.
        let actions = self
            .actor
            .forward(&state.detach().unsqueeze(0)?)?
            .squeeze(0)?;
        Ok(match mode {
            RunMode::Train => {
                // the noise can push the action outside its valid range, so
                // clip back to the bounds
                let noisy = (actions + self.ou_noise.sample()?)?;
                noisy
                    .minimum(&self.action_high)?
                    .maximum(&self.action_low)?
            }
            RunMode::Test => actions,
        })
    }

    fn train(&mut self) -> Result<Option<TrainStats>, DdpgError> {
        if self.replay_buffer.len() < self.pre_fill_threshold {
            return Ok(None);
        }
        let (states, actions, rewards, next_states, terminateds, _truncateds) =
            match self.replay_buffer.random_batch(self.batch_size) {
                Ok(batch) => batch,
                Err(DdpgError::InsufficientData { .. }) => return Ok(None),
                Err(e) => return Err(e),
            };

        let next_q = self
            .critic
            .target_forward(&next_states, &self.actor.target_forward(&next_states)?)?;
        let q_target = bellman_target(&rewards, &terminateds, self.gamma, &next_q)?;
        let q = self.critic.forward(&states, &actions)?;

        let critic_loss = (q_target - q)?.sqr()?.mean_all()?;
        let critic_loss_value = critic_loss.to_scalar::<f64>()?;
        if !critic_loss_value.is_finite() {
            return Err(DdpgError::Numerical {
                context: "critic",
                value: critic_loss_value,
            });
        }
        self.critic_optim.backward_step(&critic_loss)?;

        let actor_loss = self
            .critic
            .forward(&states, &self.actor.forward(&states)?)?
            .mean_all()?
            .neg()?;
        let actor_loss_value = actor_loss.to_scalar::<f64>()?;
        if !actor_loss_value.is_finite() {
            return Err(DdpgError::Numerical {
                context: "actor",
                value: actor_loss_value,
            });
        }
        self.actor_optim.backward_step(&actor_loss)?;

        self.critic.track(self.tau)?;
        self.actor.track(self.tau)?;

        info!(
            "critic loss {critic_loss_value:.6}, actor loss {actor_loss_value:.6}",
        );
        Ok(Some(TrainStats {
            critic_loss: critic_loss_value,
            actor_loss: actor_loss_value,
        }))
    }

    fn reset_episode(&mut self) -> Result<(), DdpgError> {
        self.ou_noise.reset()
    }
}

impl OffPolicyAlgorithm for DDPG<'_> {
    fn remember(
        &mut self,
        state: &Tensor,
        action: &Tensor,
        reward: &Tensor,
        next_state: &Tensor,
        terminated: &Tensor,
        truncated: &Tensor,
    ) {
        info!("Pushing to replay buffer, reward {reward:?}");
        self.replay_buffer
            .push(state, action, reward, next_state, terminated, truncated)
    }

    fn replay_buffer(&self) -> &ReplayBuffer {
        &self.replay_buffer
    }
}

impl SaveableAlgorithm for DDPG<'_> {
    /// Write the actor and critic weights as two safetensors files.
    ///
    /// The target networks live in the same var maps and ride along, so a
    /// round trip resumes training exactly where it left off.
    fn save<P: AsRef<Path> + ?Sized>(
        &self,
        path: &P,
        name: &str,
    ) -> Result<(), DdpgError> {
        self.actor
            .varmap
            .save(path.as_ref().join(format!("{name}-actor.safetensors")))?;
        self.critic
            .varmap
            .save(path.as_ref().join(format!("{name}-critic.safetensors")))?;
        Ok(())
    }

    fn load<P: AsRef<Path> + ?Sized>(
        &mut self,
        path: &P,
        name: &str,
    ) -> Result<(), DdpgError> {
        self.actor
            .varmap
            .load(path.as_ref().join(format!("{name}-actor.safetensors")))?;
        self.critic
            .varmap
            .load(path.as_ref().join(format!("{name}-critic.safetensors")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    fn test_config() -> DDPG_Config {
        DDPG_Config {
            actor_learning_rate: 1e-3,
            critic_learning_rate: 1e-3,
            gamma: 0.99,
            tau: 0.005,
            hidden_1_size: 16,
            hidden_2_size: 16,
            replay_buffer_capacity: 64,
            pre_fill_threshold: 4,
            training_batch_size: 4,
            ou_mu: vec![0.0],
            ou_theta: vec![0.15],
            ou_sigma: vec![0.2],
            action_low: vec![-1.0],
            action_high: vec![1.0],
        }
    }

    fn forward_vec(actor: &Actor, state: &Tensor) -> Vec<f64> {
        actor
            .forward(state)
            .unwrap()
            .flatten_all()
            .unwrap()
            .to_vec1::<f64>()
            .unwrap()
    }

    fn target_vec(actor: &Actor, state: &Tensor) -> Vec<f64> {
        actor
            .target_forward(state)
            .unwrap()
            .flatten_all()
            .unwrap()
            .to_vec1::<f64>()
            .unwrap()
    }

    #[test]
    fn rejects_mismatched_action_bounds() {
        let device = Device::Cpu;
        let mut config = test_config();
        config.action_low = vec![0.0, 0.0];
        config.action_high = vec![1.0, 1.0];
        assert!(matches!(
            DDPG::from_config(&device, &config, 3, 1),
            Err(DdpgError::DimensionMismatch(_)),
        ));
    }

    #[test]
    fn rejects_inverted_action_bounds() {
        let device = Device::Cpu;
        let mut config = test_config();
        config.action_low = vec![1.0];
        config.action_high = vec![-1.0];
        assert!(matches!(
            DDPG::from_config(&device, &config, 3, 1),
            Err(DdpgError::Config(_)),
        ));
    }

    #[test]
    fn actions_respect_the_bounds_in_both_modes() {
        let device = Device::Cpu;
        let mut config = test_config();
        config.action_low = vec![-0.3];
        config.action_high = vec![0.8];
        // loud noise to make sure clipping does the work
        config.ou_sigma = vec![2.0];
        let mut agent = *DDPG::from_config(&device, &config, 3, 1).unwrap();

        let state = Tensor::new(&[0.1f64, -0.2, 0.3], &device).unwrap();
        for mode in [RunMode::Train, RunMode::Test] {
            for _ in 0..50 {
                let action = agent.actions(&state, mode).unwrap();
                let values = action.to_vec1::<f64>().unwrap();
                assert!(
                    values.iter().all(|a| (-0.3..=0.8).contains(a)),
                    "action {values:?} escaped the bounds in mode {mode}",
                );
            }
        }
    }

    #[test]
    fn soft_sync_with_tau_zero_and_one() {
        let device = Device::Cpu;
        let mut actor = Actor::new(
            &device,
            DType::F64,
            &[(3, 8), (8, 8), (8, 1)],
            &[-1.0],
            &[1.0],
        )
        .unwrap();
        let state = Tensor::new(&[[0.1f64, -0.2, 0.3]], &device).unwrap();

        // fresh networks start in lockstep
        assert_eq!(forward_vec(&actor, &state), target_vec(&actor, &state));

        // push the online network away from its target copy
        let weight = actor.vb.get((8, 3), "actor-fc0.weight").unwrap();
        actor
            .varmap
            .set_one("actor-fc0.weight", (weight + 1.0).unwrap())
            .unwrap();
        assert_ne!(forward_vec(&actor, &state), target_vec(&actor, &state));

        // tau = 0 leaves the target untouched
        let before = target_vec(&actor, &state);
        actor.track(0.0).unwrap();
        assert_eq!(before, target_vec(&actor, &state));

        // tau = 1 snaps the target onto the online network
        actor.track(1.0).unwrap();
        assert_eq!(forward_vec(&actor, &state), target_vec(&actor, &state));
    }

    #[test]
    fn terminal_transitions_do_not_bootstrap() {
        let device = Device::Cpu;
        let rewards = Tensor::new(&[[1.0f64], [-2.0]], &device).unwrap();
        let terminateds = Tensor::new(&[[1.0f64], [0.0]], &device).unwrap();
        let next_q = Tensor::new(&[[100.0f64], [100.0]], &device).unwrap();

        let target = bellman_target(&rewards, &terminateds, 0.9, &next_q).unwrap();
        let values = target.flatten_all().unwrap().to_vec1::<f64>().unwrap();
        assert_eq!(values[0], 1.0);
        assert_eq!(values[1], 88.0);
    }

    #[test]
    fn optimization_waits_for_the_pre_fill_threshold() {
        let device = Device::Cpu;
        let mut config = test_config();
        config.pre_fill_threshold = 8;
        config.training_batch_size = 4;
        let mut agent = *DDPG::from_config(&device, &config, 2, 1).unwrap();

        let state = Tensor::new(&[0.0f64, 0.0], &device).unwrap();
        let action = Tensor::new(&[0.1f64], &device).unwrap();
        let reward = Tensor::new(&[0.5f64], &device).unwrap();
        let flag = Tensor::new(&[0.0f64], &device).unwrap();

        for _ in 0..7 {
            agent.remember(&state, &action, &reward, &state, &flag, &flag);
        }
        // one transition short of the threshold: pure data collection
        assert!(agent.train().unwrap().is_none());

        agent.remember(&state, &action, &reward, &state, &flag, &flag);
        assert!(agent.train().unwrap().is_some());
    }

    #[test]
    fn non_finite_losses_halt_training() {
        let device = Device::Cpu;
        let config = test_config();
        let mut agent = *DDPG::from_config(&device, &config, 2, 1).unwrap();

        let state = Tensor::new(&[0.0f64, 0.0], &device).unwrap();
        let action = Tensor::new(&[0.1f64], &device).unwrap();
        let reward = Tensor::new(&[f64::NAN], &device).unwrap();
        let flag = Tensor::new(&[0.0f64], &device).unwrap();
        for _ in 0..4 {
            agent.remember(&state, &action, &reward, &state, &flag, &flag);
        }

        match agent.train() {
            Err(DdpgError::Numerical { context, .. }) => assert_eq!(context, "critic"),
            other => panic!("expected a numerical error, got {other:?}"),
        }
    }

    #[test]
    fn save_and_load_restore_the_policy() {
        let device = Device::Cpu;
        let config = test_config();
        let mut agent = *DDPG::from_config(&device, &config, 3, 1).unwrap();

        let state = Tensor::new(&[0.3f64, -0.1, 0.7], &device).unwrap();
        let before = agent
            .actions(&state, RunMode::Test)
            .unwrap()
            .to_vec1::<f64>()
            .unwrap();

        let dir = TempDir::new("ddpg-checkpoint").unwrap();
        agent.save(dir.path(), "test").unwrap();

        let mut restored = *DDPG::from_config(&device, &config, 3, 1).unwrap();
        let fresh = restored
            .actions(&state, RunMode::Test)
            .unwrap()
            .to_vec1::<f64>()
            .unwrap();
        restored.load(dir.path(), "test").unwrap();
        let after = restored
            .actions(&state, RunMode::Test)
            .unwrap()
            .to_vec1::<f64>()
            .unwrap();

        assert_ne!(before, fresh);
        assert_eq!(before, after);
    }
}
