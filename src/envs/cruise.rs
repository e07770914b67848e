use {
    super::{
        Environment,
        Sampleable,
        Step,
        TensorConvertible,
        VectorConvertible,
    },
    anyhow::Result,
    candle_core::{
        Device,
        Tensor,
    },
    rand::{
        rngs::StdRng,
        Rng,
        RngCore,
        SeedableRng,
    },
    serde::{
        Deserialize,
        Serialize,
    },
    std::ops::RangeInclusive,
    tracing::info,
};

fn tensor_to_vec(value: Tensor) -> candle_core::Result<Vec<f64>> {
    let dims = value.dims();
    if dims.len() == 1 {
        value.to_vec1::<f64>()
    } else {
        value.squeeze(0)?.to_vec1::<f64>()
    }
}

/// The configuration struct for the [`CruiseEnv`] environment.
///
/// # Fields
/// * `target_speed` - The speed the controller is asked to hold, in \[0.0, 1.0\].
/// * `timelimit` - The maximum number of steps before the episode is truncated.
/// * `seed` - The seed for the random number generator.
///
/// # Example
/// ```
/// use ddpg_rl::envs::CruiseEnvConfig;
///
/// let config = CruiseEnvConfig::default();
/// assert_eq!(config.target_speed, 0.5);
/// assert_eq!(config.timelimit, 50);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CruiseEnvConfig {
    pub target_speed: f64,
    pub timelimit: usize,
    pub seed: u64,
}
impl Default for CruiseEnvConfig {
    fn default() -> Self {
        Self {
            target_speed: 0.5,
            timelimit: 50,
            seed: StdRng::from_entropy().gen::<u64>(),
        }
    }
}
impl CruiseEnvConfig {
    pub fn new(
        target_speed: f64,
        timelimit: usize,
        seed: u64,
    ) -> Self {
        Self {
            target_speed,
            timelimit,
            seed,
        }
    }

    pub fn check(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.target_speed) {
            return Err(anyhow::anyhow!("Target speed must be in the range [0.0, 1.0]"));
        }
        if self.timelimit == 0 {
            return Err(anyhow::anyhow!("Timelimit must be at least 1"));
        }
        Ok(())
    }
}

/// The action type for the [`CruiseEnv`] environment.
///
/// A [`CruiseAction`] is the throttle setpoint for the next step, a single
/// f64 value in \[0.0, 1.0\].
#[derive(Debug, Clone)]
pub struct CruiseAction {
    throttle: f64,
}
impl CruiseAction {
    pub fn throttle(&self) -> f64 {
        self.throttle
    }
}
impl Sampleable for CruiseAction {
    /// Sample a throttle uniformly from the action domain.
    ///
    /// This function panics if the number of ranges in the domain is not 1.
    fn sample(
        rng: &mut dyn RngCore,
        domain: &[RangeInclusive<f64>],
    ) -> Self {
        assert!(domain.len() == 1);
        Self {
            throttle: rng.gen_range(domain[0].clone()),
        }
    }
}
impl VectorConvertible for CruiseAction {
    /// Panics if the Vec does not have exactly 1 element.
    fn from_vec(value: Vec<f64>) -> Self {
        assert!(value.len() == 1);
        Self { throttle: value[0] }
    }

    fn to_vec(value: Self) -> Vec<f64> {
        vec![value.throttle]
    }
}
impl TensorConvertible for CruiseAction {
    fn from_tensor(value: Tensor) -> Self {
        Self::from_vec(tensor_to_vec(value).unwrap())
    }

    fn to_tensor(
        value: Self,
        device: &Device,
    ) -> candle_core::Result<Tensor> {
        Tensor::new(Self::to_vec(value), device)
    }
}

/// The observation type for the [`CruiseEnv`] environment.
///
/// The observation is the current speed of the car, a single f64 value
/// in \[0.0, 1.0\].
#[derive(Debug, Clone)]
pub struct CruiseState {
    speed: f64,
}
impl CruiseState {
    pub fn speed(&self) -> f64 {
        self.speed
    }
}
impl VectorConvertible for CruiseState {
    /// Panics if the Vec does not have exactly 1 element.
    fn from_vec(value: Vec<f64>) -> Self {
        assert!(value.len() == 1);
        Self { speed: value[0] }
    }

    fn to_vec(value: Self) -> Vec<f64> {
        vec![value.speed]
    }
}
impl TensorConvertible for CruiseState {
    fn from_tensor(value: Tensor) -> Self {
        Self::from_vec(tensor_to_vec(value).unwrap())
    }

    fn to_tensor(
        value: Self,
        device: &Device,
    ) -> candle_core::Result<Tensor> {
        Tensor::new(Self::to_vec(value), device)
    }
}

/// A minimal cruise-control environment.
///
/// The throttle directly sets the speed for the next step, and the reward is
/// the negative squared tracking error against the configured target speed.
/// The optimal policy is therefore to output the target speed everywhere,
/// which makes this environment a good smoke test for a continuous-control
/// agent: there is a single known-optimal action to converge to.
///
/// Episodes never terminate, they are truncated at the timelimit.
pub struct CruiseEnv {
    config: CruiseEnvConfig,
    speed: f64,
    timestep: usize,
    timelimit: usize,
    rng: StdRng,
}

impl Environment for CruiseEnv {
    type Config = CruiseEnvConfig;
    type Action = CruiseAction;
    type Observation = CruiseState;

    fn new(config: Self::Config) -> Result<Box<Self>> {
        config.check()?;
        let mut rng = StdRng::seed_from_u64(config.seed);
        let speed = rng.gen_range(0.0..=1.0);
        Ok(Box::new(Self {
            timelimit: config.timelimit,
            config,
            speed,
            timestep: 0,
            rng,
        }))
    }

    fn reset(
        &mut self,
        seed: u64,
    ) -> Result<Self::Observation> {
        self.timestep = 0;
        self.rng = StdRng::seed_from_u64(seed);
        self.speed = self.rng.gen_range(0.0..=1.0);
        Ok(self.current_observation())
    }

    fn step(
        &mut self,
        action: Self::Action,
    ) -> Result<Step<Self::Observation, Self::Action>> {
        let throttle = action.throttle().clamp(0.0, 1.0);
        self.timestep += 1;
        self.speed = throttle;

        let reward = -(self.speed - self.config.target_speed).powi(2);
        let terminated = false;
        let truncated = self.timestep == self.timelimit;

        info!(
            "CruiseEnv step {}: throttle {:.3} -> speed {:.3}, reward {:.4}",
            self.timestep, throttle, self.speed, reward,
        );

        Ok(Step {
            observation: self.current_observation(),
            action,
            reward,
            terminated,
            truncated,
        })
    }

    fn timelimit(&self) -> usize {
        self.timelimit
    }

    fn action_space(&self) -> Vec<usize> {
        vec![1]
    }

    fn action_domain(&self) -> Vec<RangeInclusive<f64>> {
        vec![0.0..=1.0]
    }

    fn observation_space(&self) -> Vec<usize> {
        vec![1]
    }

    fn current_observation(&self) -> Self::Observation {
        CruiseState { speed: self.speed }
    }

    fn config(&self) -> &Self::Config {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_at_the_timelimit() {
        let mut env = *CruiseEnv::new(CruiseEnvConfig::new(0.5, 10, 42)).unwrap();
        for i in 1..=env.timelimit() {
            let step = env.step(CruiseAction { throttle: 0.3 }).unwrap();
            assert!(!step.terminated);
            assert_eq!(step.truncated, i == 10);
        }
    }

    #[test]
    fn reward_peaks_at_the_target_speed() {
        let mut env = *CruiseEnv::new(CruiseEnvConfig::new(0.5, 10, 42)).unwrap();
        let on_target = env.step(CruiseAction { throttle: 0.5 }).unwrap();
        let off_target = env.step(CruiseAction { throttle: 0.1 }).unwrap();
        assert_eq!(on_target.reward, 0.0);
        assert!(off_target.reward < on_target.reward);
    }

    #[test]
    fn reset_with_equal_seeds_is_deterministic() {
        let mut env = *CruiseEnv::new(CruiseEnvConfig::default()).unwrap();
        let first = env.reset(7).unwrap();
        let second = env.reset(7).unwrap();
        assert_eq!(first.speed(), second.speed());
    }

    #[test]
    fn rejects_an_unreachable_target() {
        assert!(CruiseEnv::new(CruiseEnvConfig::new(1.5, 10, 42)).is_err());
    }
}
