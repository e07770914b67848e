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
    std::{
        f64::consts::PI,
        ops::RangeInclusive,
    },
    tracing::info,
};

const MAX_SPEED: f64 = 8.0;
const MAX_TORQUE: f64 = 2.0;
const DT: f64 = 0.05;
const GRAVITY: f64 = 10.0;
const MASS: f64 = 1.0;
const LENGTH: f64 = 1.0;

fn angle_normalize(x: f64) -> f64 {
    (x + PI).rem_euclid(2.0 * PI) - PI
}

fn tensor_to_vec(value: Tensor) -> candle_core::Result<Vec<f64>> {
    let dims = value.dims();
    if dims.len() == 1 {
        value.to_vec1::<f64>()
    } else {
        value.squeeze(0)?.to_vec1::<f64>()
    }
}

/// The configuration struct for the [`PendulumEnv`] environment.
///
/// # Fields
/// * `timelimit` - The maximum number of steps before the episode is truncated.
/// * `seed` - The seed for the random number generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendulumConfig {
    pub timelimit: usize,
    pub seed: u64,
}
impl Default for PendulumConfig {
    fn default() -> Self {
        Self {
            timelimit: 200,
            seed: StdRng::from_entropy().gen::<u64>(),
        }
    }
}
impl PendulumConfig {
    pub fn new(
        timelimit: usize,
        seed: u64,
    ) -> Self {
        Self { timelimit, seed }
    }

    pub fn check(&self) -> Result<()> {
        if self.timelimit == 0 {
            return Err(anyhow::anyhow!("Timelimit must be at least 1"));
        }
        Ok(())
    }
}

/// The action type for the [`PendulumEnv`] environment.
///
/// A single f64 value: the torque applied to the free end of the pendulum,
/// in \[-2.0, 2.0\].
#[derive(Debug, Clone)]
pub struct PendulumAction {
    torque: f64,
}
impl PendulumAction {
    pub fn torque(&self) -> f64 {
        self.torque
    }
}
impl Sampleable for PendulumAction {
    /// Sample a torque uniformly from the action domain.
    ///
    /// This function panics if the number of ranges in the domain is not 1.
    fn sample(
        rng: &mut dyn RngCore,
        domain: &[RangeInclusive<f64>],
    ) -> Self {
        assert!(domain.len() == 1);
        Self {
            torque: rng.gen_range(domain[0].clone()),
        }
    }
}
impl VectorConvertible for PendulumAction {
    /// Panics if the Vec does not have exactly 1 element.
    fn from_vec(value: Vec<f64>) -> Self {
        assert!(value.len() == 1);
        Self { torque: value[0] }
    }

    fn to_vec(value: Self) -> Vec<f64> {
        vec![value.torque]
    }
}
impl TensorConvertible for PendulumAction {
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

/// The observation type for the [`PendulumEnv`] environment.
///
/// The observation consists of the (x, y) coordinates of the free end of the
/// pendulum and its angular velocity: \[x, y, velocity\].
#[derive(Debug, Clone)]
pub struct PendulumState {
    x: f64,
    y: f64,
    velocity: f64,
}
impl VectorConvertible for PendulumState {
    /// Panics if the Vec does not have exactly 3 elements.
    fn from_vec(value: Vec<f64>) -> Self {
        assert!(value.len() == 3);
        Self {
            x: value[0],
            y: value[1],
            velocity: value[2],
        }
    }

    fn to_vec(value: Self) -> Vec<f64> {
        vec![value.x, value.y, value.velocity]
    }
}
impl TensorConvertible for PendulumState {
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

/// The classic pendulum swing-up task.
///
/// This is a native implementation of the dynamics of the Gymnasium
/// Pendulum-v1 environment, see the
/// [documentation](https://gymnasium.farama.org/environments/classic_control/pendulum/).
/// The pendulum starts at a random angle and the goal is to swing it up and
/// balance it upright by applying torque to the free end.
///
/// Episodes never terminate, they are truncated at the timelimit.
pub struct PendulumEnv {
    config: PendulumConfig,
    theta: f64,
    theta_dot: f64,
    timestep: usize,
    timelimit: usize,
    rng: StdRng,
}

impl Environment for PendulumEnv {
    type Config = PendulumConfig;
    type Action = PendulumAction;
    type Observation = PendulumState;

    fn new(config: Self::Config) -> Result<Box<Self>> {
        config.check()?;
        let mut rng = StdRng::seed_from_u64(config.seed);
        let theta = rng.gen_range(-PI..=PI);
        let theta_dot = rng.gen_range(-1.0..=1.0);
        Ok(Box::new(Self {
            timelimit: config.timelimit,
            config,
            theta,
            theta_dot,
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
        self.theta = self.rng.gen_range(-PI..=PI);
        self.theta_dot = self.rng.gen_range(-1.0..=1.0);
        Ok(self.current_observation())
    }

    fn step(
        &mut self,
        action: Self::Action,
    ) -> Result<Step<Self::Observation, Self::Action>> {
        let torque = action.torque().clamp(-MAX_TORQUE, MAX_TORQUE);
        self.timestep += 1;

        // costs are computed on the state before integration
        let costs = angle_normalize(self.theta).powi(2)
            + 0.1 * self.theta_dot.powi(2)
            + 0.001 * torque.powi(2);

        self.theta_dot += (3.0 * GRAVITY / (2.0 * LENGTH) * self.theta.sin()
            + 3.0 / (MASS * LENGTH.powi(2)) * torque)
            * DT;
        self.theta_dot = self.theta_dot.clamp(-MAX_SPEED, MAX_SPEED);
        self.theta += self.theta_dot * DT;

        let reward = -costs;
        let terminated = false;
        let truncated = self.timestep == self.timelimit;

        info!(
            "PendulumEnv step {}: torque {:.3}, angle {:.3}, reward {:.4}",
            self.timestep, torque, self.theta, reward,
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
        vec![-MAX_TORQUE..=MAX_TORQUE]
    }

    fn observation_space(&self) -> Vec<usize> {
        vec![3]
    }

    fn current_observation(&self) -> Self::Observation {
        PendulumState {
            x: self.theta.cos(),
            y: self.theta.sin(),
            velocity: self.theta_dot,
        }
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
        let mut env = *PendulumEnv::new(PendulumConfig::new(5, 42)).unwrap();
        for i in 1..=env.timelimit() {
            let step = env.step(PendulumAction { torque: 0.0 }).unwrap();
            assert!(!step.terminated);
            assert_eq!(step.truncated, i == 5);
        }
    }

    #[test]
    fn observation_stays_on_the_unit_circle() {
        let mut env = *PendulumEnv::new(PendulumConfig::new(100, 42)).unwrap();
        for _ in 0..100 {
            let step = env.step(PendulumAction { torque: 1.5 }).unwrap();
            let obs = PendulumState::to_vec(step.observation);
            let radius = (obs[0].powi(2) + obs[1].powi(2)).sqrt();
            assert!((radius - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn velocity_is_clamped_and_rewards_are_bounded() {
        let mut env = *PendulumEnv::new(PendulumConfig::new(50, 7)).unwrap();
        for _ in 0..50 {
            let step = env.step(PendulumAction { torque: MAX_TORQUE }).unwrap();
            let obs = PendulumState::to_vec(step.observation);
            assert!(obs[2].abs() <= MAX_SPEED);
            // see the Gymnasium docs for the reward bound
            assert!(step.reward <= 0.0 && step.reward >= -16.2736044);
        }
    }
}
