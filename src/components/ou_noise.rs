use {
    crate::error::DdpgError,
    candle_core::{
        DType,
        Device,
        Tensor,
    },
};

/// An Ornstein-Uhlenbeck process with independent parameters per action
/// dimension, so that e.g. a throttle can be biased towards its positive
/// range while a steering dimension stays centered.
pub struct OuNoise {
    mu: Tensor,
    theta: Tensor,
    sigma: Tensor,
    state: Tensor,
}
impl OuNoise {
    /// Create the process with its state at zero.
    ///
    /// Every parameter slice must have exactly `size_action` entries.
    pub fn new(
        mu: &[f64],
        theta: &[f64],
        sigma: &[f64],
        size_action: usize,
        device: &Device,
    ) -> Result<Self, DdpgError> {
        for (name, len) in [
            ("mu", mu.len()),
            ("theta", theta.len()),
            ("sigma", sigma.len()),
        ] {
            if len != size_action {
                return Err(DdpgError::DimensionMismatch(format!(
                    "OU parameter {name} has length {len} \
                     but the action space has {size_action} dimensions"
                )));
            }
        }
        Ok(Self {
            mu: Tensor::from_slice(mu, size_action, device)?,
            theta: Tensor::from_slice(theta, size_action, device)?,
            sigma: Tensor::from_slice(sigma, size_action, device)?,
            state: Tensor::zeros(size_action, DType::F64, device)?,
        })
    }

    pub fn sample(&mut self) -> Result<Tensor, DdpgError> {
        let rand = Tensor::randn_like(&self.state, 0.0, 1.0)?;
        let drift = ((&self.mu - &self.state)? * &self.theta)?;
        let diffusion = (rand * &self.sigma)?;
        self.state = ((&self.state + drift)? + diffusion)?;
        Ok(self.state.clone())
    }

    /// Return the state to zero, e.g. at an episode boundary.
    pub fn reset(&mut self) -> Result<(), DdpgError> {
        self.state = self.state.zeros_like()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_mismatched_parameter_lengths() {
        let device = Device::Cpu;
        let result = OuNoise::new(&[0.0], &[0.15, 0.15], &[0.1, 0.1], 2, &device);
        assert!(matches!(result, Err(DdpgError::DimensionMismatch(_))));
    }

    #[test]
    fn reset_restores_initial_state() {
        // With sigma at zero the process is deterministic, so the
        // trajectory after a reset must replay exactly.
        let device = Device::Cpu;
        let mut noise =
            OuNoise::new(&[0.4, -0.2], &[0.15, 0.15], &[0.0, 0.0], 2, &device).unwrap();
        let first = noise.sample().unwrap().to_vec1::<f64>().unwrap();
        noise.sample().unwrap();
        noise.sample().unwrap();
        noise.reset().unwrap();
        let replay = noise.sample().unwrap().to_vec1::<f64>().unwrap();
        assert_eq!(first, replay);
    }

    #[test]
    fn long_run_mean_reverts_to_mu() {
        let device = Device::Cpu;
        let mu = [-0.5, 0.0, 0.5];
        let mut noise =
            OuNoise::new(&mu, &[0.15, 0.15, 0.15], &[0.1, 0.1, 0.1], 3, &device).unwrap();

        let n_samples = 10_000;
        let mut sums = [0.0; 3];
        for _ in 0..n_samples {
            let sample = noise.sample().unwrap().to_vec1::<f64>().unwrap();
            for (sum, value) in sums.iter_mut().zip(&sample) {
                *sum += value;
            }
        }
        for (sum, target) in sums.iter().zip(&mu) {
            let mean = sum / n_samples as f64;
            assert!(
                (mean - target).abs() < 0.05,
                "empirical mean {mean} too far from {target}",
            );
        }
    }
}
