use {
    crate::error::DdpgError,
    candle_core::Tensor,
    rand::{
        distributions::Uniform,
        thread_rng,
        Rng,
    },
    std::collections::VecDeque,
    unzip_n::unzip_n,
};

unzip_n!(6);

/// A transition in the replay buffer.
///
/// # Fields
///
/// * `state` - The state tensor.
/// * `action` - The action tensor.
/// * `reward` - The reward tensor.
/// * `next_state` - The next state tensor.
/// * `terminated` - The terminated tensor.
/// * `truncated` - The truncated tensor.
#[derive(Clone)]
pub struct Transition {
    state: Tensor,
    action: Tensor,
    reward: Tensor,
    next_state: Tensor,
    terminated: Tensor,
    truncated: Tensor,
}
impl Transition {
    fn new(
        state: &Tensor,
        action: &Tensor,
        reward: &Tensor,
        next_state: &Tensor,
        terminated: &Tensor,
        truncated: &Tensor,
    ) -> Self {
        Self {
            state: state.clone(),
            action: action.clone(),
            reward: reward.clone(),
            next_state: next_state.clone(),
            terminated: terminated.clone(),
            truncated: truncated.clone(),
        }
    }
}

/// A replay buffer for off-policy algorithms.
///
/// The replay buffer is implemented as a simple ring buffer / VecDeque: once
/// at capacity, every stored transition evicts the oldest one.
///
/// # Fields
///
/// * `buffer` - The buffer of transitions.
/// * `capacity` - The capacity of the buffer.
/// * `size` - The current size of the buffer.
#[derive(Clone)]
pub struct ReplayBuffer {
    buffer: VecDeque<Transition>,
    capacity: usize,
    size: usize,
}
impl ReplayBuffer {
    /// Create a new replay buffer with the given capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: VecDeque::with_capacity(capacity),
            capacity,
            size: 0,
        }
    }

    /// The number of transitions currently stored.
    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Check if the buffer is full.
    pub fn is_full(&self) -> bool {
        self.size == self.capacity
    }

    /// Push a transition into the buffer.
    ///
    /// If the buffer is full, the oldest transition is removed to make room for
    /// the new transition.
    pub fn push(
        &mut self,
        state: &Tensor,
        action: &Tensor,
        reward: &Tensor,
        next_state: &Tensor,
        terminated: &Tensor,
        truncated: &Tensor,
    ) {
        if self.size == self.capacity {
            self.buffer.pop_front();
        } else {
            self.size += 1;
        }
        self.buffer.push_back(Transition::new(
            state, action, reward, next_state, terminated, truncated,
        ));
    }

    /// Sample a random batch of transitions from the buffer, uniformly and
    /// with replacement, stacked along a fresh batch dimension.
    ///
    /// When the buffer holds fewer than `batch_size` transitions this fails
    /// with [`DdpgError::InsufficientData`], which callers treat as "keep
    /// collecting experience" rather than as a fatal condition. A
    /// `batch_size` of zero is rejected with [`DdpgError::Config`] instead:
    /// waiting for more data can never satisfy it.
    #[allow(clippy::type_complexity)]
    pub fn random_batch(
        &self,
        batch_size: usize,
    ) -> Result<(Tensor, Tensor, Tensor, Tensor, Tensor, Tensor), DdpgError> {
        if batch_size == 0 {
            return Err(DdpgError::Config(
                "the requested batch size must be at least 1".into(),
            ));
        }
        if self.size < batch_size {
            return Err(DdpgError::InsufficientData {
                requested: batch_size,
                len: self.size,
            });
        }

        let transition_to_tuple =
            |t: &Transition| -> Result<(Tensor, Tensor, Tensor, Tensor, Tensor, Tensor), DdpgError> {
                Ok((
                    t.state.unsqueeze(0)?,
                    t.action.unsqueeze(0)?,
                    t.reward.unsqueeze(0)?,
                    t.next_state.unsqueeze(0)?,
                    t.terminated.unsqueeze(0)?,
                    t.truncated.unsqueeze(0)?,
                ))
            };

        let transitions: Vec<&Transition> = thread_rng()
            .sample_iter(Uniform::from(0..self.size))
            .take(batch_size)
            .filter_map(|i| self.buffer.get(i))
            .collect();

        let (states, actions, rewards, next_states, terminateds, truncateds) = transitions
            .into_iter()
            .map(transition_to_tuple)
            .collect::<Result<Vec<(Tensor, Tensor, Tensor, Tensor, Tensor, Tensor)>, DdpgError>>()?
            .into_iter()
            .unzip_n_vec();

        Ok((
            Tensor::cat(&states, 0)?,
            Tensor::cat(&actions, 0)?,
            Tensor::cat(&rewards, 0)?,
            Tensor::cat(&next_states, 0)?,
            Tensor::cat(&terminateds, 0)?,
            Tensor::cat(&truncateds, 0)?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::Device;

    fn scalar(value: f64, device: &Device) -> Tensor {
        Tensor::new(&[value], device).unwrap()
    }

    fn push_numbered(buffer: &mut ReplayBuffer, value: f64, device: &Device) {
        let t = scalar(value, device);
        buffer.push(&t, &t, &t, &t, &scalar(0.0, device), &scalar(0.0, device));
    }

    #[test]
    fn eviction_keeps_the_most_recent_transitions() {
        let device = Device::Cpu;
        let mut buffer = ReplayBuffer::new(4);
        for i in 0..6 {
            push_numbered(&mut buffer, i as f64, &device);
        }
        assert_eq!(buffer.len(), 4);
        assert!(buffer.is_full());

        // Repeated full-size batches may only ever contain the surviving
        // transitions, and over this many draws they miss none of them.
        let survivors = [2.0, 3.0, 4.0, 5.0];
        let mut seen = [false; 4];
        for _ in 0..64 {
            let (states, ..) = buffer.random_batch(4).unwrap();
            for value in states.flatten_all().unwrap().to_vec1::<f64>().unwrap() {
                match survivors.iter().position(|s| *s == value) {
                    Some(index) => seen[index] = true,
                    None => panic!("sampled {value}, which should have been evicted"),
                }
            }
        }
        assert_eq!(seen, [true; 4]);
    }

    #[test]
    fn batches_have_the_requested_size() {
        let device = Device::Cpu;
        let mut buffer = ReplayBuffer::new(10);
        for i in 0..10 {
            push_numbered(&mut buffer, i as f64, &device);
        }
        let (states, actions, rewards, next_states, terminateds, truncateds) =
            buffer.random_batch(10).unwrap();
        for tensor in [states, actions, rewards, next_states, terminateds, truncateds] {
            assert_eq!(tensor.dims()[0], 10);
        }
    }

    #[test]
    fn underfull_buffer_reports_insufficient_data() {
        let device = Device::Cpu;
        let mut buffer = ReplayBuffer::new(10);
        for i in 0..3 {
            push_numbered(&mut buffer, i as f64, &device);
        }
        match buffer.random_batch(4) {
            Err(DdpgError::InsufficientData { requested, len }) => {
                assert_eq!(requested, 4);
                assert_eq!(len, 3);
            }
            other => panic!("expected InsufficientData, got {other:?}"),
        }
    }

    #[test]
    fn a_zero_size_batch_is_rejected() {
        let device = Device::Cpu;
        let mut buffer = ReplayBuffer::new(4);
        assert!(matches!(buffer.random_batch(0), Err(DdpgError::Config(_))));

        // also once the buffer has content, not only on the empty edge
        push_numbered(&mut buffer, 0.0, &device);
        assert!(matches!(buffer.random_batch(0), Err(DdpgError::Config(_))));
    }
}
