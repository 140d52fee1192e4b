//! Stage plans and concurrency policies.

/// How tasks within a stage plan are dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConcurrencyPolicy {
    /// Dispatch every member concurrently and await all.
    FullParallel,
    /// Partition members into ordered batches of at most `k`; batches run
    /// sequentially, tasks within a batch concurrently.
    Batched(usize),
}

/// One schedulable unit of the pipeline.
///
/// Stage 1 is represented as three plans sharing ordinal 1 with steps 1..=3,
/// executed strictly in order: later instruction templates reference earlier
/// outputs by task id, so the sub-steps must not be collapsed.
#[derive(Debug, Clone)]
pub struct StagePlan {
    pub stage: u8,
    pub step: u8,
    pub label: &'static str,
    pub policy: ConcurrencyPolicy,
    pub tasks: Vec<&'static str>,
}

impl StagePlan {
    /// Partition the member tasks according to the policy.
    ///
    /// `FullParallel` yields a single batch; `Batched(k)` yields ceil(n/k)
    /// ordered batches preserving registry order. A batch size of zero is
    /// treated as one.
    pub fn batches(&self) -> Vec<Vec<&'static str>> {
        match self.policy {
            ConcurrencyPolicy::FullParallel => vec![self.tasks.clone()],
            ConcurrencyPolicy::Batched(k) => self
                .tasks
                .chunks(k.max(1))
                .map(<[&'static str]>::to_vec)
                .collect(),
        }
    }
}
