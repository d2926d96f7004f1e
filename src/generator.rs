//! Batch generation of synthetic traces.
use std::iter::zip;

use itertools::Itertools;
use ndarray_rand::rand::{self, Rng, SeedableRng, rngs::StdRng};
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use tracing::{info, trace};

use crate::{
    Error,
    config::GeneratorConfig,
    export::TraceSink,
    leakage_model::LeakageModel,
    synthesis::Synthesizer,
    trace::{Trace, TraceRecord},
};

/// Outcome of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    pub num_traces: usize,
    /// Number of traces carrying the leakage
    pub leak_count: usize,
}

/// Returns the random generator of trace `index` in a batch seeded with `seed`.
///
/// Each trace gets its own stream, so a trace does not depend on which thread produced it or
/// on the traces generated before it.
pub fn trace_rng(seed: u64, index: usize) -> StdRng {
    StdRng::seed_from_u64(seed ^ (index as u64).wrapping_mul(0x9e37_79b9_7f4a_7c15))
}

/// Generates batches of traces for a validated [`GeneratorConfig`].
#[derive(Debug, Clone)]
pub struct Generator {
    config: GeneratorConfig,
    model: LeakageModel,
    synthesizer: Synthesizer,
}

impl Generator {
    pub fn new(config: GeneratorConfig) -> Result<Self, Error> {
        config.validate()?;

        let model = LeakageModel::new(
            config.leak_policy,
            config.round_key,
            config.watched_bit_index,
        )?;
        let synthesizer = Synthesizer::new(&config)?;

        Ok(Self {
            config,
            model,
            synthesizer,
        })
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn model(&self) -> &LeakageModel {
        &self.model
    }

    /// Generates a single trace. Returns whether it leaks, with the trace and its ciphertext.
    pub fn generate_record<R: Rng + ?Sized>(&self, rng: &mut R) -> (bool, TraceRecord) {
        let decision = self.model.decide(rng);
        let leakage = self.synthesizer.synthesize(decision.leaked, rng);

        (decision.leaked, Trace::new(leakage, decision.ciphertext))
    }

    /// Generates the batch sequentially from `rng`, streaming each record to `sink`.
    ///
    /// `progress` is called with the number of records written so far.
    pub fn generate<R, S, F>(
        &self,
        rng: &mut R,
        sink: &mut S,
        mut progress: F,
    ) -> Result<BatchSummary, Error>
    where
        R: Rng + ?Sized,
        S: TraceSink + ?Sized,
        F: FnMut(usize),
    {
        self.log_start();

        let mut leak_count = 0;
        for index in 0..self.config.num_traces {
            let (leaked, record) = self.generate_record(rng);
            leak_count += usize::from(leaked);
            trace!(index, leaked, "trace generated");

            sink.write(index, &record)?;
            progress(index + 1);
        }
        sink.finish()?;

        Ok(self.summary(leak_count))
    }

    /// Generates the batch with rayon, `batch_size` traces at a time.
    ///
    /// Trace `i` is drawn from [`trace_rng`]`(seed, i)`, so the output only depends on `seed`.
    /// Records reach `sink` in index order.
    pub fn generate_par<S, F>(
        &self,
        seed: u64,
        sink: &mut S,
        mut progress: F,
    ) -> Result<BatchSummary, Error>
    where
        S: TraceSink + ?Sized,
        F: FnMut(usize),
    {
        self.log_start();

        let mut leak_count = 0;
        let chunks = (0..self.config.num_traces).chunks(self.config.batch_size);
        for chunk in &chunks {
            let indices: Vec<usize> = chunk.collect();
            let records: Vec<(bool, TraceRecord)> = indices
                .par_iter()
                .map(|&index| self.generate_record(&mut trace_rng(seed, index)))
                .collect();

            for (index, (leaked, record)) in zip(indices, records) {
                leak_count += usize::from(leaked);
                trace!(index, leaked, "trace generated");

                sink.write(index, &record)?;
                progress(index + 1);
            }
        }
        sink.finish()?;

        Ok(self.summary(leak_count))
    }

    /// Generates the batch from the configured seed, or from a random one if none is set.
    pub fn run<S, F>(
        &self,
        parallel: bool,
        sink: &mut S,
        progress: F,
    ) -> Result<BatchSummary, Error>
    where
        S: TraceSink + ?Sized,
        F: FnMut(usize),
    {
        let seed = self.config.seed.unwrap_or_else(rand::random);
        info!(seed, "random generator seeded");

        if parallel {
            self.generate_par(seed, sink, progress)
        } else {
            self.generate(&mut StdRng::seed_from_u64(seed), sink, progress)
        }
    }

    fn log_start(&self) {
        info!(
            num_traces = self.config.num_traces,
            num_samples = self.config.num_samples,
            policy = %self.model.policy(),
            "generating traces"
        );
    }

    fn summary(&self, leak_count: usize) -> BatchSummary {
        info!(
            leak_count,
            num_traces = self.config.num_traces,
            "batch complete"
        );

        BatchSummary {
            num_traces: self.config.num_traces,
            leak_count,
        }
    }
}
