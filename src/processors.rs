//! Traces processing algorithms
use ndarray::{Array1, ArrayView1};
use std::iter::zip;

/// Processes traces to calculate mean and variance.
///
/// Used to compute the sample-wise average of a batch while it is being exported.
#[derive(Debug, Clone)]
pub struct MeanVar {
    /// Sum of traces
    sum: Array1<f64>,
    /// Sum of square of traces
    sum_squares: Array1<f64>,
    /// Number of traces processed
    count: usize,
}

impl MeanVar {
    /// Creates a new mean and variance processor.
    ///
    /// # Arguments
    ///
    /// * `size` - Number of samples per trace
    pub fn new(size: usize) -> Self {
        Self {
            sum: Array1::zeros(size),
            sum_squares: Array1::zeros(size),
            count: 0,
        }
    }

    /// Processes an input trace to update internal accumulators.
    ///
    /// # Panics
    /// Panics in debug if the length of the trace is different form the size of [`MeanVar`].
    pub fn process<T: Into<f64> + Copy>(&mut self, trace: ArrayView1<T>) {
        debug_assert!(trace.len() == self.size());

        for i in 0..self.sum.len() {
            let x = trace[i].into();

            self.sum[i] += x;
            self.sum_squares[i] += x * x;
        }

        self.count += 1;
    }

    /// Returns trace mean.
    pub fn mean(&self) -> Array1<f64> {
        let count = self.count as f64;

        self.sum.mapv(|x| x / count)
    }

    /// Calculates and returns traces variance.
    pub fn var(&self) -> Array1<f64> {
        let count = self.count as f64;

        zip(self.sum.iter(), self.sum_squares.iter())
            .map(|(&sum, &sum_squares)| (sum_squares / count) - (sum / count).powi(2))
            .collect()
    }

    /// Returns the trace size handled.
    pub fn size(&self) -> usize {
        self.sum.len()
    }

    /// Returns the number of traces processed.
    pub fn count(&self) -> usize {
        self.count
    }
}
