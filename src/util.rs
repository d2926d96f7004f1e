//! Convenient utility functions.

use std::{cmp::Ordering, path::Path};

use ndarray::{Array1, ArrayView1};
use ndarray_npy::read_npy;

use crate::Error;

#[cfg(feature = "progress_bar")]
use indicatif::{ProgressBar, ProgressStyle};
#[cfg(feature = "progress_bar")]
use std::time::Duration;

/// Reads back a trace written by [`crate::export::NpyExporter`].
pub fn load_trace<P: AsRef<Path>>(path: P) -> Result<Array1<f32>, Error> {
    Ok(read_npy(path)?)
}

/// Creates a [`ProgressBar`] with a predefined default style.
#[cfg(feature = "progress_bar")]
pub fn progress_bar(len: usize) -> ProgressBar {
    let progress_bar = ProgressBar::new(len as u64).with_style(
        ProgressStyle::with_template("{elapsed_precise} {wide_bar} {pos}/{len} ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    progress_bar.enable_steady_tick(Duration::new(0, 100000000));
    progress_bar
}

/// Return the index of the maximum value in the given array.
pub fn argmax_by<T, F>(array: ArrayView1<T>, compare: F) -> usize
where
    F: Fn(&T, &T) -> Ordering,
{
    let mut idx_max = 0;

    for i in 0..array.shape()[0] {
        if compare(&array[i], &array[idx_max]).is_gt() {
            idx_max = i;
        }
    }

    idx_max
}

#[cfg(test)]
mod tests {
    use super::argmax_by;
    use ndarray::array;

    #[test]
    fn test_argmax_by() {
        let a = array![0.1f64, -2.0, 3.5, 3.5, 0.0];
        assert_eq!(argmax_by(a.view(), f64::total_cmp), 2);
        assert_eq!(argmax_by(array![1.0f64].view(), f64::total_cmp), 0);
    }
}
