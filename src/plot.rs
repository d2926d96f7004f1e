//! Trace rendering with gnuplot.
use gnuplot::{AxesCommon, Figure, PlotOption::Caption};
use ndarray::ArrayView1;

use crate::{Error, processors::MeanVar};

/// Plots a curve against its sample index.
pub fn plot_curve(curve: ArrayView1<f64>, caption: &str) -> Result<(), Error> {
    let mut fg = Figure::new();
    fg.axes2d()
        .set_x_label("Sample", &[])
        .lines(0..curve.len(), curve, &[Caption(caption)]);
    fg.show()?;

    Ok(())
}

/// Plots a single trace.
pub fn plot_trace(trace: ArrayView1<f32>) -> Result<(), Error> {
    plot_curve(trace.mapv(f64::from).view(), "Trace")
}

/// Plots the sample-wise average of the traces accumulated in `mean_var`.
pub fn plot_average(mean_var: &MeanVar) -> Result<(), Error> {
    let caption = format!("Average of {} traces", mean_var.count());
    plot_curve(mean_var.mean().view(), &caption)
}
