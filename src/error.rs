use crate::{aligner::AlignError, fluid::FluidError, power::PowerError, spectral::SpectralError};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Error in the `fluid` module")]
    Fluid(#[from] FluidError),
    #[error("Error in the `aligner` module")]
    Align(#[from] AlignError),
    #[error("Error in the `spectral` module")]
    Spectral(#[from] SpectralError),
    #[error("Error in the `power` module")]
    Power(#[from] PowerError),
    #[cfg(feature = "plot")]
    #[error("Error in the `plot` module")]
    Plot(#[from] crate::plot::PlotError),
    #[error("{failed} of {total} pipelines failed")]
    Batch { failed: usize, total: usize },
}
