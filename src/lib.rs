pub mod evolve;
pub mod generator;
pub mod optimize;
pub mod qstate;
pub mod sweep;
pub mod test_util;

use num_complex::Complex;

pub type Qbit = Complex<f64>;

pub use optimize::BasinHopping;
pub use qstate::QState;
pub use sweep::{run_depth_sweep, run_depth_sweep_seeded, SweepResult};
