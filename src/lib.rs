pub mod error;
pub mod f;
pub mod linear;
pub mod loss;
pub mod nn;
pub mod optim;
pub mod persist;

pub use error::{Error, Result};

pub use ndarray;
pub use ndarray_rand;
pub use ndarray_stats;
