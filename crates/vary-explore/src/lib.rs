//! Exploration of a document's configuration space.
//!
//! - `sampler`: random configurations drawn from a schema, with fixed values
//! - `space`: the remaining-space metric of a rendered last page
//! - `generate`: sample, render, measure and append, sequentially or on rayon

pub mod generate;
pub mod sampler;
pub mod space;

pub use generate::{generate_batch, generate_parallel, BatchReport, GenerateError};
pub use sampler::{sample, sample_random, SampleError};
pub use space::{measure, remaining_space, IntervalSet, SpaceError, SpaceSource};
