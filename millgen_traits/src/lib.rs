//! Seam traits shared by the generator crates.
//!
//! Errors crossing these boundaries are `Box<dyn Error + Send + Sync>`; the
//! core maps them onto its typed error enum.
pub mod clock;

pub use clock::{Clock, FixedClock, SystemClock};

/// Error type used at trait boundaries.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Uniform random draws for noise generation.
///
/// Implementations must be deterministic for a given seed so that two runs
/// with the same configuration produce identical output.
pub trait NoiseSource {
    /// Next draw, uniformly distributed in `[0, 1)`.
    fn next_unit(&mut self) -> f64;
}

/// Named, row-ordered table storage (the spill/reload and final-write target).
///
/// Rows are written in order; blank cells are empty strings.
pub trait TableStore {
    fn write(&mut self, name: &str, rows: &[Vec<String>]) -> Result<(), BoxError>;

    /// Read a previously written table, keeping at most `max_cols` leading cells per row.
    fn read(&mut self, name: &str, max_cols: usize) -> Result<Vec<Vec<String>>, BoxError>;

    fn remove(&mut self, name: &str) -> Result<(), BoxError>;
}

impl<T: TableStore + ?Sized> TableStore for Box<T> {
    fn write(&mut self, name: &str, rows: &[Vec<String>]) -> Result<(), BoxError> {
        (**self).write(name, rows)
    }

    fn read(&mut self, name: &str, max_cols: usize) -> Result<Vec<Vec<String>>, BoxError> {
        (**self).read(name, max_cols)
    }

    fn remove(&mut self, name: &str) -> Result<(), BoxError> {
        (**self).remove(name)
    }
}

impl<T: NoiseSource + ?Sized> NoiseSource for Box<T> {
    fn next_unit(&mut self) -> f64 {
        (**self).next_unit()
    }
}
