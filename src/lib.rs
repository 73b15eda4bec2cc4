pub mod classify;
pub mod config;
pub mod features;
pub mod filter;
pub mod model;
pub mod peaks;
mod reader;
pub mod source;
pub mod table;
pub mod types;

// Re-export types
pub use classify::TrialFlag;
pub use config::AnalysisConfig;
pub use features::{extract, first_lick, movement_spikes, pole_out_spikes, Extraction};
pub use filter::{good_trials, FilterOptions};
pub use peaks::{find_peaks, PeakOptions};
pub use reader::Session;
pub use source::{DataSource, Dataset, MemorySource};
#[cfg(feature = "hdf5")]
pub use source::Hdf5Source;
pub use types::*;

/// Loads an ALM behavior-session NWB file.
///
/// # Examples
///
/// ```no_run
/// # #[cfg(feature = "hdf5")]
/// # {
/// use alm_importer::load;
///
/// let result = load("path/to/session.nwb");
/// match result {
///     Ok(session) => println!("Trials: {}", session.num_trials()),
///     Err(e) => println!("Error loading file: {}", e),
/// }
/// # }
/// ```
#[cfg(feature = "hdf5")]
pub fn load<P: AsRef<std::path::Path>>(file_path: P) -> Result<Session> {
    Session::open(file_path)
}
