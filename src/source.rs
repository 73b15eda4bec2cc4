//! Access to the hierarchical container a session is stored in.
//!
//! The session reader only ever asks two questions of its backing store:
//! "what is stored at this path" and "what lives under this group". Both
//! return `Ok(None)` when the path does not exist, which is how optional
//! datasets such as per-epoch tags are read.

use ndarray::{Array1, Array2};
use std::collections::BTreeMap;
use std::fmt;

use crate::types::{Result, SessionError};

/// Values read from a single dataset.
#[derive(Debug, Clone, PartialEq)]
pub enum Dataset {
    /// Scalar or 1-D numeric data, converted to `f64`
    Numbers(Array1<f64>),
    /// 2-D numeric data, converted to `f64`
    Matrix(Array2<f64>),
    /// Scalar or 1-D string data
    Strings(Vec<String>),
}

impl Dataset {
    /// Numeric contents as a 1-D array.
    pub fn into_numbers(self, path: &str) -> Result<Array1<f64>> {
        match self {
            Dataset::Numbers(values) => Ok(values),
            Dataset::Matrix(m) if m.nrows() == 1 || m.ncols() == 1 => {
                Ok(Array1::from_iter(m.iter().copied()))
            }
            Dataset::Matrix(m) => Err(SessionError::format(
                path,
                format!("expected a vector, found a {}x{} matrix", m.nrows(), m.ncols()),
            )),
            Dataset::Strings(_) => {
                Err(SessionError::format(path, "expected numbers, found strings"))
            }
        }
    }

    /// Numeric contents as a single value.
    pub fn into_scalar(self, path: &str) -> Result<f64> {
        let values = self.into_numbers(path)?;
        match values.len() {
            1 => Ok(values[0]),
            n => Err(SessionError::format(path, format!("expected a scalar, found {} values", n))),
        }
    }

    /// Numeric contents as a matrix.
    pub fn into_matrix(self, path: &str) -> Result<Array2<f64>> {
        match self {
            Dataset::Matrix(m) => Ok(m),
            Dataset::Numbers(_) => {
                Err(SessionError::format(path, "expected a matrix, found a vector"))
            }
            Dataset::Strings(_) => {
                Err(SessionError::format(path, "expected a matrix, found strings"))
            }
        }
    }

    /// String contents.
    pub fn into_strings(self, path: &str) -> Result<Vec<String>> {
        match self {
            Dataset::Strings(values) => Ok(values),
            _ => Err(SessionError::format(path, "expected strings, found numbers")),
        }
    }
}

/// A read-only hierarchical store addressed by `/`-separated paths.
pub trait DataSource: fmt::Debug {
    /// Reads the dataset at `path`, or `None` if nothing is stored there.
    fn read(&self, path: &str) -> Result<Option<Dataset>>;

    /// Names of the direct children of the group at `path`, sorted by name,
    /// or `None` if there is no such group.
    fn members(&self, path: &str) -> Result<Option<Vec<String>>>;
}

fn normalize(path: &str) -> String {
    let trimmed = path.trim_matches('/');
    format!("/{}", trimmed)
}

/// A [`DataSource`] held entirely in memory.
///
/// Groups are implied by the dataset paths inserted into it.
///
/// # Examples
///
/// ```
/// use alm_importer::{DataSource, Dataset, MemorySource};
/// use ndarray::array;
///
/// let mut source = MemorySource::new();
/// source.insert("/epochs/trial_001/start_time", Dataset::Numbers(array![1.5]));
///
/// assert_eq!(
///     source.members("/epochs").unwrap(),
///     Some(vec!["trial_001".to_string()])
/// );
/// assert!(source.read("/epochs/trial_002/start_time").unwrap().is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    datasets: BTreeMap<String, Dataset>,
}

impl MemorySource {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `dataset` at `path`, replacing anything already there.
    pub fn insert(&mut self, path: &str, dataset: Dataset) -> &mut Self {
        self.datasets.insert(normalize(path), dataset);
        self
    }

    /// Removes the dataset at `path`.
    pub fn remove(&mut self, path: &str) -> Option<Dataset> {
        self.datasets.remove(&normalize(path))
    }
}

impl DataSource for MemorySource {
    fn read(&self, path: &str) -> Result<Option<Dataset>> {
        Ok(self.datasets.get(&normalize(path)).cloned())
    }

    fn members(&self, path: &str) -> Result<Option<Vec<String>>> {
        let group = normalize(path);
        let prefix = if group == "/" {
            group
        } else {
            format!("{}/", group)
        };

        let mut names: Vec<String> = self
            .datasets
            .keys()
            .filter_map(|key| key.strip_prefix(&prefix))
            .filter_map(|rest| rest.split('/').next())
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect();
        names.sort();
        names.dedup();

        if names.is_empty() {
            Ok(None)
        } else {
            Ok(Some(names))
        }
    }
}

#[cfg(feature = "hdf5")]
pub use self::hdf5_source::Hdf5Source;

#[cfg(feature = "hdf5")]
mod hdf5_source {
    use hdf5::types::{FixedAscii, FixedUnicode, TypeDescriptor, VarLenAscii, VarLenUnicode};
    use hdf5::File;
    use ndarray::{Array1, Array2};
    use std::path::{Path, PathBuf};

    use super::{DataSource, Dataset};
    use crate::types::{Result, SessionError};

    const FIXED_STRING_CAPACITY: usize = 1024;

    /// A [`DataSource`] backed by an HDF5 (NWB) file.
    ///
    /// The file is opened read-only for the duration of each call and closed
    /// again before it returns.
    #[derive(Debug, Clone)]
    pub struct Hdf5Source {
        path: PathBuf,
    }

    impl Hdf5Source {
        /// Checks that `path` opens as an HDF5 file and wraps it.
        pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
            let path = path.as_ref().to_path_buf();
            File::open(&path)?;
            Ok(Hdf5Source { path })
        }

        /// Location of the backing file.
        pub fn path(&self) -> &Path {
            &self.path
        }
    }

    fn exists(file: &File, path: &str) -> bool {
        // link_exists fails rather than returning false when an
        // intermediate group is missing.
        let mut prefix = String::new();
        for part in path.split('/').filter(|p| !p.is_empty()) {
            prefix.push('/');
            prefix.push_str(part);
            if !file.link_exists(&prefix) {
                return false;
            }
        }
        true
    }

    fn read_numbers(ds: &hdf5::Dataset, path: &str) -> Result<Dataset> {
        let shape = ds.shape();
        let values: Vec<f64> = match ds.dtype()?.to_descriptor()? {
            TypeDescriptor::Boolean => ds
                .read_raw::<bool>()?
                .into_iter()
                .map(|b| if b { 1.0 } else { 0.0 })
                .collect(),
            _ => ds.read_raw::<f64>()?,
        };

        match shape.len() {
            0 | 1 => Ok(Dataset::Numbers(Array1::from_vec(values))),
            2 => Array2::from_shape_vec((shape[0], shape[1]), values)
                .map(Dataset::Matrix)
                .map_err(|e| SessionError::format(path, e.to_string())),
            n => Err(SessionError::format(path, format!("unsupported rank {}", n))),
        }
    }

    fn read_strings(ds: &hdf5::Dataset, descriptor: &TypeDescriptor) -> Result<Dataset> {
        let values = match descriptor {
            TypeDescriptor::VarLenUnicode => ds
                .read_raw::<VarLenUnicode>()?
                .iter()
                .map(|s| s.as_str().to_string())
                .collect(),
            TypeDescriptor::VarLenAscii => ds
                .read_raw::<VarLenAscii>()?
                .iter()
                .map(|s| s.as_str().to_string())
                .collect(),
            TypeDescriptor::FixedUnicode(_) => ds
                .read_raw::<FixedUnicode<FIXED_STRING_CAPACITY>>()?
                .iter()
                .map(|s| s.as_str().to_string())
                .collect(),
            _ => ds
                .read_raw::<FixedAscii<FIXED_STRING_CAPACITY>>()?
                .iter()
                .map(|s| s.as_str().to_string())
                .collect(),
        };
        Ok(Dataset::Strings(values))
    }

    impl DataSource for Hdf5Source {
        fn read(&self, path: &str) -> Result<Option<Dataset>> {
            let file = File::open(&self.path)?;
            if !exists(&file, path) {
                return Ok(None);
            }
            let ds = match file.dataset(path) {
                Ok(ds) => ds,
                // A group, not a dataset
                Err(_) => return Ok(None),
            };

            let descriptor = ds.dtype()?.to_descriptor()?;
            let dataset = match descriptor {
                TypeDescriptor::VarLenUnicode
                | TypeDescriptor::VarLenAscii
                | TypeDescriptor::FixedAscii(_)
                | TypeDescriptor::FixedUnicode(_) => read_strings(&ds, &descriptor)?,
                _ => read_numbers(&ds, path)?,
            };
            Ok(Some(dataset))
        }

        fn members(&self, path: &str) -> Result<Option<Vec<String>>> {
            let file = File::open(&self.path)?;
            if path.trim_matches('/').is_empty() {
                let mut names = file.member_names()?;
                names.sort();
                return Ok(Some(names));
            }
            if !exists(&file, path) {
                return Ok(None);
            }
            match file.group(path) {
                Ok(group) => {
                    let mut names = group.member_names()?;
                    names.sort();
                    Ok(Some(names))
                }
                Err(_) => Ok(None),
            }
        }
    }
}
