//! Attach the solver file involved to a failed `io::Result`.

use std::io;
use std::path::Path;

use crate::application::error::InputFile;
use crate::application::{ApplicationError, ApplicationResult};

pub trait IoResultExt<T> {
    /// ```ignore
    /// fs.read_to_string(path).reading(InputFile::Structure, path)?;
    /// ```
    fn reading(self, input: InputFile, path: &Path) -> ApplicationResult<T>;

    fn writing_results(self, path: &Path) -> ApplicationResult<T>;
}

impl<T> IoResultExt<T> for io::Result<T> {
    fn reading(self, input: InputFile, path: &Path) -> ApplicationResult<T> {
        self.map_err(|source| ApplicationError::ReadInput {
            input,
            path: path.to_path_buf(),
            source,
        })
    }

    fn writing_results(self, path: &Path) -> ApplicationResult<T> {
        self.map_err(|source| ApplicationError::WriteResults {
            path: path.to_path_buf(),
            source,
        })
    }
}
