use std::fs::File;
use std::ops::Deref;
use std::path::{Path, PathBuf};

use memmap2::{Mmap, MmapOptions};
use tracing::debug;

use crate::error::{Error, Result};

/// A read-only view of an input file's bytes
pub struct InputFile {
    path: PathBuf,
    map: Option<Mmap>,
}

impl InputFile {
    /// Memory-maps `path`. A zero-length file is not mapped at all.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|e| Error::io(&path, e))?;
        let len = file.metadata().map_err(|e| Error::io(&path, e))?.len();

        let map = if len == 0 {
            None
        } else {
            // SAFETY: the mapping is read-only; the input is expected not to be modified while
            // it is being aggregated, same as with any other reader
            let map = unsafe { MmapOptions::new().map(&file) }.map_err(|e| Error::io(&path, e))?;
            Some(map)
        };
        debug!(path = %path.display(), bytes = len, "input mapped");
        Ok(Self { path, map })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn bytes(&self) -> &[u8] {
        self.map.as_deref().unwrap_or(&[])
    }
}

impl Deref for InputFile {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.bytes()
    }
}

#[cfg(test)]
mod test {
    use std::io::Write;

    use super::InputFile;
    use crate::error::Error;

    #[test]
    fn maps_file_contents() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"a;1.0\nb;2.0\n").unwrap();
        file.flush().unwrap();

        let input = InputFile::open(file.path()).unwrap();
        assert_eq!(input.bytes(), b"a;1.0\nb;2.0\n");
        assert_eq!(input.path(), file.path());
    }

    #[test]
    fn empty_file_is_empty_slice() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let input = InputFile::open(file.path()).unwrap();
        assert!(input.is_empty());
    }

    #[test]
    fn missing_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("measurements.txt");
        match InputFile::open(&missing) {
            Err(Error::Io { path, .. }) => assert_eq!(path, missing),
            Err(e) => panic!("unexpected error {e}"),
            Ok(_) => panic!("opening a missing file should fail"),
        }
    }
}
