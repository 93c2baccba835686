//! Spec file selection and loading
//!
//! Spec binaries list their spec files explicitly (usually with
//! [`spec_file!`](crate::spec_file)). The loader narrows that list down to the
//! sources given on the command line and runs each file's declaration function
//! against a registry.

use expressive_core::{DslError, Registry, SuiteBuilder};
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Declaration function of a spec file
pub type DeclareFn = fn(&mut SuiteBuilder<'_>) -> Result<(), DslError>;

/// Stem suffixes of files the loader accepts
pub const SPEC_SUFFIXES: [&str; 2] = ["_spec", "_test"];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    #[error("failed to declare specs in {path}: {source}")]
    Declare {
        path: String,
        #[source]
        source: DslError,
    },
}

/// A source path paired with the function that declares its suites
#[derive(Clone, Copy)]
pub struct SpecFile {
    pub path: &'static str,
    pub declare: DeclareFn,
}

impl SpecFile {
    pub const fn new(path: &'static str, declare: DeclareFn) -> Self {
        Self { path, declare }
    }

    pub fn path(&self) -> &Path {
        Path::new(self.path)
    }

    /// Whether the file stem ends in one of [`SPEC_SUFFIXES`]
    pub fn follows_convention(&self) -> bool {
        self.path()
            .file_stem()
            .and_then(|stem| stem.to_str())
            .is_some_and(|stem| SPEC_SUFFIXES.iter().any(|suffix| stem.ends_with(suffix)))
    }
}

impl std::fmt::Debug for SpecFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpecFile").field("path", &self.path).finish()
    }
}

/// Build a [`SpecFile`] for the current source file
#[macro_export]
macro_rules! spec_file {
    ($declare:path) => {
        $crate::SpecFile::new(file!(), $declare)
    };
}

/// Selects spec files by source paths
#[derive(Debug, Clone, Default)]
pub struct Loader {
    sources: Vec<PathBuf>,
}

impl Loader {
    /// An empty source list selects every spec file
    pub fn new(sources: Vec<PathBuf>) -> Self {
        Self { sources }
    }

    pub fn sources(&self) -> &[PathBuf] {
        &self.sources
    }

    /// Files to load, in the order given
    ///
    /// A source selects a file when the source's path components appear as
    /// a contiguous run in the file's path, so both `tests` and
    /// `crates/app/tests/math_spec.rs` select that file.
    pub fn select<'f>(&self, files: &'f [SpecFile]) -> Vec<&'f SpecFile> {
        let candidates: Vec<&SpecFile> = files
            .iter()
            .filter(|file| {
                let accepted = file.follows_convention();
                if !accepted {
                    tracing::debug!(path = file.path, "skipping file outside naming convention");
                }
                accepted
            })
            .collect();

        if self.sources.is_empty() {
            return candidates;
        }

        let mut selected = vec![false; candidates.len()];
        for source in &self.sources {
            let mut matched = false;
            for (index, file) in candidates.iter().enumerate() {
                if contains_path(file.path(), source) {
                    selected[index] = true;
                    matched = true;
                }
            }
            if !matched {
                tracing::warn!(source = %source.display(), "Ignoring unknown source");
            }
        }

        candidates
            .into_iter()
            .zip(selected)
            .filter_map(|(file, keep)| keep.then_some(file))
            .collect()
    }

    /// Declare every selected file into `registry`
    ///
    /// Returns the number of files loaded. The first declaration error stops
    /// loading.
    pub fn load(&self, files: &[SpecFile], registry: &mut Registry) -> Result<usize, LoadError> {
        let selected = self.select(files);
        for file in &selected {
            tracing::debug!(path = file.path, "loading spec file");
            let mut builder = registry.builder();
            (file.declare)(&mut builder).map_err(|source| LoadError::Declare {
                path: file.path.to_string(),
                source,
            })?;
        }
        Ok(selected.len())
    }
}

fn contains_path(path: &Path, source: &Path) -> bool {
    let path: Vec<Component<'_>> = normalized(path);
    let source: Vec<Component<'_>> = normalized(source);
    if source.is_empty() {
        return true;
    }
    path.windows(source.len()).any(|window| window == source.as_slice())
}

fn normalized(path: &Path) -> Vec<Component<'_>> {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}
