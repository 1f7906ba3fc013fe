//! Validated archive-relative path.

use std::fmt;
use std::path::PathBuf;

use crate::error::FormatError;

/// An archive entry path that cannot leave the destination root.
///
/// Names stored in BSA/BA2 archives use `\` as separator (some tools write
/// `/`). Parsing splits on both, drops empty and `.` components, and rejects
/// anything that could resolve outside the extraction root:
///
/// - `..` components
/// - a leading separator (absolute path)
/// - components containing `:` (drive letters, alternate data streams)
/// - embedded NUL bytes
///
/// The normalized form uses `/` between components and is the same on every
/// platform, so two archives naming the same file produce equal paths.
///
/// # Examples
///
/// ```
/// use bsarc_core::types::EntryPath;
///
/// let path = EntryPath::parse(r"Meshes\.\Armor\Iron.NIF")?;
/// assert_eq!(path.as_str(), "Meshes/Armor/Iron.NIF");
///
/// assert!(EntryPath::parse(r"..\..\evil").is_err());
/// assert!(EntryPath::parse("C:evil").is_err());
/// # Ok::<(), bsarc_core::error::FormatError>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryPath(String);

impl EntryPath {
    /// Parses and normalizes a stored name.
    ///
    /// An input consisting only of separators and `.` yields the empty path,
    /// which stands for the archive root.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::PathEscape`] carrying the raw name when the
    /// name is absolute, contains `..`, a `:` or a NUL byte.
    pub fn parse(raw: &str) -> Result<Self, FormatError> {
        let escape = || FormatError::PathEscape {
            path: raw.to_string(),
        };

        if raw.contains('\0') || raw.starts_with(['\\', '/']) {
            return Err(escape());
        }

        let mut normalized = String::with_capacity(raw.len());
        for component in raw.split(['\\', '/']) {
            match component {
                "" | "." => {}
                ".." => return Err(escape()),
                c if c.contains(':') => return Err(escape()),
                c => {
                    if !normalized.is_empty() {
                        normalized.push('/');
                    }
                    normalized.push_str(c);
                }
            }
        }

        Ok(Self(normalized))
    }

    /// Appends `child` below this path.
    #[must_use]
    pub fn join(&self, child: &Self) -> Self {
        match (self.0.is_empty(), child.0.is_empty()) {
            (true, _) => child.clone(),
            (false, true) => self.clone(),
            (false, false) => Self(format!("{}/{}", self.0, child.0)),
        }
    }

    /// The normalized path with `/` separators.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is the archive root.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the normalized components.
    pub fn components(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|c| !c.is_empty())
    }

    /// Builds a relative platform path from the components.
    #[must_use]
    pub fn to_path_buf(&self) -> PathBuf {
        self.components().collect()
    }
}

impl fmt::Display for EntryPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
