use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntoCatalogPathError {
    ParentSegment,
    EmptyPath,
}

impl std::error::Error for IntoCatalogPathError {}

impl fmt::Display for IntoCatalogPathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl IntoCatalogPathError {
    pub fn as_str(&self) -> &str {
        match self {
            IntoCatalogPathError::ParentSegment => "parent (`..`) segment found in path",
            IntoCatalogPathError::EmptyPath => "no path provided",
        }
    }
}
