/// Hierarchical names (`/svc/users`) and delegation entries.
use std::fmt;
use std::str::FromStr;

use crate::error::{ColoError, ColoResult};

/// A slash-separated logical name. The empty path displays as `/`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Path(Vec<String>);

impl Path {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a path from segments. Segments must be non-empty and must not
    /// contain `/` or whitespace.
    pub fn from_segments<I, S>(segments: I) -> ColoResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        for segment in &segments {
            validate_segment(segment)?;
        }
        Ok(Self(segments))
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn validate_segment(segment: &str) -> ColoResult<()> {
    if segment.is_empty() {
        return Err(ColoError::InvalidPath {
            reason: "empty segment".into(),
        });
    }
    if segment.contains('/') || segment.chars().any(char::is_whitespace) {
        return Err(ColoError::InvalidPath {
            reason: format!("illegal character in segment {segment:?}"),
        });
    }
    Ok(())
}

impl FromStr for Path {
    type Err = ColoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s.strip_prefix('/').ok_or_else(|| ColoError::InvalidPath {
            reason: format!("{s:?} does not start with '/'"),
        })?;
        if rest.is_empty() {
            return Ok(Path::empty());
        }
        Path::from_segments(rest.split('/'))
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("/");
        }
        for segment in &self.0 {
            write!(f, "/{segment}")?;
        }
        Ok(())
    }
}

/// One delegation rule, `prefix => dst`, as recorded on delegate trees.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Dentry {
    pub prefix: Path,
    pub dst: String,
}

impl Dentry {
    pub fn new(prefix: Path, dst: impl Into<String>) -> Self {
        Self {
            prefix,
            dst: dst.into(),
        }
    }
}

impl fmt::Display for Dentry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}=>{}", self.prefix, self.dst)
    }
}
