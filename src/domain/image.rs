use crate::error::RangerError;
use std::fmt;

const DEFAULT_IMAGE_TAG: &str = "latest";

/// Docker image reference split into repository and tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageName {
    pub repository: String,
    pub tag: String,
}

impl ImageName {
    pub fn new(repository: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            tag: tag.into(),
        }
    }

    /// Parses `repo[:tag]`. A colon that belongs to a registry host
    /// (`registry:5000/repo`) is not taken as the tag separator.
    pub fn parse(reference: &str) -> Self {
        let reference = reference.trim();
        let last_segment_start = reference.rfind('/').map(|i| i + 1).unwrap_or(0);

        match reference[last_segment_start..].rfind(':') {
            Some(offset) => {
                let split = last_segment_start + offset;
                Self::new(&reference[..split], &reference[split + 1..])
            }
            None => Self::new(reference, DEFAULT_IMAGE_TAG),
        }
    }

    pub fn with_tag(&self, tag: impl Into<String>) -> Self {
        Self::new(self.repository.clone(), tag)
    }

    /// Checks that this image is a variant of `other` (same repository, any tag)
    pub fn assert_compatible_with(&self, other: &ImageName) -> Result<(), RangerError> {
        if self.repository == other.repository {
            return Ok(());
        }

        Err(RangerError::IncompatibleImage {
            expected: other.repository.clone(),
            actual: self.to_string(),
        })
    }
}

impl fmt::Display for ImageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.repository, self.tag)
    }
}
