//! Font copy step.

use super::{SourceFile, StagedFile, StepError, Transform, read};

/// Byte-identical copy of every matched font file.
pub struct FontCopy;

impl Transform for FontCopy {
    fn transform(&self, files: &[SourceFile]) -> Result<Vec<StagedFile>, StepError> {
        files
            .iter()
            .map(|file| Ok(StagedFile::new(file.rel.clone(), read(&file.path)?)))
            .collect()
    }
}
