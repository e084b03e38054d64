use crate::metadata::comparer::ComparerFlags;

/// Settings of one [`crate::cloning::MetadataCloner`] run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CloneOptions {
    /// Copy the custom attributes attached to cloned members
    pub copy_custom_attributes: bool,
    /// How imported references are matched against rows the target already holds
    pub comparer_flags: ComparerFlags,
}

impl Default for CloneOptions {
    fn default() -> Self {
        CloneOptions {
            copy_custom_attributes: true,
            comparer_flags: ComparerFlags::empty(),
        }
    }
}
