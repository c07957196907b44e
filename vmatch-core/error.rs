use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DescriptorError {
    #[error("Descriptor width must be > 0")]
    ZeroWidth,

    #[error("Descriptor buffer of {len} elements is not a multiple of width {width}")]
    TruncatedBuffer { len: usize, width: usize },

    #[error("Descriptor row {row} has {actual} elements, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        actual: usize,
    },
}

pub type DescriptorResult<T> = Result<T, DescriptorError>;
