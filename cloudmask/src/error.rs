use thiserror::Error;

#[derive(Error, Debug)]
pub enum CloudmaskError {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("mask row {line} has {actual} cells, expected {expected}")]
    RaggedRow {
        line: usize,
        expected: usize,
        actual: usize,
    },

    #[error("mask row {line} contains invalid cell {cell:?}")]
    Cell { line: usize, cell: char },

    #[error("mask dimensions {width}x{height} do not match {len} cells")]
    Dimensions {
        width: usize,
        height: usize,
        len: usize,
    },

    #[error("mask contains no set cells")]
    EmptyMask,

    #[error("degenerate boundary of {0} points, need at least 3")]
    DegenerateBoundary(usize),
}
