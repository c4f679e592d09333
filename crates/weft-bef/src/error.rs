//! Conversion errors.

/// A per-operation conversion error.
///
/// These are formatted into [`Diagnostic`](weft_ir::Diagnostic)s at the
/// operation's location; collection keeps walking after reporting one so a
/// single pass surfaces every problem in the module.
#[derive(Clone, Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConvertError {
    #[error("multi-block regions cannot be emitted to BEF files")]
    MultiBlockRegion,
    #[error("external functions are not allowed")]
    ExternalFunction,
    #[error("all functions need to end with a weft.return")]
    MissingReturn,
    #[error("return op must be at the end of its block")]
    MisplacedReturn,
    #[error("return value {index} is an argument in a sync function")]
    SyncReturnsArgument { index: usize },
    #[error("return value {index} is duplicated in a sync function")]
    SyncReturnDuplicated { index: usize },
    #[error("BEF executor only supports references to values within the current region")]
    CrossRegionOperand,
    #[error("BEF files cannot encode the '{name}' attribute")]
    UnsupportedAttribute { name: String },
    #[error("function @{symbol} not defined")]
    UndefinedSymbol { symbol: String },
    #[error("symbol @{symbol} does not reference a compilation unit")]
    NotACompilationUnit { symbol: String },
}

/// Marker for a conversion that reported diagnostics and produced nothing.
#[derive(Clone, Copy, Debug, thiserror::Error)]
#[error("module could not be converted to BEF")]
pub struct ConversionFailed;
