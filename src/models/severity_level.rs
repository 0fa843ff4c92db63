use serde_repr::Serialize_repr;

/// Severity of a trace message as the ingestion service numbers them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_repr)]
#[repr(u8)]
pub enum SeverityLevel {
    /// 0
    Verbose = 0,
    /// 1
    Information = 1,
    /// 2
    Warning = 2,
    /// 3
    Error = 3,
    /// 4
    Critical = 4,
}
