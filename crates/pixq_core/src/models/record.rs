//! Per-input conversion state.

use std::sync::Arc;

use super::blob::InputBlob;
use super::format::TargetFormat;

/// Bytes produced by a successful conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPayload {
    bytes: Arc<[u8]>,
    format: TargetFormat,
}

impl OutputPayload {
    pub fn new(bytes: impl Into<Arc<[u8]>>, format: TargetFormat) -> Self {
        Self {
            bytes: bytes.into(),
            format,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Format the payload was produced in.
    pub fn format(&self) -> TargetFormat {
        self.format
    }

    /// Media type tag, e.g. `image/png`.
    pub fn media_type(&self) -> &'static str {
        self.format.media_type()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Conversion status of a record.
///
/// The output exists only in `Done` and the failure reason only in
/// `Failed`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RecordStatus {
    #[default]
    Idle,
    Converting,
    Done(OutputPayload),
    Failed { reason: String },
}

/// Payload-free discriminant of [`RecordStatus`], for counting and display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusKind {
    Idle,
    Converting,
    Done,
    Failed,
}

impl StatusKind {
    /// Get display string for UI.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Converting => "Converting",
            Self::Done => "Done",
            Self::Failed => "Failed",
        }
    }
}

impl RecordStatus {
    pub fn kind(&self) -> StatusKind {
        match self {
            RecordStatus::Idle => StatusKind::Idle,
            RecordStatus::Converting => StatusKind::Converting,
            RecordStatus::Done(_) => StatusKind::Done,
            RecordStatus::Failed { .. } => StatusKind::Failed,
        }
    }
}

/// Returned when a record is asked to start while a conversion of it is
/// already in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlreadyConverting;

/// One input in the current batch and its conversion state.
#[derive(Debug, Clone)]
pub struct ConversionRecord {
    source: Arc<InputBlob>,
    status: RecordStatus,
}

impl ConversionRecord {
    /// Create an idle record for the given input.
    pub fn new(source: Arc<InputBlob>) -> Self {
        Self {
            source,
            status: RecordStatus::Idle,
        }
    }

    pub fn source(&self) -> &Arc<InputBlob> {
        &self.source
    }

    pub fn status(&self) -> &RecordStatus {
        &self.status
    }

    pub fn kind(&self) -> StatusKind {
        self.status.kind()
    }

    /// Output payload, if the record is done.
    pub fn output(&self) -> Option<&OutputPayload> {
        match &self.status {
            RecordStatus::Done(payload) => Some(payload),
            _ => None,
        }
    }

    /// Failure diagnostic, if the record failed.
    pub fn failure_reason(&self) -> Option<&str> {
        match &self.status {
            RecordStatus::Failed { reason } => Some(reason),
            _ => None,
        }
    }

    /// Whether a batch pass should convert this record.
    pub fn needs_conversion(&self) -> bool {
        !matches!(self.status, RecordStatus::Done(_))
    }

    /// Move to `Converting`, dropping any previous output or failure.
    ///
    /// Allowed from every state except `Converting`. Whether a `Done`
    /// record may be reconverted is the caller's decision.
    pub fn begin(&mut self) -> Result<(), AlreadyConverting> {
        if self.status == RecordStatus::Converting {
            return Err(AlreadyConverting);
        }
        self.status = RecordStatus::Converting;
        Ok(())
    }

    /// Settle an in-flight conversion.
    ///
    /// Returns false (and changes nothing) if the record is not converting.
    pub fn settle(&mut self, result: Result<OutputPayload, String>) -> bool {
        if self.status != RecordStatus::Converting {
            return false;
        }
        self.status = match result {
            Ok(payload) => RecordStatus::Done(payload),
            Err(reason) => RecordStatus::Failed { reason },
        };
        true
    }

    /// Filename the output is delivered under: the source's base name plus
    /// the extension of `format`, the batch's current target format.
    /// `None` unless done.
    pub fn download_name(&self, format: TargetFormat) -> Option<String> {
        self.output()
            .map(|_| format!("{}.{}", self.source.base_name(), format.extension()))
    }
}
