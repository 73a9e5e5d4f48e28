use edgealarm_common::status::{RespMsg, Status};
use edgealarm_common::types::AlarmKind;
use edgealarm_storage::StorageError;

use crate::directory::DirectoryError;

/// Failure kinds the alarm manager distinguishes in its responses.
///
/// # Examples
///
/// ```rust
/// use edgealarm_common::status::Status;
/// use edgealarm_common::types::AlarmKind;
/// use edgealarm_engine::error::AlarmError;
///
/// let err = AlarmError::WrongKind { id: 7, expected: AlarmKind::Event };
/// assert_eq!(err.status(), Status::ErrorParamInvalid);
/// assert_eq!(err.to_string(), "the inputID[7] is not an ID of event");
/// ```
#[derive(Debug, thiserror::Error)]
pub enum AlarmError {
    /// The content is not of the expected shape.
    #[error("param convert failed: {0}")]
    ParamConvert(String),

    /// A validator rejected a field.
    #[error("{0}")]
    ParamInvalid(String),

    /// Add-alarm into a full `(serial, alarm)` bucket.
    #[error("node [{serial}] alarm count has reached the max count {limit}")]
    QuotaExceeded { serial: String, limit: u64 },

    /// A store operation failed. `status` is the scope-specific code the
    /// caller reports.
    #[error("{context}: {source}")]
    Store {
        status: Status,
        context: String,
        #[source]
        source: StorageError,
    },

    #[error("id[{0}] not found")]
    RecordNotFound(u64),

    #[error("the inputID[{id}] is not an ID of {expected}")]
    WrongKind { id: u64, expected: AlarmKind },

    /// The node-manager RPC failed or answered with an unexpected status.
    #[error("node manager request failed: {0}")]
    Rpc(#[from] DirectoryError),
}

impl AlarmError {
    /// Wraps a storage failure with the response code of the calling scope.
    pub fn store(status: Status, context: impl Into<String>) -> impl FnOnce(StorageError) -> Self {
        let context = context.into();
        move |source| AlarmError::Store {
            status,
            context,
            source,
        }
    }

    pub fn status(&self) -> Status {
        match self {
            AlarmError::ParamConvert(_) => Status::ErrorParamConvert,
            AlarmError::ParamInvalid(_) => Status::ErrorParamInvalid,
            // Report direction has no synchronous caller; the code only
            // shows up if a handler chooses to answer.
            AlarmError::QuotaExceeded { .. } => Status::ErrorParamInvalid,
            AlarmError::Store { status, .. } => *status,
            AlarmError::RecordNotFound(_) => Status::ErrorGetAlarmDetail,
            AlarmError::WrongKind { .. } => Status::ErrorParamInvalid,
            AlarmError::Rpc(_) => Status::ErrorDecodeRespFromEdgeMgr,
        }
    }

    /// Response envelope carrying this error.
    pub fn to_resp(&self) -> RespMsg {
        RespMsg::error(self.status(), self.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AlarmError>;
