//! Multipart upload sessions for Binstore.
//!
//! A session moves through `Initiated -> InProgress -> {Completed, Aborted}`.
//! Parts are numbered from 1, may arrive in any order, and are digested on
//! receipt so the caller can verify them at completion. Completion checks
//! every expected digest, then concatenates the parts in ascending part
//! number order.
//!
//! [`SessionManager`] holds the state machine. It does not persist the
//! assembled content: the backend that owns the manager receives it in
//! [`CompletedUpload`] and stores it.

pub mod error;
pub mod manager;
pub mod session;

pub use error::{UploadError, UploadResult};
pub use manager::{CompletedUpload, PartListing, SessionManager};
pub use session::{SessionId, UploadSession, UploadStatus, UploadedPart};
