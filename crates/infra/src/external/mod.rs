//! Side channels fed after a sale commits.
//!
//! Both are best effort: a failure here is logged by the caller and never
//! undoes or fails the recorded sale.

pub mod receipts;
pub mod sheets;

pub use receipts::{FileReceiptWriter, ReceiptWriter};
pub use sheets::{DisabledMirror, GoogleSheetsMirror, SaleMirror};

#[derive(Debug, thiserror::Error)]
pub enum ExternalError {
    #[error("receipt io: {0}")]
    Io(#[from] std::io::Error),

    #[error("mirror request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("mirror rejected row (status {status}): {body}")]
    Rejected { status: u16, body: String },
}
