//! Split a photographed receipt between several people.
//!
//! Pipeline: image → OCR text → LLM-structured JSON → normalized items →
//! per-person shares with a percentage surcharge → WhatsApp payment request.

pub mod allocation;
pub mod config;
pub mod error;
pub mod message;
pub mod model;
pub mod normalize;
pub mod ocr;
pub mod plan;
pub mod registry;
pub mod session;
pub mod structuring;

pub use error::{Result, SplitError};
pub use model::{BankAccount, Item, Person};
pub use session::{Ingestor, Session, SessionState};
