//! Pipeline stages for document compliance checking.
//!
//! Each submodule implements one step and is testable on its own with a
//! scripted collaborator.
//!
//! ## Data Flow
//!
//! ```text
//! intake ──▶ ocr ──▶ extract ──▶ evaluate ──▶ correct
//! (store)   (poll)   (LINEs)    (verdicts)   (message, only on a miss)
//! ```
//!
//! 1. [`intake`]: validate the upload and persist its bytes
//! 2. [`ocr`]: submit for text detection; poll async jobs to a terminal state
//! 3. [`extract`]: `LINE` blocks to ordered lines, plus a bounded preview
//! 4. [`evaluate`]: one verdict per request, keyword or semantic
//! 5. [`correct`]: one generative call explaining what is missing
//!
//! Shared by the stages that talk to the generative service:
//! [`generate`] (invoke + decode), [`decode`] (response-shape precedence),
//! [`postprocess`] (prose cleanup) and [`retry`] (bounded backoff, also used
//! by OCR).

pub mod correct;
pub mod decode;
pub mod evaluate;
pub mod extract;
pub mod generate;
pub mod intake;
pub mod ocr;
pub mod postprocess;
pub mod retry;
