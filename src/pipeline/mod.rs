//! Pipeline stages: one module per external collaborator.
//!
//! ## Data Flow
//!
//! ```text
//! render ──▶ encode ──▶ describe ──▶ (session) ──▶ docs
//! (pdfium)   (JPEG,     (VLM, one               (Google Docs,
//!             base64)    call/page)              one append/page)
//! ```
//!
//! 1. [`render`]   — rasterise every page into a scoped temp workspace;
//!    runs in `spawn_blocking` because pdfium is not async-safe
//! 2. [`encode`]   — JPEG bytes ⇄ base64 / data URI for both APIs
//! 3. [`describe`] — single-turn vision call per page, fixed output bound
//! 4. [`docs`]     — service-account auth, `documents.create`,
//!    `documents.batchUpdate` append
//!
//! Each stage sits behind a trait ([`render::PageRenderer`],
//! [`describe::Describer`], [`docs::DocumentSink`]) so the orchestrator can
//! be driven with scripted fakes.

pub mod describe;
pub mod docs;
pub mod encode;
pub mod render;
