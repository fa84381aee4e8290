//! Host embeddings

#[cfg(feature = "python")]
pub mod python;
