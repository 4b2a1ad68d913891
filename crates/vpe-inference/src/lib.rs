//! Client for the frame-inference service.
//!
//! Detection models (objects, faces, license plates) run in a
//! separate model server; this crate is the HTTP client and the
//! [`vpe_media::RegionDetector`] implementation the addon chain uses.

pub mod client;
pub mod error;
pub mod types;

pub use client::{InferenceClient, InferenceClientConfig};
pub use error::{InferenceError, InferenceResult};
pub use types::{DetectRequest, DetectResponse, Detection};
