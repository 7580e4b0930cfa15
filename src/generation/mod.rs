/// Client for the hosted image-generation model
///
/// One request per generation: the source image, the instruction text from
/// the prompt builder and the output options go out, the first inline image
/// comes back.

pub mod client;
pub mod types;

pub use client::{GenerationClient, GenerationConfig, GenerationError};
