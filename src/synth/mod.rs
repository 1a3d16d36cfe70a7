pub mod http;
pub mod interface;

pub use http::HttpSynthesizer;
pub use interface::{SynthesisError, SynthesisOutput, SynthesisRequest, Synthesizer};
