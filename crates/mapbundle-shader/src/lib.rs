//! Shader script parsing: splitting a script file into named shaders, and
//! walking a shader's body to discover the image/video assets it needs.

pub mod dependencies;
pub mod extract;

pub use dependencies::ShaderDependencies;
pub use extract::{ExtractedShaders, Shader, extract_shaders};
