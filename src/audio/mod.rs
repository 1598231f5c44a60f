pub mod buffer;
pub mod decode;
pub mod diagnostics;
pub mod drums;
pub mod mapper;
pub mod mixdown;
pub mod stages;
pub mod wav;
pub mod waveform;
