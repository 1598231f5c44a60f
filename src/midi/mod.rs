pub mod composer;
pub mod events;
pub mod preview;
pub mod render;
pub mod smf;
