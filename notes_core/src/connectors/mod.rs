pub mod apple_common;
pub mod apple_notes;
