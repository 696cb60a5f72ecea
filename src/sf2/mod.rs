//! SoundFont 2 file decoding.
//!
//! Turns a byte buffer into typed records. Every read is bounds-checked, so
//! arbitrary input yields either a [`SoundFontFile`] or a [`ParseError`].

pub mod error;
pub mod file;
pub mod info;
pub mod reader;
pub mod records;
pub mod riff;

pub use error::{ParseError, RangeError};
pub use file::SoundFontFile;
pub use info::{BankInfo, Version};
pub use riff::Tag;
