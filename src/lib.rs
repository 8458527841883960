//! Floating clipboard notes.
//!
//! Notes are small always-on-top windows showing a screenshot, a piece of
//! text or a file reference. They can be thrown around the screen, dragged
//! out into other applications by holding them still, and parked on a shelf.
//!
//! The windowing backend is provided by the host through the traits in
//! [`platform`], while [`runtime::Runtime`] drives all notes from a calloop
//! event loop.

pub mod clipboard;
pub mod config;
pub mod geometry;
pub mod manager;
pub mod note;
pub mod platform;
pub mod runtime;
pub mod shelf;
pub mod window;

#[cfg(test)]
mod testing;

pub use crate::config::Config;
pub use crate::manager::WindowManager;
pub use crate::note::NoteId;
pub use crate::runtime::Runtime;
pub use crate::window::{FloatingWindow, NoteEvent, Phase};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("{0}")]
    EventLoop(#[from] calloop::Error),
    #[error("{0}")]
    Configory(#[from] configory::Error),
    #[error("{0}")]
    Clipboard(#[from] arboard::Error),
    #[error("surface creation failed: {0}")]
    Surface(String),
}

impl<T> From<calloop::InsertError<T>> for Error {
    fn from(err: calloop::InsertError<T>) -> Self {
        Self::EventLoop(err.error)
    }
}
