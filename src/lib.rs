//! Block-based rich-text note editor for the browser.

pub mod app;
pub mod block;
pub mod caret;
pub mod document;
pub mod dom;
pub mod error;
pub mod focus;
pub mod format;
pub mod interpreter;
pub mod markup;
pub mod settings;
pub mod store;
