//! Terminal board: kanban columns over the task store plus a documents
//! reader, sharing one event loop.

pub mod app;
pub mod editor;
pub mod view;
mod worker;

pub use app::run;
