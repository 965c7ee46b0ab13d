// Interactive review page: state, summarize controller, HTML rendering.
// The model credential stays server-side; the page only ever sees results.

pub mod controller;
pub mod handlers;
pub mod render;
pub mod sessions;
pub mod state;
