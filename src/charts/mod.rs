//! Charts module - Static chart rendering

mod plotter;
mod renderer;

pub use plotter::{padded_range, BoxGeometry};
pub use renderer::{open_in_viewer, Chart, RenderError, StaticChartRenderer};
