//! Topology graph: snapshot model, styling, layout, selection and the
//! canvas surface that ties them together.

mod builder;
mod component;
mod inspector;
mod layout;
mod panel;
mod render;
mod selection;
mod state;
mod style;
mod surface;
mod types;

pub use builder::{BuildError, build};
pub use component::TopologyCanvas;
pub use panel::InspectorPanel;
pub use selection::Selection;
pub use style::legend;
pub use types::{RawSnapshot, TopologySnapshot};
