//! Interactive window for walking around a scene in real time

mod viewer;

pub use viewer::{InteractiveViewer, ViewerConfig};
