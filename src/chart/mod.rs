pub mod headless;
pub mod reconciler;
pub mod store;
pub mod surface;
pub mod sync;
pub mod viewport;

pub use headless::{HeadlessChart, HeadlessFactory, RenderStats};
pub use reconciler::Reconciler;
pub use store::{SeriesStore, UpsertOutcome};
pub use surface::{ChartFactory, ChartHandle, ChartSurface, TimeRange};
pub use sync::ViewportSynchronizer;
pub use viewport::{TrackerConfig, Viewport, ViewportMode, ViewportTracker};
