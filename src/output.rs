//! Output requests, merged views and the dispatcher
mod dispatcher;
mod request;
mod view;

pub use dispatcher::{
    DispatchReport, DispatcherState, FormatStatus, OutputDispatcher, WrittenOutput,
};
pub use request::{FileNaming, OutputRequest};
pub use view::{SurfaceZone, ZoneView};
