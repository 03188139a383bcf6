pub use archive::{remove_empty_files, FrameSource, GoesArchive, RadianceFrame};
pub use coastline::Coastline;
pub use colormap::ColorScale;
pub use config::GoesConfig;
pub use error::{StormSatError, StormSatResult};
pub use projection::GeosProjection;
pub use render::{CompositeRenderer, RenderOptions, RenderOutcome};
pub use satellite::{scan_start_time, Domain, GoesProduct, Product, Satellite};
pub use satimage::RadianceImage;
pub use track::{StormSelection, StormTrackSample, TrackDatabase};

/**************************************************************************************************
 * Private Implementation
 *************************************************************************************************/
mod archive;
mod coastline;
mod colormap;
mod config;
mod error;
mod projection;
mod remote;
mod render;
mod satellite;
mod satimage;
mod track;
