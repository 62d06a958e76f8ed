pub mod device;
pub mod error;
pub mod fs;
pub mod report;

pub use device::{ImageReader, SectorReader};
pub use error::{FatError, Result};
pub use fs::{inspect, inspect_image, InspectOptions, Inspection, SortOrder};
