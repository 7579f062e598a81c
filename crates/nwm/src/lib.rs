//! # HydroForce NWM
//!
//! National Water Model specifics:
//! - grid projections per model domain
//! - operational and retrospective object naming
//! - forcing NetCDF reading

pub mod filenames;
pub mod grids;
pub mod reader;
pub mod retro;

pub use filenames::{create_file_list, FileRequest, Geography, Member, RunType, VarType};
pub use grids::{grid_crs, grid_projection};
pub use reader::{read_forcing, read_grid_template};
pub use retro::{create_retro_file_list, RetroObjectType, RetroVarType};
