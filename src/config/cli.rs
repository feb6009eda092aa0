use clap::Parser;
use serde::{Deserialize, Serialize};

use crate::config::{
    triple, validate_provider, DEFAULT_COMPRESSION_LEVEL, DEFAULT_DENSITY, DEFAULT_VISCOSITY,
};
use crate::domain::model::{OutOfRangePolicy, RadialAxis, SlicePlane};
use crate::domain::ports::ConfigProvider;
use crate::utils::error::Result;
use crate::utils::logger::LogFormat;
use crate::utils::validation::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "inflow-bc")]
#[command(about = "Prepare an inhomogeneous mass-flux inflow boundary condition from a bulk mesh")]
pub struct CliConfig {
    /// Bulk mesh (.vtu)
    #[arg(long)]
    pub input: String,

    /// Boundary-condition mesh to write (.vtu)
    #[arg(long)]
    pub output: String,

    /// Radial velocity profile: radius and velocity columns
    #[arg(long)]
    pub profile: String,

    /// Requested total mass flux, e.g. kg/s
    #[arg(long, allow_negative_numbers = true)]
    pub total_flux: f64,

    #[arg(long, num_args = 3, value_names = ["X", "Y", "Z"], required = true, allow_negative_numbers = true)]
    pub slice_normal: Vec<f64>,

    #[arg(long, num_args = 3, value_names = ["X", "Y", "Z"], required = true, allow_negative_numbers = true)]
    pub slice_origin: Vec<f64>,

    /// Fluid density in kg/m³
    #[arg(long, default_value_t = DEFAULT_DENSITY)]
    pub density: f64,

    /// Dynamic viscosity in Pa·s (reported only)
    #[arg(long, default_value_t = DEFAULT_VISCOSITY)]
    pub viscosity: f64,

    /// Which coordinate of a slice point is the profile radius
    #[arg(long, value_enum, default_value_t = RadialAxis::X)]
    pub radial_axis: RadialAxis,

    /// Behaviour for slice radii outside the profile
    #[arg(long, value_enum, default_value_t = OutOfRangePolicy::Error)]
    pub out_of_range: OutOfRangePolicy,

    /// Carry the bulk mesh's point and cell arrays into the output
    #[arg(long)]
    pub keep_input_arrays: bool,

    /// Also write per-point values as CSV
    #[arg(long)]
    pub point_table: Option<String>,

    /// Also write a JSON run report
    #[arg(long)]
    pub report: Option<String>,

    /// Compute everything but write nothing
    #[arg(long)]
    pub dry_run: bool,

    /// Write uncompressed binary arrays
    #[arg(long)]
    pub no_compression: bool,

    #[arg(long, default_value_t = DEFAULT_COMPRESSION_LEVEL)]
    pub compression_level: u32,

    #[arg(long, help = "Enable system monitoring")]
    pub monitor: bool,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl ConfigProvider for CliConfig {
    fn input_path(&self) -> &str {
        &self.input
    }

    fn output_path(&self) -> &str {
        &self.output
    }

    fn profile_path(&self) -> &str {
        &self.profile
    }

    fn total_flux(&self) -> f64 {
        self.total_flux
    }

    fn slice_plane(&self) -> Result<SlicePlane> {
        SlicePlane::new(
            triple("slice_origin", &self.slice_origin)?,
            triple("slice_normal", &self.slice_normal)?,
        )
    }

    fn density(&self) -> f64 {
        self.density
    }

    fn viscosity(&self) -> f64 {
        self.viscosity
    }

    fn radial_axis(&self) -> RadialAxis {
        self.radial_axis
    }

    fn out_of_range(&self) -> OutOfRangePolicy {
        self.out_of_range
    }

    fn keep_input_arrays(&self) -> bool {
        self.keep_input_arrays
    }

    fn point_table_path(&self) -> Option<&str> {
        self.point_table.as_deref()
    }

    fn report_path(&self) -> Option<&str> {
        self.report.as_deref()
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validate_provider(self, &self.slice_origin, &self.slice_normal, self.compression_level)
    }
}
