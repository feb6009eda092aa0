#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
pub use cli::CliConfig;
pub use toml_config::TomlConfig;

use crate::domain::ports::ConfigProvider;
use crate::utils::error::{BcError, Result};
use crate::utils::validation::{
    validate_file_extension, validate_finite, validate_non_zero_vector, validate_path,
    validate_positive, validate_range,
};

pub const DEFAULT_DENSITY: f64 = 0.9333;
pub const DEFAULT_VISCOSITY: f64 = 21.90e-6;
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 6;

/// Converts a 3-component option into a fixed array.
pub(crate) fn triple(field_name: &str, values: &[f64]) -> Result<[f64; 3]> {
    <[f64; 3]>::try_from(values).map_err(|_| BcError::InvalidConfigValueError {
        field: field_name.to_string(),
        value: format!("{:?}", values),
        reason: "Expected exactly 3 components".to_string(),
    })
}

/// Checks shared by every configuration source.
pub(crate) fn validate_provider<C: ConfigProvider>(
    config: &C,
    origin: &[f64],
    normal: &[f64],
    compression_level: u32,
) -> Result<()> {
    validate_file_extension("input", config.input_path(), &["vtu"])?;
    validate_file_extension("output", config.output_path(), &["vtu"])?;
    validate_path("profile", config.profile_path())?;

    validate_finite("total_flux", config.total_flux())?;
    validate_positive("density", config.density())?;
    validate_finite("viscosity", config.viscosity())?;

    for component in triple("slice_origin", origin)? {
        validate_finite("slice_origin", component)?;
    }
    validate_non_zero_vector("slice_normal", triple("slice_normal", normal)?)?;

    validate_range("compression_level", compression_level, 0, 9)?;

    if let Some(path) = config.point_table_path() {
        validate_path("point_table", path)?;
    }
    if let Some(path) = config.report_path() {
        validate_path("report", path)?;
    }
    if config.input_path() == config.output_path() {
        return Err(BcError::InvalidConfigValueError {
            field: "output".to_string(),
            value: config.output_path().to_string(),
            reason: "Output would overwrite the input mesh".to_string(),
        });
    }
    Ok(())
}
