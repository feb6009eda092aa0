use crate::config::{
    triple, validate_provider, DEFAULT_COMPRESSION_LEVEL, DEFAULT_DENSITY, DEFAULT_VISCOSITY,
};
use crate::domain::model::{OutOfRangePolicy, RadialAxis, SlicePlane};
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{BcError, Result};
use crate::utils::validation::Validate;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub mesh: MeshConfig,
    pub slice: SliceConfig,
    pub profile: ProfileConfig,
    pub flux: FluxConfig,
    pub output: Option<OutputConfig>,
    pub monitoring: Option<MonitoringConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeshConfig {
    pub input: String,
    pub output: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SliceConfig {
    pub origin: Vec<f64>,
    pub normal: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileConfig {
    pub path: String,
    pub radial_axis: Option<RadialAxis>,
    pub out_of_range: Option<OutOfRangePolicy>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FluxConfig {
    pub total: f64,
    pub density: Option<f64>,
    pub viscosity: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    pub compression: Option<bool>,
    pub compression_level: Option<u32>,
    pub keep_input_arrays: Option<bool>,
    pub point_table: Option<String>,
    pub report: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(|e| BcError::ConfigError {
            message: format!("cannot read config file '{}': {}", path.as_ref().display(), e),
        })?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        // 處理環境變數替換
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| BcError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${CASE_DIR})
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        // 使用正規表達式匹配 ${VAR_NAME} 格式
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| BcError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    fn output_section(&self) -> OutputConfig {
        self.output.clone().unwrap_or_default()
    }

    /// 是否壓縮輸出陣列
    pub fn compression(&self) -> bool {
        self.output_section().compression.unwrap_or(true)
    }

    pub fn compression_level(&self) -> u32 {
        self.output_section()
            .compression_level
            .unwrap_or(DEFAULT_COMPRESSION_LEVEL)
    }

    /// 取得監控設定
    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }
}

impl ConfigProvider for TomlConfig {
    fn input_path(&self) -> &str {
        &self.mesh.input
    }

    fn output_path(&self) -> &str {
        &self.mesh.output
    }

    fn profile_path(&self) -> &str {
        &self.profile.path
    }

    fn total_flux(&self) -> f64 {
        self.flux.total
    }

    fn slice_plane(&self) -> Result<SlicePlane> {
        SlicePlane::new(
            triple("slice.origin", &self.slice.origin)?,
            triple("slice.normal", &self.slice.normal)?,
        )
    }

    fn density(&self) -> f64 {
        self.flux.density.unwrap_or(DEFAULT_DENSITY)
    }

    fn viscosity(&self) -> f64 {
        self.flux.viscosity.unwrap_or(DEFAULT_VISCOSITY)
    }

    fn radial_axis(&self) -> RadialAxis {
        self.profile.radial_axis.unwrap_or_default()
    }

    fn out_of_range(&self) -> OutOfRangePolicy {
        self.profile.out_of_range.unwrap_or_default()
    }

    fn keep_input_arrays(&self) -> bool {
        self.output
            .as_ref()
            .and_then(|o| o.keep_input_arrays)
            .unwrap_or(false)
    }

    fn point_table_path(&self) -> Option<&str> {
        self.output.as_ref().and_then(|o| o.point_table.as_deref())
    }

    fn report_path(&self) -> Option<&str> {
        self.output.as_ref().and_then(|o| o.report.as_deref())
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        validate_provider(
            self,
            &self.slice.origin,
            &self.slice.normal,
            self.compression_level(),
        )
    }
}
