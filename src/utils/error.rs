use thiserror::Error;

#[derive(Error, Debug)]
pub enum BcError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("XML parse error: {0}")]
    XmlError(#[from] quick_xml::Error),

    #[error("Base64 decode error: {0}")]
    Base64Error(#[from] base64::DecodeError),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Malformed mesh file: {message}")]
    FormatError { message: String },

    #[error("Unsupported mesh format: {message}")]
    UnsupportedFormat { message: String },

    #[error("Velocity profile error: {message}")]
    ProfileError { message: String },

    #[error("Radius {radius} lies outside the profile range [{min}, {max}]")]
    ProfileRangeError { radius: f64, min: f64, max: f64 },

    #[error("Slice plane does not intersect the mesh")]
    EmptySlice,

    #[error("Profile integrates to {uncorrected}, cannot scale to the requested flux")]
    DegenerateFlux { uncorrected: f64 },

    #[error("Array '{name}' has {actual} values, expected {expected}")]
    ArrayLengthMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Io,
    Configuration,
    Format,
    Numerical,
    Geometry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl BcError {
    pub fn format(message: impl Into<String>) -> Self {
        Self::FormatError {
            message: message.into(),
        }
    }

    pub fn profile(message: impl Into<String>) -> Self {
        Self::ProfileError {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::IoError(_) => ErrorCategory::Io,
            Self::ConfigError { .. }
            | Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. } => ErrorCategory::Configuration,
            Self::CsvError(_)
            | Self::SerializationError(_)
            | Self::XmlError(_)
            | Self::Base64Error(_)
            | Self::FormatError { .. }
            | Self::UnsupportedFormat { .. } => ErrorCategory::Format,
            Self::ProfileError { .. }
            | Self::ProfileRangeError { .. }
            | Self::DegenerateFlux { .. }
            | Self::ProcessingError { .. } => ErrorCategory::Numerical,
            Self::EmptySlice | Self::ArrayLengthMismatch { .. } => ErrorCategory::Geometry,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Configuration => ErrorSeverity::Medium,
            ErrorCategory::Io => ErrorSeverity::Critical,
            ErrorCategory::Format | ErrorCategory::Numerical | ErrorCategory::Geometry => {
                ErrorSeverity::High
            }
        }
    }

    /// Process exit code for this error. Every failure is non-zero.
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low | ErrorSeverity::High => 1, // 處理錯誤
            ErrorSeverity::Medium => 2, // 配置錯誤
            ErrorSeverity::Critical => 3, // 系統錯誤
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::IoError(_) => "Check that the file exists and that you have permission to read or write it",
            Self::CsvError(_) | Self::ProfileError { .. } => {
                "The profile must contain at least two rows of numeric 'radius velocity' columns"
            }
            Self::ProfileRangeError { .. } => {
                "Extend the profile to cover the slice, choose another --radial-axis, or pass --out-of-range clamp"
            }
            Self::EmptySlice => "Check --slice-origin and --slice-normal against the mesh bounds",
            Self::DegenerateFlux { .. } => {
                "The profile carries no net flux over the slice; check the radial axis and the profile velocities"
            }
            Self::XmlError(_)
            | Self::Base64Error(_)
            | Self::FormatError { .. }
            | Self::UnsupportedFormat { .. } => {
                "Re-export the mesh as a VTK XML unstructured grid (.vtu), e.g. with ParaView"
            }
            Self::ConfigError { .. }
            | Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. } => "Review the command line flags or the configuration file",
            Self::SerializationError(_) | Self::ArrayLengthMismatch { .. } | Self::ProcessingError { .. } => {
                "Re-run with --verbose and report the log if the problem persists"
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Io => format!("Could not access a file: {}", self),
            ErrorCategory::Configuration => format!("Invalid configuration: {}", self),
            ErrorCategory::Format => format!("Could not read input data: {}", self),
            ErrorCategory::Numerical => format!("Flux computation failed: {}", self),
            ErrorCategory::Geometry => format!("Slicing failed: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, BcError>;
