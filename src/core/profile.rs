use crate::core::interpolate::LinearInterpolant;
use crate::utils::error::{BcError, Result};
use csv::{ReaderBuilder, Trim};

/// Measured radial velocity profile: `(radius, velocity)` samples.
#[derive(Debug, Clone, PartialEq)]
pub struct VelocityProfile {
    pub samples: Vec<(f64, f64)>,
}

impl VelocityProfile {
    /// Parses a profile table.
    ///
    /// Columns may be separated by commas or whitespace; column 0 is the radius
    /// and column 1 the velocity, further columns are ignored. Lines starting
    /// with `#` are comments and a leading non-numeric line is taken as header.
    pub fn parse(content: &[u8]) -> Result<Self> {
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .delimiter(b',')
            .comment(Some(b'#'))
            .flexible(true)
            .trim(Trim::All)
            .from_reader(content);

        let mut samples = Vec::new();
        for (row, record) in reader.records().enumerate() {
            let record = record?;
            let fields: Vec<&str> = if record.len() == 1 {
                record[0].split_whitespace().collect()
            } else {
                record.iter().filter(|f| !f.is_empty()).collect()
            };
            if fields.is_empty() {
                continue;
            }
            if fields.len() < 2 {
                return Err(BcError::profile(format!(
                    "line {}: expected radius and velocity columns, found {}",
                    row + 1,
                    fields.len()
                )));
            }

            match (fields[0].parse::<f64>(), fields[1].parse::<f64>()) {
                (Ok(radius), Ok(velocity)) => samples.push((radius, velocity)),
                _ if samples.is_empty() && row == 0 => {
                    tracing::debug!("Skipping profile header: {:?}", fields);
                }
                _ => {
                    return Err(BcError::profile(format!(
                        "line {}: cannot parse '{}' '{}' as numbers",
                        row + 1,
                        fields[0],
                        fields[1]
                    )));
                }
            }
        }

        if samples.len() < 2 {
            return Err(BcError::profile(format!(
                "profile needs at least 2 samples, found {}",
                samples.len()
            )));
        }

        if samples.windows(2).any(|w| w[1].0 < w[0].0) {
            tracing::warn!("⚠️ Profile radii are not sorted, sorting {} samples", samples.len());
        }

        Ok(Self { samples })
    }

    pub fn interpolant(&self) -> Result<LinearInterpolant> {
        LinearInterpolant::new(&self.samples)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
