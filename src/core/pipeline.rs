use serde_json::json;

use crate::core::flux::{compute_mass_flux, FluxParameters};
use crate::core::profile::VelocityProfile;
use crate::core::tagging::tag_points;
use crate::domain::model::{
    ArrayData, DataArray, PointRecord, SourceData, TransformResult, MASS_FLUX_ARRAY,
    POINT_ID_ARRAY,
};
use crate::domain::ports::{ConfigProvider, MeshToolkit, Pipeline, Storage};
use crate::utils::error::{BcError, Result};

/// Tag → slice → convert → mass flux → write.
pub struct MassFluxPipeline<T: MeshToolkit, S: Storage, C: ConfigProvider> {
    toolkit: T,
    storage: S,
    config: C,
}

impl<T: MeshToolkit, S: Storage, C: ConfigProvider> MassFluxPipeline<T, S, C> {
    pub fn new(toolkit: T, storage: S, config: C) -> Self {
        Self {
            toolkit,
            storage,
            config,
        }
    }

    pub fn config(&self) -> &C {
        &self.config
    }

    fn flux_parameters(&self) -> FluxParameters {
        FluxParameters {
            density: self.config.density(),
            viscosity: self.config.viscosity(),
            total_flux: self.config.total_flux(),
            out_of_range: self.config.out_of_range(),
        }
    }

    fn point_table(records: &[PointRecord]) -> Result<Vec<u8>> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        for record in records {
            writer.serialize(record)?;
        }
        writer.into_inner().map_err(|e| BcError::ProcessingError {
            message: format!("failed to flush point table: {}", e),
        })
    }
}

#[async_trait::async_trait]
impl<T: MeshToolkit, S: Storage, C: ConfigProvider> Pipeline for MassFluxPipeline<T, S, C> {
    async fn extract(&self) -> Result<SourceData> {
        let grid = self.toolkit.load(self.config.input_path()).await?;

        tracing::debug!("Reading velocity profile from: {}", self.config.profile_path());
        let content = self.storage.read_file(self.config.profile_path()).await?;
        let profile = VelocityProfile::parse(&content)?;
        tracing::info!("📈 Loaded velocity profile with {} samples", profile.len());

        Ok(SourceData { grid, profile })
    }

    async fn transform(&self, data: SourceData) -> Result<TransformResult> {
        let SourceData { mut grid, profile } = data;
        let plane = self.config.slice_plane()?;

        // 標記每個點的原始索引，切片後仍可對應回原網格
        tag_points(&mut grid, POINT_ID_ARRAY, self.config.keep_input_arrays())?;

        let surface = self.toolkit.slice(&grid, &plane)?;
        tracing::info!(
            "🔪 Slice at origin {:?} normal {:?}: {} points, {} cells",
            plane.origin.coords.as_slice(),
            plane.normal.as_slice(),
            surface.point_count(),
            surface.cell_count()
        );
        if surface.is_empty() {
            return Err(BcError::EmptySlice);
        }

        let mut slice = self.toolkit.to_volume(surface)?;

        let axis = self.config.radial_axis();
        let radii: Vec<f64> = slice.points.iter().map(|p| axis.radius_of(p, &plane)).collect();

        let viscosity = self.config.viscosity();
        tracing::debug!("Dynamic viscosity {} Pa·s is reported only", viscosity);

        let field = compute_mass_flux(&radii, &profile, &self.flux_parameters())?;

        let ids = match slice.point_array(POINT_ID_ARRAY).map(|a| &a.data) {
            Some(ArrayData::Unsigned(ids)) => ids.clone(),
            Some(data) => (0..data.len()).map(|i| data.value_as_f64(i) as u64).collect(),
            None => {
                return Err(BcError::ProcessingError {
                    message: format!("slice lost the '{}' array", POINT_ID_ARRAY),
                })
            }
        };

        let points = slice
            .points
            .iter()
            .enumerate()
            .map(|(i, p)| PointRecord {
                bulk_node_id: ids[i],
                x: p.x,
                y: p.y,
                z: p.z,
                radius: radii[i],
                velocity: field.velocities[i],
                mass_flux: field.mass_flux[i],
            })
            .collect();

        slice.set_point_array(DataArray::float64(MASS_FLUX_ARRAY, field.mass_flux))?;

        Ok(TransformResult {
            grid: slice,
            report: field.report,
            points,
        })
    }

    async fn load(&self, result: TransformResult) -> Result<String> {
        let output_path = self.config.output_path().to_string();
        self.toolkit.save(&result.grid, &output_path).await?;

        if let Some(path) = self.config.point_table_path() {
            let table = Self::point_table(&result.points)?;
            self.storage.write_file(path, &table).await?;
            tracing::info!("🧾 Point table with {} rows saved to: {}", result.points.len(), path);
        }

        if let Some(path) = self.config.report_path() {
            let plane = self.config.slice_plane()?;
            let report = json!({
                "generated_at": chrono::Utc::now().to_rfc3339(),
                "input": self.config.input_path(),
                "output": output_path,
                "profile": self.config.profile_path(),
                "slice": {
                    "origin": [plane.origin.x, plane.origin.y, plane.origin.z],
                    "normal": [plane.normal.x, plane.normal.y, plane.normal.z],
                },
                "radial_axis": self.config.radial_axis(),
                "out_of_range": self.config.out_of_range(),
                "flux": result.report,
            });
            let data = serde_json::to_vec_pretty(&report)?;
            self.storage.write_file(path, &data).await?;
            tracing::info!("📝 Run report saved to: {}", path);
        }

        Ok(output_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::toolkit::VtkToolkit;
    use crate::adapters::vtu::{read_vtu, write_vtu, VtuWriteOptions};
    use crate::core::flux::radial_integral;
    use crate::core::slice::tests::hex_column;
    use crate::domain::model::{OutOfRangePolicy, RadialAxis, SlicePlane};
    use approx::assert_relative_eq;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[derive(Clone)]
    struct MockStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl MockStorage {
        fn new() -> Self {
            Self {
                files: Arc::new(Mutex::new(HashMap::new())),
            }
        }

        async fn get_file(&self, path: &str) -> Option<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned()
        }
    }

    impl Storage for MockStorage {
        async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned().ok_or_else(|| {
                BcError::IoError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("File not found: {}", path),
                ))
            })
        }

        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.to_vec());
            Ok(())
        }
    }

    struct MockConfig {
        origin: [f64; 3],
        normal: [f64; 3],
        total_flux: f64,
        radial_axis: RadialAxis,
        out_of_range: OutOfRangePolicy,
        point_table: Option<String>,
        report: Option<String>,
    }

    impl MockConfig {
        fn new(total_flux: f64) -> Self {
            Self {
                origin: [0.0, 0.0, 0.5],
                normal: [0.0, 0.0, 1.0],
                total_flux,
                radial_axis: RadialAxis::X,
                out_of_range: OutOfRangePolicy::Error,
                point_table: None,
                report: None,
            }
        }
    }

    impl ConfigProvider for MockConfig {
        fn input_path(&self) -> &str {
            "mesh.vtu"
        }
        fn output_path(&self) -> &str {
            "inflow.vtu"
        }
        fn profile_path(&self) -> &str {
            "profile.csv"
        }
        fn total_flux(&self) -> f64 {
            self.total_flux
        }
        fn slice_plane(&self) -> Result<SlicePlane> {
            SlicePlane::new(self.origin, self.normal)
        }
        fn density(&self) -> f64 {
            0.9333
        }
        fn viscosity(&self) -> f64 {
            21.90e-6
        }
        fn radial_axis(&self) -> RadialAxis {
            self.radial_axis
        }
        fn out_of_range(&self) -> OutOfRangePolicy {
            self.out_of_range
        }
        fn keep_input_arrays(&self) -> bool {
            false
        }
        fn point_table_path(&self) -> Option<&str> {
            self.point_table.as_deref()
        }
        fn report_path(&self) -> Option<&str> {
            self.report.as_deref()
        }
    }

    async fn seeded_storage(profile: &str) -> MockStorage {
        let storage = MockStorage::new();
        let mesh = write_vtu(&hex_column(2), &VtuWriteOptions::default()).unwrap();
        storage.write_file("mesh.vtu", &mesh).await.unwrap();
        storage.write_file("profile.csv", profile.as_bytes()).await.unwrap();
        storage
    }

    fn pipeline(
        storage: &MockStorage,
        config: MockConfig,
    ) -> MassFluxPipeline<VtkToolkit<MockStorage>, MockStorage, MockConfig> {
        MassFluxPipeline::new(VtkToolkit::new(storage.clone()), storage.clone(), config)
    }

    #[tokio::test]
    async fn test_extract_reads_mesh_and_profile() {
        let storage = seeded_storage("r,u\n0,1\n1,1\n").await;
        let data = pipeline(&storage, MockConfig::new(1.0)).extract().await.unwrap();
        assert_eq!(data.grid.point_count(), 12);
        assert_eq!(data.profile.samples, vec![(0.0, 1.0), (1.0, 1.0)]);
    }

    #[tokio::test]
    async fn test_extract_missing_profile_is_io_error() {
        let storage = MockStorage::new();
        let mesh = write_vtu(&hex_column(1), &VtuWriteOptions::default()).unwrap();
        storage.write_file("mesh.vtu", &mesh).await.unwrap();

        let err = pipeline(&storage, MockConfig::new(1.0)).extract().await.unwrap_err();
        assert!(matches!(err, BcError::IoError(_)));
    }

    #[tokio::test]
    async fn test_transform_tags_and_normalises() {
        let storage = seeded_storage("0 2.0\n0.5 1.5\n1 1.0\n").await;
        let p = pipeline(&storage, MockConfig::new(0.125));
        let data = p.extract().await.unwrap();
        let result = p.transform(data).await.unwrap();

        // Mid-plane of the first hex: its four bottom/top edges are cut.
        assert_eq!(result.grid.point_count(), 4);
        let ids = result.grid.point_array(POINT_ID_ARRAY).unwrap();
        let ArrayData::Unsigned(ids) = &ids.data else {
            panic!("ids must stay unsigned");
        };
        for (record, point) in result.points.iter().zip(&result.grid.points) {
            // Each slice point sits on the vertical edge between node k and k + 4.
            assert!(ids.contains(&record.bulk_node_id));
            assert!(record.bulk_node_id < 4);
            assert_eq!(record.radius, point.x);
        }

        let radii: Vec<f64> = result.points.iter().map(|r| r.radius).collect();
        let flux: Vec<f64> = result.points.iter().map(|r| r.mass_flux).collect();
        assert_relative_eq!(radial_integral(&radii, &flux), 0.125, max_relative = 1e-12);
        assert!(result.grid.point_array(MASS_FLUX_ARRAY).is_some());
        assert!(result.grid.cell_array("level").is_none());
    }

    #[tokio::test]
    async fn test_transform_missed_plane_is_empty_slice() {
        let storage = seeded_storage("0 1\n1 1\n").await;
        let mut config = MockConfig::new(1.0);
        config.origin = [0.0, 0.0, 10.0];
        let p = pipeline(&storage, config);
        let data = p.extract().await.unwrap();
        let err = p.transform(data).await.unwrap_err();
        assert!(matches!(err, BcError::EmptySlice));
    }

    #[tokio::test]
    async fn test_transform_out_of_range_radius() {
        let storage = seeded_storage("0 1\n0.5 1\n").await;
        let p = pipeline(&storage, MockConfig::new(1.0));
        let data = p.extract().await.unwrap();
        let err = p.transform(data).await.unwrap_err();
        assert!(matches!(err, BcError::ProfileRangeError { .. }));
    }

    #[tokio::test]
    async fn test_load_writes_mesh_table_and_report() {
        let storage = seeded_storage("0 1\n1 1\n").await;
        let mut config = MockConfig::new(2.0);
        config.point_table = Some("points.csv".to_string());
        config.report = Some("report.json".to_string());
        let p = pipeline(&storage, config);

        let data = p.extract().await.unwrap();
        let result = p.transform(data).await.unwrap();
        let output = p.load(result).await.unwrap();
        assert_eq!(output, "inflow.vtu");

        let written = read_vtu(&storage.get_file("inflow.vtu").await.unwrap()).unwrap();
        assert!(written.point_array(POINT_ID_ARRAY).is_some());
        assert!(written.point_array(MASS_FLUX_ARRAY).is_some());

        let table = String::from_utf8(storage.get_file("points.csv").await.unwrap()).unwrap();
        let mut lines = table.lines();
        assert_eq!(
            lines.next(),
            Some("bulk_node_id,x,y,z,radius,velocity,mass_flux")
        );
        assert_eq!(lines.count(), 4);

        let report: serde_json::Value =
            serde_json::from_slice(&storage.get_file("report.json").await.unwrap()).unwrap();
        assert_eq!(report["flux"]["requested_total_flux"], 2.0);
        assert_eq!(report["radial_axis"], "x");
        assert!(report["generated_at"].is_string());
    }
}
