use crate::domain::model::{
    OutOfRangePolicy, PolySurface, RadialAxis, SlicePlane, SourceData, TransformResult,
    UnstructuredGrid,
};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// Mesh I/O and geometry capabilities the pipeline needs from a mesh toolkit.
pub trait MeshToolkit: Send + Sync {
    fn load(&self, path: &str) -> impl std::future::Future<Output = Result<UnstructuredGrid>> + Send;
    fn slice(&self, grid: &UnstructuredGrid, plane: &SlicePlane) -> Result<PolySurface>;
    fn to_volume(&self, surface: PolySurface) -> Result<UnstructuredGrid>;
    fn save(
        &self,
        grid: &UnstructuredGrid,
        path: &str,
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn input_path(&self) -> &str;
    fn output_path(&self) -> &str;
    fn profile_path(&self) -> &str;
    fn total_flux(&self) -> f64;
    fn slice_plane(&self) -> Result<SlicePlane>;
    fn density(&self) -> f64;
    fn viscosity(&self) -> f64;
    fn radial_axis(&self) -> RadialAxis;
    fn out_of_range(&self) -> OutOfRangePolicy;
    fn keep_input_arrays(&self) -> bool;
    fn point_table_path(&self) -> Option<&str>;
    fn report_path(&self) -> Option<&str>;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<SourceData>;
    async fn transform(&self, data: SourceData) -> Result<TransformResult>;
    async fn load(&self, result: TransformResult) -> Result<String>;
}
