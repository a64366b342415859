//! Pass-through transformer

use async_trait::async_trait;

use super::DataTransformer;
use crate::error::Result;
use crate::model::{AggregatedRecords, ContainerNameMapping};

/// Returns the aggregated records unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityTransformer;

impl IdentityTransformer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DataTransformer for IdentityTransformer {
    type Output = AggregatedRecords;

    async fn transform_data(
        &self,
        data: AggregatedRecords,
        _names: &ContainerNameMapping,
    ) -> Result<AggregatedRecords> {
        Ok(data)
    }
}
