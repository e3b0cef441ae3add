//! Water sensors. Same attribute record as sensors; states run dry/wet.

use crate::models::{
    AnyResource, ResourceKind, ResourceType, SensorAttributes, TypedResource,
};

#[derive(Clone, Debug, PartialEq)]
pub struct WaterSensorKind;

impl ResourceKind for WaterSensorKind {
    type Attributes = SensorAttributes;
    const TYPE: ResourceType = ResourceType::WaterSensor;

    fn wrap(resource: TypedResource<Self>) -> AnyResource {
        AnyResource::WaterSensor(resource)
    }
}

pub type WaterSensor = TypedResource<WaterSensorKind>;
