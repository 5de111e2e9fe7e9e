// Domain layer: models, the required-service catalog and ports (interfaces).

pub mod catalog;
pub mod model;
pub mod ports;
