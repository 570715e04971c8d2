// Domain layer: records, request/response models and the ports the dispatcher talks through.

pub mod model;
pub mod ports;
