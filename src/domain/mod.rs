// Domain layer: sheet and index models plus the storage/pipeline ports.

pub mod model;
pub mod ports;
