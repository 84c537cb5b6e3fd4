// Domain layer: order models, ports, and the row-to-order services.
// Nothing here knows about xlsx or the file system.

pub mod model;
pub mod ports;

pub mod services;
