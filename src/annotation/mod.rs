pub(crate) mod model;
pub(crate) mod snapshot;
pub(crate) mod surface;
pub(crate) mod tools;
