pub(crate) mod fetch;
pub(crate) mod kind;
pub(crate) mod raster;
