pub(crate) mod encoder;
pub(crate) mod engine;
pub(crate) mod session;
