pub(crate) mod store;
pub(crate) mod transcript;
pub(crate) mod upload;
