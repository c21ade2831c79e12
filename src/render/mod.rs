pub(crate) mod composite;
pub(crate) mod cpu;
pub(crate) mod ink;
pub(crate) mod layers;
