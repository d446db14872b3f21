pub(crate) const DEFAULT_USER_AGENT: &str = concat!("blitz/", env!("CARGO_PKG_VERSION"));
