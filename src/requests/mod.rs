//! Prepared requests: the immutable [`RequestSpec`], the cyclically replayed
//! [`RequestSet`], and the loaders that build them from flags and request files.
mod file;
mod login;
mod spec;


pub use file::{load_request_file, parse_header_string, parse_request_lines};
pub use login::{cookie_prefix, perform_login};
pub use spec::{Origin, RequestSet, RequestSpec, Scheme};
