pub mod batch;
pub mod common;
pub mod inspect;
pub mod strip;
