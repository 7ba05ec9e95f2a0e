pub mod fallback;
pub mod tours;
