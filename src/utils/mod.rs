pub mod scope_guard;
pub mod redact;
