//! Configuration access port trait.
//!
//! Values come back as raw strings; typing and validation happen in
//! `config_validation`, which reports malformed values with their key.

pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;

    /// Every key present in `section`, sorted. Empty when the section is absent.
    fn keys(&self, section: &str) -> Vec<String>;
}
