pub mod cache;
pub mod repository;

#[cfg(test)]
pub(crate) mod testing;
