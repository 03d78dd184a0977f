pub mod calendar;
pub mod http;
pub mod persistence;
pub mod reporting;
pub mod sources;

#[cfg(test)]
pub(crate) mod test_support;
