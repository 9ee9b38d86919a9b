#[cfg(test)]
pub mod metadata_api_tests;
#[cfg(test)]
pub mod reconciler_tests;
#[cfg(test)]
pub mod utils;
