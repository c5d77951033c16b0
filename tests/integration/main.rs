//! Integration tests, run against wiremock servers standing in for the site

mod common;
mod fetch_tests;
mod harvest_tests;
mod index_tests;
