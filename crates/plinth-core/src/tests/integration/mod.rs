#![cfg(test)]

pub mod property_tests;
pub mod scenario_tests;
