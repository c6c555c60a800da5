pub mod descriptor_tests;
pub mod disabled_tests;
