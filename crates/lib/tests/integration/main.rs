mod common;

mod concurrency_tests;
mod pipeline_tests;
mod reference_tests;
