mod common;

mod deploy_tests;
mod diff_tests;
mod inventory_tests;
mod package_tests;
mod snapshot_tests;
