pub mod hash;
pub mod serde_duration;
#[cfg(test)]
pub mod testutil;
