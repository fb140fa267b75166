// Test modules for ShardStore









#[cfg(test)]
pub mod store;
