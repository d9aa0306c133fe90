// ABOUTME: SeaORM entities module for database models and relationships
// ABOUTME: Exports entity definitions for blocks, block versions, and block references

pub mod block;
pub mod block_reference;
pub mod block_version;

pub use block::Entity as Block;
pub use block_reference::Entity as BlockReference;
pub use block_version::Entity as BlockVersion;
